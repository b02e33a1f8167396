//! Quadrant inverse-distance gap filling
//!
//! For every unknown cell, the nearest known cell is looked up in each of
//! the four quadrants around it, within a circular search window. The
//! candidates found are blended with inverse distance weights:
//!
//! ```text
//! z = Σ(wi * zi) / Σ(wi),   wi = 1 / di^p
//! ```
//!
//! Only cells that were known in the input contribute; values filled in
//! this pass are never reused, so the result does not depend on scan
//! order.

use crate::maybe_rayon::*;
use geochroma_core::raster::{Neighborhood, Quadrant, SearchOffset};
use geochroma_core::{Algorithm, Error, Raster, Result};
use ndarray::Array2;
use std::ops::RangeInclusive;

/// Default search radius in cells
pub const DEFAULT_MAX_SEARCH_DISTANCE: usize = 30;

/// Parameters for gap filling
#[derive(Debug, Clone)]
pub struct FillNodataParams {
    /// Search radius in cells. 0 is treated as 1.
    pub max_search_distance: usize,
    /// Inverse-distance exponent (default: 2.0)
    pub power: f64,
    /// Written to cells that stay unknown, and set as the output's nodata
    pub nodata: f32,
}

impl Default for FillNodataParams {
    fn default() -> Self {
        Self {
            max_search_distance: DEFAULT_MAX_SEARCH_DISTANCE,
            power: 2.0,
            nodata: -9999.0,
        }
    }
}

/// Gap filling algorithm
#[derive(Debug, Clone, Default)]
pub struct FillNodata;

impl Algorithm for FillNodata {
    type Input = Raster<f32>;
    type Output = Raster<f32>;
    type Params = FillNodataParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Fill NoData"
    }

    fn description(&self) -> &'static str {
        "Fill unknown cells by inverse distance weighting of the nearest known cell per quadrant"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        fill_nodata(&input, params)
    }
}

/// Fill NaN and nodata cells of `raster`.
///
/// Known cells are copied unchanged. Unknown cells with no known neighbour
/// inside the search radius are set to `params.nodata`.
pub fn fill_nodata(raster: &Raster<f32>, params: FillNodataParams) -> Result<Raster<f32>> {
    let targets = raster.data().mapv(|v| raster.is_nodata(v));
    let GapFill { raster: mut output, .. } = fill_gaps(raster, &params, &targets)?;
    let nodata = params.nodata;
    output.data_mut().mapv_inplace(|v| if v.is_nan() { nodata } else { v });
    output.set_nodata(Some(nodata));
    Ok(output)
}

/// Outcome of [`fill_gaps`]
#[derive(Debug, Clone)]
pub struct GapFill {
    /// Input with the resolved targets filled; unresolved targets are NaN
    pub raster: Raster<f32>,
    /// Targets that received a value
    pub filled: usize,
    /// Targets left NaN
    pub unresolved: usize,
}

/// Fill the unknown cells flagged in `targets`.
///
/// Every other cell, unknown or not, is copied unchanged, and only known
/// cells act as sources. `params.nodata` is not written and the output
/// has no nodata value; unresolved targets stay NaN so the caller can tell
/// them apart from real values.
pub fn fill_gaps(raster: &Raster<f32>, params: &FillNodataParams, targets: &Array2<bool>) -> Result<GapFill> {
    if !params.power.is_finite() || params.power <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "power",
            value: params.power.to_string(),
            reason: "must be a positive finite number".into(),
        });
    }
    if targets.dim() != raster.shape() {
        return Err(Error::shape_mismatch("targets", raster.shape(), targets.dim()));
    }

    let (rows, cols) = raster.shape();
    let radius = params.max_search_distance.max(1);
    let window = Neighborhood::Circle(radius).search_order();
    let known = KnownCounts::new(raster);
    // wi = 1 / di^p = (di^2)^(-p/2)
    let exponent = -params.power / 2.0;
    let input = raster.view();

    let cells: Vec<(f32, Option<bool>)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let value = input[(row, col)];
                if !targets[(row, col)] || !raster.is_nodata(value) {
                    row_data.push((value, None));
                    continue;
                }
                let filled = quadrant_idw(raster, &known, row, col, &window, radius, exponent);
                row_data.push((filled.unwrap_or(f32::NAN), Some(filled.is_some())));
            }
            row_data
        })
        .collect();

    let filled = cells.iter().filter(|(_, hit)| *hit == Some(true)).count();
    let unresolved = cells.iter().filter(|(_, hit)| *hit == Some(false)).count();
    let data: Vec<f32> = cells.into_iter().map(|(v, _)| v).collect();
    let data = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(GapFill {
        raster: raster.with_same_meta(data)?,
        filled,
        unresolved,
    })
}

/// Summed-area table of known cells, for constant-time box counts.
struct KnownCounts {
    rows: usize,
    cols: usize,
    table: Vec<usize>,
}

impl KnownCounts {
    fn new(raster: &Raster<f32>) -> Self {
        let (rows, cols) = raster.shape();
        let stride = cols + 1;
        let mut table = vec![0usize; (rows + 1) * stride];
        let input = raster.view();
        for row in 0..rows {
            let mut run = 0;
            for col in 0..cols {
                if !raster.is_nodata(input[(row, col)]) {
                    run += 1;
                }
                table[(row + 1) * stride + col + 1] = table[row * stride + col + 1] + run;
            }
        }
        Self { rows, cols, table }
    }

    /// Known cells in the box `row + dr, col + dc`, clipped to the grid.
    fn count(&self, row: usize, col: usize, dr: RangeInclusive<isize>, dc: RangeInclusive<isize>) -> usize {
        let clip = |centre: usize, lo: isize, hi: isize, len: usize| {
            let start = (centre as isize + lo).clamp(0, len as isize) as usize;
            let end = (centre as isize + hi + 1).clamp(0, len as isize) as usize;
            (start, end)
        };
        let (r0, r1) = clip(row, *dr.start(), *dr.end(), self.rows);
        let (c0, c1) = clip(col, *dc.start(), *dc.end(), self.cols);
        if r0 >= r1 || c0 >= c1 {
            return 0;
        }
        let s = self.cols + 1;
        self.table[r1 * s + c1] + self.table[r0 * s + c0] - self.table[r0 * s + c1] - self.table[r1 * s + c0]
    }
}

/// Blend the nearest known cell of each quadrant around (row, col).
///
/// Quadrants whose square extent holds no known cell are skipped up
/// front; a cell deep inside a hole costs four table lookups.
fn quadrant_idw(
    raster: &Raster<f32>,
    known: &KnownCounts,
    row: usize,
    col: usize,
    window: &[SearchOffset],
    radius: usize,
    exponent: f64,
) -> Option<f32> {
    let (rows, cols) = raster.shape();
    let mut nearest: [Option<(usize, f32)>; 4] = [None; 4];
    let mut done = [false; 4];
    for q in Quadrant::ALL {
        let (dr, dc) = q.extent(radius);
        done[q.index()] = known.count(row, col, dr, dc) == 0;
    }
    let mut pending = done.iter().filter(|&&d| !d).count();
    if pending == 0 {
        return None;
    }

    for offset in window {
        let q = offset.quadrant.index();
        if done[q] {
            continue;
        }

        let r = row as isize + offset.dr;
        let c = col as isize + offset.dc;
        if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize {
            continue;
        }

        let value = unsafe { raster.get_unchecked(r as usize, c as usize) };
        if raster.is_nodata(value) {
            continue;
        }

        nearest[q] = Some((offset.dist_sq, value));
        done[q] = true;
        pending -= 1;
        if pending == 0 {
            break;
        }
    }

    let mut sum_w = 0.0;
    let mut sum_wz = 0.0;
    for (dist_sq, value) in nearest.into_iter().flatten() {
        let w = (dist_sq as f64).powf(exponent);
        sum_w += w;
        sum_wz += w * value as f64;
    }

    (sum_w > 0.0).then(|| (sum_wz / sum_w) as f32)
}
