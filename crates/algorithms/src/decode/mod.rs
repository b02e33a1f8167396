//! Colour-to-value decoding of legend rasters
//!
//! Every cell of an RGB raster is projected onto a [`LegendRamp`] and
//! replaced by the interpolated value. Cells whose colour is printed
//! linework (contours, labels, borders) can be flagged with a
//! [`LineworkMask`] and blanked afterwards.

use crate::legend::{snap_threshold, LegendRamp};
use crate::maybe_rayon::*;
use geochroma_core::{Algorithm, Error, PixelBatch, Raster, Result};
use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

/// Parameters for legend decoding
#[derive(Debug, Clone, Default)]
pub struct DecodeParams {
    /// Projections beyond this fraction of the final segment snap to the
    /// ramp's last value. `None`, NaN and values outside [0, 1] disable it.
    pub snap_last_t: Option<f64>,
}

/// Decodes colour rasters against one legend ramp.
#[derive(Debug, Clone, Copy)]
pub struct RasterDecoder<'a> {
    ramp: &'a LegendRamp,
}

impl<'a> RasterDecoder<'a> {
    pub fn new(ramp: &'a LegendRamp) -> Self {
        Self { ramp }
    }

    pub fn ramp(&self) -> &'a LegendRamp {
        self.ramp
    }

    /// Decode a whole batch into a value raster georeferenced like it.
    pub fn decode(&self, bands: &PixelBatch, params: &DecodeParams) -> Result<Raster<f32>> {
        let values = decode_bands(
            bands.red(),
            bands.green(),
            bands.blue(),
            self.ramp,
            params.snap_last_t,
        )?;
        bands.to_raster(values)
    }
}

impl Algorithm for RasterDecoder<'_> {
    type Input = PixelBatch;
    type Output = Raster<f32>;
    type Params = DecodeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Legend Decode"
    }

    fn description(&self) -> &'static str {
        "Project legend colours onto a colour ramp and recover the mapped values"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        self.decode(&input, &params)
    }
}

/// Decode a colour raster into values.
///
/// Cells for which no ramp segment yields a candidate (every segment
/// degenerate, or a NaN channel) are NaN.
pub fn decode(bands: &PixelBatch, ramp: &LegendRamp, snap_last_t: Option<f64>) -> Result<Raster<f32>> {
    RasterDecoder::new(ramp).decode(bands, &DecodeParams { snap_last_t })
}

/// Decode three band views of identical shape.
///
/// Each output cell equals `ramp.project(r, g, b, snap_last_t)` for the
/// corresponding samples. Rows are processed in parallel; within a row
/// segments are the outer loop so the running minimum is updated in ramp
/// order, which keeps the first-segment-wins tie rule.
pub fn decode_bands(
    red: ArrayView2<'_, f32>,
    green: ArrayView2<'_, f32>,
    blue: ArrayView2<'_, f32>,
    ramp: &LegendRamp,
    snap_last_t: Option<f64>,
) -> Result<Array2<f32>> {
    let shape = red.dim();
    if green.dim() != shape {
        return Err(Error::shape_mismatch("green", shape, green.dim()));
    }
    if blue.dim() != shape {
        return Err(Error::shape_mismatch("blue", shape, blue.dim()));
    }

    let (rows, cols) = shape;
    let segments = ramp.geometry();
    let snap = snap_threshold(snap_last_t);

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let (r, g, b) = (red.row(row), green.row(row), blue.row(row));
            let mut values = vec![f32::NAN; cols];
            let mut best = vec![f32::INFINITY; cols];

            for seg in &segments {
                for col in 0..cols {
                    let (t, dist_sq) = seg.project([r[col], g[col], b[col]], snap);
                    if dist_sq < best[col] {
                        best[col] = dist_sq;
                        values[col] = seg.value_at(t);
                    }
                }
            }
            values
        })
        .collect();

    Array2::from_shape_vec(shape, data).map_err(|e| Error::Other(e.to_string()))
}

/// Rule for spotting dark, near-neutral linework.
///
/// Channels are truncated to integers; a pixel is linework when every
/// channel is below `dark_threshold` and neighbouring channels differ by
/// less than `neutral_tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineworkMask {
    pub dark_threshold: i16,
    pub neutral_tolerance: i16,
}

impl Default for LineworkMask {
    fn default() -> Self {
        Self {
            dark_threshold: 75,
            neutral_tolerance: 15,
        }
    }
}

impl LineworkMask {
    /// Cells without colour (NaN channels) are never linework.
    pub fn is_linework(&self, rgb: [f32; 3]) -> bool {
        if rgb.iter().any(|v| v.is_nan()) {
            return false;
        }
        let [r, g, b] = rgb.map(|v| v as i16 as i32);
        let dark = self.dark_threshold as i32;
        let tol = self.neutral_tolerance as i32;
        r < dark && g < dark && b < dark && (r - g).abs() < tol && (g - b).abs() < tol
    }

    /// Flag every linework pixel of `bands`.
    pub fn detect(&self, bands: &PixelBatch) -> Array2<bool> {
        Zip::from(bands.red())
            .and(bands.green())
            .and(bands.blue())
            .map_collect(|&r, &g, &b| self.is_linework([r, g, b]))
    }
}

/// Linework mask with the default thresholds (dark < 75, tolerance 15).
pub fn detect_artifact_mask(bands: &PixelBatch) -> Array2<bool> {
    LineworkMask::default().detect(bands)
}

/// Set masked cells of `values` to NaN, returning how many were flagged.
pub fn apply_mask(values: &mut Raster<f32>, mask: &Array2<bool>) -> Result<usize> {
    if mask.dim() != values.shape() {
        return Err(Error::shape_mismatch("mask", values.shape(), mask.dim()));
    }

    let mut count = 0;
    Zip::from(values.data_mut()).and(mask).for_each(|v, &masked| {
        if masked {
            *v = f32::NAN;
            count += 1;
        }
    });
    Ok(count)
}
