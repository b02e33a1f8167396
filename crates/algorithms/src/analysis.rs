//! End-to-end legend analysis
//!
//! decode -> mask linework -> fill gaps -> write nodata

use crate::decode::{apply_mask, decode, LineworkMask};
use crate::interpolation::{fill_gaps, FillNodataParams, DEFAULT_MAX_SEARCH_DISTANCE};
use crate::legend::LegendRamp;
use geochroma_core::raster::RasterStatistics;
use geochroma_core::{PixelBatch, Raster, Result};
use ndarray::Zip;
use std::fmt;
use tracing::{debug, info, warn};

/// Value written to cells that stay unknown
pub const DEFAULT_NODATA: f32 = -9999.0;

/// Parameters for [`analyze`]
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    /// See [`DecodeParams::snap_last_t`](crate::decode::DecodeParams)
    pub snap_last_t: Option<f64>,
    /// Linework rule, `None` to keep every decoded cell
    pub linework: Option<LineworkMask>,
    /// Gap-fill search radius in cells, `None` to skip filling
    pub fill_distance: Option<usize>,
    /// Inverse-distance exponent used by the gap fill
    pub fill_power: f64,
    pub nodata: f32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            snap_last_t: None,
            linework: Some(LineworkMask::default()),
            fill_distance: Some(DEFAULT_MAX_SEARCH_DISTANCE),
            fill_power: 2.0,
            nodata: DEFAULT_NODATA,
        }
    }
}

/// Cell accounting for one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub preset: String,
    pub rows: usize,
    pub cols: usize,
    /// Cells with a finite value straight out of the decoder
    pub decoded: usize,
    /// Cells blanked as linework
    pub masked: usize,
    /// Unknown cells given a value by the gap fill
    pub filled: usize,
    /// Cells written as nodata
    pub unresolved: usize,
    /// Statistics over the final valid cells
    pub statistics: RasterStatistics,
}

impl AnalysisReport {
    pub fn total(&self) -> usize {
        self.rows * self.cols
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Preset:     {}", self.preset)?;
        writeln!(f, "  Size:       {} x {} ({} cells)", self.cols, self.rows, self.total())?;
        writeln!(f, "  Decoded:    {}", self.decoded)?;
        writeln!(f, "  Masked:     {}", self.masked)?;
        writeln!(f, "  Filled:     {}", self.filled)?;
        write!(f, "  Unresolved: {}", self.unresolved)?;
        if let (Some(min), Some(max), Some(mean)) = (
            self.statistics.min,
            self.statistics.max,
            self.statistics.mean,
        ) {
            write!(f, "\n  Range:      {:.4} .. {:.4} (mean {:.4})", min, max, mean)?;
        }
        Ok(())
    }
}

/// Decoded raster and its report
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub raster: Raster<f32>,
    pub report: AnalysisReport,
}

/// Run the full pipeline on one colour raster.
///
/// The output carries the batch's georeferencing and has its nodata set
/// to `params.nodata`; no NaN survives. Cells without colour (transparent
/// pixels) are never filled. Counts come from cell masks, not from
/// comparing values against `params.nodata`.
pub fn analyze(bands: &PixelBatch, ramp: &LegendRamp, params: &AnalysisParams) -> Result<AnalysisOutput> {
    let (rows, cols) = bands.shape();
    debug!(preset = ramp.key(), rows, cols, "decoding legend raster");

    let (lo, hi) = ramp.value_range();
    if (lo..=hi).contains(&(params.nodata as f64)) {
        warn!(
            nodata = params.nodata,
            preset = ramp.key(),
            "nodata value lies inside the legend range ({} .. {}); decoded cells with that value will read as nodata",
            lo,
            hi
        );
    }

    let mut values = decode(bands, ramp, params.snap_last_t)?;
    let decoded = values.data().iter().filter(|v| !v.is_nan()).count();

    let masked = match &params.linework {
        Some(rule) => {
            let mask = rule.detect(bands);
            apply_mask(&mut values, &mask)?
        }
        None => 0,
    };
    debug!(decoded, masked, "decode finished");

    let blank = bands.blank_mask();
    let unknown = values.data().iter().filter(|v| v.is_nan()).count();
    let targets = Zip::from(values.data())
        .and(&blank)
        .map_collect(|v, &no_colour| v.is_nan() && !no_colour);

    let (mut raster, filled) = match params.fill_distance {
        Some(distance) if targets.iter().any(|&t| t) => {
            let fill = fill_gaps(
                &values,
                &FillNodataParams {
                    max_search_distance: distance,
                    power: params.fill_power,
                    nodata: params.nodata,
                },
                &targets,
            )?;
            (fill.raster, fill.filled)
        }
        _ => (values, 0),
    };
    let unresolved = unknown - filled;

    // NaN still marks every unresolved cell here
    let statistics = raster.statistics();
    let nodata = params.nodata;
    raster.data_mut().mapv_inplace(|v| if v.is_nan() { nodata } else { v });
    raster.set_nodata(Some(nodata));

    let report = AnalysisReport {
        preset: ramp.key().to_string(),
        rows,
        cols,
        decoded,
        masked,
        filled,
        unresolved,
        statistics,
    };
    info!(
        preset = ramp.key(),
        decoded,
        masked,
        filled,
        unresolved,
        "legend analysis complete"
    );

    Ok(AnalysisOutput { raster, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::PresetCatalog;
    use approx::assert_relative_eq;

    fn striped() -> PixelBatch {
        // 3x3 of the Cu 104 ppm colour with a black contour down the middle
        let mut bands = PixelBatch::filled(3, 3, [230, 0, 0]);
        for row in 0..3 {
            bands.set_pixel(row, 1, [0.0, 0.0, 0.0]).unwrap();
        }
        bands
    }

    #[test]
    fn test_mask_then_fill() {
        let ramp = PresetCatalog::builtin().require("cu").unwrap();
        let out = analyze(&striped(), ramp, &AnalysisParams::default()).unwrap();

        assert_eq!(out.report.decoded, 9);
        assert_eq!(out.report.masked, 3);
        assert_eq!(out.report.filled, 3);
        assert_eq!(out.report.unresolved, 0);
        for row in 0..3 {
            assert_relative_eq!(out.raster.get(row, 1).unwrap(), 104.0, epsilon = 1e-3);
        }
        assert_eq!(out.raster.nodata(), Some(DEFAULT_NODATA));
    }

    #[test]
    fn test_mask_without_fill() {
        let ramp = PresetCatalog::builtin().require("cu").unwrap();
        let params = AnalysisParams {
            fill_distance: None,
            nodata: -1.0,
            ..Default::default()
        };
        let out = analyze(&striped(), ramp, &params).unwrap();

        assert_eq!(out.report.filled, 0);
        assert_eq!(out.report.unresolved, 3);
        assert_eq!(out.raster.get(0, 1).unwrap(), -1.0);
        assert_eq!(out.raster.get(0, 0).unwrap(), 104.0);
        assert_eq!(out.report.statistics.valid_count, 6);
        assert_eq!(out.report.statistics.max, Some(104.0));
    }

    #[test]
    fn test_no_mask_keeps_linework_values() {
        let ramp = PresetCatalog::builtin().require("cu").unwrap();
        let params = AnalysisParams {
            linework: None,
            ..Default::default()
        };
        let out = analyze(&striped(), ramp, &params).unwrap();
        assert_eq!(out.report.masked, 0);
        assert_eq!(out.report.unresolved, 0);
        assert!(out.raster.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_input() {
        let ramp = PresetCatalog::builtin().require("pb").unwrap();
        let out = analyze(&PixelBatch::filled(0, 0, [0, 0, 0]), ramp, &AnalysisParams::default()).unwrap();
        assert_eq!(out.report.total(), 0);
        assert_eq!(out.report.statistics.mean, None);
    }

    #[test]
    fn test_nodata_equal_to_decoded_value() {
        // legend background grey decodes to 0, the same as the chosen nodata
        let mut bands = PixelBatch::filled(3, 3, [204, 204, 204]);
        for row in 0..3 {
            bands.set_pixel(row, 1, [0.0, 0.0, 0.0]).unwrap();
        }
        let ramp = PresetCatalog::builtin().require("cu").unwrap();
        let params = AnalysisParams {
            nodata: 0.0,
            ..Default::default()
        };
        let out = analyze(&bands, ramp, &params).unwrap();

        assert_eq!(out.report.masked, 3);
        assert_eq!(out.report.filled, 3);
        assert_eq!(out.report.unresolved, 0);
        assert_eq!(out.report.statistics.valid_count, 9);
        assert_eq!(out.report.statistics.max, Some(0.0));
        assert_eq!(out.raster.nodata(), Some(0.0));
    }

    #[test]
    fn test_transparent_cells_stay_nodata() {
        // Cu 104 ppm colour, left column fully transparent black
        let mut samples = Vec::new();
        for _row in 0..3 {
            samples.extend_from_slice(&[0u8, 0, 0, 0]);
            samples.extend_from_slice(&[230, 0, 0, 255]);
            samples.extend_from_slice(&[230, 0, 0, 255]);
        }
        let bands = PixelBatch::from_interleaved(&samples, 3, 3, 4).unwrap();
        let ramp = PresetCatalog::builtin().require("cu").unwrap();
        let out = analyze(&bands, ramp, &AnalysisParams::default()).unwrap();

        assert_eq!(out.report.decoded, 6);
        assert_eq!(out.report.masked, 0);
        assert_eq!(out.report.filled, 0);
        assert_eq!(out.report.unresolved, 3);
        for row in 0..3 {
            assert_eq!(out.raster.get(row, 0).unwrap(), DEFAULT_NODATA);
            assert_eq!(out.raster.get(row, 2).unwrap(), 104.0);
        }
    }

    #[test]
    fn test_report_display() {
        let ramp = PresetCatalog::builtin().require("cu").unwrap();
        let out = analyze(&striped(), ramp, &AnalysisParams::default()).unwrap();
        let text = out.report.to_string();
        assert!(text.contains("Preset:     cu"));
        assert!(text.contains("Masked:     3"));
    }
}
