//! JSON configuration for the `geochroma` binary
//!
//! Every key is optional; anything missing falls back to the defaults
//! (nodata -9999, 30 px fill radius, linework masking on).
//!
//! ```json
//! {
//!   "decode": { "snap_last_t": 0.5, "mask_linework": true },
//!   "fill":   { "enabled": true, "max_search_distance": 30, "power": 2.0 },
//!   "output": { "nodata": -9999.0, "compression": "deflate" },
//!   "presets": [ { "key": "as", "unit": "ppm", "points": [ ... ] } ]
//! }
//! ```

use anyhow::{Context, Result};
use geochroma_algorithms::analysis::{AnalysisParams, DEFAULT_NODATA};
use geochroma_algorithms::decode::LineworkMask;
use geochroma_algorithms::interpolation::DEFAULT_MAX_SEARCH_DISTANCE;
use geochroma_algorithms::legend::{LegendRamp, PresetCatalog};
use geochroma_core::io::{Compression, GeoTiffOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub decode: DecodeConfig,
    pub fill: FillConfig,
    pub output: OutputConfig,
    /// Extra legend ramps; a key already in the catalog replaces it
    pub presets: Vec<LegendRamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    pub snap_last_t: Option<f64>,
    pub mask_linework: bool,
    pub dark_threshold: i16,
    pub neutral_tolerance: i16,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        let mask = LineworkMask::default();
        Self {
            snap_last_t: None,
            mask_linework: true,
            dark_threshold: mask.dark_threshold,
            neutral_tolerance: mask.neutral_tolerance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FillConfig {
    pub enabled: bool,
    pub max_search_distance: usize,
    pub power: f64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_search_distance: DEFAULT_MAX_SEARCH_DISTANCE,
            power: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub nodata: f32,
    pub compression: Compression,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            nodata: DEFAULT_NODATA,
            compression: Compression::default(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub snap_last_t: Option<f64>,
    pub no_mask: bool,
    pub no_fill: bool,
    pub fill_distance: Option<usize>,
    pub power: Option<f64>,
    pub nodata: Option<f32>,
    pub compression: Option<Compression>,
}

impl Config {
    /// Read a config file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if overrides.snap_last_t.is_some() {
            self.decode.snap_last_t = overrides.snap_last_t;
        }
        if overrides.no_mask {
            self.decode.mask_linework = false;
        }
        if overrides.no_fill {
            self.fill.enabled = false;
        }
        if let Some(distance) = overrides.fill_distance {
            self.fill.max_search_distance = distance;
        }
        if let Some(power) = overrides.power {
            self.fill.power = power;
        }
        if let Some(nodata) = overrides.nodata {
            self.output.nodata = nodata;
        }
        if let Some(compression) = overrides.compression {
            self.output.compression = compression;
        }
    }

    /// Built-in presets plus the ramps from this file
    pub fn catalog(&self) -> PresetCatalog {
        let mut catalog = PresetCatalog::default();
        catalog.extend(self.presets.iter().cloned());
        catalog
    }

    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams {
            snap_last_t: self.decode.snap_last_t,
            linework: self.decode.mask_linework.then_some(LineworkMask {
                dark_threshold: self.decode.dark_threshold,
                neutral_tolerance: self.decode.neutral_tolerance,
            }),
            fill_distance: self.fill.enabled.then_some(self.fill.max_search_distance),
            fill_power: self.fill.power,
            nodata: self.output.nodata,
        }
    }

    pub fn geotiff_options(&self) -> GeoTiffOptions {
        GeoTiffOptions {
            compression: self.output.compression,
        }
    }
}
