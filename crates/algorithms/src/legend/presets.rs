//! Built-in legend catalog
//!
//! The published geochemical maps share one 11-step percentile colour
//! progression; each element only differs in the values assigned to the
//! steps.

use super::{LegendPoint, LegendRamp};
use geochroma_core::{Error, Result};
use std::sync::OnceLock;

/// Revision of the built-in tables. Bump whenever a value or colour changes.
pub const CATALOG_VERSION: u32 = 1;

/// Percentile colour progression, from background grey to dark red.
pub const PERCENTILE_COLORS: [[u8; 3]; 11] = [
    [204, 204, 204],
    [0, 38, 115],
    [0, 112, 255],
    [0, 197, 255],
    [0, 255, 0],
    [85, 255, 0],
    [255, 255, 0],
    [255, 170, 0],
    [255, 85, 0],
    [230, 0, 0],
    [115, 12, 12],
];

struct PresetDef {
    key: &'static str,
    label: &'static str,
    unit: &'static str,
    values: [f64; 11],
}

const PRESETS: &[PresetDef] = &[
    PresetDef {
        key: "fe2o3",
        label: "Fe2O3 (iron oxide)",
        unit: "%",
        values: [0.0, 3.1, 3.5, 3.9, 4.5, 5.7, 7.1, 8.5, 9.4, 12.0, 51.0],
    },
    PresetDef {
        key: "pb",
        label: "Pb (lead)",
        unit: "ppm",
        values: [0.0, 18.0, 20.0, 21.0, 24.0, 28.0, 32.0, 36.0, 41.0, 57.0, 1363.0],
    },
    PresetDef {
        key: "cu",
        label: "Cu (copper)",
        unit: "ppm",
        values: [0.0, 10.0, 12.0, 14.0, 17.0, 23.0, 33.0, 45.0, 58.0, 104.0, 2104.0],
    },
    PresetDef {
        key: "zn",
        label: "Zn (zinc)",
        unit: "ppm",
        values: [0.0, 45.0, 57.0, 66.0, 79.0, 107.0, 149.0, 212.0, 272.0, 542.0, 21100.0],
    },
    PresetDef {
        key: "sr",
        label: "Sr (strontium)",
        unit: "ppm",
        values: [0.0, 57.0, 72.0, 83.0, 99.0, 135.0, 192.0, 275.0, 342.0, 496.0, 3645.0],
    },
    PresetDef {
        key: "ba",
        label: "Ba (barium)",
        unit: "ppm",
        values: [
            0.0, 734.0, 853.0, 935.0, 1050.0, 1268.0, 1507.0, 1752.0, 1920.0, 2362.0, 15840.0,
        ],
    },
    PresetDef {
        key: "cao",
        label: "CaO (calcium oxide)",
        unit: "%",
        values: [0.0, 0.40, 0.50, 0.58, 0.73, 1.18, 1.90, 2.99, 4.05, 9.03, 53.07],
    },
];

impl PresetDef {
    fn to_ramp(&self) -> LegendRamp {
        let points = self
            .values
            .iter()
            .zip(PERCENTILE_COLORS)
            .map(|(&value, rgb)| LegendPoint::new(value, rgb))
            .collect();
        LegendRamp {
            key: self.key.to_string(),
            label: self.label.to_string(),
            unit: self.unit.to_string(),
            points,
        }
    }
}

/// Named legend ramps: the built-in element presets plus any user ramps.
///
/// Keys are matched case-insensitively. Inserting a ramp whose key already
/// exists replaces it, so user files can override a built-in table.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    ramps: Vec<LegendRamp>,
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl PresetCatalog {
    /// The built-in element presets
    pub fn builtin() -> &'static PresetCatalog {
        static BUILTIN: OnceLock<PresetCatalog> = OnceLock::new();
        BUILTIN.get_or_init(|| PresetCatalog {
            ramps: PRESETS.iter().map(PresetDef::to_ramp).collect(),
        })
    }

    /// A catalog with no ramps at all
    pub fn empty() -> Self {
        Self { ramps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.ramps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ramps.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&LegendRamp> {
        self.ramps.iter().find(|r| r.key.eq_ignore_ascii_case(key))
    }

    /// Like [`get`](Self::get), failing with [`Error::UnknownPreset`].
    pub fn require(&self, key: &str) -> Result<&LegendRamp> {
        self.get(key)
            .ok_or_else(|| Error::UnknownPreset(key.to_string()))
    }

    /// Keys in catalog order
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.ramps.iter().map(|r| r.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LegendRamp> + '_ {
        self.ramps.iter()
    }

    /// Add a ramp, returning the one it replaced.
    pub fn insert(&mut self, ramp: LegendRamp) -> Option<LegendRamp> {
        match self
            .ramps
            .iter_mut()
            .find(|r| r.key.eq_ignore_ascii_case(&ramp.key))
        {
            Some(slot) => Some(std::mem::replace(slot, ramp)),
            None => {
                self.ramps.push(ramp);
                None
            }
        }
    }

    /// Insert every ramp of a JSON array, returning how many were read.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize> {
        let ramps: Vec<LegendRamp> =
            serde_json::from_str(json).map_err(|e| Error::Other(format!("legend JSON: {}", e)))?;
        let count = ramps.len();
        for ramp in ramps {
            self.insert(ramp);
        }
        Ok(count)
    }
}

impl Extend<LegendRamp> for PresetCatalog {
    fn extend<I: IntoIterator<Item = LegendRamp>>(&mut self, iter: I) {
        for ramp in iter {
            self.insert(ramp);
        }
    }
}
