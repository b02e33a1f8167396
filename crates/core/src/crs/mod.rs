//! Coordinate Reference System metadata
//!
//! geochroma never reprojects; the CRS only travels with the rasters so the
//! decoded output lands in the same reference system as the legend image.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System, identified by its EPSG code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// Parse an `EPSG:<code>` authority string (case-insensitive) or a bare code.
    pub fn parse_authority(s: &str) -> Option<Self> {
        let s = s.trim();
        let code = match s.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => &s[5..],
            _ => s,
        };
        code.parse::<u32>().ok().map(Self::from_epsg)
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Whether the EPSG code lies in the geographic 2D range (4000-4999).
    ///
    /// Used to pick the GeoTIFF model type; other codes count as projected.
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg, 4000..=4999)
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        self.epsg == other.epsg
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}
