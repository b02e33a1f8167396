//! # geochroma algorithms
//!
//! Recover numeric values from legend-coloured rasters.
//!
//! ## Modules
//!
//! - **legend**: colour ramps, the built-in element presets and the
//!   colour-to-value projection
//! - **decode**: whole-raster decoding and linework masking
//! - **interpolation**: gap filling of cells left unknown
//! - **analysis**: the decode, mask and fill pipeline with a cell report

pub mod analysis;
pub mod decode;
pub mod interpolation;
pub mod legend;
pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{analyze, AnalysisOutput, AnalysisParams, AnalysisReport, DEFAULT_NODATA};
    pub use crate::decode::{
        apply_mask, decode, decode_bands, detect_artifact_mask, DecodeParams, LineworkMask,
        RasterDecoder,
    };
    pub use crate::interpolation::{fill_gaps, fill_nodata, FillNodata, FillNodataParams, GapFill};
    pub use crate::legend::{LegendPoint, LegendRamp, PresetCatalog, Projection, Segment};
    pub use geochroma_core::prelude::*;
}
