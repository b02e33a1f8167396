//! Gap filling for decoded rasters
//!
//! Cells left unknown after decoding (masked linework, legend-less colours)
//! are filled from the nearest known cells around them.

mod fill;

pub use fill::{fill_gaps, fill_nodata, FillNodata, FillNodataParams, GapFill, DEFAULT_MAX_SEARCH_DISTANCE};
