//! Raster data structures

mod bands;
mod element;
mod geotransform;
mod grid;
mod neighborhood;

pub use bands::PixelBatch;
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use neighborhood::{Neighborhood, Quadrant, SearchOffset};
