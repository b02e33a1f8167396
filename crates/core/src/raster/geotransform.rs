//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Legend images are exported north-up, so the rotation terms are normally
/// 0 and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Rotation about X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// North-up transform covering `(min_x, min_y, max_x, max_y)` with a
    /// grid of `width` x `height` pixels.
    ///
    /// This is the grid an acquisition step produces when asked to export an
    /// extent at a fixed pixel size.
    pub fn from_extent(
        (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
        width: usize,
        height: usize,
    ) -> Self {
        let width = width.max(1) as f64;
        let height = height.max(1) as f64;
        Self::new(
            min_x,
            max_y,
            (max_x - min_x) / width,
            -(max_y - min_y) / height,
        )
    }

    /// Convert to GDAL-style array
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Geographic coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.at(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Geographic coordinates of the pixel's top-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.at(col as f64, row as f64)
    }

    fn at(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Get the cell size (assumes square pixels and no rotation)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Check if this is a north-up image (no rotation)
    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < 1e-10
            && self.col_rotation.abs() < 1e-10
            && self.pixel_height < 0.0
    }

    /// Calculate the bounding box for a raster of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ];

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_center() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let (x, y) = gt.pixel_to_geo(5, 10);
        assert_relative_eq!(x, 155.0, epsilon = 1e-10);
        assert_relative_eq!(y, 95.0, epsilon = 1e-10);
    }

    #[test]
    fn test_from_extent_bounds() {
        let gt = GeoTransform::from_extent((950_000.0, 1_900_000.0, 953_000.0, 1_902_000.0), 100, 50);
        assert_relative_eq!(gt.pixel_width, 30.0, epsilon = 1e-10);
        assert_relative_eq!(gt.pixel_height, -40.0, epsilon = 1e-10);
        assert!(gt.is_north_up());

        let (min_x, min_y, max_x, max_y) = gt.bounds(100, 50);
        assert_relative_eq!(min_x, 950_000.0, epsilon = 1e-6);
        assert_relative_eq!(min_y, 1_900_000.0, epsilon = 1e-6);
        assert_relative_eq!(max_x, 953_000.0, epsilon = 1e-6);
        assert_relative_eq!(max_y, 1_902_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_gdal_order() {
        let gt = GeoTransform::new(1.0, 2.0, 3.0, -4.0);
        assert_eq!(gt.to_gdal(), [1.0, 3.0, 0.0, 2.0, 0.0, -4.0]);
    }
}
