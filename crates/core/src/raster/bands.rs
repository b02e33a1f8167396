//! Colour bands of a legend-encoded raster

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::{Array2, ArrayView2, Zip};

/// The red, green and blue samples of a colour raster, one per cell.
///
/// Channels are held as `f32` regardless of the source sample type; the
/// decoder works in single precision throughout. All three bands share one
/// shape, which is checked when the batch is built.
#[derive(Debug, Clone)]
pub struct PixelBatch {
    red: Array2<f32>,
    green: Array2<f32>,
    blue: Array2<f32>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl PixelBatch {
    /// Build a batch from three band arrays.
    pub fn new(red: Array2<f32>, green: Array2<f32>, blue: Array2<f32>) -> Result<Self> {
        check_shape("green", red.dim(), green.dim())?;
        check_shape("blue", red.dim(), blue.dim())?;
        Ok(Self {
            red,
            green,
            blue,
            transform: GeoTransform::default(),
            crs: None,
        })
    }

    /// Build a batch from pixel-interleaved samples (`RGBRGB...` or `RGBARGBA...`).
    ///
    /// `samples_per_pixel` must be 3 or 4. With an alpha sample, fully
    /// transparent pixels get NaN channels and count as having no colour.
    pub fn from_interleaved<T: RasterElement>(
        samples: &[T],
        rows: usize,
        cols: usize,
        samples_per_pixel: usize,
    ) -> Result<Self> {
        if !(3..=4).contains(&samples_per_pixel) {
            return Err(Error::InvalidParameter {
                name: "samples_per_pixel",
                value: samples_per_pixel.to_string(),
                reason: "colour rasters need 3 (RGB) or 4 (RGBA) samples".into(),
            });
        }
        if samples.len() != rows * cols * samples_per_pixel {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let band = |offset: usize| {
            Array2::from_shape_fn((rows, cols), |(r, c)| {
                let pixel = &samples[(r * cols + c) * samples_per_pixel..][..samples_per_pixel];
                match pixel.get(3) {
                    Some(&alpha) if alpha.to_f32() == 0.0 => f32::NAN,
                    _ => pixel[offset].to_f32(),
                }
            })
        };
        Self::new(band(0), band(1), band(2))
    }

    /// A batch where every cell has the same colour.
    pub fn filled(rows: usize, cols: usize, rgb: [u8; 3]) -> Self {
        let band = |v: u8| Array2::from_elem((rows, cols), v as f32);
        Self {
            red: band(rgb[0]),
            green: band(rgb[1]),
            blue: band(rgb[2]),
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    /// Attach a geotransform
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Attach a CRS
    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.red.dim()
    }

    pub fn rows(&self) -> usize {
        self.red.nrows()
    }

    pub fn cols(&self) -> usize {
        self.red.ncols()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.red.len()
    }

    pub fn is_empty(&self) -> bool {
        self.red.is_empty()
    }

    pub fn red(&self) -> ArrayView2<'_, f32> {
        self.red.view()
    }

    pub fn green(&self) -> ArrayView2<'_, f32> {
        self.green.view()
    }

    pub fn blue(&self) -> ArrayView2<'_, f32> {
        self.blue.view()
    }

    /// `[r, g, b]` at (row, col)
    pub fn pixel(&self, row: usize, col: usize) -> Option<[f32; 3]> {
        let r = *self.red.get((row, col))?;
        let g = *self.green.get((row, col))?;
        let b = *self.blue.get((row, col))?;
        Some([r, g, b])
    }

    /// Overwrite the colour at (row, col)
    pub fn set_pixel(&mut self, row: usize, col: usize, rgb: [f32; 3]) -> Result<()> {
        let (rows, cols) = self.shape();
        if row >= rows || col >= cols {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows,
                cols,
            });
        }
        self.red[(row, col)] = rgb[0];
        self.green[(row, col)] = rgb[1];
        self.blue[(row, col)] = rgb[2];
        Ok(())
    }

    /// Flag cells without colour (any NaN channel, e.g. transparent pixels).
    pub fn blank_mask(&self) -> Array2<bool> {
        Zip::from(&self.red)
            .and(&self.green)
            .and(&self.blue)
            .map_collect(|r, g, b| r.is_nan() || g.is_nan() || b.is_nan())
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Wrap per-cell output in a raster georeferenced like this batch.
    pub fn to_raster<U: RasterElement>(&self, data: Array2<U>) -> Result<Raster<U>> {
        check_shape("output", self.shape(), data.dim())?;
        let mut raster = Raster::from_array(data);
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        Ok(raster)
    }
}

fn check_shape(band: &'static str, expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(Error::shape_mismatch(band, expected, actual));
    }
    Ok(())
}
