//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is carried by the usual GeoTIFF
//! tags (pixel scale + tiepoint, or the full transformation matrix), the
//! GeoKey directory (EPSG code only) and GDAL's ASCII nodata tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, PixelBatch, Raster, RasterElement};
use num_traits::NumCast;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use std::str::FromStr;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::compression::{Compression as TiffCompression, Deflate, Lzw, Uncompressed};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tiff::ColorType;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Compression applied to written rasters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Lzw,
    Deflate,
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "lzw" => Ok(Compression::Lzw),
            "deflate" => Ok(Compression::Deflate),
            other => Err(Error::InvalidParameter {
                name: "compression",
                value: other.to_string(),
                reason: "expected none, lzw or deflate".into(),
            }),
        }
    }
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub compression: Compression,
}

/// Everything read from one TIFF image before it is split into bands.
struct DecodedImage {
    samples: DecodingResult,
    rows: usize,
    cols: usize,
    samples_per_pixel: usize,
    transform: Option<GeoTransform>,
    crs: Option<CRS>,
    nodata: Option<f64>,
}

/// Read one band of a GeoTIFF file into a Raster
///
/// `band` selects a sample of pixel-interleaved images (0-based, default 0).
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    decode_band(file, band)
}

/// Same as [`read_geotiff`] but from an in-memory buffer
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_band(Cursor::new(data), band)
}

/// Read an RGB or RGBA GeoTIFF into a [`PixelBatch`]
pub fn read_rgb_geotiff<P: AsRef<Path>>(path: P) -> Result<PixelBatch> {
    let file = BufReader::new(File::open(path.as_ref())?);
    decode_rgb(file)
}

/// Same as [`read_rgb_geotiff`] but from an in-memory buffer
pub fn read_rgb_geotiff_from_buffer(data: &[u8]) -> Result<PixelBatch> {
    decode_rgb(Cursor::new(data))
}

fn decode_band<T, R>(reader: R, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let image = decode_image(reader)?;
    let band = band.unwrap_or(0);
    if band >= image.samples_per_pixel {
        return Err(Error::InvalidParameter {
            name: "band",
            value: band.to_string(),
            reason: format!("image has {} sample(s) per pixel", image.samples_per_pixel),
        });
    }

    let all: Vec<T> = cast_samples(&image.samples)?;
    let data: Vec<T> = all
        .into_iter()
        .skip(band)
        .step_by(image.samples_per_pixel)
        .collect();

    let mut raster = Raster::from_vec(data, image.rows, image.cols)?;
    if let Some(transform) = image.transform {
        raster.set_transform(transform);
    }
    raster.set_crs(image.crs);
    raster.set_nodata(image.nodata.and_then(num_traits::cast));
    Ok(raster)
}

fn decode_rgb<R: Read + Seek>(reader: R) -> Result<PixelBatch> {
    let image = decode_image(reader)?;
    if image.samples_per_pixel < 3 {
        return Err(Error::UnsupportedDataType(format!(
            "expected an RGB or RGBA image, found {} sample(s) per pixel",
            image.samples_per_pixel
        )));
    }

    let samples: Vec<f32> = cast_samples(&image.samples)?;
    let batch = PixelBatch::from_interleaved(
        &samples,
        image.rows,
        image.cols,
        image.samples_per_pixel,
    )?;
    Ok(batch
        .with_transform(image.transform.unwrap_or_default())
        .with_crs(image.crs))
}

fn decode_image<R: Read + Seek>(reader: R) -> Result<DecodedImage> {
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let samples_per_pixel = match decoder.colortype()? {
        ColorType::Gray(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) => 4,
        other => {
            return Err(Error::UnsupportedDataType(format!(
                "TIFF colour type {:?}",
                other
            )))
        }
    };

    let samples = decoder.read_image()?;
    let rows = height as usize;
    let cols = width as usize;

    // Georeferencing tags are optional; a plain TIFF still decodes.
    let transform = read_geotransform(&mut decoder).ok();
    let crs = read_crs(&mut decoder);
    let nodata = read_nodata(&mut decoder);

    Ok(DecodedImage {
        samples,
        rows,
        cols,
        samples_per_pixel,
        transform,
        crs,
        nodata,
    })
}

fn cast_samples<T: NumCast + RasterElement>(result: &DecodingResult) -> Result<Vec<T>> {
    fn cast_all<S: NumCast + Copy, T: RasterElement>(buf: &[S]) -> Vec<T> {
        buf.iter()
            .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
            .collect()
    }

    Ok(match result {
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF sample format".to_string(),
            ))
        }
    })
}

/// Read the GeoTransform from pixel scale + tiepoint tags, falling back to
/// the model transformation matrix.
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE));
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT));

    if let (Ok(scale), Ok(tiepoint)) = (scale, tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    let matrix = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_TRANSFORMATION))
        .map_err(|_| Error::Other("No georeferencing tags".into()))?;
    if matrix.len() >= 8 {
        return Ok(GeoTransform {
            origin_x: matrix[3],
            origin_y: matrix[7],
            pixel_width: matrix[0],
            pixel_height: matrix[5],
            row_rotation: matrix[1],
            col_rotation: matrix[4],
        });
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// EPSG code from the GeoKey directory, if it holds one inline.
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u16_vec(Tag::Unknown(GEO_KEY_DIRECTORY))
        .ok()?;
    parse_geokeys(&keys)
}

fn parse_geokeys(keys: &[u16]) -> Option<CRS> {
    let count = *keys.get(3)? as usize;
    let entries = keys.get(4..4 + count * 4)?;

    // Prefer the projected system over its base geographic system.
    let mut geographic = None;
    for entry in entries.chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // location 0: value stored inline; 32767 means user-defined
        if location != 0 || value == 0 || value == 32767 {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_KEY => return Some(CRS::from_epsg(value as u32)),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(CRS::from_epsg(value as u32)),
            _ => {}
        }
    }
    geographic
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder
        .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA))
        .ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse::<f64>()
        .ok()
}

/// Write a Raster to a single-band float32 GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    // The encoder seeks back to patch offsets, so buffer in memory first.
    let buf = write_geotiff_to_buffer(raster, options)?;
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    file.write_all(&buf)?;
    file.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let options = options.unwrap_or_default();
    let data: Vec<f32> = raster.data().iter().map(|&v| v.to_f32()).collect();

    let mut buf = Vec::new();
    {
        let mut encoder = TiffEncoder::new(Cursor::new(&mut buf))?;
        match options.compression {
            Compression::None => encode_image(&mut encoder, raster, &data, Uncompressed)?,
            Compression::Lzw => encode_image(&mut encoder, raster, &data, Lzw)?,
            Compression::Deflate => {
                encode_image(&mut encoder, raster, &data, Deflate::default())?
            }
        }
    }

    Ok(buf)
}

fn encode_image<W, K, T, D>(
    encoder: &mut TiffEncoder<W, K>,
    raster: &Raster<T>,
    data: &[f32],
    compression: D,
) -> Result<()>
where
    W: Write + Seek,
    K: TiffKind,
    T: RasterElement,
    D: TiffCompression,
{
    let (rows, cols) = raster.shape();
    let mut image = encoder.new_image_with_compression::<Gray32Float, D>(
        cols as u32,
        rows as u32,
        compression,
    )?;
    write_georef_tags(image.encoder(), raster)?;
    image.write_data(data)?;
    Ok(())
}

fn write_georef_tags<W, K, T>(dir: &mut DirectoryEncoder<'_, W, K>, raster: &Raster<T>) -> Result<()>
where
    W: Write + Seek,
    K: TiffKind,
    T: RasterElement,
{
    let gt = raster.transform();

    if gt.row_rotation == 0.0 && gt.col_rotation == 0.0 {
        let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
        dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])?;
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])?;
    } else {
        let matrix = [
            gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x,
            gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(Tag::Unknown(MODEL_TRANSFORMATION), &matrix[..])?;
    }

    let keys = geokeys(raster.crs());
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), keys.as_slice())?;

    if let Some(nodata) = raster.nodata().and_then(RasterElement::to_f64) {
        let text = format!("{}", nodata);
        dir.write_tag(Tag::Unknown(GDAL_NODATA), text.as_str())?;
    }

    Ok(())
}

fn geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let geographic = crs.is_some_and(CRS::is_geographic);
    let model_type = if geographic { 2 } else { 1 };

    // Header: version 1.1.0, key count patched below
    let mut keys: Vec<u16> = vec![1, 1, 0, 0];
    keys.extend_from_slice(&[GT_MODEL_TYPE_KEY, 0, 1, model_type]);
    // RasterPixelIsArea
    keys.extend_from_slice(&[GT_RASTER_TYPE_KEY, 0, 1, 1]);

    if let Some(code) = crs.map(CRS::epsg).and_then(|c| u16::try_from(c).ok()) {
        let key = if geographic {
            GEOGRAPHIC_TYPE_KEY
        } else {
            PROJECTED_CS_TYPE_KEY
        };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }

    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}
