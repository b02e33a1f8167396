//! End-to-end tests: colour GeoTIFF in, decoded value GeoTIFF out.
//!
//! The colour rasters are synthesised on the fly with the `tiff` encoder,
//! so no fixture files are needed.

use approx::assert_relative_eq;
use geochroma_algorithms::analysis::{analyze, AnalysisParams, DEFAULT_NODATA};
use geochroma_algorithms::decode::{decode, detect_artifact_mask};
use geochroma_algorithms::legend::{LegendPoint, LegendRamp, PresetCatalog, PERCENTILE_COLORS};
use geochroma_core::io::{read_geotiff, read_rgb_geotiff, write_geotiff, Compression, GeoTiffOptions};
use geochroma_core::raster::Raster;
use geochroma_core::Error;
use std::fs::File;
use std::path::Path;
use tiff::encoder::colortype::RGB8;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;

/// Write an 8-bit RGB GeoTIFF in EPSG:5179 with 30 m cells.
fn write_rgb(path: &Path, cols: u32, rows: u32, pixels: &[[u8; 3]]) {
    let flat: Vec<u8> = pixels.iter().flatten().copied().collect();
    let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
    let mut image = encoder.new_image::<RGB8>(cols, rows).unwrap();
    let scale = [30.0f64, 30.0, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
        .unwrap();
    let tiepoint = [0.0f64, 0.0, 0.0, 1_000_000.0, 2_000_000.0, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
        .unwrap();
    let keys: Vec<u16> = vec![1, 1, 0, 1, 3072, 0, 1, 5179];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), keys.as_slice())
        .unwrap();
    image.write_data(&flat).unwrap();
}

#[test]
fn three_point_ramp_scenario() {
    let ramp = LegendRamp::new(
        "demo",
        "Demo",
        "ppm",
        vec![
            LegendPoint::new(0.0, [204, 204, 204]),
            LegendPoint::new(10.0, [0, 38, 115]),
            LegendPoint::new(20.0, [0, 255, 0]),
        ],
    )
    .unwrap();

    let hit = ramp.project_with_distance(0.0, 38.0, 115.0, None).unwrap();
    assert_eq!(hit.value, 10.0);
    assert_eq!(hit.dist_sq, 0.0);
    assert_eq!(ramp.project(204.0, 204.0, 204.0, None), 0.0);

    // repeated projections are bit-identical
    let first = ramp.project(97.0, 141.0, 33.0, Some(0.5));
    for _ in 0..10 {
        assert_eq!(ramp.project(97.0, 141.0, 33.0, Some(0.5)).to_bits(), first.to_bits());
    }
}

#[test]
fn one_point_ramp_rejected() {
    let err = LegendRamp::new("x", "x", "", vec![LegendPoint::new(1.0, [1, 2, 3])]).unwrap_err();
    assert!(matches!(err, Error::InvalidRamp { .. }));
}

#[test]
fn every_preset_decodes_its_own_anchors() {
    for ramp in PresetCatalog::builtin().iter() {
        for (point, rgb) in ramp.points().iter().zip(PERCENTILE_COLORS) {
            let [r, g, b] = rgb.map(f32::from);
            // an interior anchor is reached at t = 1 of the previous segment,
            // so decimal tables may differ from the literal by an ulp
            assert_relative_eq!(
                ramp.project(r, g, b, None),
                point.value as f32,
                max_relative = 1e-6
            );
        }
    }
}

#[test]
fn geotiff_roundtrip_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cu_map.tif");
    let output = dir.path().join("cu_values.tif");

    // 4x3 map: copper legend colours with a black boundary line in column 2
    let red = [230, 0, 0];
    let line = [20, 20, 20];
    let green = [0, 255, 0];
    #[rustfmt::skip]
    let pixels = [
        red,   red,   line, green,
        red,   red,   line, green,
        red,   red,   line, green,
    ];
    write_rgb(&input, 4, 3, &pixels);

    let bands = read_rgb_geotiff(&input).unwrap();
    assert_eq!(bands.shape(), (3, 4));
    assert_eq!(detect_artifact_mask(&bands).iter().filter(|&&m| m).count(), 3);

    let ramp = PresetCatalog::builtin().require("cu").unwrap();
    let out = analyze(&bands, ramp, &AnalysisParams::default()).unwrap();
    assert_eq!(out.report.masked, 3);
    assert_eq!(out.report.filled, 3);
    assert_eq!(out.report.unresolved, 0);

    write_geotiff(
        &out.raster,
        &output,
        Some(GeoTiffOptions {
            compression: Compression::Deflate,
        }),
    )
    .unwrap();

    let back: Raster<f32> = read_geotiff(&output, None).unwrap();
    assert_eq!(back.shape(), (3, 4));
    assert_eq!(back.nodata(), Some(DEFAULT_NODATA));
    assert_eq!(back.crs().map(|c| c.epsg()), Some(5179));
    assert_eq!(back.transform().origin_x, 1_000_000.0);
    assert_eq!(back.transform().pixel_width, 30.0);
    assert_eq!(back.get(0, 0).unwrap(), 104.0);
    assert_eq!(back.get(2, 3).unwrap(), 17.0);

    // filled line sits between 104 (west) and 17 (east)
    let v = back.get(1, 2).unwrap();
    assert!(v > 17.0 && v < 104.0, "filled value {}", v);
}

#[test]
fn unfilled_cells_written_as_nodata() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("all_lines.tif");
    write_rgb(&input, 2, 2, &[[0, 0, 0]; 4]);

    let bands = read_rgb_geotiff(&input).unwrap();
    let ramp = PresetCatalog::builtin().require("pb").unwrap();
    let out = analyze(&bands, ramp, &AnalysisParams::default()).unwrap();

    assert_eq!(out.report.unresolved, 4);
    assert!(out.raster.data().iter().all(|&v| v == DEFAULT_NODATA));
    assert_eq!(out.report.statistics.valid_count, 0);
}

#[test]
fn decode_reads_rgb_geotiff() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plain.tif");
    write_rgb(&input, 3, 1, &[[204, 204, 204], [0, 197, 255], [115, 12, 12]]);

    let bands = read_rgb_geotiff(&input).unwrap();
    let ramp = PresetCatalog::builtin().require("zn").unwrap();
    let values = decode(&bands, ramp, None).unwrap();
    assert_eq!(values.data().as_slice().unwrap(), &[0.0, 66.0, 21100.0]);
}
