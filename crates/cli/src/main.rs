//! geochroma CLI - recover geochemical values from legend-coloured maps

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use geochroma_algorithms::analysis::analyze;
use geochroma_algorithms::decode::LineworkMask;
use geochroma_algorithms::legend::{PresetCatalog, CATALOG_VERSION};
use geochroma_core::io::{read_geotiff, read_rgb_geotiff, write_geotiff, Compression};
use geochroma_core::{Error, GeoTransform, PixelBatch, Raster, CRS};

use config::{Config, Overrides};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geochroma")]
#[command(author, version, about = "Decode geochemical legend maps into value rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available legend presets
    Presets {
        /// Dump the ramps as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Decode a colour GeoTIFF into a single-band value GeoTIFF
    Decode {
        /// Input RGB/RGBA GeoTIFF
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Legend preset key (fe2o3, pb, cu, zn, sr, ba, cao, or a config ramp)
        #[arg(short, long)]
        preset: String,
        /// Snap projections past this fraction of the last segment to the maximum
        #[arg(short, long)]
        snap: Option<f64>,
        /// Keep values decoded from dark linework
        #[arg(long)]
        no_mask: bool,
        /// Leave masked cells as nodata instead of filling them
        #[arg(long)]
        no_fill: bool,
        /// Gap-fill search radius in cells
        #[arg(short = 'd', long)]
        fill_distance: Option<usize>,
        /// Inverse-distance exponent of the gap fill
        #[arg(long)]
        power: Option<f64>,
        /// Value written to unresolved cells
        #[arg(long, allow_hyphen_values = true)]
        nodata: Option<f32>,
        /// Output compression: none, lzw, deflate
        #[arg(long)]
        compression: Option<Compression>,
        /// CRS (EPSG:<code>) for inputs without GeoKeys
        #[arg(long)]
        crs: Option<String>,
    },
    /// Decode a single colour
    Project {
        /// Legend preset key
        #[arg(short, long)]
        preset: String,
        /// Red channel
        r: f32,
        /// Green channel
        g: f32,
        /// Blue channel
        b: f32,
        /// Snap projections past this fraction of the last segment to the maximum
        #[arg(short, long)]
        snap: Option<f64>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_colour(path: &Path) -> Result<PixelBatch> {
    let pb = spinner("Reading raster...");
    let bands = read_rgb_geotiff(path)
        .with_context(|| format!("Failed to read colour raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", bands.cols(), bands.rows());
    Ok(bands)
}

fn write_result(raster: &Raster<f32>, path: &Path, config: &Config) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(config.geotiff_options()))
        .with_context(|| format!("Failed to write output {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn print_georef(transform: &GeoTransform, crs: Option<&CRS>, rows: usize, cols: usize) {
    let bounds = transform.bounds(cols, rows);
    println!("Dimensions: {} x {} ({} cells)", cols, rows, rows * cols);
    println!("Cell size: {}", transform.cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    if let Some(crs) = crs {
        println!("CRS: {}", crs);
    }
}

// ─── Commands ───────────────────────────────────────────────────────────

fn list_presets(catalog: &PresetCatalog, json: bool) -> Result<()> {
    if json {
        let ramps: Vec<_> = catalog.iter().collect();
        println!("{}", serde_json::to_string_pretty(&ramps)?);
        return Ok(());
    }

    println!("Legend catalog v{}", CATALOG_VERSION);
    println!("{:<8} {:<24} {:<5} {:>6} {:>12}", "Key", "Label", "Unit", "Points", "Max");
    for ramp in catalog.iter() {
        let (_, max) = ramp.value_range();
        println!(
            "{:<8} {:<24} {:<5} {:>6} {:>12}",
            ramp.key(),
            ramp.label(),
            ramp.unit(),
            ramp.points().len(),
            max
        );
    }
    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    println!("File: {}", input.display());

    match read_rgb_geotiff(input) {
        Ok(bands) => {
            let (rows, cols) = bands.shape();
            print_georef(bands.transform(), bands.crs(), rows, cols);
            let linework = LineworkMask::default().detect(&bands);
            let count = linework.iter().filter(|&&m| m).count();
            println!("Type: colour");
            println!(
                "Linework pixels: {} ({:.1}%)",
                count,
                100.0 * count as f64 / bands.len().max(1) as f64
            );
        }
        Err(Error::UnsupportedDataType(_)) => {
            let raster: Raster<f32> = read_geotiff(input, None).context("Failed to read raster")?;
            let (rows, cols) = raster.shape();
            print_georef(raster.transform(), raster.crs(), rows, cols);
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }

            let stats = raster.statistics();
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }
        Err(e) => return Err(e).context("Failed to read raster"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Presets { json } => list_presets(&config.catalog(), json)?,

        Commands::Info { input } => show_info(&input)?,

        Commands::Decode {
            input,
            output,
            preset,
            snap,
            no_mask,
            no_fill,
            fill_distance,
            power,
            nodata,
            compression,
            crs,
        } => {
            config.apply(&Overrides {
                snap_last_t: snap,
                no_mask,
                no_fill,
                fill_distance,
                power,
                nodata,
                compression,
            });
            let catalog = config.catalog();
            let ramp = catalog.require(&preset)?;
            if !ramp.is_monotonic() {
                warn!("Legend '{}' values do not increase along the ramp", ramp.key());
            }

            let mut bands = read_colour(&input)?;
            if let Some(code) = crs {
                let crs = CRS::parse_authority(&code).with_context(|| format!("Invalid CRS: {}", code))?;
                match bands.crs().cloned() {
                    None => bands = bands.with_crs(Some(crs)),
                    Some(existing) if !existing.is_equivalent(&crs) => {
                        warn!("Input already has CRS {}, ignoring {}", existing, crs);
                    }
                    Some(_) => {}
                }
            }
            let start = Instant::now();
            let pb = spinner("Decoding legend...");
            let result = analyze(&bands, ramp, &config.analysis_params())
                .context("Legend analysis failed")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            write_result(&result.raster, &output, &config)?;
            println!("{}", result.report);
            done(&format!("{} values", ramp.label()), &output, elapsed);
        }

        Commands::Project {
            preset,
            r,
            g,
            b,
            snap,
        } => {
            let catalog = config.catalog();
            let ramp = catalog.require(&preset)?;
            let snap = snap.or(config.decode.snap_last_t);
            match ramp.project_with_distance(r, g, b, snap) {
                Some(p) => {
                    println!("{} {}", p.value, ramp.unit());
                    println!("  Segment: {} (t = {:.4})", p.segment, p.t);
                    println!("  Distance: {:.4}", p.dist_sq.sqrt());
                }
                None => println!("No legend segment matches ({}, {}, {})", r, g, b),
            }
        }
    }

    Ok(())
}
