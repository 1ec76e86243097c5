use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;

use alpenstein::config::{FileConfig, default_cache_dir};
use alpenstein::geojson::parse_polygon;
use alpenstein::geometry::{Bounds, Ring, wgs84_to_lv95};
use alpenstein::grid::{GridStore, Tier, clip_grid};
use alpenstein::mesh::{StlFormat, build_solid, fundament, triangulate, write_stl};
use alpenstein::mesh::stl::{clear_slot, estimate_stl_size};

/// Generate 3D-printable STL terrain models from swisstopo elevation grids
///
/// Examples:
///   # Build a terrain model for a polygon drawn on a map
///   alpenstein -p area.geojson
///
///   # High-resolution 25 m grid, custom output path
///   alpenstein -p area.geojson --high -o matterhorn.stl
///
///   # ASCII STL for inspection
///   alpenstein -p area.geojson --ascii
#[derive(Parser, Debug)]
#[command(name = "alpenstein")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches alpenstein.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// GeoJSON file with the polygon to model (Polygon, Feature, or FeatureCollection)
    #[arg(short = 'p', long)]
    polygon: Option<PathBuf>,

    /// Use the high-resolution 25 m grid instead of the 200 m grid
    #[arg(long)]
    high: bool,

    /// Output STL file path (defaults to the model slot in the cache directory)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Write ASCII STL instead of binary
    #[arg(long)]
    ascii: bool,

    /// Directory for cached grids and the STL slot
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let file_config = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            Some(toml::from_str(&contents).context("Failed to parse config file")?)
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        FileConfig::load()
    };

    let polygon_path = args
        .polygon
        .clone()
        .or_else(|| file_config.as_ref().and_then(|c| c.polygon.clone()));
    let high = args.high || file_config.as_ref().map(|c| c.high).unwrap_or(false);
    let ascii = args.ascii || file_config.as_ref().map(|c| c.ascii).unwrap_or(false);
    let verbose = args.verbose || file_config.as_ref().map(|c| c.verbose).unwrap_or(false);
    let cache_dir = args
        .cache_dir
        .clone()
        .or_else(|| file_config.as_ref().and_then(|c| c.cache_dir.clone()))
        .unwrap_or_else(default_cache_dir);
    let output = args
        .output
        .clone()
        .or_else(|| file_config.as_ref().and_then(|c| c.output.clone()))
        .unwrap_or_else(|| cache_dir.join("model.stl"));
    let source_config = file_config
        .as_ref()
        .and_then(|c| c.source.clone())
        .unwrap_or_default();

    let Some(polygon_path) = polygon_path else {
        bail!("Must provide a polygon file via --polygon/-p or the config file");
    };

    let tier = if high { Tier::High } else { Tier::Standard };

    println!("alpenstein - Terrain Model STL Generator");
    println!("========================================");
    println!();

    if verbose {
        println!("Configuration:");
        println!("  Polygon: {}", polygon_path.display());
        println!(
            "  Grid tier: {} ({})",
            tier.key(),
            if high { "25 m" } else { "200 m" }
        );
        println!("  Cache dir: {}", cache_dir.display());
        println!("  Output: {}", output.display());
        println!("  Format: {}", if ascii { "ASCII" } else { "binary" });
        println!();
    }

    // The slot holds at most one artifact per session
    clear_slot(&output).context("Failed to clear the STL output slot")?;

    let contents = std::fs::read_to_string(&polygon_path)
        .context(format!("Failed to read polygon file: {:?}", polygon_path))?;
    let points = parse_polygon(&contents).context("Failed to extract a polygon ring")?;
    let ring = Ring::new(&points).context("Polygon is not usable for extrusion")?;

    let projected = ring.project_lv03();
    let bounds = Bounds::from_points(&projected)
        .context("Polygon has no vertices after normalization")?;
    println!(
        "Selected area: {:.1} km x {:.1} km, {} vertices ({})",
        bounds.width() / 1000.0,
        bounds.height() / 1000.0,
        ring.vertices().len(),
        if ring.is_ccw() {
            "counter-clockwise"
        } else {
            "clockwise"
        }
    );
    if verbose {
        let center = ring
            .vertices()
            .iter()
            .fold((0.0, 0.0), |acc, &(lng, lat)| (acc.0 + lng, acc.1 + lat));
        let n = ring.vertices().len() as f64;
        let (e95, n95) = wgs84_to_lv95(center.1 / n, center.0 / n);
        println!("  Center (modern frame): {:.0} / {:.0}", e95, n95);
    }

    let spinner = create_spinner(format!("Loading {} elevation grid...", tier.key()));
    let start = Instant::now();
    let store = GridStore::new(cache_dir.clone(), source_config);
    let entry = store
        .get_elevation(tier)
        .context("Failed to load the elevation grid")?;
    spinner.finish_with_message(format!(
        "Loaded {} grid: {} x {} cells at {:.0} m [{:.1}s]",
        tier.key(),
        entry.grid.nrows(),
        entry.grid.ncols(),
        entry.meta.cellsize,
        start.elapsed().as_secs_f32()
    ));

    let area = clip_grid(&entry.grid, &entry.meta, &ring);
    let Some((height_min, height_max)) = area.height_range() else {
        bail!("No elevation data in the selected area; draw the polygon inside Switzerland");
    };
    if verbose {
        println!(
            "  Clipped to {} x {} cells, elevation {:.1} m .. {:.1} m",
            area.nrows(),
            area.ncols(),
            height_min,
            height_max
        );
    }

    let zero = fundament(height_min, height_max);
    let spinner = create_spinner("Building terrain solid...".to_string());
    let start = Instant::now();
    let solid = build_solid(&area, &points, zero, height_max)
        .context("Failed to build the terrain solid")?;
    let (solid_lo, solid_hi) = solid.elevation();
    spinner.finish_with_message(format!(
        "Built solid: {} faces, z {:.1} m .. {:.1} m [{:.1}s]",
        solid.faces().len(),
        solid_lo,
        solid_hi,
        start.elapsed().as_secs_f32()
    ));

    let spinner = create_spinner("Writing STL file...".to_string());
    let start = Instant::now();
    let format = if ascii {
        StlFormat::Ascii
    } else {
        StlFormat::Binary
    };
    let triangle_count = triangulate(&solid).len();
    write_stl(&output, &solid, format).context("Failed to write STL file")?;
    spinner.finish_with_message(format!(
        "Wrote {} triangles ({:.1} KB) [{:.1}s]",
        triangle_count,
        estimate_stl_size(triangle_count) as f64 / 1024.0,
        start.elapsed().as_secs_f32()
    ));

    println!();
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );
    println!();
    println!("Output: {}", output.display());

    Ok(())
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
