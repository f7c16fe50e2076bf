use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use isotherm_core::{
    evaluate_grid, fit, isotherm_levels, load_sites, sites_to_points, text, Bounds, Grid,
};
use std::io::Write;
use std::path::Path;

mod cli;
mod config;
mod render;

use cli::Args;
use config::{ConfigFile, Settings};
use render::canvas::{bundled_font, load_font};
use render::colormap::ColorScale;
use render::{render, Scene};

/// Prints a progress line that `done` later replaces.
fn step(message: &str) {
    print!("{}...", message);
    let _ = std::io::stdout().flush();
}

fn done(message: &str) {
    let term = Term::stdout();
    let _ = term.clear_line();
    println!("\r{} {}", text::check_icon(), message);
}

fn warn(message: &str) {
    println!("  {} {}", text::warning("!"), message);
}

fn print_settings(settings: &Settings, config: &ConfigFile) {
    let dline = "=".repeat(72);
    println!("{} Configuration:", text::bold("Isotherm"));
    println!("  {:<20} {}", "Coordinates:", settings.coordinates.display());
    println!("  {:<20} {}", "Temperatures:", settings.temperatures.display());
    println!("  {:<20} {}", "Output File:", settings.output.display());
    println!("  {:<20} {}", "View:", settings.view.describe());
    if let Some(origin) = config.origin() {
        println!("  {:<20} {}", "Config File:", origin.display());
    }
    println!(
        "  {:<20} {} x {}",
        "Grid Resolution:", settings.resolution, settings.resolution
    );
    println!("  {:<20} {}", "Level Step:", text::celsius(settings.level_step));
    println!("  {:<20} {}", "Smoothing:", settings.smoothing);
    match settings.bounds {
        Some(b) => println!(
            "  {:<20} [{}, {}] x [{}, {}]",
            "Bounds:", b.min_x, b.max_x, b.min_y, b.max_y
        ),
        None => println!("  {:<20} {}", "Padding:", settings.padding),
    }
    println!(
        "  {:<20} {} x {} px",
        "Image Size:", settings.width, settings.height
    );
    println!(
        "  {:<20} {}",
        "Font:",
        settings
            .font
            .as_ref()
            .map_or_else(|| "DejaVu Sans (bundled)".to_string(), |p| p.display().to_string())
    );
    println!(
        "  {:<20} {} ({:.5}, {:.5})",
        "Marker:", settings.marker.label, settings.marker.lat, settings.marker.lon
    );
    println!(
        "  {:<20} {}",
        "Parallel Jobs:",
        if settings.jobs == 0 {
            "all available cores".to_string()
        } else {
            settings.jobs.to_string()
        }
    );
    println!("{}\n", dline);
}

fn load_background(path: Option<&Path>) -> Option<image::RgbaImage> {
    let path = path?;
    match image::open(path) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            warn(&format!(
                "Background {} could not be loaded ({}); drawing without it.",
                path.display(),
                e
            ));
            None
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let line = "-".repeat(72);
    let dline = "=".repeat(72);

    println!(
        "\n{}\n{}\nInterpolates point temperature readings and renders isotherm maps.\nPart of the {} toolkit.\n\nAuthors:\n{}\n{}\n",
        format!(
            "{} {}",
            text::highlight("Isotherm Map"),
            env!("CARGO_PKG_VERSION")
        ),
        line,
        text::highlight("isotherm-tools"),
        env!("CARGO_PKG_AUTHORS"),
        dline
    );

    let config = ConfigFile::discover(args.config.as_deref())?;
    for key in config.unknown_keys() {
        warn(&format!("Ignoring unknown config key '{}'.", key));
    }
    let settings = Settings::resolve(&args, &config)?;

    if settings.jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(settings.jobs)
            .build_global()?;
    }

    print_settings(&settings, &config);

    step("Reading site tables");
    let sites = load_sites(&settings.coordinates, &settings.temperatures)?;
    done(&format!("Loaded {} sites.", sites.len()));

    let points = sites_to_points(&sites);
    step("Fitting thin-plate spline");
    let interpolant = fit(&points, settings.smoothing)
        .context("Failed to fit a thin-plate spline to the readings")?;
    done(&format!(
        "Fitted thin-plate spline through {} points.",
        interpolant.len()
    ));

    let bounds = match settings.bounds {
        Some(bounds) => bounds,
        None => Bounds::from_points(&points)?.padded_by_fraction(settings.padding)?,
    };
    println!(
        "  Plotting from ({:.5}, {:.5}) to ({:.5}, {:.5})",
        bounds.min_y, bounds.min_x, bounds.max_y, bounds.max_x
    );

    step("Evaluating grid");
    let grid = Grid::square(bounds, settings.resolution)?;
    let field = evaluate_grid(&grid, &interpolant);
    done(&format!(
        "Evaluated {} x {} grid.",
        grid.rows(),
        grid.cols()
    ));

    let (min, max) = points
        .value_range()
        .context("No finite temperature readings")?;
    println!(
        "  Readings range from {} to {}",
        text::celsius(min),
        text::celsius(max)
    );
    let levels = isotherm_levels(min, max, settings.level_step);

    let background = load_background(settings.background.as_deref());
    let font = match settings.font.as_deref() {
        Some(path) => load_font(path)?,
        None => bundled_font()?,
    };

    step("Rendering");
    let scene = Scene {
        view: settings.view,
        title: settings.view.title(&settings.city),
        sites: &sites,
        field: &field,
        levels: &levels,
        scale: ColorScale::new(min, max),
        marker: &settings.marker,
        background: background.as_ref(),
    };
    let canvas = render(&scene, settings.width, settings.height, font);
    canvas.save(&settings.output)?;
    done(&format!(
        "{} written to {}",
        settings.view.describe(),
        settings.output.display()
    ));

    println!("\n{}", text::success("Done."));
    Ok(())
}

/// Main entry point for the isotherm-map tool.
///
/// Reads the site tables, fits the spline, samples it on a grid and renders the requested view.
fn main() {
    if let Err(e) = run() {
        eprintln!("\n{} {}", text::cross_icon(), text::error(format!("{:#}", e)));
        std::process::exit(1);
    }
}
