use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for the isotherm-map tool.
///
/// Options left unset fall back to the configuration file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Interpolates point temperature readings with a thin-plate spline and renders an isotherm map or a 3-D temperature surface."
)]
pub struct Args {
    /// Headerless CSV with `name, latitude, longitude` rows.
    #[arg(long, default_value = "data/coordinates.csv")]
    pub coordinates: PathBuf,

    /// Headerless CSV with `name, temperature` rows.
    #[arg(long, default_value = "data/temps.csv")]
    pub temperatures: PathBuf,

    /// Path of the PNG file to write.
    #[arg(long, default_value = "graph.png")]
    pub output: PathBuf,

    /// What to draw.
    #[arg(long, value_enum, default_value_t = View::Contours)]
    pub view: View,

    /// Configuration file with `key = value` lines. Defaults to `isotherm.config` if it exists.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of grid nodes along each axis.
    #[arg(long)]
    pub resolution: Option<usize>,

    /// Spacing between isotherms in °C.
    #[arg(long)]
    pub level_step: Option<f64>,

    /// Thin-plate spline regularization (0 = exact interpolation).
    #[arg(long)]
    pub smoothing: Option<f64>,

    /// Padding added around the data bounds, as a fraction of each extent.
    #[arg(long)]
    pub padding: Option<f64>,

    /// Explicit grid rectangle `min_lon,max_lon,min_lat,max_lat`; replaces the data bounds.
    #[arg(long, allow_hyphen_values = true)]
    pub bounds: Option<String>,

    /// Background image stretched over the grid bounds.
    #[arg(long)]
    pub background: Option<PathBuf>,

    /// TrueType font used for titles and labels. Defaults to the bundled DejaVu Sans.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Output width in pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of parallel jobs to run. Defaults to 0 (Rayon chooses).
    #[arg(long, default_value_t = 0)]
    pub jobs: usize,
}

/// The available renderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    /// Plan view with labeled isotherms and a color bar.
    Contours,
    /// Plan view with the name of every site.
    Tags,
    /// Plan view with the reading of every site.
    Temperatures,
    /// 3-D view of the interpolated surface.
    Surface,
    /// 3-D view of the isotherms lifted to their temperature.
    Isotherms3d,
}

impl View {
    pub fn is_3d(self) -> bool {
        matches!(self, View::Surface | View::Isotherms3d)
    }

    pub fn title(self, city: &str) -> String {
        match self {
            View::Contours => format!("Isotherm Map for Temperature Distribution Across {}", city),
            View::Tags => format!("Tags for Data Collection Spots Across {}", city),
            View::Temperatures => format!("Temperatures Collected Across {}", city),
            View::Surface => format!("3d Surface of Temperatures Across {}", city),
            View::Isotherms3d => format!("3d Isotherm of Temperatures Across {}", city),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            View::Contours => "Isotherm map",
            View::Tags => "Site tags",
            View::Temperatures => "Site readings",
            View::Surface => "3-D surface",
            View::Isotherms3d => "3-D isotherms",
        }
    }
}
