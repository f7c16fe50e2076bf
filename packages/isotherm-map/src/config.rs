use anyhow::{bail, Context, Result};
use isotherm_core::Bounds;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cli::{Args, View};

/// Configuration file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "isotherm.config";

const KNOWN_KEYS: &[&str] = &[
    "resolution",
    "level_step",
    "smoothing",
    "padding",
    "background",
    "font",
    "width",
    "height",
    "marker_label",
    "marker_lat",
    "marker_lon",
    "city",
];

/// `key = value` pairs read from a configuration file, in file order.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    origin: Option<PathBuf>,
    entries: Vec<(String, String)>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::parse(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.origin = Some(path.to_path_buf());
        Ok(config)
    }

    /// Loads `explicit` if given, else the default file if it exists, else nothing.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    entries.push((key.trim().to_string(), value.trim().to_string()));
                }
                _ => bail!("line {}: expected `key = value`, found '{}'", idx + 1, line),
            }
        }
        Ok(Self {
            origin: None,
            entries,
        })
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// The last value given for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn unknown_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| !KNOWN_KEYS.contains(k))
            .collect()
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| anyhow::anyhow!("Invalid value '{}' for '{}' in config", raw, key)),
            None => Ok(None),
        }
    }
}

/// The reference marker drawn on every view.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

impl Default for Marker {
    fn default() -> Self {
        Self {
            label: "CBD".to_string(),
            lat: 49.28303110427836,
            lon: -123.12080249820562,
        }
    }
}

/// Effective settings after merging CLI, config file and defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub coordinates: PathBuf,
    pub temperatures: PathBuf,
    pub output: PathBuf,
    pub view: View,
    pub resolution: usize,
    pub level_step: f64,
    pub smoothing: f64,
    pub padding: f64,
    pub bounds: Option<Bounds>,
    pub background: Option<PathBuf>,
    pub font: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub marker: Marker,
    pub city: String,
    pub jobs: usize,
}

impl Settings {
    pub fn resolve(args: &Args, config: &ConfigFile) -> Result<Self> {
        let defaults = Marker::default();
        let settings = Self {
            coordinates: args.coordinates.clone(),
            temperatures: args.temperatures.clone(),
            output: args.output.clone(),
            view: args.view,
            resolution: pick(args.resolution, config.parsed("resolution")?, 500),
            level_step: pick(args.level_step, config.parsed("level_step")?, 0.5),
            smoothing: pick(args.smoothing, config.parsed("smoothing")?, 0.0),
            padding: pick(args.padding, config.parsed("padding")?, 0.0),
            bounds: parse_bounds(args.bounds.as_deref())?,
            background: args
                .background
                .clone()
                .or_else(|| config.get("background").map(PathBuf::from)),
            font: args
                .font
                .clone()
                .or_else(|| config.get("font").map(PathBuf::from)),
            width: pick(args.width, config.parsed("width")?, 1600),
            height: pick(args.height, config.parsed("height")?, 1000),
            marker: Marker {
                label: config
                    .get("marker_label")
                    .map_or(defaults.label, str::to_string),
                lat: config.parsed("marker_lat")?.unwrap_or(defaults.lat),
                lon: config.parsed("marker_lon")?.unwrap_or(defaults.lon),
            },
            city: config.get("city").unwrap_or("Vancouver").to_string(),
            jobs: args.jobs,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.resolution < 2 {
            bail!("Grid resolution must be at least 2, got {}", self.resolution);
        }
        if !(self.level_step.is_finite() && self.level_step > 0.0) {
            bail!("Level step must be a positive number, got {}", self.level_step);
        }
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            bail!("Smoothing must be >= 0, got {}", self.smoothing);
        }
        if !(self.padding.is_finite() && self.padding >= 0.0) {
            bail!("Padding must be >= 0, got {}", self.padding);
        }
        if self.width < 200 || self.height < 150 {
            bail!(
                "Output size must be at least 200x150 pixels, got {}x{}",
                self.width,
                self.height
            );
        }
        if !(self.marker.lat.is_finite() && self.marker.lon.is_finite()) {
            bail!("Marker position must be finite");
        }
        Ok(())
    }
}

/// CLI value first, then the config file, then the built-in default.
fn pick<T>(cli: Option<T>, config: Option<T>, default: T) -> T {
    cli.or(config).unwrap_or(default)
}

/// Parses `min_lon,max_lon,min_lat,max_lat`.
pub fn parse_bounds(bounds_str: Option<&str>) -> Result<Option<Bounds>> {
    match bounds_str {
        Some(s) => {
            let parts: Vec<&str> = s.split(',').map(str::trim).collect();
            if parts.len() != 4 {
                bail!("Bounds must be four comma-separated numbers: min_lon,max_lon,min_lat,max_lat.");
            }
            let mut values = [0.0; 4];
            for (slot, part) in values.iter_mut().zip(&parts) {
                *slot = part
                    .parse::<f64>()
                    .with_context(|| format!("Failed to parse bound '{}'.", part))?;
            }
            let bounds = Bounds::new(values[0], values[1], values[2], values[3])?;
            Ok(Some(bounds))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["isotherm-map"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn parses_comments_and_last_value_wins() {
        let config = ConfigFile::parse(
            "# grid\nresolution = 120\n\n  level_step=1.0  \nresolution = 80\ncolour = red\n",
        )
        .unwrap();
        assert_eq!(config.get("resolution"), Some("80"));
        assert_eq!(config.get("level_step"), Some("1.0"));
        assert_eq!(config.unknown_keys(), vec!["colour"]);
    }

    #[test]
    fn rejects_lines_without_separator() {
        assert!(ConfigFile::parse("resolution 100\n").is_err());
        assert!(ConfigFile::parse("= 100\n").is_err());
    }

    #[test]
    fn cli_overrides_config_overrides_defaults() {
        let config =
            ConfigFile::parse("resolution = 120\nlevel_step = 1.0\nmarker_label = Downtown\n")
                .unwrap();
        let settings = Settings::resolve(&args(&["--resolution", "64"]), &config).unwrap();
        assert_eq!(settings.resolution, 64);
        assert_eq!(settings.level_step, 1.0);
        assert_eq!(settings.smoothing, 0.0);
        assert_eq!(settings.width, 1600);
        assert_eq!(settings.marker.label, "Downtown");
        assert_eq!(settings.marker.lat, Marker::default().lat);
        assert_eq!(settings.city, "Vancouver");
    }

    #[test]
    fn rejects_invalid_values() {
        let config = ConfigFile::parse("smoothing = lots\n").unwrap();
        assert!(Settings::resolve(&args(&[]), &config).is_err());

        let empty = ConfigFile::default();
        assert!(Settings::resolve(&args(&["--resolution", "1"]), &empty).is_err());
        assert!(Settings::resolve(&args(&["--level-step", "0"]), &empty).is_err());
        assert!(Settings::resolve(&args(&["--smoothing=-2"]), &empty).is_err());
    }

    #[test]
    fn parses_explicit_bounds() {
        let bounds = parse_bounds(Some("-123.22, -123.02, 49.20, 49.32"))
            .unwrap()
            .unwrap();
        assert_eq!(bounds.min_x, -123.22);
        assert_eq!(bounds.max_y, 49.32);
        assert!(parse_bounds(Some("1,2,3")).is_err());
        assert!(parse_bounds(Some("2,1,0,1")).is_err());
        assert!(parse_bounds(None).unwrap().is_none());
    }
}
