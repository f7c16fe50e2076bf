//! Reading the site tables and joining them into sample points.
//!
//! Both tables are headerless CSV files keyed by site name:
//!
//! ```text
//! coordinates.csv: name, latitude, longitude
//! temps.csv:       name, temperature
//! ```
//!
//! Whitespace around fields is ignored and lines starting with `#` are skipped.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{SiteError, Table};
use crate::tps::{PointSet, SamplePoint};

/// One row of the coordinates table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateRecord {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// One row of the temperature table.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureRecord {
    pub name: String,
    pub temperature: f64,
}

/// A measurement site with its position and reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub temperature: f64,
}

fn open_table(path: &Path) -> Result<csv::Reader<std::fs::File>, SiteError> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(path)
        .map_err(|source| SiteError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_number(path: &Path, line: u64, field: &str, what: &str) -> Result<f64, SiteError> {
    let value: f64 = field.parse().map_err(|_| SiteError::Parse {
        path: path.to_path_buf(),
        line,
        message: format!("{} '{}' is not a number", what, field),
    })?;
    if !value.is_finite() {
        return Err(SiteError::Parse {
            path: path.to_path_buf(),
            line,
            message: format!("{} '{}' is not finite", what, field),
        });
    }
    Ok(value)
}

/// Iterates the records of a table, checking the column count.
fn read_rows(path: &Path, columns: usize) -> Result<Vec<(u64, csv::StringRecord)>, SiteError> {
    let mut reader = open_table(path)?;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| SiteError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line());
        if record.len() != columns {
            return Err(SiteError::Parse {
                path: path.to_path_buf(),
                line,
                message: format!("expected {} fields, found {}", columns, record.len()),
            });
        }
        rows.push((line, record));
    }
    Ok(rows)
}

/// Reads the `name, latitude, longitude` table.
pub fn read_coordinates(path: &Path) -> Result<Vec<CoordinateRecord>, SiteError> {
    read_rows(path, 3)?
        .into_iter()
        .map(|(line, record)| {
            Ok(CoordinateRecord {
                name: record[0].to_string(),
                lat: parse_number(path, line, &record[1], "latitude")?,
                lon: parse_number(path, line, &record[2], "longitude")?,
            })
        })
        .collect()
}

/// Reads the `name, temperature` table.
pub fn read_temperatures(path: &Path) -> Result<Vec<TemperatureRecord>, SiteError> {
    read_rows(path, 2)?
        .into_iter()
        .map(|(line, record)| {
            Ok(TemperatureRecord {
                name: record[0].to_string(),
                temperature: parse_number(path, line, &record[1], "temperature")?,
            })
        })
        .collect()
}

/// Joins both tables by site name, keeping the order of the coordinates table.
///
/// Every site has to appear exactly once in each table.
pub fn join_sites(
    coordinates: &[CoordinateRecord],
    temperatures: &[TemperatureRecord],
) -> Result<Vec<Site>, SiteError> {
    let mut readings: HashMap<&str, f64> = HashMap::with_capacity(temperatures.len());
    for t in temperatures {
        if readings.insert(t.name.as_str(), t.temperature).is_some() {
            return Err(SiteError::DuplicateSite {
                site: t.name.clone(),
                table: Table::Temperatures,
            });
        }
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(coordinates.len());
    let mut sites = Vec::with_capacity(coordinates.len());
    for c in coordinates {
        if !seen.insert(c.name.as_str()) {
            return Err(SiteError::DuplicateSite {
                site: c.name.clone(),
                table: Table::Coordinates,
            });
        }
        let temperature = *readings
            .get(c.name.as_str())
            .ok_or_else(|| SiteError::InputMismatch {
                site: c.name.clone(),
                missing_from: Table::Temperatures,
            })?;
        sites.push(Site {
            name: c.name.clone(),
            lat: c.lat,
            lon: c.lon,
            temperature,
        });
    }

    if let Some(orphan) = temperatures.iter().find(|t| !seen.contains(t.name.as_str())) {
        return Err(SiteError::InputMismatch {
            site: orphan.name.clone(),
            missing_from: Table::Coordinates,
        });
    }

    Ok(sites)
}

/// Reads both tables and joins them.
pub fn load_sites(coordinates: &Path, temperatures: &Path) -> Result<Vec<Site>, SiteError> {
    let coords = read_coordinates(coordinates)?;
    let temps = read_temperatures(temperatures)?;
    join_sites(&coords, &temps)
}

/// Longitude becomes `x`, latitude `y`.
pub fn sites_to_points(sites: &[Site]) -> PointSet {
    sites
        .iter()
        .map(|s| SamplePoint::new(s.lon, s.lat, s.temperature))
        .collect()
}
