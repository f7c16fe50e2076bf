//! Error types shared by the library modules.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the thin-plate spline fit.
#[derive(Debug, Error)]
pub enum TpsError {
    /// The assembled `(N+3) x (N+3)` system cannot be solved: fewer than three points,
    /// coincident points or all points on one line.
    #[error("singular thin-plate spline system: {0}")]
    SingularSystem(String),

    #[error("regularization must be a finite value >= 0, got {0}")]
    InvalidRegularization(f64),

    #[error("sample point {index} has a non-finite coordinate or value")]
    NonFinitePoint { index: usize },
}

/// Failures while building bounds or grids.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid bounds: x [{min_x}, {max_x}], y [{min_y}, {max_y}]")]
    InvalidBounds {
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
    },

    #[error("grid resolution must be at least 1x1, got {rows}x{cols}")]
    EmptyResolution { rows: usize, cols: usize },

    #[error("cannot compute bounds of an empty point set")]
    EmptyPointSet,
}

/// The two input tables joined into sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Coordinates,
    Temperatures,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Coordinates => write!(f, "coordinates"),
            Table::Temperatures => write!(f, "temperatures"),
        }
    }
}

/// Failures while reading and joining the site tables.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}, line {line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("site '{site}' is missing from the {missing_from} table")]
    InputMismatch { site: String, missing_from: Table },

    #[error("site '{site}' appears more than once in the {table} table")]
    DuplicateSite { site: String, table: Table },
}
