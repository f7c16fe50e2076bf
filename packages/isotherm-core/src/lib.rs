//! # Isotherm Core Library
//!
//! Numerical core of the isotherm toolkit. It turns a sparse set of temperature readings into
//! a continuous field that the rendering tools contour or draw as a surface.
//!
//! The main components are:
//! - [`tps`]: thin-plate spline fitting ([`fit`]) and evaluation ([`evaluate`],
//!   [`evaluate_grid`]).
//! - [`grid`]: [`Bounds`], the regular [`Grid`] sampled by the evaluator and the resulting
//!   [`Field`].
//! - [`levels`]: isotherm level selection.
//! - [`sites`]: reading the coordinate and temperature tables and joining them into a
//!   [`PointSet`].
//!
//! Nothing here draws or writes images; the core only hands numbers to its callers.

pub mod error;
pub mod grid;
pub mod levels;
pub mod sites;
pub mod text;
pub mod tps;

pub use error::{GridError, SiteError, Table, TpsError};
pub use grid::{Bounds, Field, Grid};
pub use levels::{is_labeled_level, isotherm_levels, linspace_levels};
pub use sites::{join_sites, load_sites, read_coordinates, read_temperatures, sites_to_points, Site};
pub use tps::{evaluate, evaluate_grid, fit, fit_exact, Interpolant, PointSet, SamplePoint};
