//! Pure model logic for galshell.
//!
//! Estimates how many stars of one spectral type lie in a thin spherical
//! shell around an observer in a disk galaxy, how many of those sit inside
//! spiral arms, and what that implies for a Drake-style probability of at
//! least one civilization among them. Functions take plain data and return
//! results; the only I/O is the arm-table loader and the JSON/CSV helpers.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`arms`] | Logarithmic spiral arms, table loading with parametric fallback |
//! | [`config`] | TOML run configuration with defaults and validation |
//! | [`constants`] | Unit conversions and model defaults |
//! | [`convergence`] | Repeated-run spread and record comparison |
//! | [`density`] | Exponential disk density and its normalization |
//! | [`drake`] | Drake priors, stable at-least-one probability, summaries |
//! | [`error`] | Configuration and model error types |
//! | [`expectation`] | Expected counts, sensitivity sweep, full shell pipeline |
//! | [`membership`] | Arm membership by local azimuth grid search |
//! | [`scenarios`] | Fixed Drake scenarios and the `f_l × f_i` sweep |
//! | [`shell`] | Uniform-by-volume spherical shell sampler |
//! | [`stats`] | Quantiles, moments, Kolmogorov–Smirnov statistic |

pub mod arms;
pub mod config;
pub mod constants;
pub mod convergence;
pub mod density;
pub mod drake;
pub mod error;
pub mod expectation;
pub mod membership;
pub mod scenarios;
pub mod shell;
pub mod stats;

pub use config::RunConfig;
pub use error::{ConfigError, ModelError, ModelResult};
