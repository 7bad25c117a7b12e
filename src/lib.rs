//! # Enroll Forecast
//!
//! A Rust library for forecasting per-course enrollment in an academic
//! department from term-by-term enrollment history, using
//! prerequisite-chain enrollments as leading indicators.
//!
//! ## Features
//!
//! - Academic term calendar arithmetic (`YYYYSS` term codes)
//! - Lagged prerequisite and cohort-size exogenous features
//! - A four-model ARIMA ensemble (plain, seasonal, exogenous,
//!   seasonal+exogenous) with one-step-ahead forecasts
//! - Two-point hold-out backtesting with per-model accuracy scores
//! - A JSON report artifact mixing raw history and forecast records
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use enroll_forecast::aggregate::run_forecast_from_providers;
//! use enroll_forecast::data::{CsvHistoryProvider, CsvPrerequisiteProvider, StaticCohorts};
//! use enroll_forecast::profile::RunConfig;
//!
//! # fn main() -> enroll_forecast::Result<()> {
//! let history = CsvHistoryProvider::new("enrollment.csv");
//! let prereqs = CsvPrerequisiteProvider::new("prerequisites.csv");
//! let cohorts = StaticCohorts::default();
//!
//! let report = run_forecast_from_providers(
//!     &history,
//!     &prereqs,
//!     &cohorts,
//!     &RunConfig::default(),
//! )?;
//! println!("{}", report.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod backtest;
pub mod calendar;
pub mod data;
pub mod error;
pub mod features;
pub mod models;
pub mod profile;
pub mod report;

// Re-export commonly used types
pub use crate::aggregate::{forecast_course, run_forecast, run_forecast_from_providers};
pub use crate::calendar::{Semester, TermCode};
pub use crate::data::{EnrollmentPoint, PrerequisiteEdge, RunSnapshot};
pub use crate::error::{ForecastError, Result};
pub use crate::profile::{CourseProfile, RunConfig};
pub use crate::report::{CourseOutcome, ForecastReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
