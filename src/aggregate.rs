//! The forecast aggregator
//!
//! Drives the whole run: per course it builds the profile, classifies
//! the offering pattern, assembles the exogenous features, fits the
//! ensemble, backtests, and records the outcome. Courses are
//! independent and processed in parallel; a failure inside one
//! course's pipeline is logged and that course omitted, never aborting
//! the run.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::backtest::{backtest_course, best_accuracy, HOLDOUT};
use crate::calendar::{forecast_target_term, SlotTally, TermCode};
use crate::data::{
    CohortProvider, HistoryProvider, PrerequisiteProvider, RunSnapshot,
};
use crate::error::Result;
use crate::features::build_features;
use crate::models::fit_course_ensemble;
use crate::profile::{CourseProfile, RunConfig};
use crate::report::{CourseOutcome, ForecastRecord, ForecastReport};

/// Minimum usable observations before a course can be fitted
pub const MIN_OBSERVATIONS: usize = 4;

/// Read all providers into a snapshot and produce the report
pub fn run_forecast_from_providers(
    history: &dyn HistoryProvider,
    prerequisites: &dyn PrerequisiteProvider,
    cohorts: &dyn CohortProvider,
    config: &RunConfig,
) -> Result<ForecastReport> {
    let snapshot = RunSnapshot::load(history, prerequisites, cohorts)?;
    Ok(run_forecast(&snapshot, config))
}

/// Forecast every course in the snapshot and assemble the report
pub fn run_forecast(snapshot: &RunSnapshot, config: &RunConfig) -> ForecastReport {
    let codes = snapshot.course_codes();
    let outcomes: Vec<CourseOutcome> = codes
        .par_iter()
        .filter_map(|code| match forecast_course(code, snapshot, config) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(course = %code, error = %e, "course skipped");
                None
            }
        })
        .collect();
    ForecastReport::new(snapshot.history(), outcomes)
}

/// Run one course through the pipeline
pub fn forecast_course(
    code: &str,
    snapshot: &RunSnapshot,
    config: &RunConfig,
) -> Result<CourseOutcome> {
    let series = snapshot.course_series(code);
    let title = series
        .iter()
        .rev()
        .find(|p| !p.title.is_empty())
        .map(|p| p.title.clone())
        .unwrap_or_default();
    let profile = CourseProfile::for_course(code, config);

    if series.len() < MIN_OBSERVATIONS {
        debug!(course = %code, observations = series.len(), "insufficient history");
        return Ok(CourseOutcome::InsufficientData { code: code.to_string(), title });
    }

    let terms: Vec<TermCode> = series.iter().map(|p| p.term).collect();
    let tally = SlotTally::count(&terms);
    let is_yearly = tally.is_yearly();

    let edge = snapshot.edge_for(code);
    let features = build_features(&series, &profile, &edge, snapshot, config);

    // Row filtering can shrink a lower-division series below the
    // fitting threshold; treat that exactly like short raw history.
    if features.kept.len() < MIN_OBSERVATIONS {
        debug!(
            course = %code,
            usable = features.kept.len(),
            "insufficient history after exogenous filtering"
        );
        return Ok(CourseOutcome::InsufficientData { code: code.to_string(), title });
    }

    let y: Vec<f64> = features
        .kept
        .iter()
        .map(|&i| f64::from(series[i].enrolled))
        .collect();

    let forecasts = fit_course_ensemble(&y, &features, &profile);
    let target_term = forecast_target_term(&profile, &tally, is_yearly, terms[terms.len() - 1]);

    let holdout_start = features.kept.len().saturating_sub(HOLDOUT);
    let holdout_terms: Vec<String> = features.kept[holdout_start..]
        .iter()
        .map(|&i| series[i].term.name())
        .collect();
    let backtests = backtest_course(&y, &features, &holdout_terms, &profile);
    let best = best_accuracy(&backtests);

    Ok(CourseOutcome::Forecasted(ForecastRecord {
        code: code.to_string(),
        title,
        target_term,
        forecasts,
        backtests,
        yearly_course: is_yearly,
        best_accuracy: best,
    }))
}
