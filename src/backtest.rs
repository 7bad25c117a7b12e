//! Hold-out backtesting for the model ensemble
//!
//! The last two observed points are held out, each ensemble member is
//! refitted on the remainder and scored against the hold-out. Scores
//! feed the per-course `best_accuracy` figure in the report.

use statrs::statistics::Statistics;

use crate::features::FeatureSet;
use crate::models::{round_enrollment, ModelKind, ModelSpec, Sarimax};
use crate::profile::CourseProfile;

/// How many trailing observations are held out
pub const HOLDOUT: usize = 2;

/// Scores for one model's backtest
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestScore {
    pub mae: f64,
    pub rmse: f64,
    /// `100 - (MAE / mean(test) * 100)`; absent when the hold-out mean
    /// is zero
    pub accuracy: Option<f64>,
    /// Term names of the held-out observations
    pub val_terms: Vec<String>,
    /// Hold-out predictions, rounded and floored for display
    pub val_preds: Vec<u32>,
}

/// Result of backtesting one ensemble member
#[derive(Debug, Clone, PartialEq)]
pub enum BacktestOutcome {
    Scored(BacktestScore),
    Failed { reason: String },
}

impl BacktestOutcome {
    pub fn score(&self) -> Option<&BacktestScore> {
        match self {
            BacktestOutcome::Scored(score) => Some(score),
            BacktestOutcome::Failed { .. } => None,
        }
    }
}

/// MAE and RMSE between a forecast and the actuals it targets
fn forecast_errors(forecast: &[f64], actual: &[f64]) -> (f64, f64) {
    let n = forecast.len() as f64;
    let mae = forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (f - a).abs())
        .sum::<f64>()
        / n;
    let mse = forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (f - a).powi(2))
        .sum::<f64>()
        / n;
    (mae, mse.sqrt())
}

/// Backtest all four ensemble members for one course.
///
/// `val_terms` carries the names of the held-out terms, aligned with
/// the series tail. Callers guarantee `y.len() >= 4` so the training
/// split keeps at least two points.
pub fn backtest_course(
    y: &[f64],
    features: &FeatureSet,
    val_terms: &[String],
    profile: &CourseProfile,
) -> [BacktestOutcome; 4] {
    ModelKind::ALL.map(|kind| backtest_one(kind, y, features, val_terms, profile))
}

fn backtest_one(
    kind: ModelKind,
    y: &[f64],
    features: &FeatureSet,
    val_terms: &[String],
    profile: &CourseProfile,
) -> BacktestOutcome {
    if y.len() < HOLDOUT + 2 {
        return BacktestOutcome::Failed {
            reason: "series too short to hold out two points".to_string(),
        };
    }
    let split = y.len() - HOLDOUT;
    let (train, test) = y.split_at(split);

    let exog = if kind.exogenous() {
        let (train_x, _) = features.rows.split_at(split.min(features.rows.len()));
        match train_x.last() {
            Some(last) => Some((train_x, vec![last.clone(); HOLDOUT])),
            None => {
                return BacktestOutcome::Failed {
                    reason: "no exogenous rows available".to_string(),
                }
            }
        }
    } else {
        None
    };

    let spec = ModelSpec::for_course(kind, profile);
    let fitted = match Sarimax::new(spec).fit(train, exog.as_ref().map(|(rows, _)| *rows)) {
        Ok(fitted) => fitted,
        Err(e) => return BacktestOutcome::Failed { reason: e.to_string() },
    };
    let future = exog.as_ref().map(|(_, future)| future.as_slice());
    let preds = match fitted.forecast(HOLDOUT, future) {
        Ok(preds) => preds,
        Err(e) => return BacktestOutcome::Failed { reason: e.to_string() },
    };
    if preds.iter().any(|p| !p.is_finite()) {
        return BacktestOutcome::Failed {
            reason: "backtest forecast was not finite".to_string(),
        };
    }

    // Error metrics use the raw forecasts; rounding is display-only.
    let (mae, rmse) = forecast_errors(&preds, test);
    let test_mean: f64 = Statistics::mean(test);
    let accuracy = if test_mean == 0.0 {
        None
    } else {
        Some(100.0 - (mae / test_mean * 100.0))
    };

    let val_preds: Vec<u32> = preds.iter().filter_map(|&p| round_enrollment(p)).collect();
    BacktestOutcome::Scored(BacktestScore {
        mae,
        rmse,
        accuracy,
        val_terms: val_terms.to_vec(),
        val_preds,
    })
}

/// The best accuracy across whichever models' backtests succeeded
pub fn best_accuracy(outcomes: &[BacktestOutcome]) -> Option<f64> {
    outcomes
        .iter()
        .filter_map(|o| o.score().and_then(|s| s.accuracy))
        .fold(None, |best, acc| match best {
            Some(b) if b >= acc => Some(b),
            _ => Some(acc),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::RunConfig;
    use pretty_assertions::assert_eq;

    fn profile_for(code: &str) -> CourseProfile {
        CourseProfile::for_course(code, &RunConfig::default())
    }

    fn zero_features(len: usize) -> FeatureSet {
        FeatureSet {
            rows: vec![vec![0.0, 0.0]; len],
            kept: (0..len).collect(),
            width: 2,
        }
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Term {i}")).collect()
    }

    #[test]
    fn accuracy_formula_matches_worked_example() {
        let (mae, _) = forecast_errors(&[22.0, 22.0], &[20.0, 24.0]);
        assert_eq!(mae, 2.0);
        let mean = 22.0;
        let accuracy = 100.0 - (mae / mean * 100.0);
        assert!((accuracy - 90.909).abs() < 0.001);
    }

    #[test]
    fn rmse_is_root_of_mean_squared_error() {
        let (_, rmse) = forecast_errors(&[22.0, 22.0], &[20.0, 24.0]);
        assert_eq!(rmse, 2.0);
    }

    #[test]
    fn zero_mean_holdout_has_no_accuracy() {
        let y = vec![4.0, 3.0, 2.0, 1.0, 0.0, 0.0];
        let outcomes = backtest_course(&y, &zero_features(6), &names(2), &profile_for("CSCE A105"));
        let score = outcomes[0].score().expect("plain model scores");
        assert_eq!(score.accuracy, None);
        assert_eq!(best_accuracy(&outcomes[..1]), None);
    }

    #[test]
    fn scored_models_carry_holdout_terms_and_rounded_preds() {
        let y = vec![20.0, 24.0, 22.0, 26.0, 25.0, 28.0];
        let terms = vec!["Fall 2025".to_string(), "Spring 2026".to_string()];
        let outcomes = backtest_course(&y, &zero_features(6), &terms, &profile_for("CSCE A105"));
        let score = outcomes[0].score().expect("plain model scores");
        assert_eq!(score.val_terms, terms);
        assert_eq!(score.val_preds.len(), 2);
    }

    #[test]
    fn best_accuracy_takes_the_maximum_over_successes() {
        let score = |acc: Option<f64>| {
            BacktestOutcome::Scored(BacktestScore {
                mae: 1.0,
                rmse: 1.0,
                accuracy: acc,
                val_terms: vec![],
                val_preds: vec![],
            })
        };
        let outcomes = [
            score(Some(80.0)),
            BacktestOutcome::Failed { reason: "x".into() },
            score(Some(91.5)),
            score(None),
        ];
        assert_eq!(best_accuracy(&outcomes), Some(91.5));
    }

    #[test]
    fn all_failures_yield_no_best_accuracy() {
        let outcomes = [
            BacktestOutcome::Failed { reason: "a".into() },
            BacktestOutcome::Failed { reason: "b".into() },
        ];
        assert_eq!(best_accuracy(&outcomes), None);
    }

    #[test]
    fn short_training_split_fails_that_model_only() {
        // Four points leave a two-point train set: enough for the plain
        // model, too short for seasonal differencing at period 3.
        let y = vec![20.0, 24.0, 22.0, 26.0];
        let outcomes = backtest_course(&y, &zero_features(4), &names(2), &profile_for("CSCE A105"));
        assert!(outcomes[0].score().is_some());
        assert!(matches!(outcomes[1], BacktestOutcome::Failed { .. }));
    }
}
