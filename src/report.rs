//! Report assembly and serialization
//!
//! The report is a single JSON array mixing two record shapes: raw
//! history rows and per-course forecast rows (with an insufficient-data
//! variant whose optional fields are all null). Field names are a
//! compatibility contract with downstream consumers and must not
//! change.

use serde::Serialize;

use crate::backtest::BacktestOutcome;
use crate::calendar::TermCode;
use crate::data::EnrollmentPoint;
use crate::error::Result;
use crate::models::ModelOutcome;

/// Label used in place of a term name when a course cannot be forecast
pub const INSUFFICIENT_DATA: &str = "Insufficient data";

/// A raw history observation as it appears in the report
#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    pub code: String,
    pub term: u32,
    pub term_name: String,
    pub enrolled: u32,
    pub title: String,
}

impl From<&EnrollmentPoint> for HistoryRow {
    fn from(point: &EnrollmentPoint) -> Self {
        Self {
            code: point.code.clone(),
            term: point.term.code(),
            term_name: point.term.name(),
            enrolled: point.enrolled,
            title: point.title.clone(),
        }
    }
}

/// Everything the aggregator assembles for a fully processed course
#[derive(Debug, Clone)]
pub struct ForecastRecord {
    pub code: String,
    pub title: String,
    pub target_term: TermCode,
    /// One-step-ahead outcomes in ensemble order
    pub forecasts: [ModelOutcome; 4],
    /// Backtest outcomes in ensemble order
    pub backtests: [BacktestOutcome; 4],
    pub yearly_course: bool,
    pub best_accuracy: Option<f64>,
}

/// Terminal state of one course's pipeline
#[derive(Debug, Clone)]
pub enum CourseOutcome {
    /// Fewer than four usable observations; a recorded state, not an
    /// error
    InsufficientData { code: String, title: String },
    Forecasted(ForecastRecord),
}

/// A forecast record in its serialized shape
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRow {
    pub code: String,
    pub title: String,
    pub term: Option<u32>,
    pub term_name: String,
    pub arima_forecast: Option<u32>,
    pub sarima_forecast: Option<u32>,
    pub arimax_forecast: Option<u32>,
    pub sarimax_forecast: Option<u32>,
    pub arima_mae: Option<f64>,
    pub sarima_mae: Option<f64>,
    pub arimax_mae: Option<f64>,
    pub sarimax_mae: Option<f64>,
    pub arima_val_terms: Option<Vec<String>>,
    pub sarima_val_terms: Option<Vec<String>>,
    pub arimax_val_terms: Option<Vec<String>>,
    pub sarimax_val_terms: Option<Vec<String>>,
    pub arima_val_preds: Option<Vec<u32>>,
    pub sarima_val_preds: Option<Vec<u32>>,
    pub arimax_val_preds: Option<Vec<u32>>,
    pub sarimax_val_preds: Option<Vec<u32>>,
    pub yearly_course: Option<bool>,
    pub best_accuracy: Option<f64>,
}

fn mae_of(outcome: &BacktestOutcome) -> Option<f64> {
    outcome.score().map(|s| s.mae)
}

fn val_terms_of(outcome: &BacktestOutcome) -> Option<Vec<String>> {
    outcome.score().map(|s| s.val_terms.clone())
}

fn val_preds_of(outcome: &BacktestOutcome) -> Option<Vec<u32>> {
    outcome.score().map(|s| s.val_preds.clone())
}

impl CourseOutcome {
    /// Flatten into the serialized shape; the two variants are the two
    /// record shapes of the output contract.
    pub fn into_row(self) -> ForecastRow {
        match self {
            CourseOutcome::InsufficientData { code, title } => ForecastRow {
                code,
                title,
                term: None,
                term_name: INSUFFICIENT_DATA.to_string(),
                arima_forecast: None,
                sarima_forecast: None,
                arimax_forecast: None,
                sarimax_forecast: None,
                arima_mae: None,
                sarima_mae: None,
                arimax_mae: None,
                sarimax_mae: None,
                arima_val_terms: None,
                sarima_val_terms: None,
                arimax_val_terms: None,
                sarimax_val_terms: None,
                arima_val_preds: None,
                sarima_val_preds: None,
                arimax_val_preds: None,
                sarimax_val_preds: None,
                yearly_course: None,
                best_accuracy: None,
            },
            CourseOutcome::Forecasted(record) => {
                let [arima, sarima, arimax, sarimax] = &record.forecasts;
                let [arima_bt, sarima_bt, arimax_bt, sarimax_bt] = &record.backtests;
                ForecastRow {
                    code: record.code,
                    title: record.title,
                    term: Some(record.target_term.code()),
                    term_name: record.target_term.name(),
                    arima_forecast: arima.forecast(),
                    sarima_forecast: sarima.forecast(),
                    arimax_forecast: arimax.forecast(),
                    sarimax_forecast: sarimax.forecast(),
                    arima_mae: mae_of(arima_bt),
                    sarima_mae: mae_of(sarima_bt),
                    arimax_mae: mae_of(arimax_bt),
                    sarimax_mae: mae_of(sarimax_bt),
                    arima_val_terms: val_terms_of(arima_bt),
                    sarima_val_terms: val_terms_of(sarima_bt),
                    arimax_val_terms: val_terms_of(arimax_bt),
                    sarimax_val_terms: val_terms_of(sarimax_bt),
                    arima_val_preds: val_preds_of(arima_bt),
                    sarima_val_preds: val_preds_of(sarima_bt),
                    arimax_val_preds: val_preds_of(arimax_bt),
                    sarimax_val_preds: val_preds_of(sarimax_bt),
                    yearly_course: Some(record.yearly_course),
                    best_accuracy: record.best_accuracy,
                }
            }
        }
    }
}

/// One element of the report array
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportRow {
    History(HistoryRow),
    Forecast(ForecastRow),
}

/// The complete run artifact: history rows followed by forecast rows
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ForecastReport {
    pub rows: Vec<ReportRow>,
}

impl ForecastReport {
    pub fn new(history: &[EnrollmentPoint], outcomes: Vec<CourseOutcome>) -> Self {
        let mut rows: Vec<ReportRow> = history
            .iter()
            .map(|point| ReportRow::History(point.into()))
            .collect();
        rows.extend(
            outcomes
                .into_iter()
                .map(|outcome| ReportRow::Forecast(outcome.into_row())),
        );
        Self { rows }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::BacktestScore;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn term(code: u32) -> TermCode {
        TermCode::try_from(code).unwrap()
    }

    fn sample_record() -> ForecastRecord {
        let fitted = ModelOutcome::Fitted { forecast: 42 };
        let failed = ModelOutcome::Failed { reason: "did not converge".into() };
        let scored = BacktestOutcome::Scored(BacktestScore {
            mae: 2.0,
            rmse: 2.0,
            accuracy: Some(90.9),
            val_terms: vec!["Fall 2025".into(), "Spring 2026".into()],
            val_preds: vec![22, 22],
        });
        ForecastRecord {
            code: "CSCE A201".into(),
            title: "Programming II".into(),
            target_term: term(202601),
            forecasts: [fitted.clone(), failed, fitted.clone(), fitted],
            backtests: [
                scored.clone(),
                BacktestOutcome::Failed { reason: "short".into() },
                scored.clone(),
                scored,
            ],
            yearly_course: false,
            best_accuracy: Some(90.9),
        }
    }

    #[test]
    fn insufficient_data_row_nulls_everything_else() {
        let outcome = CourseOutcome::InsufficientData {
            code: "CSCE A470".into(),
            title: "Capstone".into(),
        };
        let json = serde_json::to_value(outcome.into_row()).unwrap();
        assert_eq!(json["term"], Value::Null);
        assert_eq!(json["term_name"], "Insufficient data");
        assert_eq!(json["arima_forecast"], Value::Null);
        assert_eq!(json["sarimax_val_preds"], Value::Null);
        assert_eq!(json["yearly_course"], Value::Null);
        assert_eq!(json["best_accuracy"], Value::Null);
    }

    #[test]
    fn forecast_row_keeps_contract_field_names() {
        let json = serde_json::to_value(CourseOutcome::Forecasted(sample_record()).into_row())
            .unwrap();
        let object = json.as_object().unwrap();
        for field in [
            "code",
            "title",
            "term",
            "term_name",
            "arima_forecast",
            "sarima_forecast",
            "arimax_forecast",
            "sarimax_forecast",
            "arima_mae",
            "sarima_mae",
            "arimax_mae",
            "sarimax_mae",
            "arima_val_terms",
            "sarima_val_terms",
            "arimax_val_terms",
            "sarimax_val_terms",
            "arima_val_preds",
            "sarima_val_preds",
            "arimax_val_preds",
            "sarimax_val_preds",
            "yearly_course",
            "best_accuracy",
        ] {
            assert!(object.contains_key(field), "missing field {field}");
        }
        assert_eq!(json["term"], 202601);
        assert_eq!(json["term_name"], "Spring 2026");
        assert_eq!(json["arima_forecast"], 42);
        // The failed sibling's fields are null, not absent.
        assert_eq!(json["sarima_forecast"], Value::Null);
        assert_eq!(json["sarima_mae"], Value::Null);
        assert_eq!(json["arima_val_preds"], serde_json::json!([22, 22]));
    }

    #[test]
    fn report_concatenates_history_then_forecasts() {
        let history = vec![EnrollmentPoint {
            code: "CSCE A201".into(),
            term: term(202503),
            enrolled: 30,
            title: "Programming II".into(),
        }];
        let report = ForecastReport::new(
            &history,
            vec![CourseOutcome::Forecasted(sample_record())],
        );
        let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["enrolled"], 30);
        assert!(rows[0].get("arima_forecast").is_none());
        assert_eq!(rows[1]["arima_forecast"], 42);
    }
}
