//! The four-model forecasting ensemble
//!
//! Every course is fitted with four variants of the same
//! autoregressive-integrated family: plain ARIMA(1,1,1), a seasonal
//! variant, an exogenous variant, and the seasonal+exogenous
//! combination. A model failure is a value, not an error: one variant
//! failing never affects its siblings or the course.

use crate::features::FeatureSet;
use crate::profile::CourseProfile;

pub mod sarimax;

pub use sarimax::{FittedSarimax, Sarimax};

/// The four ensemble members, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Arima,
    Sarima,
    Arimax,
    SarimaExog,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Arima,
        ModelKind::Sarima,
        ModelKind::Arimax,
        ModelKind::SarimaExog,
    ];

    /// Field-name prefix in the serialized report
    pub fn label(self) -> &'static str {
        match self {
            ModelKind::Arima => "arima",
            ModelKind::Sarima => "sarima",
            ModelKind::Arimax => "arimax",
            ModelKind::SarimaExog => "sarimax",
        }
    }

    pub fn seasonal(self) -> bool {
        matches!(self, ModelKind::Sarima | ModelKind::SarimaExog)
    }

    pub fn exogenous(self) -> bool {
        matches!(self, ModelKind::Arimax | ModelKind::SarimaExog)
    }
}

/// Non-seasonal (p,d,q) order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal (P,D,Q,m) order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

/// Complete order specification for one ensemble member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub order: Order,
    pub seasonal: Option<SeasonalOrder>,
}

impl ModelSpec {
    /// The order a model kind uses for a given course: (1,1,1)
    /// throughout, seasonal (1,1,1,m) with the course's period, or the
    /// gateway course's (1,0,1,2) override.
    pub fn for_course(kind: ModelKind, profile: &CourseProfile) -> Self {
        let order = Order { p: 1, d: 1, q: 1 };
        let seasonal = if kind.seasonal() {
            Some(profile.seasonal_override.unwrap_or(SeasonalOrder {
                p: 1,
                d: 1,
                q: 1,
                period: profile.seasonal_period,
            }))
        } else {
            None
        };
        ModelSpec { order, seasonal }
    }
}

/// Result of fitting one ensemble member
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    Fitted { forecast: u32 },
    Failed { reason: String },
}

impl ModelOutcome {
    pub fn forecast(&self) -> Option<u32> {
        match self {
            ModelOutcome::Fitted { forecast } => Some(*forecast),
            ModelOutcome::Failed { .. } => None,
        }
    }
}

/// Round a raw forecast to a non-negative enrollment count
pub fn round_enrollment(raw: f64) -> Option<u32> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().max(0.0) as u32)
}

/// Fit all four ensemble members and produce their one-step-ahead
/// forecasts. The exogenous members repeat the last observed feature
/// row as the future regressor, since next term's prerequisite
/// enrollment is not yet known.
pub fn fit_course_ensemble(
    y: &[f64],
    features: &FeatureSet,
    profile: &CourseProfile,
) -> [ModelOutcome; 4] {
    ModelKind::ALL.map(|kind| fit_one(kind, y, features, profile))
}

fn fit_one(
    kind: ModelKind,
    y: &[f64],
    features: &FeatureSet,
    profile: &CourseProfile,
) -> ModelOutcome {
    let exog = if kind.exogenous() {
        match features.rows.last() {
            Some(last) => Some((features.rows.as_slice(), vec![last.clone()])),
            None => {
                return ModelOutcome::Failed {
                    reason: "no exogenous rows available".to_string(),
                }
            }
        }
    } else {
        None
    };

    let spec = ModelSpec::for_course(kind, profile);
    let fitted = match Sarimax::new(spec).fit(y, exog.as_ref().map(|(rows, _)| *rows)) {
        Ok(fitted) => fitted,
        Err(e) => return ModelOutcome::Failed { reason: e.to_string() },
    };

    let future = exog.as_ref().map(|(_, future)| future.as_slice());
    let raw = match fitted.forecast(1, future) {
        Ok(values) => values.first().copied(),
        Err(e) => return ModelOutcome::Failed { reason: e.to_string() },
    };

    match raw.and_then(round_enrollment) {
        Some(forecast) => ModelOutcome::Fitted { forecast },
        None => ModelOutcome::Failed {
            reason: "forecast was not finite".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::RunConfig;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

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

    #[rstest]
    #[case("CSCE A101", 3)]
    #[case("CSCE A311", 2)]
    fn seasonal_period_follows_course_level(#[case] code: &str, #[case] period: usize) {
        let spec = ModelSpec::for_course(ModelKind::Sarima, &profile_for(code));
        assert_eq!(spec.seasonal.map(|s| s.period), Some(period));
        assert_eq!(spec.seasonal.map(|s| s.d), Some(1));
    }

    #[test]
    fn gateway_course_uses_override_order() {
        let spec = ModelSpec::for_course(ModelKind::SarimaExog, &profile_for("CSCE A201"));
        let seasonal = spec.seasonal.expect("seasonal order");
        assert_eq!((seasonal.p, seasonal.d, seasonal.q, seasonal.period), (1, 0, 1, 2));
    }

    #[test]
    fn plain_kinds_have_no_seasonal_order() {
        for kind in [ModelKind::Arima, ModelKind::Arimax] {
            let spec = ModelSpec::for_course(kind, &profile_for("CSCE A101"));
            assert_eq!(spec.seasonal, None);
        }
    }

    #[rstest]
    #[case(4.4, Some(4))]
    #[case(4.5, Some(5))]
    #[case(-3.2, Some(0))]
    #[case(f64::NAN, None)]
    fn rounding_floors_at_zero(#[case] raw: f64, #[case] expected: Option<u32>) {
        assert_eq!(round_enrollment(raw), expected);
    }

    #[test]
    fn five_point_series_yields_all_four_forecasts() {
        let y = vec![20.0, 24.0, 22.0, 26.0, 25.0];
        let outcomes = fit_course_ensemble(&y, &zero_features(5), &profile_for("CSCE A105"));
        for outcome in &outcomes {
            assert!(
                outcome.forecast().is_some(),
                "expected a forecast, got {outcome:?}"
            );
        }
    }

    #[test]
    fn ensemble_is_deterministic() {
        let y = vec![20.0, 24.0, 22.0, 26.0, 25.0, 28.0];
        let profile = profile_for("CSCE A311");
        let features = zero_features(6);
        let first = fit_course_ensemble(&y, &features, &profile);
        let second = fit_course_ensemble(&y, &features, &profile);
        assert_eq!(first, second);
    }

    #[test]
    fn seasonal_failure_leaves_siblings_standing() {
        // Four points cannot survive seasonal differencing at period 3,
        // but the plain variants still forecast.
        let y = vec![20.0, 24.0, 22.0, 26.0];
        let outcomes = fit_course_ensemble(&y, &zero_features(4), &profile_for("CSCE A105"));
        assert!(outcomes[0].forecast().is_some());
        assert!(matches!(outcomes[1], ModelOutcome::Failed { .. }));
        assert!(outcomes[2].forecast().is_some());
        assert!(matches!(outcomes[3], ModelOutcome::Failed { .. }));
    }
}
