//! Prerequisite-lag exogenous features
//!
//! For each observation of a course, prerequisite slot `i` contributes
//! the prerequisite's enrollment `i` terms back (skipping Summer for
//! upper-division courses). The entry-level course additionally gets a
//! scaled external cohort-size column. Unknown lagged values are typed
//! as `None` and resolved by division: lower-division rows with any
//! unknown are dropped, upper-division unknowns are zero-filled.

use crate::calendar::Semester;
use crate::data::{EnrollmentPoint, PrerequisiteEdge, RunSnapshot};
use crate::profile::{CourseProfile, RunConfig};

/// Resolved exogenous matrix for one course
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// One row per kept observation, aligned with `kept`
    pub rows: Vec<Vec<f64>>,
    /// Indices into the original course series that survived filtering
    pub kept: Vec<usize>,
    pub width: usize,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn prereq_value(
    prereq: Option<&str>,
    point: &EnrollmentPoint,
    lag: usize,
    profile: &CourseProfile,
    snapshot: &RunSnapshot,
) -> Option<f64> {
    let code = match prereq {
        // An empty slot contributes an all-zero column.
        None => return Some(0.0),
        Some(code) => code,
    };
    let lag_term = point.term.lagged(lag, profile.skip_summer);
    match snapshot.enrollment_at(code, lag_term) {
        Some(value) => Some(value),
        // Lower-division histories are short and gap-intolerant, so an
        // unknown lag excludes the row; upper-division series tolerate
        // zero-filling to preserve length.
        None if profile.upper_division() => Some(0.0),
        None => None,
    }
}

fn cohort_value(point: &EnrollmentPoint, snapshot: &RunSnapshot, scale: f64) -> f64 {
    // Spring cohorts entered the prior calendar year.
    let year = match point.term.semester() {
        Some(Semester::Spring) => point.term.year() as i32 - 1,
        _ => point.term.year() as i32,
    };
    snapshot
        .cohort_for_year(year)
        .map(|size| size / scale)
        .unwrap_or(0.0)
}

/// Build and resolve the exogenous matrix for one course series
pub fn build_features(
    series: &[&EnrollmentPoint],
    profile: &CourseProfile,
    edge: &PrerequisiteEdge,
    snapshot: &RunSnapshot,
    config: &RunConfig,
) -> FeatureSet {
    let width = if profile.entry_course { 3 } else { 2 };
    let mut rows = Vec::with_capacity(series.len());
    let mut kept = Vec::with_capacity(series.len());

    for (idx, point) in series.iter().enumerate() {
        let first = prereq_value(edge.prereq_1.as_deref(), point, 1, profile, snapshot);
        let second = prereq_value(edge.prereq_2.as_deref(), point, 2, profile, snapshot);

        let (first, second) = match (first, second) {
            (Some(a), Some(b)) => (a, b),
            _ => continue,
        };

        let mut row = vec![first, second];
        if profile.entry_course {
            row.push(cohort_value(point, snapshot, config.cohort_scale));
        }
        rows.push(row);
        kept.push(idx);
    }

    FeatureSet { rows, kept, width }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TermCode;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn point(code: &str, term: u32, enrolled: u32) -> EnrollmentPoint {
        EnrollmentPoint {
            code: code.to_string(),
            term: TermCode::try_from(term).unwrap(),
            enrolled,
            title: String::new(),
        }
    }

    fn edge(code: &str, p1: Option<&str>, p2: Option<&str>) -> PrerequisiteEdge {
        PrerequisiteEdge {
            course_code: code.to_string(),
            prereq_1: p1.map(str::to_string),
            prereq_2: p2.map(str::to_string),
        }
    }

    fn snapshot(points: Vec<EnrollmentPoint>) -> RunSnapshot {
        RunSnapshot::from_parts(points, vec![], BTreeMap::new()).unwrap()
    }

    #[test]
    fn no_prerequisites_yield_zero_columns() {
        let config = RunConfig::default();
        let profile = CourseProfile::for_course("CSCE A105", &config);
        let snap = snapshot(vec![
            point("CSCE A105", 202403, 20),
            point("CSCE A105", 202501, 22),
        ]);
        let series = snap.course_series("CSCE A105");
        let features = build_features(&series, &profile, &edge("CSCE A105", None, None), &snap, &config);

        assert_eq!(features.kept, vec![0, 1]);
        assert_eq!(features.rows, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn lower_division_drops_rows_with_unknown_lag() {
        let config = RunConfig::default();
        let profile = CourseProfile::for_course("CSCE A201", &config);
        // Prerequisite history covers 202402 but not 202501's lag (202403
        // is missing), so only the 202403 observation keeps its row.
        let snap = snapshot(vec![
            point("CSCE A201", 202403, 30),
            point("CSCE A201", 202501, 28),
            point("CSCE A101", 202402, 55),
        ]);
        let series = snap.course_series("CSCE A201");
        let features = build_features(
            &series,
            &profile,
            &edge("CSCE A201", Some("CSCE A101"), None),
            &snap,
            &config,
        );

        assert_eq!(features.kept, vec![0]);
        assert_eq!(features.rows, vec![vec![55.0, 0.0]]);
    }

    #[test]
    fn upper_division_zero_fills_unknown_lag() {
        let config = RunConfig::default();
        let profile = CourseProfile::for_course("CSCE A311", &config);
        let snap = snapshot(vec![
            point("CSCE A311", 202403, 18),
            point("CSCE A311", 202501, 17),
            // Spring 2025's one-term lag lands on this Fall offering.
            point("CSCE A201", 202403, 33),
        ]);
        let series = snap.course_series("CSCE A311");
        let features = build_features(
            &series,
            &profile,
            &edge("CSCE A311", Some("CSCE A201"), None),
            &snap,
            &config,
        );

        // Both rows retained; the 202403 observation's lag (Spring 2024)
        // is unrecorded and becomes 0.
        assert_eq!(features.kept, vec![0, 1]);
        assert_eq!(features.rows[0], vec![0.0, 0.0]);
        assert_eq!(features.rows[1], vec![33.0, 0.0]);
    }

    #[test]
    fn entry_course_appends_scaled_cohort_column() {
        let config = RunConfig::default();
        let profile = CourseProfile::for_course("CSCE A101", &config);
        let mut cohorts = BTreeMap::new();
        cohorts.insert(2024, 400.0);
        let snap = RunSnapshot::from_parts(
            vec![
                point("CSCE A101", 202403, 50),
                point("CSCE A101", 202501, 48),
            ],
            vec![],
            cohorts,
        )
        .unwrap();
        let series = snap.course_series("CSCE A101");
        let features = build_features(&series, &profile, &edge("CSCE A101", None, None), &snap, &config);

        assert_eq!(features.width, 3);
        // Fall 2024 reads the 2024 cohort; Spring 2025 reads the prior year.
        assert_eq!(features.rows[0][2], 400.0 / 50.0);
        assert_eq!(features.rows[1][2], 400.0 / 50.0);
    }

    #[test]
    fn missing_cohort_year_is_zero_not_unknown() {
        let config = RunConfig::default();
        let profile = CourseProfile::for_course("CSCE A101", &config);
        let snap = snapshot(vec![
            point("CSCE A101", 202403, 50),
            point("CSCE A101", 202501, 48),
        ]);
        let series = snap.course_series("CSCE A101");
        let features = build_features(&series, &profile, &edge("CSCE A101", None, None), &snap, &config);

        assert_eq!(features.kept.len(), 2);
        assert_eq!(features.rows[0][2], 0.0);
    }
}
