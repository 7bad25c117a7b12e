//! Enrollment data model, provider interfaces and the run snapshot
//!
//! The forecasting core never reaches out to ambient state: a
//! [`RunSnapshot`] is read once from the providers at the start of a
//! run and passed around as an immutable view. CSV-backed providers
//! are included as the thin ingestion glue.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::calendar::TermCode;
use crate::error::{ForecastError, Result};

/// One observed (course, term) enrollment count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentPoint {
    pub code: String,
    pub term: TermCode,
    pub enrolled: u32,
    pub title: String,
}

/// Up to two prerequisites for a course, ordered with `prereq_1`
/// fewer terms back than `prereq_2`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrerequisiteEdge {
    pub course_code: String,
    pub prereq_1: Option<String>,
    pub prereq_2: Option<String>,
}

/// Supplies the full enrollment history for the subject
pub trait HistoryProvider {
    fn enrollment_history(&self) -> Result<Vec<EnrollmentPoint>>;
}

/// Supplies the prerequisite map
pub trait PrerequisiteProvider {
    fn prerequisite_edges(&self) -> Result<Vec<PrerequisiteEdge>>;
}

/// Supplies the calendar-year -> cohort-size mapping used by the
/// entry-level course
pub trait CohortProvider {
    fn cohort_sizes(&self) -> Result<BTreeMap<i32, f64>>;
}

#[derive(Debug, Deserialize)]
struct HistoryCsvRow {
    code: String,
    term: u32,
    enrolled: u32,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct PrereqCsvRow {
    course_code: String,
    #[serde(default)]
    prereq_1: Option<String>,
    #[serde(default)]
    prereq_2: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CohortCsvRow {
    year: i32,
    count: f64,
}

/// History provider reading `code,term,enrolled,title` rows
#[derive(Debug, Clone)]
pub struct CsvHistoryProvider {
    path: PathBuf,
}

impl CsvHistoryProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl HistoryProvider for CsvHistoryProvider {
    fn enrollment_history(&self) -> Result<Vec<EnrollmentPoint>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut points = Vec::new();
        for row in reader.deserialize::<HistoryCsvRow>() {
            let row = row?;
            points.push(EnrollmentPoint {
                code: row.code.trim().to_string(),
                term: TermCode::try_from(row.term)?,
                enrolled: row.enrolled,
                title: row.title.trim().to_string(),
            });
        }
        Ok(points)
    }
}

/// Prerequisite provider reading `course_code,prereq_1,prereq_2` rows
#[derive(Debug, Clone)]
pub struct CsvPrerequisiteProvider {
    path: PathBuf,
}

impl CsvPrerequisiteProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl PrerequisiteProvider for CsvPrerequisiteProvider {
    fn prerequisite_edges(&self) -> Result<Vec<PrerequisiteEdge>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut edges = Vec::new();
        for row in reader.deserialize::<PrereqCsvRow>() {
            let row = row?;
            edges.push(PrerequisiteEdge {
                course_code: row.course_code.trim().to_string(),
                prereq_1: non_empty(row.prereq_1),
                prereq_2: non_empty(row.prereq_2),
            });
        }
        Ok(edges)
    }
}

/// Cohort provider reading `year,count` rows
#[derive(Debug, Clone)]
pub struct CsvCohortProvider {
    path: PathBuf,
}

impl CsvCohortProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl CohortProvider for CsvCohortProvider {
    fn cohort_sizes(&self) -> Result<BTreeMap<i32, f64>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut sizes = BTreeMap::new();
        for row in reader.deserialize::<CohortCsvRow>() {
            let row = row?;
            sizes.insert(row.year, row.count);
        }
        Ok(sizes)
    }
}

/// In-memory cohort provider, for runs without an external cohort
/// source and for tests
#[derive(Debug, Clone, Default)]
pub struct StaticCohorts(pub BTreeMap<i32, f64>);

impl CohortProvider for StaticCohorts {
    fn cohort_sizes(&self) -> Result<BTreeMap<i32, f64>> {
        Ok(self.0.clone())
    }
}

/// Immutable snapshot of everything a forecast run reads
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    history: Vec<EnrollmentPoint>,
    enrollment_index: HashMap<(String, TermCode), f64>,
    edges: HashMap<String, PrerequisiteEdge>,
    cohorts: BTreeMap<i32, f64>,
}

impl RunSnapshot {
    /// Read all three providers into a snapshot. Provider failures
    /// propagate: a run never partially executes without history.
    pub fn load(
        history: &dyn HistoryProvider,
        prerequisites: &dyn PrerequisiteProvider,
        cohorts: &dyn CohortProvider,
    ) -> Result<Self> {
        let history = history
            .enrollment_history()
            .map_err(|e| ForecastError::Provider(format!("enrollment history: {e}")))?;
        let edges = prerequisites
            .prerequisite_edges()
            .map_err(|e| ForecastError::Provider(format!("prerequisites: {e}")))?;
        let cohorts = cohorts
            .cohort_sizes()
            .map_err(|e| ForecastError::Provider(format!("cohort sizes: {e}")))?;
        Self::from_parts(history, edges, cohorts)
    }

    /// Build a snapshot from already-materialized data
    pub fn from_parts(
        mut history: Vec<EnrollmentPoint>,
        edges: Vec<PrerequisiteEdge>,
        cohorts: BTreeMap<i32, f64>,
    ) -> Result<Self> {
        if history.is_empty() {
            return Err(ForecastError::Data(
                "enrollment history is empty".to_string(),
            ));
        }
        history.sort_by(|a, b| a.code.cmp(&b.code).then(a.term.cmp(&b.term)));

        let enrollment_index = history
            .iter()
            .map(|p| ((p.code.clone(), p.term), f64::from(p.enrolled)))
            .collect();
        let edges = edges
            .into_iter()
            .map(|e| (e.course_code.clone(), e))
            .collect();

        Ok(Self { history, enrollment_index, edges, cohorts })
    }

    /// All history points, sorted by course code then term
    pub fn history(&self) -> &[EnrollmentPoint] {
        &self.history
    }

    /// Distinct course codes in sorted order
    pub fn course_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for point in &self.history {
            if codes.last().map(String::as_str) != Some(point.code.as_str()) {
                codes.push(point.code.clone());
            }
        }
        codes
    }

    /// One course's observations, ascending by term
    pub fn course_series(&self, code: &str) -> Vec<&EnrollmentPoint> {
        self.history.iter().filter(|p| p.code == code).collect()
    }

    /// Enrollment for a (course, term) pair, if recorded
    pub fn enrollment_at(&self, code: &str, term: TermCode) -> Option<f64> {
        self.enrollment_index
            .get(&(code.to_string(), term))
            .copied()
    }

    /// The prerequisite edge for a course; absent means no prerequisites
    pub fn edge_for(&self, code: &str) -> PrerequisiteEdge {
        self.edges.get(code).cloned().unwrap_or_else(|| PrerequisiteEdge {
            course_code: code.to_string(),
            ..PrerequisiteEdge::default()
        })
    }

    pub fn cohort_for_year(&self, year: i32) -> Option<f64> {
        self.cohorts.get(&year).copied()
    }
}
