//! Academic term calendar arithmetic
//!
//! Terms are encoded as `YYYYSS` integers where `SS` is 01 (Spring),
//! 02 (Summer) or 03 (Fall). All sequencing rules live here: plain
//! next/previous stepping, lagged lookups that can skip Summer for
//! upper-division courses, and the target-term rule used to label a
//! one-step-ahead forecast.

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::profile::CourseProfile;

/// One of the three semester slots in an academic year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semester {
    Spring,
    Summer,
    Fall,
}

impl Semester {
    /// Decode the two-digit semester part of a term code
    pub fn from_digit(digit: u32) -> Option<Self> {
        match digit {
            1 => Some(Semester::Spring),
            2 => Some(Semester::Summer),
            3 => Some(Semester::Fall),
            _ => None,
        }
    }

    pub fn digit(self) -> u32 {
        match self {
            Semester::Spring => 1,
            Semester::Summer => 2,
            Semester::Fall => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Semester::Spring => "Spring",
            Semester::Summer => "Summer",
            Semester::Fall => "Fall",
        }
    }
}

/// Encoded academic term (`year * 100 + semester`)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct TermCode(u32);

impl TermCode {
    /// Build a term code from a year and semester
    pub fn from_parts(year: u32, semester: Semester) -> Self {
        TermCode(year * 100 + semester.digit())
    }

    /// Raw `YYYYSS` value
    pub fn code(self) -> u32 {
        self.0
    }

    pub fn year(self) -> u32 {
        self.0 / 100
    }

    pub fn semester(self) -> Option<Semester> {
        Semester::from_digit(self.0 % 100)
    }

    /// Human-readable label, e.g. `"Fall 2025"`.
    ///
    /// An unrecognized semester digit yields `"Unknown <year>"` rather
    /// than failing; validated constructors keep that branch out of
    /// normal operation.
    pub fn name(self) -> String {
        match self.semester() {
            Some(sem) => format!("{} {}", sem.name(), self.year()),
            None => format!("Unknown {}", self.year()),
        }
    }

    /// The term immediately after this one
    pub fn next(self) -> TermCode {
        match self.semester() {
            Some(Semester::Spring) => TermCode::from_parts(self.year(), Semester::Summer),
            Some(Semester::Summer) => TermCode::from_parts(self.year(), Semester::Fall),
            Some(Semester::Fall) | None => TermCode::from_parts(self.year() + 1, Semester::Spring),
        }
    }

    /// The term immediately before this one
    pub fn previous(self) -> TermCode {
        match self.semester() {
            Some(Semester::Spring) | None => TermCode::from_parts(self.year() - 1, Semester::Fall),
            Some(Semester::Summer) => TermCode::from_parts(self.year(), Semester::Spring),
            Some(Semester::Fall) => TermCode::from_parts(self.year(), Semester::Summer),
        }
    }

    /// Step `steps_back` terms into the past.
    ///
    /// With `skip_summer`, any intermediate Summer landing is stepped
    /// over once more, so "one term back" resolves to the last term an
    /// upper-division course could actually have run.
    pub fn lagged(self, steps_back: usize, skip_summer: bool) -> TermCode {
        let mut term = self;
        for _ in 0..steps_back {
            term = term.previous();
            if skip_summer && term.semester() == Some(Semester::Summer) {
                term = term.previous();
            }
        }
        term
    }
}

impl TryFrom<u32> for TermCode {
    type Error = ForecastError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match Semester::from_digit(code % 100) {
            Some(_) => Ok(TermCode(code)),
            None => Err(ForecastError::Data(format!(
                "invalid term code {code}: semester digit must be 01, 02 or 03"
            ))),
        }
    }
}

impl From<TermCode> for u32 {
    fn from(term: TermCode) -> u32 {
        term.0
    }
}

impl std::fmt::Display for TermCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many observations fall in each semester slot for one course
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotTally {
    pub spring: usize,
    pub summer: usize,
    pub fall: usize,
}

impl SlotTally {
    pub fn count(terms: &[TermCode]) -> Self {
        let mut tally = SlotTally::default();
        for term in terms {
            match term.semester() {
                Some(Semester::Spring) => tally.spring += 1,
                Some(Semester::Summer) => tally.summer += 1,
                Some(Semester::Fall) => tally.fall += 1,
                None => {}
            }
        }
        tally
    }

    /// A yearly course occupies exactly one of the three slots
    pub fn is_yearly(&self) -> bool {
        let nonzero = [self.spring, self.summer, self.fall]
            .iter()
            .filter(|&&n| n > 0)
            .count();
        nonzero == 1
    }

    /// The single populated slot, when there is exactly one
    pub fn sole_semester(&self) -> Option<Semester> {
        if !self.is_yearly() {
            return None;
        }
        if self.spring > 0 {
            Some(Semester::Spring)
        } else if self.summer > 0 {
            Some(Semester::Summer)
        } else {
            Some(Semester::Fall)
        }
    }
}

/// The term a one-step-ahead forecast should be labeled with.
///
/// Yearly courses advance to the next occurrence of their single
/// semester slot. Otherwise upper-division courses step Spring/Summer
/// to the same-year Fall and Fall to next-year Spring (Summer is never
/// a target), while lower-division courses follow the plain
/// Spring -> Summer -> Fall cycle.
pub fn forecast_target_term(
    profile: &CourseProfile,
    tally: &SlotTally,
    is_yearly: bool,
    last_observed: TermCode,
) -> TermCode {
    if is_yearly {
        if let Some(target) = tally.sole_semester() {
            let last_digit = last_observed.code() % 100;
            let year = if target.digit() > last_digit {
                last_observed.year()
            } else {
                last_observed.year() + 1
            };
            return TermCode::from_parts(year, target);
        }
    }

    if profile.upper_division() {
        match last_observed.semester() {
            Some(Semester::Spring) | Some(Semester::Summer) => {
                TermCode::from_parts(last_observed.year(), Semester::Fall)
            }
            Some(Semester::Fall) | None => {
                TermCode::from_parts(last_observed.year() + 1, Semester::Spring)
            }
        }
    } else {
        last_observed.next()
    }
}
