//! Hard eligibility filter: a pure, suspend-free gate over
//! (candidate metadata, required conditions).
//!
//! Semantics per condition:
//! - experience: candidate years >= required minimum
//! - salary: candidate expected range overlaps the query range widened by
//!   the configured tolerance
//! - education: candidate level >= required level (ordinal)
//! - location: candidate location is in the accepted set, or the candidate
//!   is remote-eligible and the query allows remote
//!
//! A candidate missing the metadata behind a required condition is excluded
//! with an `InsufficientData` verdict, never silently passed. Ambiguous
//! required fields are skipped entirely; they score softly instead.

use crate::models::{Annotation, CandidateMetadata, QueryCriteria, RequiredField};

/// Per-candidate filter result. `passed` holds exactly when no condition
/// failed and none lacked data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterVerdict {
    pub failed: Vec<RequiredField>,
    pub insufficient: Vec<RequiredField>,
    pub skipped_ambiguous: Vec<RequiredField>,
}

impl FilterVerdict {
    pub fn passed(&self) -> bool {
        self.failed.is_empty() && self.insufficient.is_empty()
    }

    /// Annotations to surface in provenance for an excluded candidate.
    pub fn annotations(&self) -> Vec<Annotation> {
        let mut out: Vec<Annotation> = self
            .insufficient
            .iter()
            .map(|f| Annotation::InsufficientData { field: *f })
            .collect();
        out.extend(
            self.skipped_ambiguous
                .iter()
                .map(|f| Annotation::AmbiguousRequired { field: *f }),
        );
        out
    }
}

/// Evaluates every enforceable required condition. Monotonic: tightening
/// any single condition can only move candidates from passed to failed,
/// never the reverse.
pub fn evaluate(
    metadata: &CandidateMetadata,
    criteria: &QueryCriteria,
    salary_tolerance: f64,
) -> FilterVerdict {
    let mut verdict = FilterVerdict::default();

    for field in [
        RequiredField::Experience,
        RequiredField::Salary,
        RequiredField::Education,
        RequiredField::Location,
    ] {
        let has_value = match field {
            RequiredField::Experience => criteria.required.min_experience_years.is_some(),
            RequiredField::Salary => criteria.required.salary_range.is_some(),
            RequiredField::Education => criteria.required.min_education.is_some(),
            RequiredField::Location => {
                !criteria.required.locations.is_empty() || criteria.required.remote_allowed
            }
        };
        if !has_value {
            continue;
        }
        if !criteria.is_enforceable(field) {
            verdict.skipped_ambiguous.push(field);
            continue;
        }
        match check(field, metadata, criteria, salary_tolerance) {
            Check::Pass => {}
            Check::Fail => verdict.failed.push(field),
            Check::MissingData => verdict.insufficient.push(field),
        }
    }

    verdict
}

enum Check {
    Pass,
    Fail,
    MissingData,
}

fn check(
    field: RequiredField,
    metadata: &CandidateMetadata,
    criteria: &QueryCriteria,
    salary_tolerance: f64,
) -> Check {
    match field {
        RequiredField::Experience => {
            let min = criteria
                .required
                .min_experience_years
                .unwrap_or_default();
            match metadata.years_experience {
                None => Check::MissingData,
                Some(years) if years >= min => Check::Pass,
                Some(_) => Check::Fail,
            }
        }
        RequiredField::Salary => {
            let range = match criteria.required.salary_range {
                Some(r) => r,
                None => return Check::Pass,
            };
            match metadata.expected_salary {
                None => Check::MissingData,
                Some(expected) => {
                    if range.widen(salary_tolerance).overlaps(&expected) {
                        Check::Pass
                    } else {
                        Check::Fail
                    }
                }
            }
        }
        RequiredField::Education => {
            let min = match criteria.required.min_education {
                Some(level) => level,
                None => return Check::Pass,
            };
            match metadata.education {
                None => Check::MissingData,
                Some(level) if level >= min => Check::Pass,
                Some(_) => Check::Fail,
            }
        }
        RequiredField::Location => {
            let remote_satisfied = criteria.required.remote_allowed && metadata.remote_ok;
            if remote_satisfied {
                return Check::Pass;
            }
            if criteria.required.locations.is_empty() {
                // Remote was required and the candidate is not eligible.
                return if metadata.remote_ok { Check::Pass } else { Check::Fail };
            }
            match metadata.location.as_deref() {
                None => Check::MissingData,
                Some(location) => {
                    let location = location.trim().to_lowercase();
                    let accepted = criteria
                        .required
                        .locations
                        .iter()
                        .any(|l| l.trim().to_lowercase() == location);
                    if accepted {
                        Check::Pass
                    } else {
                        Check::Fail
                    }
                }
            }
        }
    }
}
