//! Multi-dimensional scorer: a pure, deterministic function from
//! (candidate metadata, query criteria) to six dimension scores in [0, 100]
//! plus their weighted composite.
//!
//! Missing candidate data never raises — the affected dimension falls back
//! to the neutral 50 and is listed in `ScoreBreakdown::defaulted`. An
//! absent query requirement scores 100: the candidate cannot mismatch a
//! constraint that was never asked for.

use std::collections::HashSet;

use uuid::Uuid;

use crate::config::ScoreWeights;
use crate::models::{CandidateMetadata, Dimension, QueryCriteria, ScoreBreakdown};

/// Neutral score for dimensions that lack the candidate data to judge.
const NEUTRAL: f64 = 50.0;

pub fn score(
    resume_id: Uuid,
    metadata: &CandidateMetadata,
    criteria: &QueryCriteria,
    weights: &ScoreWeights,
    salary_tolerance: f64,
) -> ScoreBreakdown {
    let mut defaulted = Vec::new();
    let mut dim = |dimension: Dimension, value: (f64, bool)| -> f64 {
        let (score, was_defaulted) = value;
        if was_defaulted {
            defaulted.push(dimension);
        }
        score.clamp(0.0, 100.0)
    };

    let skills = dim(Dimension::Skills, skills_score(metadata, criteria));
    let experience = dim(Dimension::Experience, experience_score(metadata, criteria));
    let education = dim(Dimension::Education, education_score(metadata, criteria));
    let salary = dim(
        Dimension::Salary,
        salary_score(metadata, criteria, salary_tolerance),
    );
    let location = dim(Dimension::Location, location_score(metadata, criteria));
    let domain = dim(Dimension::Domain, domain_score(metadata, criteria));

    let w = weights.normalized();
    let composite = (w.skills * skills
        + w.experience * experience
        + w.education * education
        + w.salary * salary
        + w.location * location
        + w.domain * domain)
        .clamp(0.0, 100.0);

    ScoreBreakdown {
        resume_id,
        query_id: criteria.id,
        skills,
        experience,
        education,
        salary,
        location,
        domain,
        composite,
        rank: None,
        defaulted,
    }
}

fn to_set(items: &[String]) -> HashSet<&str> {
    items.iter().map(String::as_str).collect()
}

fn overlap_fraction(candidate: &HashSet<&str>, wanted: &HashSet<&str>) -> f64 {
    if wanted.is_empty() {
        return 0.0;
    }
    candidate.intersection(wanted).count() as f64 / wanted.len() as f64
}

/// Required-skill overlap dominates (0.8); preferred skills add the rest.
/// When only one of the two sets is specified it carries the full weight.
fn skills_score(metadata: &CandidateMetadata, criteria: &QueryCriteria) -> (f64, bool) {
    let required = to_set(&criteria.soft.required_skills);
    let preferred = to_set(&criteria.soft.preferred_skills);
    if required.is_empty() && preferred.is_empty() {
        return (100.0, false);
    }
    if metadata.skills.is_empty() {
        return (NEUTRAL, true);
    }
    let candidate = to_set(&metadata.skills);
    let score = if required.is_empty() {
        overlap_fraction(&candidate, &preferred)
    } else if preferred.is_empty() {
        overlap_fraction(&candidate, &required)
    } else {
        0.8 * overlap_fraction(&candidate, &required)
            + 0.2 * overlap_fraction(&candidate, &preferred)
    };
    (score * 100.0, false)
}

/// Saturating in years relative to the requirement: meeting it exactly
/// scores 80, double the requirement saturates at 100, shortfalls scale
/// linearly below 80.
fn experience_score(metadata: &CandidateMetadata, criteria: &QueryCriteria) -> (f64, bool) {
    let required = match criteria.required.min_experience_years {
        Some(years) if years > 0.0 => years,
        _ => return (100.0, false),
    };
    let years = match metadata.years_experience {
        Some(y) => y,
        None => return (NEUTRAL, true),
    };
    if years >= required {
        let surplus = ((years - required) / required).min(1.0);
        (80.0 + 20.0 * surplus, false)
    } else {
        (80.0 * (years / required).max(0.0), false)
    }
}

/// Ordinal distance mapped to a ratio of ranks; at or above scores full.
fn education_score(metadata: &CandidateMetadata, criteria: &QueryCriteria) -> (f64, bool) {
    let required = match criteria.required.min_education {
        Some(level) => level,
        None => return (100.0, false),
    };
    let candidate = match metadata.education {
        Some(level) => level,
        None => return (NEUTRAL, true),
    };
    if candidate >= required {
        return (100.0, false);
    }
    let required_rank = f64::from(required.rank());
    (100.0 * f64::from(candidate.rank()) / required_rank, false)
}

/// Closeness to the query's tolerance band: fully inside is 100, partial
/// overlap scales with the covered share of the candidate's range, and
/// outside the band the score decays with the gap.
fn salary_score(
    metadata: &CandidateMetadata,
    criteria: &QueryCriteria,
    tolerance: f64,
) -> (f64, bool) {
    let range = match criteria.required.salary_range {
        Some(r) => r,
        None => return (100.0, false),
    };
    let expected = match metadata.expected_salary {
        Some(s) => s,
        None => return (NEUTRAL, true),
    };
    let band = range.widen(tolerance);

    if expected.min >= band.min && expected.max <= band.max {
        return (100.0, false);
    }
    if band.overlaps(&expected) {
        let overlap = band.max.min(expected.max) - band.min.max(expected.min);
        let covered = if expected.width() > 0.0 {
            (overlap / expected.width()).clamp(0.0, 1.0)
        } else {
            1.0
        };
        return (50.0 + 50.0 * covered, false);
    }
    let gap = if expected.min > band.max {
        expected.min - band.max
    } else {
        band.min - expected.max
    };
    let width = band.width().max(1.0);
    ((50.0 - 100.0 * gap / width).max(0.0), false)
}

/// Match tiers: exact location 100, remote-eligible against a
/// remote-friendly query 85, partial (substring) match 60, mismatch 0.
fn location_score(metadata: &CandidateMetadata, criteria: &QueryCriteria) -> (f64, bool) {
    let wants_location =
        !criteria.required.locations.is_empty() || criteria.required.remote_allowed;
    if !wants_location {
        return (100.0, false);
    }

    let candidate = metadata.location.as_deref().map(|l| l.trim().to_lowercase());
    if let Some(candidate) = &candidate {
        for accepted in &criteria.required.locations {
            let accepted = accepted.trim().to_lowercase();
            if accepted == *candidate {
                return (100.0, false);
            }
        }
    }
    if criteria.required.remote_allowed && metadata.remote_ok {
        return (85.0, false);
    }
    if let Some(candidate) = &candidate {
        for accepted in &criteria.required.locations {
            let accepted = accepted.trim().to_lowercase();
            if accepted.contains(candidate.as_str()) || candidate.contains(accepted.as_str()) {
                return (60.0, false);
            }
        }
        return (0.0, false);
    }
    (NEUTRAL, true)
}

/// Coverage of the query's domain and trait tags by the candidate's.
fn domain_score(metadata: &CandidateMetadata, criteria: &QueryCriteria) -> (f64, bool) {
    let mut wanted = to_set(&criteria.soft.domains);
    wanted.extend(criteria.soft.traits.iter().map(String::as_str));
    if wanted.is_empty() {
        return (100.0, false);
    }
    let mut candidate = to_set(&metadata.domains);
    candidate.extend(metadata.traits.iter().map(String::as_str));
    if candidate.is_empty() {
        return (NEUTRAL, true);
    }
    (100.0 * overlap_fraction(&candidate, &wanted), false)
}
