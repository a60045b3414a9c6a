//! Core data model: candidate metadata, query criteria, score breakdowns,
//! and the assembled screening report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Education level under a fixed ordinal ordering. `Ord` drives both the
/// hard filter and the education dimension score.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    #[default]
    None,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl EducationLevel {
    /// Ordinal rank used for ratio scoring. `None` is 0.
    pub fn rank(self) -> u8 {
        match self {
            EducationLevel::None => 0,
            EducationLevel::Associate => 1,
            EducationLevel::Bachelor => 2,
            EducationLevel::Master => 3,
            EducationLevel::Doctorate => 4,
        }
    }

    /// Lenient parse from free-form LLM output ("BSc", "master's", "PhD"...).
    pub fn parse(text: &str) -> Option<Self> {
        let t = text.trim().to_lowercase();
        if t.is_empty() || t == "none" {
            return Some(EducationLevel::None);
        }
        if t.contains("doctor") || t.contains("phd") {
            return Some(EducationLevel::Doctorate);
        }
        if t.contains("master") || t.contains("msc") || t.contains("mba") {
            return Some(EducationLevel::Master);
        }
        if t.contains("bachelor") || t.contains("bsc") || t.contains("undergrad") {
            return Some(EducationLevel::Bachelor);
        }
        if t.contains("associate") || t.contains("diploma") || t.contains("college") {
            return Some(EducationLevel::Associate);
        }
        None
    }
}

/// An expected or offered salary range, in absolute currency units.
/// A single figure is represented as `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
}

impl SalaryRange {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn point(value: f64) -> Self {
        Self { min: value, max: value }
    }

    /// Parses salary strings as they appear in resumes and queries:
    /// "20K", "20K-30K", "25000", "20k - 30k". Returns `None` when nothing
    /// numeric can be recovered.
    pub fn parse(text: &str) -> Option<Self> {
        let cleaned = text.replace(' ', "").to_lowercase();
        if cleaned.is_empty() {
            return None;
        }
        let mut parts = cleaned.splitn(2, '-');
        let lo = parse_salary_figure(parts.next()?)?;
        match parts.next() {
            Some(rest) => {
                let hi = parse_salary_figure(rest)?;
                Some(SalaryRange::new(lo, hi))
            }
            None => Some(SalaryRange::point(lo)),
        }
    }

    /// Widens the range by `tolerance` (e.g. 0.10 for ±10%) on both ends.
    pub fn widen(&self, tolerance: f64) -> Self {
        SalaryRange::new(self.min * (1.0 - tolerance), self.max * (1.0 + tolerance))
    }

    pub fn overlaps(&self, other: &SalaryRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

fn parse_salary_figure(text: &str) -> Option<f64> {
    let (digits, multiplier) = match text.strip_suffix('k') {
        Some(d) => (d, 1000.0),
        None => (text, 1.0),
    };
    digits.parse::<f64>().ok().map(|v| v * multiplier)
}

/// Structured metadata extracted from one resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateMetadata {
    pub name: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub years_experience: Option<f64>,
    pub education: Option<EducationLevel>,
    pub expected_salary: Option<SalaryRange>,
    pub location: Option<String>,
    #[serde(default)]
    pub remote_ok: bool,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub traits: Vec<String>,
    pub summary: Option<String>,
    /// Set when extraction could not recover all filterable fields, or the
    /// extraction degraded after bounded retries. Incomplete candidates are
    /// excluded by the hard filter with an `InsufficientData` annotation
    /// when an affected condition is required.
    #[serde(default)]
    pub incomplete: bool,
}

/// One ingested resume with its extracted metadata and embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: Uuid,
    pub raw_text: String,
    pub metadata: CandidateMetadata,
    pub embedding: Vec<f32>,
    /// False when the embedding provider failed at ingestion; the record is
    /// kept and can be re-indexed later, but is invisible to retrieval.
    pub indexed: bool,
    pub ingested_at: DateTime<Utc>,
}

/// The four hard-filterable conditions. Also names the fields a query
/// interpreter may mark ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Experience,
    Salary,
    Education,
    Location,
}

/// Required (hard-gated) conditions of a query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredConditions {
    pub min_experience_years: Option<f64>,
    pub salary_range: Option<SalaryRange>,
    pub min_education: Option<EducationLevel>,
    #[serde(default)]
    pub locations: Vec<String>,
    /// When true a remote-eligible candidate satisfies the location condition.
    #[serde(default)]
    pub remote_allowed: bool,
}

/// Soft preferences: never gate, only score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoftPreferences {
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Interpreted hiring criteria. Immutable once created.
///
/// A required field listed in `ambiguous` is excluded from hard filtering
/// (never silently passed or failed) and contributes to soft scoring only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCriteria {
    pub id: Uuid,
    pub raw_text: String,
    pub required: RequiredConditions,
    pub soft: SoftPreferences,
    #[serde(default)]
    pub ambiguous: Vec<RequiredField>,
    pub created_at: DateTime<Utc>,
}

impl QueryCriteria {
    /// True when `field` should be enforced by the hard filter: a value is
    /// present and the interpreter did not flag it ambiguous.
    pub fn is_enforceable(&self, field: RequiredField) -> bool {
        if self.ambiguous.contains(&field) {
            return false;
        }
        match field {
            RequiredField::Experience => self.required.min_experience_years.is_some(),
            RequiredField::Salary => self.required.salary_range.is_some(),
            RequiredField::Education => self.required.min_education.is_some(),
            RequiredField::Location => {
                !self.required.locations.is_empty() || self.required.remote_allowed
            }
        }
    }
}

/// The six scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Skills,
    Experience,
    Education,
    Salary,
    Location,
    Domain,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Skills,
        Dimension::Experience,
        Dimension::Education,
        Dimension::Salary,
        Dimension::Location,
        Dimension::Domain,
    ];
}

/// Per-dimension scores in [0, 100] for one (resume, query) pair, plus the
/// weighted composite and the rank assigned after ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub resume_id: Uuid,
    pub query_id: Uuid,
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub salary: f64,
    pub location: f64,
    pub domain: f64,
    pub composite: f64,
    pub rank: Option<u32>,
    /// Dimensions that fell back to the neutral score for missing data.
    #[serde(default)]
    pub defaulted: Vec<Dimension>,
}

impl ScoreBreakdown {
    pub fn dimension(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Skills => self.skills,
            Dimension::Experience => self.experience,
            Dimension::Education => self.education,
            Dimension::Salary => self.salary,
            Dimension::Location => self.location,
            Dimension::Domain => self.domain,
        }
    }
}

/// Non-fatal degradations surfaced in report provenance. Nothing in the
/// pipeline is swallowed without one of these appearing in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    ExtractionIncomplete,
    AmbiguousRequired { field: RequiredField },
    InsufficientData { field: RequiredField },
    ScoreDefaulted { dimension: Dimension },
    AnalysisFailed { reason: String },
}

/// A candidate that survived filtering, fully scored. Input to the ranker.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub record: ResumeRecord,
    pub similarity: f32,
    pub breakdown: ScoreBreakdown,
    pub annotations: Vec<Annotation>,
}

/// One entry of the final ranked response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub resume_id: Uuid,
    pub rank: u32,
    pub name: Option<String>,
    pub similarity: f32,
    pub breakdown: ScoreBreakdown,
    pub metadata: CandidateMetadata,
    /// Absent when analysis was skipped (below top-N) or failed; a failure
    /// also carries an `AnalysisFailed` annotation.
    pub narrative: Option<String>,
    pub annotations: Vec<Annotation>,
}

/// Per-stage cache and filtering provenance attached to each report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    pub interpretation_cache_hit: bool,
    pub analysis_cache_hits: usize,
    pub analysis_cache_misses: usize,
    pub retrieved: usize,
    pub filtered_out: usize,
    pub insufficient_data: usize,
}

/// The assembled, ordered screening response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub query_id: Uuid,
    pub query_text: String,
    pub total_candidates: usize,
    pub candidates: Vec<RankedCandidate>,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a submitted query as seen through `fetch_results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryStatus {
    Pending,
    Ready { report: Box<ScreeningReport> },
    Failed { message: String, retryable: bool },
}
