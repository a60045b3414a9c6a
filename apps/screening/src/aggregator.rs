//! Report assembly: ranked candidates + narrative analysis + provenance
//! into one `ScreeningReport`. Every silent degradation that happened
//! upstream surfaces here as an annotation on the affected candidate.

use chrono::Utc;

use crate::analyzer::BatchAnalysis;
use crate::models::{
    Annotation, Provenance, QueryCriteria, RankedCandidate, ScoredCandidate, ScreeningReport,
};

pub fn assemble(
    criteria: &QueryCriteria,
    ranked: Vec<ScoredCandidate>,
    analysis: BatchAnalysis,
    mut provenance: Provenance,
) -> ScreeningReport {
    provenance.analysis_cache_hits = analysis.cache_hits;
    provenance.analysis_cache_misses = analysis.cache_misses;

    let candidates = ranked
        .into_iter()
        .map(|scored| {
            let id = scored.record.id;
            let mut annotations = scored.annotations;
            if scored.record.metadata.incomplete {
                annotations.push(Annotation::ExtractionIncomplete);
            }
            for dimension in &scored.breakdown.defaulted {
                annotations.push(Annotation::ScoreDefaulted {
                    dimension: *dimension,
                });
            }
            let narrative = analysis.narratives.get(&id).cloned();
            if let Some(reason) = analysis.failures.get(&id) {
                annotations.push(Annotation::AnalysisFailed {
                    reason: reason.clone(),
                });
            }
            RankedCandidate {
                resume_id: id,
                rank: scored.breakdown.rank.unwrap_or(0),
                name: scored.record.metadata.name.clone(),
                similarity: scored.similarity,
                breakdown: scored.breakdown,
                metadata: scored.record.metadata,
                narrative,
                annotations,
            }
        })
        .collect::<Vec<_>>();

    ScreeningReport {
        query_id: criteria.id,
        query_text: criteria.raw_text.clone(),
        total_candidates: candidates.len(),
        candidates,
        provenance,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CandidateMetadata, Dimension, RequiredConditions, ResumeRecord, ScoreBreakdown,
        SoftPreferences,
    };
    use uuid::Uuid;

    fn criteria() -> QueryCriteria {
        QueryCriteria {
            id: Uuid::new_v4(),
            raw_text: "rust engineer".to_string(),
            required: RequiredConditions::default(),
            soft: SoftPreferences::default(),
            ambiguous: vec![],
            created_at: Utc::now(),
        }
    }

    fn scored(rank: u32, incomplete: bool, defaulted: Vec<Dimension>) -> ScoredCandidate {
        let id = Uuid::new_v4();
        ScoredCandidate {
            record: ResumeRecord {
                id,
                raw_text: String::new(),
                metadata: CandidateMetadata {
                    name: Some("Jane".to_string()),
                    incomplete,
                    ..Default::default()
                },
                embedding: vec![],
                indexed: true,
                ingested_at: Utc::now(),
            },
            similarity: 0.8,
            breakdown: ScoreBreakdown {
                resume_id: id,
                query_id: Uuid::new_v4(),
                skills: 50.0,
                experience: 50.0,
                education: 50.0,
                salary: 50.0,
                location: 50.0,
                domain: 50.0,
                composite: 50.0,
                rank: Some(rank),
                defaulted,
            },
            annotations: vec![],
        }
    }

    #[test]
    fn test_report_carries_ranks_and_narratives() {
        let c = criteria();
        let first = scored(1, false, vec![]);
        let second = scored(2, false, vec![]);
        let mut analysis = BatchAnalysis::default();
        analysis
            .narratives
            .insert(first.record.id, "Recommend interview.".to_string());
        analysis.cache_misses = 1;

        let report = assemble(&c, vec![first, second], analysis, Provenance::default());
        assert_eq!(report.total_candidates, 2);
        assert_eq!(report.candidates[0].rank, 1);
        assert_eq!(
            report.candidates[0].narrative.as_deref(),
            Some("Recommend interview.")
        );
        // Below the analysis cut: no narrative, no failure annotation.
        assert!(report.candidates[1].narrative.is_none());
        assert!(report.candidates[1].annotations.is_empty());
        assert_eq!(report.provenance.analysis_cache_misses, 1);
    }

    #[test]
    fn test_degradations_surface_as_annotations() {
        let c = criteria();
        let candidate = scored(1, true, vec![Dimension::Salary]);
        let id = candidate.record.id;
        let mut analysis = BatchAnalysis::default();
        analysis
            .failures
            .insert(id, "provider timed out".to_string());

        let report = assemble(&c, vec![candidate], analysis, Provenance::default());
        let annotations = &report.candidates[0].annotations;
        assert!(annotations.contains(&Annotation::ExtractionIncomplete));
        assert!(annotations.contains(&Annotation::ScoreDefaulted {
            dimension: Dimension::Salary
        }));
        assert!(annotations.iter().any(|a| matches!(
            a,
            Annotation::AnalysisFailed { reason } if reason.contains("timed out")
        )));
        assert!(report.candidates[0].narrative.is_none());
    }
}
