//! Rule-plus-similarity ranking of catalog remedies against an assessed profile.
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::catalog::{Remedy, RemedyCatalog};
use super::plan::{build_plan, CarePlan};
use super::profile::{LifestyleTrigger, Profile};
use crate::assessment::types::{AssessmentResult, SeverityGrade};
use crate::config::EngineConfig;

const EXACT_SEVERITY_BONUS: f64 = 2.0;
const NEAR_MISS_BASE: f64 = 1.5;
const NEAR_MISS_STEP: f64 = 0.3;
const NEAR_MISS_FLOOR: f64 = 0.5;
const TRIGGER_BONUS: f64 = 0.75;
const CONCERN_BONUS: f64 = 0.8;
const SIMILARITY_WEIGHT: f64 = 1.5;

pub const PROFESSIONAL_EVALUATION_ALERT: &str =
    "Severe acne suspected: seek professional evaluation from a dermatologist.";
pub const WIDESPREAD_INFLAMMATION_ALERT: &str =
    "Widespread inflammation detected: cut back on irritating actives.";
pub const MULTIPLE_FOCI_ALERT: &str =
    "Multiple inflamed foci found: consider an antibacterial care routine.";

const WIDESPREAD_INFLAMMATION_PCT: f32 = 25.0;
const MULTIPLE_FOCI_COUNT: usize = 6;

// Thresholds turning assessment signals into concern tags.
const REDNESS_CONCERN_PCT: f32 = 12.0;
const INFLAMMATION_CONCERN_PCT: f32 = 20.0;
const TEXTURE_CONCERN_SCORE: f32 = 120.0;
const BLACKHEAD_CONCERN_PROXY: f32 = 18.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRemedy {
    #[serde(flatten)]
    pub remedy: Remedy,
    pub score: f64,
}

/// Everything a caller needs to render a plan for one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub concerns: BTreeSet<String>,
    pub plan: CarePlan,
    pub remedies: Vec<RankedRemedy>,
    pub safety_alerts: Vec<String>,
    pub community_highlights: Vec<String>,
}

/// Exact match scores 2.0; otherwise a bonus shrinking with the ordinal gap to the
/// nearest applicable grade, never below 0.5. No applicable grades, no bonus.
pub fn severity_bonus(grade: SeverityGrade, applicable: &BTreeSet<SeverityGrade>) -> f64 {
    if applicable.contains(&grade) {
        return EXACT_SEVERITY_BONUS;
    }
    applicable
        .iter()
        .map(|s| s.distance(grade))
        .min()
        .map(|distance| (NEAR_MISS_BASE - NEAR_MISS_STEP * distance as f64).max(NEAR_MISS_FLOOR))
        .unwrap_or(0.0)
}

/// Rule-based part of a remedy's score.
pub fn rule_score(
    remedy: &Remedy,
    grade: SeverityGrade,
    triggers: &[LifestyleTrigger],
    concerns: &BTreeSet<String>,
) -> f64 {
    let trigger_hits = triggers
        .iter()
        .filter(|t| remedy.triggers.contains(t.as_str()))
        .count();
    let concern_hits = concerns
        .iter()
        .filter(|c| remedy.concerns.contains(c.as_str()))
        .count();

    severity_bonus(grade, &remedy.applicable_severities)
        + TRIGGER_BONUS * trigger_hits as f64
        + CONCERN_BONUS * concern_hits as f64
}

pub fn build_query(
    grade: SeverityGrade,
    concerns: &BTreeSet<String>,
    triggers: &[LifestyleTrigger],
) -> String {
    let mut terms = vec![grade.name().to_string()];
    terms.extend(concerns.iter().cloned());
    terms.extend(triggers.iter().map(|t| t.as_str().to_string()));
    terms.join(" ")
}

fn round2(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// Independent alert rules over the assessment summary.
pub fn safety_alerts(
    grade: SeverityGrade,
    inflamed_area_pct: f32,
    region_count: usize,
) -> Vec<String> {
    let mut alerts = Vec::new();
    if grade >= SeverityGrade::Severe {
        alerts.push(PROFESSIONAL_EVALUATION_ALERT.to_string());
    }
    if inflamed_area_pct > WIDESPREAD_INFLAMMATION_PCT {
        alerts.push(WIDESPREAD_INFLAMMATION_ALERT.to_string());
    }
    if region_count >= MULTIPLE_FOCI_COUNT {
        alerts.push(MULTIPLE_FOCI_ALERT.to_string());
    }
    alerts
}

/// First community quote of each remedy, in rank order, up to `top_k`.
pub fn community_highlights(ranked: &[RankedRemedy], top_k: usize) -> Vec<String> {
    ranked
        .iter()
        .filter_map(|r| {
            r.remedy
                .community
                .first()
                .map(|quote| format!("{}: {}", r.remedy.title, quote))
        })
        .take(top_k)
        .collect()
}

/// Concern tags derived from assessment signals.
pub fn derive_concerns(assessment: &AssessmentResult) -> BTreeSet<String> {
    let mut concerns = BTreeSet::new();
    if assessment.inflamed_area_pct > REDNESS_CONCERN_PCT {
        concerns.insert("redness".to_string());
    }
    if assessment.inflamed_area_pct > INFLAMMATION_CONCERN_PCT {
        concerns.insert("inflammation".to_string());
    }
    if assessment.texture_score > TEXTURE_CONCERN_SCORE {
        concerns.insert("texture".to_string());
    }
    if assessment.pore_proxy > BLACKHEAD_CONCERN_PROXY {
        concerns.insert("blackheads".to_string());
    }
    concerns
}

pub struct RemedyRanker {
    catalog: Arc<RemedyCatalog>,
    top_k: usize,
    highlight_top_k: usize,
}

impl RemedyRanker {
    pub fn new(catalog: Arc<RemedyCatalog>, config: &EngineConfig) -> Self {
        Self {
            catalog,
            top_k: config.rank_top_k,
            highlight_top_k: config.highlight_top_k,
        }
    }

    pub fn catalog(&self) -> &RemedyCatalog {
        &self.catalog
    }

    pub fn rank(
        &self,
        grade: SeverityGrade,
        profile: &Profile,
        concerns: &BTreeSet<String>,
    ) -> Vec<RankedRemedy> {
        self.rank_top(grade, profile, concerns, self.top_k)
    }

    /// Score every remedy, sort descending (ties keep catalog order), keep `top_k`.
    pub fn rank_top(
        &self,
        grade: SeverityGrade,
        profile: &Profile,
        concerns: &BTreeSet<String>,
        top_k: usize,
    ) -> Vec<RankedRemedy> {
        let triggers = profile.triggers();
        let query = build_query(grade, concerns, &triggers);
        let similarities = self.catalog.index().similarities(&query);

        let mut scored: Vec<(f64, &Remedy)> = self
            .catalog
            .remedies()
            .iter()
            .zip(similarities)
            .map(|(remedy, similarity)| {
                let total =
                    rule_score(remedy, grade, &triggers, concerns) + SIMILARITY_WEIGHT * similarity;
                (total, remedy)
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        debug!("Ranked {} remedies for query '{}'", scored.len(), query);

        scored
            .into_iter()
            .take(top_k)
            .map(|(score, remedy)| RankedRemedy {
                remedy: remedy.clone(),
                score: round2(score),
            })
            .collect()
    }

    pub fn highlights(&self, ranked: &[RankedRemedy]) -> Vec<String> {
        community_highlights(ranked, self.highlight_top_k)
    }

    /// Full plan for an assessment: concerns, care plan, remedies, alerts, highlights.
    pub fn recommend(&self, assessment: &AssessmentResult, profile: &Profile) -> Recommendation {
        let concerns = derive_concerns(assessment);
        let remedies = self.rank(assessment.final_grade, profile, &concerns);
        let safety_alerts = safety_alerts(
            assessment.final_grade,
            assessment.inflamed_area_pct,
            assessment.detections.len(),
        );
        let community_highlights = self.highlights(&remedies);
        let plan = build_plan(profile, assessment.final_grade, assessment.inflamed_area_pct);

        info!(
            "Recommendation for {}: {} remedies, {} alerts",
            assessment.final_grade,
            remedies.len(),
            safety_alerts.len()
        );

        Recommendation {
            concerns,
            plan,
            remedies,
            safety_alerts,
            community_highlights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::profile::{Diet, StressLevel};

    fn remedy(
        id: &str,
        severities: &[SeverityGrade],
        concerns: &[&str],
        triggers: &[&str],
    ) -> Remedy {
        Remedy {
            id: id.to_string(),
            title: format!("Remedy {id}"),
            summary: String::new(),
            evidence_level: "low".to_string(),
            applicable_severities: severities.iter().copied().collect(),
            concerns: concerns.iter().map(|s| s.to_string()).collect(),
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            instructions: String::new(),
            warnings: Vec::new(),
            sources: Vec::new(),
            community: vec![format!("{id} worked for me")],
        }
    }

    fn ranker(remedies: Vec<Remedy>) -> RemedyRanker {
        RemedyRanker::new(
            Arc::new(RemedyCatalog::new(remedies).unwrap()),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_severity_bonus_exact_and_near_miss() {
        let applicable = BTreeSet::from([SeverityGrade::Mild, SeverityGrade::Moderate]);
        assert_eq!(severity_bonus(SeverityGrade::Mild, &applicable), 2.0);
        assert!((severity_bonus(SeverityGrade::Severe, &applicable) - 1.2).abs() < 1e-12);
        assert!((severity_bonus(SeverityGrade::VerySevere, &applicable) - 0.9).abs() < 1e-12);
        let far = BTreeSet::from([SeverityGrade::VerySevere]);
        assert_eq!(severity_bonus(SeverityGrade::Clear, &far), 0.5);
        assert_eq!(severity_bonus(SeverityGrade::Clear, &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_exact_grade_gets_no_near_miss_bonus() {
        // empty summary and no overlapping terms: similarity contributes nothing
        let ranked = ranker(vec![remedy("a", &[SeverityGrade::Moderate], &[], &[])]).rank(
            SeverityGrade::Moderate,
            &Profile::default(),
            &BTreeSet::new(),
        );
        assert_eq!(ranked[0].score, 2.0);
    }

    #[test]
    fn test_trigger_and_concern_bonuses() {
        let profile = Profile {
            diet: Diet::HighSugar,
            stress_level: StressLevel::High,
            ..Profile::default()
        };
        let r = remedy("a", &[SeverityGrade::Mild], &["redness", "texture"], &["stress", "dairy"]);
        let concerns = BTreeSet::from(["redness".to_string(), "blackheads".to_string()]);
        let score = rule_score(&r, SeverityGrade::Mild, &profile.triggers(), &concerns);
        assert!((score - (2.0 + 0.75 + 0.8)).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_catalog_order_and_top_k() {
        let remedies = (0..8)
            .map(|i| remedy(&format!("r{i}"), &[SeverityGrade::Clear], &[], &[]))
            .collect();
        let ranked =
            ranker(remedies).rank(SeverityGrade::Clear, &Profile::default(), &BTreeSet::new());
        let ids: Vec<&str> = ranked.iter().map(|r| r.remedy.id.as_str()).collect();
        assert_eq!(ids, vec!["r0", "r1", "r2", "r3", "r4"]);
    }

    #[test]
    fn test_similarity_breaks_rule_ties() {
        let mut plain = remedy("plain", &[SeverityGrade::Mild], &[], &[]);
        plain.summary = "gentle cleanser routine".to_string();
        let mut soothing = remedy("soothing", &[SeverityGrade::Mild], &[], &[]);
        soothing.summary = "soothes redness quickly".to_string();

        let concerns = BTreeSet::from(["redness".to_string()]);
        let ranked =
            ranker(vec![plain, soothing]).rank(SeverityGrade::Mild, &Profile::default(), &concerns);
        assert_eq!(ranked[0].remedy.id, "soothing");
        assert!(ranked[0].score > 2.0);
        assert_eq!(ranked[1].score, 2.0);
    }

    #[test]
    fn test_scores_are_rounded() {
        let r = remedy("a", &[SeverityGrade::Clear], &[], &[]);
        let ranked = ranker(vec![r]).rank(
            SeverityGrade::VerySevere,
            &Profile::default(),
            &BTreeSet::new(),
        );
        // distance 4: max(0.5, 1.5 - 1.2) = 0.5
        assert_eq!(ranked[0].score, 0.5);
        assert_eq!(round2(1.23456), 1.23);
    }

    #[test]
    fn test_safety_alerts() {
        assert_eq!(
            safety_alerts(SeverityGrade::VerySevere, 10.0, 0),
            vec![PROFESSIONAL_EVALUATION_ALERT.to_string()]
        );
        assert_eq!(
            safety_alerts(SeverityGrade::Mild, 30.0, 7),
            vec![
                WIDESPREAD_INFLAMMATION_ALERT.to_string(),
                MULTIPLE_FOCI_ALERT.to_string()
            ]
        );
        assert!(safety_alerts(SeverityGrade::Moderate, 25.0, 5).is_empty());
    }

    #[test]
    fn test_community_highlights_in_rank_order() {
        let mut quiet = remedy("quiet", &[SeverityGrade::Clear], &[], &[]);
        quiet.community.clear();
        let ranked: Vec<RankedRemedy> = ["a", "quiet", "b", "c", "d"]
            .iter()
            .map(|id| RankedRemedy {
                remedy: if *id == "quiet" {
                    quiet.clone()
                } else {
                    remedy(id, &[SeverityGrade::Clear], &[], &[])
                },
                score: 1.0,
            })
            .collect();

        assert_eq!(
            community_highlights(&ranked, 3),
            vec![
                "Remedy a: a worked for me".to_string(),
                "Remedy b: b worked for me".to_string(),
                "Remedy c: c worked for me".to_string(),
            ]
        );
        assert_eq!(community_highlights(&ranked[..2], 3).len(), 1);
    }
}
