use serde::{Deserialize, Serialize};

use super::profile::{HormonalStatus, LifestyleTrigger, Profile};
use crate::assessment::types::SeverityGrade;

const REDNESS_TONER_PCT: f32 = 12.0;

/// Routine items that count as a cleanser.
const CLEANSER_ITEMS: [&str; 2] = ["cleanser", "gentle_cleanser"];

/// Structured care plan sections, each a list of short advice lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarePlan {
    pub focus: Vec<String>,
    pub actives: Vec<String>,
    pub lifestyle: Vec<String>,
    pub routine_gaps: Vec<String>,
    pub weekly: Vec<String>,
}

struct SeverityNotes {
    focus: &'static [&'static str],
    actives: &'static [&'static str],
}

fn severity_notes(grade: SeverityGrade) -> SeverityNotes {
    match grade {
        SeverityGrade::Clear => SeverityNotes {
            focus: &["Protect the skin with barrier-friendly products."],
            actives: &["Gentle cleanser", "Daytime SPF 30+"],
        },
        SeverityGrade::Mild => SeverityNotes {
            focus: &["Choose non-comedogenic base products."],
            actives: &["Salicylic acid (2-3 times a week)", "Niacinamide serum"],
        },
        SeverityGrade::Moderate => SeverityNotes {
            focus: &["Control inflammation and clear comedones."],
            actives: &["Benzoyl peroxide (low %, spot use)", "Retinoid (night)"],
        },
        SeverityGrade::Severe => SeverityNotes {
            focus: &["Professional support and anti-inflammatory care."],
            actives: &["Dermatologist consultation", "Evaluate topical or oral treatment"],
        },
        SeverityGrade::VerySevere => SeverityNotes {
            focus: &["Urgent dermatologist referral."],
            actives: &["May require systemic treatment"],
        },
    }
}

fn trigger_note(trigger: LifestyleTrigger) -> &'static str {
    match trigger {
        LifestyleTrigger::HighGlycemic => "Add a low glycemic index meal plan.",
        LifestyleTrigger::Dairy => "Limiting dairy may reduce lesions for some people.",
        LifestyleTrigger::Stress => {
            "Add daily breathing exercises and a stress management routine."
        }
        LifestyleTrigger::Hydration => "Raise water intake to about 2L a day.",
        LifestyleTrigger::Sleep => "Aim for 7-8 hours of sleep and build a sleep hygiene habit.",
        LifestyleTrigger::Occlusive => {
            "Swap heavy or comedogenic products for lightweight textures."
        }
    }
}

fn routine_gaps(profile: &Profile) -> Vec<String> {
    let mut gaps = Vec::new();
    if !profile.has_routine_item("spf") {
        gaps.push("Daily SPF keeps marks and redness from getting worse.".to_string());
    }
    if !CLEANSER_ITEMS.iter().any(|item| profile.has_routine_item(item)) {
        gaps.push("A gentle SLS-free cleanser supports the skin barrier.".to_string());
    }
    if !profile.has_routine_item("moisturizer") {
        gaps.push(
            "If the moisture barrier is damaged, add a cream with ceramides or hyaluronic acid."
                .to_string(),
        );
    }
    gaps
}

pub fn build_plan(profile: &Profile, grade: SeverityGrade, inflamed_area_pct: f32) -> CarePlan {
    let notes = severity_notes(grade);

    let mut weekly = Vec::new();
    if grade >= SeverityGrade::Moderate {
        weekly.push(
            "Compare photos every 4 weeks to track progress with professional care.".to_string(),
        );
    }
    if inflamed_area_pct > REDNESS_TONER_PCT {
        weekly.push("Add a green tea or niacinamide toner to reduce redness.".to_string());
    }
    if profile.hormonal_status == HormonalStatus::MarkedFluctuation {
        weekly.push("Plan a cyclical retinoid schedule for periodic flare-ups.".to_string());
    }

    CarePlan {
        focus: notes.focus.iter().map(|s| s.to_string()).collect(),
        actives: notes.actives.iter().map(|s| s.to_string()).collect(),
        lifestyle: profile
            .triggers()
            .into_iter()
            .map(|t| trigger_note(t).to_string())
            .collect(),
        routine_gaps: routine_gaps(profile),
        weekly,
    }
}
