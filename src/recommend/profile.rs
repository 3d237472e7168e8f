use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diet {
    #[default]
    Balanced,
    HighSugar,
    DairyHeavy,
    PlantBased,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    #[default]
    Moderate,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HydrationLevel {
    Low,
    #[default]
    Adequate,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HormonalStatus {
    #[default]
    Stable,
    MildFluctuation,
    MarkedFluctuation,
}

/// Lifestyle factors a profile can flag, keyed by the trigger names used in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifestyleTrigger {
    HighGlycemic,
    Dairy,
    Stress,
    Hydration,
    Sleep,
    Occlusive,
}

impl LifestyleTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            LifestyleTrigger::HighGlycemic => "high_glycemic",
            LifestyleTrigger::Dairy => "dairy",
            LifestyleTrigger::Stress => "stress",
            LifestyleTrigger::Hydration => "hydration",
            LifestyleTrigger::Sleep => "sleep",
            LifestyleTrigger::Occlusive => "occlusive",
        }
    }
}

pub const OCCLUSIVE_ROUTINE_ITEM: &str = "occlusive_makeup";
const MIN_SLEEP_HOURS: f32 = 7.0;

/// Caller-supplied lifestyle profile for one recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub diet: Diet,
    pub stress_level: StressLevel,
    pub sleep_hours: f32,
    pub hydration_level: HydrationLevel,
    pub hormonal_status: HormonalStatus,
    pub routine_items: BTreeSet<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            diet: Diet::default(),
            stress_level: StressLevel::default(),
            sleep_hours: MIN_SLEEP_HOURS,
            hydration_level: HydrationLevel::default(),
            hormonal_status: HormonalStatus::default(),
            routine_items: BTreeSet::new(),
        }
    }
}

impl Profile {
    /// Triggers in a fixed order: diet, stress, hydration, sleep, cosmetics.
    pub fn triggers(&self) -> Vec<LifestyleTrigger> {
        let mut triggers = Vec::new();
        match self.diet {
            Diet::HighSugar => triggers.push(LifestyleTrigger::HighGlycemic),
            Diet::DairyHeavy => triggers.push(LifestyleTrigger::Dairy),
            Diet::Balanced | Diet::PlantBased => {}
        }
        if matches!(self.stress_level, StressLevel::High | StressLevel::VeryHigh) {
            triggers.push(LifestyleTrigger::Stress);
        }
        if self.hydration_level == HydrationLevel::Low {
            triggers.push(LifestyleTrigger::Hydration);
        }
        if self.sleep_hours < MIN_SLEEP_HOURS {
            triggers.push(LifestyleTrigger::Sleep);
        }
        if self.has_routine_item(OCCLUSIVE_ROUTINE_ITEM) {
            triggers.push(LifestyleTrigger::Occlusive);
        }
        triggers
    }

    pub fn has_routine_item(&self, item: &str) -> bool {
        self.routine_items
            .iter()
            .any(|i| i.trim().eq_ignore_ascii_case(item))
    }
}
