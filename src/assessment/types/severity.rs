use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Five-level ordinal severity scale. Declaration order is the ordinal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityGrade {
    Clear = 0,
    Mild = 1,
    Moderate = 2,
    Severe = 3,
    #[serde(rename = "Very Severe")]
    VerySevere = 4,
}

impl SeverityGrade {
    pub const SCALE: [SeverityGrade; 5] = [
        SeverityGrade::Clear,
        SeverityGrade::Mild,
        SeverityGrade::Moderate,
        SeverityGrade::Severe,
        SeverityGrade::VerySevere,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Grade at an ordinal position, clamped into the scale.
    pub fn from_index(index: usize) -> Self {
        Self::SCALE[index.min(Self::SCALE.len() - 1)]
    }

    pub fn name(self) -> &'static str {
        match self {
            SeverityGrade::Clear => "Clear",
            SeverityGrade::Mild => "Mild",
            SeverityGrade::Moderate => "Moderate",
            SeverityGrade::Severe => "Severe",
            SeverityGrade::VerySevere => "Very Severe",
        }
    }

    /// Ordinal gap between two grades.
    pub fn distance(self, other: SeverityGrade) -> usize {
        self.index().abs_diff(other.index())
    }
}

impl fmt::Display for SeverityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strict parse of a canonical grade name, ignoring case and separators. Classifier
/// output goes through `ensemble::normalize_label` instead, which never fails.
impl FromStr for SeverityGrade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = compact(s);
        Self::SCALE
            .iter()
            .copied()
            .find(|grade| compact(grade.name()) == key)
            .ok_or_else(|| format!("unknown severity grade '{s}'"))
    }
}

fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_index_strictly_increasing() {
        let indices: Vec<usize> = SeverityGrade::SCALE.iter().map(|g| g.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(SeverityGrade::Clear < SeverityGrade::Mild);
        assert!(SeverityGrade::Severe < SeverityGrade::VerySevere);
    }

    #[test]
    fn test_from_index_clamps() {
        assert_eq!(SeverityGrade::from_index(2), SeverityGrade::Moderate);
        assert_eq!(SeverityGrade::from_index(99), SeverityGrade::VerySevere);
    }

    #[test]
    fn test_parse_canonical_names() {
        assert_eq!("very severe".parse(), Ok(SeverityGrade::VerySevere));
        assert_eq!("Very_Severe".parse(), Ok(SeverityGrade::VerySevere));
        assert_eq!("MILD".parse(), Ok(SeverityGrade::Mild));
        assert!("level 1".parse::<SeverityGrade>().is_err());
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&SeverityGrade::VerySevere).unwrap();
        assert_eq!(json, "\"Very Severe\"");
        let grade: SeverityGrade = serde_json::from_str("\"Moderate\"").unwrap();
        assert_eq!(grade, SeverityGrade::Moderate);
    }
}
