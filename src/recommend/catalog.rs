use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::similarity::LexicalIndex;
use crate::assessment::types::SeverityGrade;
use crate::config::EngineConfig;
use crate::error::EngineError;

const BUILTIN_CATALOG: &str = include_str!("../../content/natural_remedies.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub label: String,
    pub url: String,
}

/// One catalog entry. Field names on the wire follow the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remedy {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(rename = "evidence")]
    pub evidence_level: String,
    #[serde(rename = "severity")]
    pub applicable_severities: BTreeSet<SeverityGrade>,
    pub concerns: BTreeSet<String>,
    pub triggers: BTreeSet<String>,
    pub instructions: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceLink>,
    #[serde(default)]
    pub community: Vec<String>,
}

impl Remedy {
    /// Text the lexical index is built from.
    pub fn descriptor(&self) -> String {
        let mut text = self.summary.clone();
        for term in self.concerns.iter().chain(self.triggers.iter()) {
            text.push(' ');
            text.push_str(term);
        }
        text
    }
}

/// Ordered, read-only remedy reference data with a lazily built similarity index.
#[derive(Debug)]
pub struct RemedyCatalog {
    remedies: Vec<Remedy>,
    index: OnceLock<LexicalIndex>,
}

impl RemedyCatalog {
    pub fn new(remedies: Vec<Remedy>) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        for remedy in &remedies {
            if !seen.insert(remedy.id.as_str()) {
                return Err(EngineError::CatalogLoadFailed(format!(
                    "duplicate remedy id '{}'",
                    remedy.id
                )));
            }
        }
        Ok(Self {
            remedies,
            index: OnceLock::new(),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let remedies: Vec<Remedy> = serde_json::from_str(json)
            .map_err(|e| EngineError::CatalogLoadFailed(e.to_string()))?;
        Self::new(remedies)
    }

    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let json = fs::read_to_string(path).map_err(|e| {
            EngineError::CatalogLoadFailed(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn builtin() -> Result<Self, EngineError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Configured catalog file, or the built-in catalog when none is set.
    pub fn load(config: &EngineConfig) -> Result<Self, EngineError> {
        let catalog = match &config.catalog_path {
            Some(path) => Self::from_path(path)?,
            None => Self::builtin()?,
        };
        info!("Loaded remedy catalog with {} entries", catalog.len());
        Ok(catalog)
    }

    pub fn remedies(&self) -> &[Remedy] {
        &self.remedies
    }

    pub fn len(&self) -> usize {
        self.remedies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remedies.is_empty()
    }

    /// Built once on first use, shared by every request afterwards.
    pub fn index(&self) -> &LexicalIndex {
        self.index.get_or_init(|| {
            let descriptors: Vec<String> = self.remedies.iter().map(Remedy::descriptor).collect();
            LexicalIndex::build(descriptors.iter().map(String::as_str))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = r#"[{
        "id": "green-tea",
        "title": "Green tea compress",
        "summary": "Cooled green tea calms redness.",
        "evidence": "moderate",
        "severity": ["Mild", "Very Severe"],
        "concerns": ["redness"],
        "triggers": ["stress"],
        "instructions": "Apply for 10 minutes."
    }]"#;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = RemedyCatalog::builtin().unwrap();
        assert!(catalog.len() >= 5);
        assert_eq!(catalog.index().len(), catalog.len());
        assert!(catalog.remedies().iter().all(|r| !r.community.is_empty()));
    }

    #[test]
    fn test_optional_fields_default() {
        let catalog = RemedyCatalog::from_json(ONE).unwrap();
        let remedy = &catalog.remedies()[0];
        assert!(remedy.applicable_severities.contains(&SeverityGrade::VerySevere));
        assert!(remedy.warnings.is_empty());
        assert_eq!(remedy.descriptor(), "Cooled green tea calms redness. redness stress");
    }

    #[test]
    fn test_unknown_severity_fails_load() {
        let json = ONE.replace("\"Mild\"", "\"Extreme\"");
        assert!(matches!(
            RemedyCatalog::from_json(&json),
            Err(EngineError::CatalogLoadFailed(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_fail_load() {
        let remedy: Vec<Remedy> = serde_json::from_str(ONE).unwrap();
        let doubled = vec![remedy[0].clone(), remedy[0].clone()];
        assert!(matches!(
            RemedyCatalog::new(doubled),
            Err(EngineError::CatalogLoadFailed(_))
        ));
    }

    #[test]
    fn test_missing_file_fails_load() {
        let result = RemedyCatalog::from_path(Path::new("/nonexistent/remedies.json"));
        assert!(matches!(result, Err(EngineError::CatalogLoadFailed(_))));
    }
}
