use std::path::PathBuf;

use config::{Config, Environment};
use serde::Deserialize;

use crate::error::EngineError;

pub const ENV_PREFIX: &str = "SKINPRO";

pub const DEFAULT_CLASSIFIER_SOURCES: [&str; 3] = [
    "onnx::severity_cls",
    "hf::imfarzanansari/skintelligent-acne",
    "hf::afscomercial/dermatologic",
];

/// Engine settings. Every field has a default so a bare environment yields a working engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum detector confidence passed to the backend.
    pub detector_conf: f32,
    /// Square input resolution requested from the detector backend.
    pub detector_size: u32,
    /// Hard cap on raw detections requested from the backend.
    pub detector_max_det: usize,
    /// Number of detections kept after sorting.
    pub detection_limit: usize,
    pub max_regions: usize,
    /// Ordered list of classifier source ids. All are queried, order carries no priority.
    pub classifier_sources: Vec<String>,
    pub hf_model: Option<String>,
    pub rank_top_k: usize,
    pub highlight_top_k: usize,
    pub catalog_path: Option<PathBuf>,
    /// Directory holding model weights such as `severity_cls.onnx`.
    pub models_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detector_conf: 0.45,
            detector_size: 1024,
            detector_max_det: 150,
            detection_limit: 10,
            max_regions: 5,
            classifier_sources: DEFAULT_CLASSIFIER_SOURCES
                .iter()
                .map(|id| id.to_string())
                .collect(),
            hf_model: None,
            rank_top_k: 5,
            highlight_top_k: 3,
            catalog_path: None,
            models_dir: PathBuf::from("models"),
        }
    }
}

impl EngineConfig {
    /// Load from `SKINPRO_*` process environment variables.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_source(Self::environment())
    }

    /// Load from an explicit environment source (tests inject a map here).
    pub fn from_source(environment: Environment) -> Result<Self, EngineError> {
        let settings = Config::builder().add_source(environment).build()?;
        let config: EngineConfig = settings.try_deserialize()?;
        let config = config.with_hf_model();
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(config)
    }

    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("classifier_sources")
    }

    /// Source ids in query order, with the optional extra HF model folded in.
    pub fn sources(&self) -> &[String] {
        &self.classifier_sources
    }

    fn with_hf_model(mut self) -> Self {
        if let Some(model) = self.hf_model.as_deref().map(str::trim) {
            if !model.is_empty() {
                let id = format!("hf::{model}");
                if !self.classifier_sources.contains(&id) {
                    self.classifier_sources.insert(0, id);
                }
            }
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.detector_conf) {
            return Err("Detector confidence must be between 0.0 and 1.0".to_string());
        }

        if self.detector_size == 0 {
            return Err("Detector input size must be greater than 0".to_string());
        }

        if self.detector_max_det == 0 || self.detection_limit == 0 {
            return Err("Detection caps must be greater than 0".to_string());
        }

        if self.rank_top_k == 0 || self.highlight_top_k == 0 {
            return Err("Top-k values must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::environment().source(Some(map))
    }

    #[test]
    fn test_defaults_from_empty_environment() {
        let config = EngineConfig::from_source(env(&[])).unwrap();
        assert_eq!(config.detector_conf, 0.45);
        assert_eq!(config.detector_size, 1024);
        assert_eq!(config.rank_top_k, 5);
        assert_eq!(config.highlight_top_k, 3);
        assert_eq!(config.sources().len(), 3);
        assert_eq!(config.models_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_overrides_and_source_list() {
        let config = EngineConfig::from_source(env(&[
            ("SKINPRO_DETECTOR_CONF", "0.6"),
            ("SKINPRO_DETECTOR_SIZE", "640"),
            ("SKINPRO_CLASSIFIER_SOURCES", "onnx::a,hf::b"),
            ("SKINPRO_RANK_TOP_K", "3"),
            ("SKINPRO_MODELS_DIR", "/opt/skinpro/models"),
        ]))
        .unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/opt/skinpro/models"));
        assert!((config.detector_conf - 0.6).abs() < 1e-6);
        assert_eq!(config.detector_size, 640);
        assert_eq!(config.sources(), ["onnx::a".to_string(), "hf::b".to_string()]);
        assert_eq!(config.rank_top_k, 3);
    }

    #[test]
    fn test_hf_model_is_prepended_once() {
        let config = EngineConfig::from_source(env(&[
            ("SKINPRO_CLASSIFIER_SOURCES", "onnx::a"),
            ("SKINPRO_HF_MODEL", "org/model"),
        ]))
        .unwrap();
        assert_eq!(
            config.sources(),
            ["hf::org/model".to_string(), "onnx::a".to_string()]
        );
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let result = EngineConfig::from_source(env(&[("SKINPRO_DETECTOR_CONF", "1.5")]));
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }
}
