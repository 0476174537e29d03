use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scoring::company::FeatureParams;
use crate::scoring::grouping::{DEFAULT_GROUPS, GroupingParams};

/// Pipeline parameters.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "reference_year": 2023,
///   "n_clusters": 20,
///   "max_iter": 200,
///   "n_init": 10,
///   "tolerance": 0.0001,
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Year company ages are measured against. `None` means the current year.
    pub reference_year: Option<i32>,
    pub n_clusters: usize,
    pub max_iter: usize,
    pub n_init: usize,
    pub tolerance: f64,
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let grouping = GroupingParams::default();
        Self {
            reference_year: None,
            n_clusters: DEFAULT_GROUPS,
            max_iter: grouping.max_iter,
            n_init: grouping.n_init,
            tolerance: grouping.tolerance,
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_clusters == 0 {
            return Err(ConfigError::Invalid("n_clusters must be at least 1".into()));
        }
        if self.max_iter == 0 {
            return Err(ConfigError::Invalid("max_iter must be at least 1".into()));
        }
        if self.n_init == 0 {
            return Err(ConfigError::Invalid("n_init must be at least 1".into()));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(ConfigError::Invalid(
                "tolerance must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    /// The configured reference year, or the current UTC year.
    pub fn reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Utc::now().year())
    }

    pub fn feature_params(&self) -> FeatureParams {
        FeatureParams {
            reference_year: self.reference_year(),
            grouping: GroupingParams {
                n_groups: self.n_clusters,
                max_iter: self.max_iter,
                n_init: self.n_init,
                tolerance: self.tolerance,
                seed: self.seed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.n_clusters, 20);
        assert_eq!(config.max_iter, 200);
        assert_eq!(config.n_init, 10);
        assert_eq!(config.reference_year(), Utc::now().year());
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let path = temp_path("investor_rater_test_config.json");
        fs::write(&path, r#"{ "reference_year": 2023, "seed": 7 }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.reference_year(), 2023);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.n_clusters, 20);

        let params = config.feature_params();
        assert_eq!(params.reference_year, 2023);
        assert_eq!(params.grouping.seed, Some(7));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_zero_clusters() {
        let path = temp_path("investor_rater_test_config_invalid.json");
        fs::write(&path, r#"{ "n_clusters": 0 }"#).unwrap();

        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load("/nonexistent/investor_rater.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
