//! Service configuration.
//!
//! Loaded from a YAML file where every section is optional, then overridden
//! by `CANOPY_*` environment variables.

use crate::CalculationError;
use canopy_engine::{CarbonCoefficients, EstimationParams};
use canopy_signal::LiveSignalConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable selecting the signal mode.
pub const ENV_SIGNAL_MODE: &str = "CANOPY_SIGNAL_MODE";
/// Environment variable naming the service-account key file.
pub const ENV_CREDENTIALS_PATH: &str = "CANOPY_CREDENTIALS_PATH";
/// Environment variable naming the compute project.
pub const ENV_PROJECT: &str = "CANOPY_PROJECT";
/// Environment variable naming the JSON-lines audit store.
pub const ENV_STORE_PATH: &str = "CANOPY_STORE_PATH";

/// Which vegetation signal source to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    /// Deterministic offline signal.
    #[default]
    Simulated,
    /// Remote compute API.
    Live,
}

impl FromStr for SignalMode {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(SignalMode::Simulated),
            "live" => Ok(SignalMode::Live),
            other => Err(CalculationError::Configuration(format!(
                "unknown signal mode '{other}' (expected 'simulated' or 'live')"
            ))),
        }
    }
}

/// Signal source settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub mode: SignalMode,
    pub live: LiveSignalConfig,
}

/// Persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Append audit records to this JSON-lines file.
    pub jsonl_path: Option<PathBuf>,
}

/// Top-level service configuration.
///
/// ```yaml
/// signal:
///   mode: live
///   live:
///     credentials_path: /etc/canopy/service-account.json
///     max_poll_attempts: 15
/// estimation:
///   cloud_high_max_percent: 15.0
/// coefficients:
///   Peat_bog: { above_ground_per_ha: 15.0, soil_per_ha: 600.0, root_to_shoot: 0.5 }
/// store:
///   jsonl_path: /var/lib/canopy/estimates.jsonl
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub signal: SignalConfig,
    /// Engine thresholds and multipliers.
    pub estimation: EstimationParams,
    /// Per-category coefficients merged over `estimation.coefficients`.
    pub coefficients: BTreeMap<String, CarbonCoefficients>,
    pub store: StoreConfig,
}

impl ServiceConfig {
    /// Parse and validate YAML text. Empty text yields the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, CalculationError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| CalculationError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the effective engine parameters.
    pub fn validate(&self) -> Result<(), CalculationError> {
        Ok(self.estimation_params().validate()?)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self, CalculationError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CalculationError::Configuration(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Apply `CANOPY_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), CalculationError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `CANOPY_*` overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), CalculationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(mode) = get(ENV_SIGNAL_MODE) {
            self.signal.mode = mode.parse()?;
        }
        if let Some(path) = get(ENV_CREDENTIALS_PATH) {
            self.signal.live.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(project) = get(ENV_PROJECT) {
            self.signal.live.project = Some(project);
        }
        if let Some(path) = get(ENV_STORE_PATH) {
            self.store.jsonl_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Engine parameters with coefficient overrides merged in.
    pub fn estimation_params(&self) -> EstimationParams {
        let mut params = self.estimation.clone();
        params.coefficients.merge(&self.coefficients);
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(ServiceConfig::from_yaml_str("").unwrap(), ServiceConfig::default());
        assert_eq!(ServiceConfig::from_yaml_str("  \n").unwrap().signal.mode, SignalMode::Simulated);
    }

    #[test]
    fn test_parse_sections() {
        let yaml = r#"
signal:
  mode: live
  live:
    project: my-project
    max_poll_attempts: 15
    poll_interval_ms: 500
estimation:
  cloud_high_max_percent: 15.0
coefficients:
  peat bog: { above_ground_per_ha: 15.0, soil_per_ha: 600.0, root_to_shoot: 0.5 }
  Forest: { above_ground_per_ha: 150.0, soil_per_ha: 95.0, root_to_shoot: 0.25 }
store:
  jsonl_path: /tmp/estimates.jsonl
"#;
        let config = ServiceConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.signal.mode, SignalMode::Live);
        assert_eq!(config.signal.live.project.as_deref(), Some("my-project"));
        assert_eq!(config.signal.live.max_poll_attempts, 15);
        assert_eq!(config.signal.live.default_window_days, 90);
        assert_eq!(config.estimation.cloud_high_max_percent, 15.0);
        assert_eq!(config.estimation.cloud_medium_max_percent, 30.0);
        assert_eq!(config.store.jsonl_path, Some(PathBuf::from("/tmp/estimates.jsonl")));

        let params = config.estimation_params();
        assert_eq!(params.coefficients.lookup("Peat_bog"), (CarbonCoefficients::new(15.0, 600.0, 0.5), true));
        assert_eq!(params.coefficients.lookup("forest").0.above_ground_per_ha, 150.0);
        assert_eq!(params.coefficients.lookup("Grassland").0.above_ground_per_ha, 8.0);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ServiceConfig::from_yaml_str("signal: [unclosed").unwrap_err();
        assert_eq!(err.code(), "configuration_error");
        let err = ServiceConfig::from_yaml_str("signal:\n  mode: satellite\n").unwrap_err();
        assert_eq!(err.code(), "configuration_error");
    }

    #[test]
    fn test_invalid_estimation_overrides_rejected() {
        let cases = [
            "estimation:\n  index_multiplier_min: 3.0\n",
            "estimation:\n  reference_index: 0.0\n",
            "estimation:\n  cloud_high_max_percent: 50.0\n",
            "estimation:\n  std_dev_medium_max: 0.1\n",
            "estimation:\n  uncertainty_low: 1.5\n",
            "estimation:\n  quality_multiplier_low: 0.0\n",
            "coefficients:\n  Forest: { above_ground_per_ha: -1.0, soil_per_ha: 90.0, root_to_shoot: 0.24 }\n",
        ];
        for yaml in cases {
            let err = ServiceConfig::from_yaml_str(yaml).unwrap_err();
            assert_eq!(err.code(), "configuration_error", "{yaml}");
        }
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SIGNAL_MODE, "LIVE"),
            (ENV_CREDENTIALS_PATH, "/keys/sa.json"),
            (ENV_PROJECT, "env-project"),
            (ENV_STORE_PATH, ""),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::from_yaml_str("store:\n  jsonl_path: /from/file.jsonl\n").unwrap();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.signal.mode, SignalMode::Live);
        assert_eq!(config.signal.live.credentials_path, Some(PathBuf::from("/keys/sa.json")));
        assert_eq!(config.signal.live.project.as_deref(), Some("env-project"));
        assert_eq!(config.store.jsonl_path, Some(PathBuf::from("/from/file.jsonl")));
    }

    #[test]
    fn test_bad_env_mode() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_SIGNAL_MODE).then(|| "orbital".to_string()))
            .unwrap_err();
        assert!(matches!(err, CalculationError::Configuration(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ServiceConfig::load(Path::new("/nonexistent/canopy.yaml")).unwrap_err();
        assert_eq!(err.status(), 500);
    }
}
