use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding a JSON-encoded [`Config`].
pub const CONFIG_ENV_VAR: &str = "PAGEMETRICS_CONFIG";

/// Tunables for the analysis handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Name of the renderer main thread, as reported by thread-name metadata.
    pub main_thread_name: String,
    /// Name of the scheduler's top-level task events.
    pub run_task_name: String,
    /// Whether the meta handler drops navigations with an empty document URL.
    pub discard_empty_url_navigations: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            main_thread_name: "CrRendererMain".to_string(),
            run_task_name: "RunTask".to_string(),
            discard_empty_url_navigations: true,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads the config from [`CONFIG_ENV_VAR`], falling back to defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(json) => Self::from_json(&json),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(source) => Err(ConfigError::Env {
                var: CONFIG_ENV_VAR,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = Config::from_json(r#"{"mainThreadName": "Main"}"#).unwrap();
        assert_eq!(cfg.main_thread_name, "Main");
        assert_eq!(cfg.run_task_name, "RunTask");
        assert!(cfg.discard_empty_url_navigations);
    }

    #[test]
    fn test_invalid_json() {
        let err = Config::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
