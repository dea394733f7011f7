use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{
    DEFAULT_CONSENT_STORAGE_KEY, ENV_PREFIX, PARAM_GDPR_APPLIES, PARAM_GDPR_CONSENT,
};
use crate::error::MediationError;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ConsentSettings {
    /// Key of the stored consent value in the host's consent storage.
    #[serde(default = "default_storage_key")]
    #[validate(length(min = 1))]
    pub storage_key: String,
    #[serde(default = "default_gdpr_applies_param")]
    #[validate(length(min = 1))]
    pub gdpr_applies_param: String,
    #[serde(default = "default_consent_string_param")]
    #[validate(length(min = 1))]
    pub consent_string_param: String,
}

fn default_storage_key() -> String {
    DEFAULT_CONSENT_STORAGE_KEY.to_string()
}

fn default_gdpr_applies_param() -> String {
    PARAM_GDPR_APPLIES.to_string()
}

fn default_consent_string_param() -> String {
    PARAM_GDPR_CONSENT.to_string()
}

impl Default for ConsentSettings {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            gdpr_applies_param: default_gdpr_applies_param(),
            consent_string_param: default_consent_string_param(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct DisplaySettings {
    /// Upper bound on the blocking UI hand-off of `show()`. Unset waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 60_000))]
    pub show_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub consent: ConsentSettings,
    #[serde(default)]
    #[validate(nested)]
    pub display: DisplaySettings,
    /// Per-network switches keyed by network name. Networks without an entry are enabled.
    #[serde(default)]
    pub networks: HashMap<String, NetworkSettings>,
}

impl Settings {
    /// Loads settings from a TOML string, applying `AD_MEDIATION__*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::Settings`] when the TOML cannot be parsed or
    /// deserialized, or when a value fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<MediationError>> {
        let environment = Environment::default().prefix(ENV_PREFIX).separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(MediationError::Settings {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(MediationError::Settings {
                    message: "Failed to deserialize configuration".to_string(),
                })?;

        settings.validate().change_context(MediationError::Settings {
            message: "Settings validation failed".to_string(),
        })?;

        Ok(settings)
    }

    /// Serializes the effective settings (after env overrides) back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`MediationError::Settings`] if serialization fails.
    pub fn to_canonical_toml(&self) -> Result<String, Report<MediationError>> {
        toml::to_string(self).change_context(MediationError::Settings {
            message: "Failed to serialize settings".to_string(),
        })
    }

    #[must_use]
    pub fn network_enabled(&self, name: &str) -> bool {
        self.networks.get(name).map_or(true, |network| network.enabled)
    }

    #[must_use]
    pub fn show_timeout(&self) -> Option<Duration> {
        self.display.show_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERRIDES: [&str; 2] = [
        "AD_MEDIATION__DISPLAY__SHOW_TIMEOUT_MS",
        "AD_MEDIATION__NETWORKS__TAPJOY__ENABLED",
    ];

    #[test]
    fn test_empty_toml_uses_defaults() {
        temp_env::with_vars_unset(OVERRIDES, || {
            let settings = Settings::from_toml("").expect("empty config should load");
            assert_eq!(settings.consent.storage_key, DEFAULT_CONSENT_STORAGE_KEY);
            assert_eq!(settings.consent.gdpr_applies_param, PARAM_GDPR_APPLIES);
            assert!(settings.show_timeout().is_none());
            assert!(settings.network_enabled("vungle"));
        });
    }

    #[test]
    fn test_settings_from_valid_toml() {
        let toml_str = r#"
            [consent]
            storage_key = "host_consent"

            [display]
            show_timeout_ms = 2500

            [networks.vungle]
            enabled = false
        "#;

        temp_env::with_vars_unset(OVERRIDES, || {
            let settings = Settings::from_toml(toml_str).expect("valid config should load");
            assert_eq!(settings.consent.storage_key, "host_consent");
            assert_eq!(settings.show_timeout(), Some(Duration::from_millis(2500)));
            assert!(!settings.network_enabled("vungle"));
            assert!(settings.network_enabled("tapjoy"));
        });
    }

    #[test]
    fn test_settings_rejects_empty_storage_key() {
        let toml_str = r#"
            [consent]
            storage_key = ""
        "#;

        let error = Settings::from_toml(toml_str).expect_err("empty storage key should fail");
        assert!(matches!(
            error.current_context(),
            MediationError::Settings { .. }
        ));
    }

    #[test]
    fn test_settings_rejects_out_of_range_timeout() {
        let toml_str = r#"
            [display]
            show_timeout_ms = 0
        "#;

        assert!(
            Settings::from_toml(toml_str).is_err(),
            "zero timeout should fail validation"
        );
    }

    #[test]
    fn test_settings_invalid_toml() {
        let result = Settings::from_toml("[consent\nstorage_key = ");
        assert!(result.is_err(), "malformed TOML should fail");
    }

    #[test]
    fn test_env_override_show_timeout() {
        temp_env::with_var(
            "AD_MEDIATION__DISPLAY__SHOW_TIMEOUT_MS",
            Some("750"),
            || {
                let settings = Settings::from_toml("").expect("config with env override");
                assert_eq!(settings.show_timeout(), Some(Duration::from_millis(750)));
            },
        );
    }

    #[test]
    fn test_env_override_disables_network() {
        temp_env::with_var(
            "AD_MEDIATION__NETWORKS__TAPJOY__ENABLED",
            Some("false"),
            || {
                let settings = Settings::from_toml("").expect("config with env override");
                assert!(!settings.network_enabled("tapjoy"));
            },
        );
    }

    #[test]
    fn test_canonical_toml_round_trips() {
        temp_env::with_vars_unset(OVERRIDES, || {
            let settings = Settings::from_toml(
                r#"
                [display]
                show_timeout_ms = 100
            "#,
            )
            .expect("valid config");
            let canonical = settings.to_canonical_toml().expect("serializable");
            let reloaded = Settings::from_toml(&canonical).expect("canonical TOML reloads");
            assert_eq!(reloaded.display.show_timeout_ms, Some(100));
        });
    }
}
