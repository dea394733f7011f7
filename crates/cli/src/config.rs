//! Configuration management commands.
//!
//! Configuration is loaded from TOML files and merged with environment variables
//! prefixed with `AD_MEDIATION__`. For example, `AD_MEDIATION__DISPLAY__SHOW_TIMEOUT_MS`
//! will override `display.show_timeout_ms` in the TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use ad_mediation_common::networks::NetworkRegistry;
use ad_mediation_common::settings::Settings;
use validator::Validate;

use crate::error::CliError;

/// Load and merge configuration from TOML file with environment variables.
///
/// Environment variables prefixed with `AD_MEDIATION__` will override TOML values.
pub(crate) fn load_and_merge_config(
    file: &Path,
    verbose: bool,
) -> Result<(Settings, String), CliError> {
    let content = fs::read_to_string(file)?;

    if verbose {
        println!("Loading config from: {}", file.display());
        println!("Environment variables with AD_MEDIATION__ prefix will be merged");
    }

    let settings = Settings::from_toml(&content)
        .map_err(|e| CliError::Config(format!("Failed to parse and merge config: {:?}", e)))?;

    settings
        .validate()
        .map_err(|e| CliError::Config(format!("Settings validation failed: {e}")))?;

    let merged_toml = settings
        .to_canonical_toml()
        .map_err(|e| CliError::Config(format!("Failed to serialize merged config: {e:?}")))?;

    Ok((settings, merged_toml))
}

/// Validate configuration file.
pub fn validate(file: PathBuf, verbose: bool) -> Result<(), CliError> {
    let (settings, merged_toml) = load_and_merge_config(&file, verbose)?;
    let registry = NetworkRegistry::new(&settings);

    println!("Configuration is valid");
    println!("  File: {}", file.display());
    println!("  Consent storage key: {}", settings.consent.storage_key);
    match settings.display.show_timeout_ms {
        Some(ms) => println!("  Show timeout: {} ms", ms),
        None => println!("  Show timeout: none"),
    }
    println!("  Enabled networks: {}", registry.names().join(", "));

    if verbose {
        println!("\nMerged configuration:");
        println!("---");
        println!("{}", merged_toml.trim_end());
        println!("---");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_config(dir: &TempDir, body: &str) -> PathBuf {
        let config_path = dir.path().join("mediation.toml");
        let mut file = fs::File::create(&config_path).expect("create config");
        write!(file, "{}", body).expect("write config");
        config_path
    }

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().expect("temp dir");
        let path = create_test_config(
            &dir,
            r#"
[consent]
storage_key = "host_consent"

[display]
show_timeout_ms = 2000

[networks.mopub]
enabled = false
"#,
        );

        let (settings, merged) = load_and_merge_config(&path, false).expect("config loads");
        assert_eq!(settings.consent.storage_key, "host_consent");
        assert_eq!(settings.display.show_timeout_ms, Some(2000));
        assert!(!settings.network_enabled("mopub"));
        assert!(merged.contains("host_consent"));
    }

    #[test]
    fn test_env_override_is_merged() {
        let dir = TempDir::new().expect("temp dir");
        let path = create_test_config(&dir, "[display]\nshow_timeout_ms = 2000\n");

        temp_env::with_var("AD_MEDIATION__DISPLAY__SHOW_TIMEOUT_MS", Some("500"), || {
            let (settings, _) = load_and_merge_config(&path, false).expect("config loads");
            assert_eq!(settings.display.show_timeout_ms, Some(500));
        });
    }

    #[test]
    fn test_out_of_range_timeout_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = create_test_config(&dir, "[display]\nshow_timeout_ms = 0\n");

        let result = load_and_merge_config(&path, false);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_and_merge_config(Path::new("/nonexistent/mediation.toml"), false);
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
