//! Config file discovery, parsing and environment overrides

use crate::domain::Config;
use anyhow::{Context, Result};
use figment::providers::{Env, Serialized};
use figment::Figment;
use std::fs;
use std::path::{Path, PathBuf};

/// Section name a config may be nested under.
const NESTED_SECTION: &str = "mend";

const CANDIDATES: &[&str] = &["mend.toml", ".mend.toml", "mend.yml", ".mend.yml", "mend.yaml", ".mend.yaml"];

/// Load the effective file + environment configuration for `root`.
///
/// A config that cannot be parsed is discarded with a warning and defaults
/// are used; an explicit path that does not exist is an error.
pub fn load_config(root: &Path, config_path: Option<&Path>) -> Result<Config> {
    let discovered = match config_path {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => discover_config(root),
    };

    let file_config = match discovered {
        Some(config_file) => match parse_config_file(&config_file) {
            Ok(config) => {
                tracing::debug!("Loaded config from {}", config_file.display());
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring config {}: {:#}; using defaults", config_file.display(), e);
                Config::default()
            }
        },
        None => Config::default(),
    };

    Ok(apply_env_overrides(file_config))
}

/// Layer `MEND_*` environment variables over `config` (`__` separates nesting,
/// e.g. `MEND_GENERATOR__MODEL`).
pub fn apply_env_overrides(config: Config) -> Config {
    let figment = Figment::from(Serialized::defaults(config.clone())).merge(Env::prefixed("MEND_").split("__"));
    match figment.extract::<Config>() {
        Ok(merged) => merged,
        Err(e) => {
            tracing::warn!("Ignoring invalid MEND_* environment settings: {}", e);
            config
        }
    }
}

fn parse_config_file(config_file: &Path) -> Result<Config> {
    let content = fs::read_to_string(config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;
    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "toml" => parse_toml_config(&content, config_file),
        "yaml" | "yml" => parse_yaml_config(&content, config_file),
        other => anyhow::bail!("Unsupported config extension '.{}'", other),
    }
}

/// Parse TOML config, supporting a nested `[mend]` section.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, supporting a nested `mend:` mapping.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(root: &Path) -> Option<PathBuf> {
    CANDIDATES.iter().map(|candidate| root.join(candidate)).find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FailurePolicy;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_defaults_when_missing() {
        let tmp = TempDir::new().expect("tmp");
        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.budget_chars, Config::default().budget_chars);
        assert!(cfg.verify_command.is_none());
    }

    #[test]
    fn test_load_toml_config() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(
            tmp.path().join("mend.toml"),
            "max_file_bytes = 999\nrespect_gitignore = false\non_failure = 'revert'\n\n[generator]\nmodel = 'local'\n",
        )
        .expect("write");

        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.max_file_bytes, 999);
        assert!(!cfg.respect_gitignore);
        assert_eq!(cfg.on_failure, FailurePolicy::Revert);
        assert_eq!(cfg.generator.model, "local");
        assert_eq!(cfg.generator.max_retries, 3);
    }

    #[test]
    fn test_nested_section_toml() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join(".mend.toml"), "[mend]\nbudget_chars = 1234\n").expect("write");
        let cfg = load_config(tmp.path(), None).expect("config");
        assert_eq!(cfg.budget_chars, 1234);
    }

    #[test]
    fn test_yaml_config() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("custom.yml");
        fs::write(&path, "mend:\n  verify_command: make check\n  max_attempts: 5\n").expect("write");
        let cfg = load_config(tmp.path(), Some(&path)).expect("config");
        assert_eq!(cfg.verify_command.as_deref(), Some("make check"));
        assert_eq!(cfg.max_attempts, 5);
    }

    #[test]
    fn test_invalid_type_falls_back_to_defaults() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("mend.toml"), "budget_chars = 'lots'\n").expect("write");
        let cfg = load_config(tmp.path(), None).expect("should not error on bad config");
        assert_eq!(cfg.budget_chars, Config::default().budget_chars);

        let explicit = tmp.path().join("bad.toml");
        fs::write(&explicit, "exclude_globs = false\n").expect("write");
        let cfg = load_config(tmp.path(), Some(&explicit)).expect("explicit bad config soft-fails");
        assert!(cfg.exclude_globs.is_empty());
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let tmp = TempDir::new().expect("tmp");
        assert!(load_config(tmp.path(), Some(&tmp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("mend.toml", "verify_timeout_secs = 2\npreview_lines = 4\n")?;
            jail.set_env("MEND_VERIFY_TIMEOUT_SECS", "7");
            jail.set_env("MEND_GENERATOR__TIMEOUT_SECS", "9");
            let cfg = load_config(jail.directory(), None).expect("config");
            assert_eq!(cfg.verify_timeout_secs, 7);
            assert_eq!(cfg.preview_lines, 4);
            assert_eq!(cfg.generator.timeout_secs, 9);
            Ok(())
        });
    }
}
