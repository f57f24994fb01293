//! Command-line overrides applied on top of file and environment config.

use crate::domain::{Config, FailurePolicy};

/// Values given on the command line. `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub budget_chars: Option<usize>,
    pub max_file_bytes: Option<u64>,
    pub respect_gitignore: Option<bool>,
    pub exclude_globs: Option<Vec<String>>,
    pub similarity_threshold: Option<f64>,
    pub verify_command: Option<String>,
    pub verify_timeout_secs: Option<u64>,
    pub max_attempts: Option<usize>,
    pub on_failure: Option<FailurePolicy>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
}

pub fn merge_cli_with_config(mut config: Config, cli: CliOverrides) -> Config {
    if let Some(v) = cli.budget_chars {
        config.budget_chars = v;
    }
    if let Some(v) = cli.max_file_bytes {
        config.max_file_bytes = v;
    }
    if let Some(v) = cli.respect_gitignore {
        config.respect_gitignore = v;
    }
    if let Some(globs) = cli.exclude_globs {
        for glob in globs {
            if !config.exclude_globs.contains(&glob) {
                config.exclude_globs.push(glob);
            }
        }
    }
    if let Some(v) = cli.similarity_threshold {
        config.similarity_threshold = v.clamp(0.0, 1.0);
    }
    if let Some(v) = cli.verify_command {
        config.verify_command = Some(v);
    }
    if let Some(v) = cli.verify_timeout_secs {
        config.verify_timeout_secs = v;
    }
    if let Some(v) = cli.max_attempts {
        config.max_attempts = v.max(1);
    }
    if let Some(v) = cli.on_failure {
        config.on_failure = v;
    }
    if let Some(v) = cli.model {
        config.generator.model = v;
    }
    if let Some(v) = cli.endpoint {
        config.generator.endpoint = v;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_values_win() {
        let base = Config { budget_chars: 10, exclude_globs: vec!["dist/**".into()], ..Config::default() };
        let merged = merge_cli_with_config(
            base,
            CliOverrides {
                budget_chars: Some(99),
                exclude_globs: Some(vec!["dist/**".into(), "*.snap".into()]),
                on_failure: Some(FailurePolicy::Revert),
                model: Some("other".into()),
                ..CliOverrides::default()
            },
        );
        assert_eq!(merged.budget_chars, 99);
        assert_eq!(merged.exclude_globs, vec!["dist/**", "*.snap"]);
        assert_eq!(merged.on_failure, FailurePolicy::Revert);
        assert_eq!(merged.generator.model, "other");
    }

    #[test]
    fn test_empty_overrides_change_nothing() {
        let base = Config { max_attempts: 4, ..Config::default() };
        assert_eq!(merge_cli_with_config(base.clone(), CliOverrides::default()), base);
    }

    #[test]
    fn test_values_are_clamped() {
        let merged = merge_cli_with_config(
            Config::default(),
            CliOverrides { similarity_threshold: Some(1.7), max_attempts: Some(0), ..CliOverrides::default() },
        );
        assert_eq!(merged.similarity_threshold, 1.0);
        assert_eq!(merged.max_attempts, 1);
    }
}
