//! examforge configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examforge_core::EngineConfig;

/// Top-level examforge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamforgeConfig {
    /// Directory holding `state.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Question bank file or directory of `.toml` files.
    #[serde(default = "default_question_bank")]
    pub question_bank: PathBuf,
    /// Author recorded when a request does not name one.
    #[serde(default)]
    pub default_author: Option<String>,
    /// Upper bound on questions per exam.
    #[serde(default = "default_max_question_count")]
    pub max_question_count: u32,
    /// Rounding precision of topic proportions.
    #[serde(default = "default_proportion_decimals")]
    pub proportion_decimals: u32,
    /// Exams per page for `list`.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./.examforge")
}
fn default_question_bank() -> PathBuf {
    PathBuf::from("./questions")
}
fn default_max_question_count() -> u32 {
    200
}
fn default_proportion_decimals() -> u32 {
    4
}
fn default_page_size() -> u32 {
    20
}

impl Default for ExamforgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            question_bank: default_question_bank(),
            default_author: None,
            max_question_count: default_max_question_count(),
            proportion_decimals: default_proportion_decimals(),
            page_size: default_page_size(),
        }
    }
}

impl ExamforgeConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_question_count: self.max_question_count,
            proportion_decimals: self.proportion_decimals,
            ..EngineConfig::default()
        }
    }

    /// Location of the persisted exam snapshot.
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }

    /// Resolve relative paths against `base`.
    fn rebase(mut self, base: &Path) -> Self {
        if self.data_dir.is_relative() {
            self.data_dir = base.join(&self.data_dir);
        }
        if self.question_bank.is_relative() {
            self.question_bank = base.join(&self.question_bank);
        }
        self
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examforge.toml` in the current directory
/// 2. `~/.config/examforge/config.toml`
///
/// Environment variable overrides: `EXAMFORGE_DATA_DIR`, `EXAMFORGE_AUTHOR`.
pub fn load_config() -> Result<ExamforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let mut config = toml::from_str::<ExamforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            config.data_dir = resolve_path(&config.data_dir);
            config.question_bank = resolve_path(&config.question_bank);
            // Relative paths in a config file are relative to that file.
            match path.parent() {
                Some(base) => config.rebase(base),
                None => config,
            }
        }
        None => ExamforgeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(dir) = std::env::var("EXAMFORGE_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(author) = std::env::var("EXAMFORGE_AUTHOR") {
        config.default_author = Some(author);
    }

    config.default_author = config
        .default_author
        .as_deref()
        .map(resolve_env_vars)
        .filter(|a| !a.trim().is_empty());

    let max_per_page = config.engine_config().max_per_page;
    if config.page_size == 0 || config.page_size > max_per_page {
        anyhow::bail!(
            "page_size must be between 1 and {max_per_page}, got {}",
            config.page_size
        );
    }

    tracing::debug!(
        source = ?config_path,
        data_dir = %config.data_dir.display(),
        question_bank = %config.question_bank.display(),
        "loaded configuration"
    );
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examforge"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMFORGE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_EXAMFORGE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_EXAMFORGE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("open ${never closed"), "open ${never closed");
        std::env::remove_var("_EXAMFORGE_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ExamforgeConfig::default();
        assert_eq!(config.max_question_count, 200);
        assert_eq!(config.proportion_decimals, 4);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.state_path(), PathBuf::from("./.examforge/state.json"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ExamforgeConfig = toml::from_str(
            r#"
question_bank = "bank"
max_question_count = 50
"#,
        )
        .unwrap();
        assert_eq!(config.question_bank, PathBuf::from("bank"));
        assert_eq!(config.max_question_count, 50);
        assert_eq!(config.proportion_decimals, 4);

        let engine = config.engine_config();
        assert_eq!(engine.max_question_count, 50);
        assert_eq!(engine.max_per_page, EngineConfig::default().max_per_page);
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examforge.toml");
        std::fs::write(
            &path,
            "data_dir = \"${_EXAMFORGE_LOAD_TEST}/state\"\nquestion_bank = \"bank\"\nproportion_decimals = 2\n",
        )
        .unwrap();
        std::env::set_var("_EXAMFORGE_LOAD_TEST", "/srv/exams");

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.proportion_decimals, 2);
        assert_eq!(config.question_bank, dir.path().join("bank"));
        if std::env::var("EXAMFORGE_DATA_DIR").is_err() {
            assert_eq!(config.data_dir, PathBuf::from("/srv/exams/state"));
        }
        std::env::remove_var("_EXAMFORGE_LOAD_TEST");
    }

    #[test]
    fn page_size_must_fit_a_listing_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examforge.toml");

        std::fs::write(&path, "page_size = 101\n").unwrap();
        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("page_size must be between 1 and 100, got 101"));

        std::fs::write(&path, "page_size = 0\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());

        std::fs::write(&path, "page_size = 100\n").unwrap();
        assert_eq!(load_config_from(Some(&path)).unwrap().page_size, 100);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn rebase_only_touches_relative_paths() {
        let config = ExamforgeConfig {
            data_dir: PathBuf::from("/abs/data"),
            ..Default::default()
        }
        .rebase(Path::new("/work"));
        assert_eq!(config.data_dir, PathBuf::from("/abs/data"));
        assert_eq!(config.question_bank, PathBuf::from("/work/./questions"));
    }
}
