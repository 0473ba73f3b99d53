//! Tool configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examforge_core::statistics::StrengthThresholds;

/// Top-level examforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamforgeConfig {
    /// Catalog file or directory of catalog files.
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,
    /// Directory that stored results live under.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Countdown tick interval in milliseconds. 1000 outside of tests and demos.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Topic accuracy (percent) at or above which a topic is strong.
    #[serde(default = "default_strong_threshold")]
    pub strong_threshold: f64,
    /// Topic accuracy (percent) below which a topic is weak.
    #[serde(default = "default_weak_threshold")]
    pub weak_threshold: f64,
}

fn default_catalog() -> PathBuf {
    PathBuf::from("./catalog")
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("./examforge-results")
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_strong_threshold() -> f64 {
    70.0
}
fn default_weak_threshold() -> f64 {
    50.0
}

impl Default for ExamforgeConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            results_dir: default_results_dir(),
            tick_interval_ms: default_tick_interval(),
            strong_threshold: default_strong_threshold(),
            weak_threshold: default_weak_threshold(),
        }
    }
}

impl ExamforgeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn thresholds(&self) -> StrengthThresholds {
        StrengthThresholds {
            strong: self.strong_threshold,
            weak: self.weak_threshold,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables expand to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
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
/// Environment variable overrides: `EXAMFORGE_CATALOG`, `EXAMFORGE_RESULTS_DIR`.
pub fn load_config() -> Result<ExamforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamforgeConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("examforge.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamforgeConfig::default(),
    };

    if let Ok(catalog) = std::env::var("EXAMFORGE_CATALOG") {
        config.catalog = PathBuf::from(catalog);
    }
    if let Ok(dir) = std::env::var("EXAMFORGE_RESULTS_DIR") {
        config.results_dir = PathBuf::from(dir);
    }

    config.catalog = resolve_path(&config.catalog);
    config.results_dir = resolve_path(&config.results_dir);

    Ok(config)
}

/// Parse and sanity-check a config document.
pub fn parse_config(content: &str) -> Result<ExamforgeConfig> {
    let config: ExamforgeConfig = toml::from_str(content)?;
    if config.weak_threshold > config.strong_threshold {
        anyhow::bail!(
            "weak_threshold ({}) must not exceed strong_threshold ({})",
            config.weak_threshold,
            config.strong_threshold
        );
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examforge"))
}
