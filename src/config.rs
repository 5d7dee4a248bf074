//! Runtime configuration loaded from environment variables.
//!
//! CLI flags override individual fields after [`Config::from_env`].

use std::path::PathBuf;
use std::time::Duration;

use crate::api::middleware::SecurityConfig;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// Root of `review/` and `licensing_ready/`.
    pub docs_dir: PathBuf,
    pub generator: GeneratorConfig,
    /// Month budget in dollars. `None` disables budget reporting.
    pub monthly_budget: Option<f64>,
    pub security: SecurityConfig,
}

/// Settings for the language model collaborator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Without a key the simulated generator is used.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl GeneratorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_nonempty("OPENAI_API_KEY"),
            model: env_nonempty("OPENAI_MODEL").unwrap_or(defaults.model),
            base_url: env_nonempty("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            timeout: env_parse::<u64>("DOCUMENTER_GENERATION_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: env_parse("DOCUMENTER_MAX_RETRIES").unwrap_or(defaults.max_retries),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = default_data_dir()?;
        Ok(Self {
            db_path: env_nonempty("DOCUMENTER_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("documenter.db")),
            docs_dir: env_nonempty("DOCUMENTER_DOCS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("docs")),
            generator: GeneratorConfig::from_env(),
            monthly_budget: env_parse("DOCUMENTER_MONTHLY_BUDGET"),
            security: SecurityConfig::from_env(),
        })
    }

    /// Config rooted at `dir` with the simulated generator and no security.
    /// Used by tests and local experiments.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            db_path: dir.join("documenter.db"),
            docs_dir: dir.join("docs"),
            generator: GeneratorConfig::default(),
            monthly_budget: None,
            security: SecurityConfig::disabled(),
        }
    }
}

/// Platform data directory, e.g. `~/.local/share/documenter` on Linux.
pub fn default_data_dir() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "documenter")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_nonempty(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}: cannot parse {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_config_uses_simulated_generator() {
        let config = Config::local("/tmp/documenter-test");
        assert!(config.generator.api_key.is_none());
        assert_eq!(config.generator.model, DEFAULT_MODEL);
        assert_eq!(config.docs_dir, PathBuf::from("/tmp/documenter-test/docs"));
        assert!(config.security.api_key.is_none());
    }

    #[test]
    fn generator_defaults_match_constants() {
        let config = GeneratorConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.base_url, DEFAULT_OPENAI_URL);
    }
}
