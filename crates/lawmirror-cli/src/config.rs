//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for lawmirror
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub source: SourceConfig,
    pub workers: WorkersConfig,
    pub http: HttpConfig,
    pub run: RunConfig,
    pub index: IndexConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub toc_url: String,
    pub archive_suffix: String,
    pub markup_extension: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let gii = lawmirror_gii::Config::default();
        Self {
            toc_url: gii.toc_url,
            archive_suffix: gii.archive_suffix,
            markup_extension: gii.markup_extension,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            default: cpus.min(8),
            max: 16,
        }
    }
}

impl WorkersConfig {
    /// Requested worker count, clamped to `1..=max`.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).clamp(1, self.max.max(1))
    }
}

/// HTTP settings; timeouts in seconds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout: u64,
    pub read_timeout: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let core = lawmirror_core::HttpConfig::default();
        Self {
            connect_timeout: core.connect_timeout.as_secs(),
            read_timeout: core.read_timeout.as_secs(),
            max_retries: core.max_retries,
            base_delay_ms: core.base_delay.as_millis() as u64,
        }
    }
}

impl HttpConfig {
    /// Fetcher settings, with CLI overrides applied.
    pub fn resolve(
        &self,
        read_timeout: Option<u64>,
        max_retries: Option<u32>,
    ) -> lawmirror_core::HttpConfig {
        lawmirror_core::HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(read_timeout.unwrap_or(self.read_timeout)),
            max_retries: max_retries.unwrap_or(self.max_retries),
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Fail the run when the catalog loaded but no entry completed
    pub fail_on_empty: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Published location of the data directory; each index row links to
    /// `{base_url}/{code}.json`
    pub base_url: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://politpatrick.github.io/law-data-germany/data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub push: bool,
    pub remote: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub author_name: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub author_email: Option<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            push: false,
            remote: "origin".to_string(),
            author_name: Some("law-bot".to_string()),
            author_email: Some("bot@example.com".to_string()),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./lawmirror.toml (current directory)
    /// 2. ~/.config/lawmirror/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("lawmirror.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "lawmirror") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.dir, PathBuf::from("data"));
        assert!(config.source.toc_url.ends_with("gii-toc.xml"));
        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.http.base_delay_ms, 1000);
        assert!(config.workers.default >= 1);
        assert!(!config.run.fail_on_empty);
        assert!(!config.publish.enabled);
        assert_eq!(config.publish.remote, "origin");
        assert!(config.index.base_url.starts_with("https://"));
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${LAWMIRROR_NONEXISTENT_VAR}"), None);
    }

    #[test]
    fn expand_env_var_present() {
        // PATH is set in any test environment
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_var("${PATH}"), Some(path));
    }

    #[test]
    fn workers_are_clamped() {
        let workers = WorkersConfig { default: 4, max: 8 };
        assert_eq!(workers.resolve(None), 4);
        assert_eq!(workers.resolve(Some(32)), 8);
        assert_eq!(workers.resolve(Some(0)), 1);
    }

    #[test]
    fn http_overrides_win() {
        let http = HttpConfig::default().resolve(Some(10), Some(0));
        assert_eq!(http.read_timeout, Duration::from_secs(10));
        assert_eq!(http.max_retries, 0);
        assert_eq!(http.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[output]
dir = "/srv/law-data/data"

[source]
toc_url = "http://localhost:8080/gii-toc.xml"

[workers]
default = 2
max = 4

[http]
read_timeout = 120
max_retries = 3

[run]
fail_on_empty = true

[index]
base_url = "https://example.org/law-data/data"

[publish]
enabled = true
push = true
author_name = "mirror"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("/srv/law-data/data"));
        assert_eq!(config.source.toc_url, "http://localhost:8080/gii-toc.xml");
        assert_eq!(config.source.archive_suffix, "/xml.zip");
        assert_eq!(config.workers.default, 2);
        assert_eq!(config.http.read_timeout, 120);
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.http.connect_timeout, 30);
        assert!(config.run.fail_on_empty);
        assert_eq!(config.index.base_url, "https://example.org/law-data/data");
        assert!(config.publish.enabled && config.publish.push);
        assert_eq!(config.publish.author_name.as_deref(), Some("mirror"));
        assert_eq!(config.publish.author_email.as_deref(), Some("bot@example.com"));
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lawmirror.toml");
        std::fs::write(&path, "[workers\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("lawmirror.toml"));
    }
}
