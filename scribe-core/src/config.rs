//! Project configuration.
//!
//! Lookup order for [`load_at`]:
//! 1. `<root>/.scribe/config.yaml`
//! 2. `<config_home>/scribe/config.yaml` (user-wide defaults)
//! 3. [`Config::default`]
//!
//! Every field is optional in YAML; missing fields take their defaults.
//!
//! # API pattern
//!
//! Functions that touch the user's config directory come in two forms:
//! - `fn_at(…, config_home: Option<&Path>)` — explicit directory; used in tests
//! - `fn(…)` — derives it from `dirs::config_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::layout::ProjectLayout;

/// Connection settings for the content generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// HTTP endpoint accepting generation requests. `None` leaves generation
    /// unconfigured; every regeneration then fails and is retried later.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Recorded in each artifact footer as `generator_id`.
    pub id: String,
    pub timeout_secs: u64,
    /// Name of the environment variable holding a bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            id: "http:default".to_string(),
            timeout_secs: 120,
            api_key_env: None,
        }
    }
}

/// Settings read from `.scribe/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory (relative to the project root) that receives artifacts.
    pub scope: PathBuf,
    /// Artifact mirror root, relative to the project root.
    pub artifact_dir: PathBuf,
    /// Files larger than this are skipped as oversized.
    pub max_file_bytes: u64,
    pub sweep_interval_secs: u64,
    pub debounce_ms: u64,
    /// Quiet period after the last HEAD movement before watcher updates fire.
    pub git_suppression_ms: u64,
    /// Enables the deprecated real-time watcher (`scribe watchdog`).
    pub watchdog_enabled: bool,
    pub skip_if_unchanged: bool,
    /// Extra gitignore-style patterns.
    pub ignore: Vec<String>,
    /// Topic names offered to the generator for cross-linking.
    pub topics: Vec<String>,
    pub generator: GeneratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scope: PathBuf::from("."),
            artifact_dir: PathBuf::from(".scribe/mirror"),
            max_file_bytes: 512 * 1024,
            sweep_interval_secs: 3600,
            debounce_ms: 500,
            git_suppression_ms: 2000,
            watchdog_enabled: false,
            skip_if_unchanged: true,
            ignore: Vec::new(),
            topics: Vec::new(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Config {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn git_suppression_window(&self) -> Duration {
        Duration::from_millis(self.git_suppression_ms)
    }

    /// Reject values that would make the daemon spin or write nowhere.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_file_bytes must be greater than zero".to_string(),
            ));
        }
        if self.artifact_dir.as_os_str().is_empty() || self.artifact_dir == Path::new(".") {
            return Err(ConfigError::Invalid(
                "artifact_dir must name a directory below the project root".to_string(),
            ));
        }
        if self.artifact_dir.is_absolute() || self.scope.is_absolute() {
            return Err(ConfigError::Invalid(
                "scope and artifact_dir must be relative to the project root".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<config_home>/scribe/config.yaml`
pub fn user_config_path_at(config_home: &Path) -> PathBuf {
    config_home.join("scribe").join("config.yaml")
}

/// Load the effective config for `layout`, validated.
pub fn load_at(layout: &ProjectLayout, config_home: Option<&Path>) -> Result<Config, ConfigError> {
    let project = layout.config_path();
    let config = if project.exists() {
        read_config(&project)?
    } else if let Some(user) = config_home.map(user_config_path_at).filter(|p| p.exists()) {
        read_config(&user)?
    } else {
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load(layout: &ProjectLayout) -> Result<Config, ConfigError> {
    load_at(layout, dirs::config_dir().as_deref())
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `<root>/.scribe/config.yaml`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `rename`.
pub fn save_at(layout: &ProjectLayout, config: &Config) -> Result<(), ConfigError> {
    let dir = layout.scribe_dir();
    std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    let path = layout.config_path();
    let tmp = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Create `.scribe/` with its state and log directories and a default config.
///
/// Idempotent: an existing config is loaded and returned unchanged.
pub fn init_at(layout: &ProjectLayout) -> Result<Config, ConfigError> {
    for dir in [layout.scribe_dir(), layout.state_dir(), layout.logs_dir()] {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    }
    if layout.config_path().exists() {
        return load_at(layout, None);
    }
    let config = Config::default();
    save_at(layout, &config)?;
    Ok(config)
}
