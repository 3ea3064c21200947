//! Desk Configuration - classifier vocabulary, team names, rule list and
//! lookup timeouts as operator-tunable TOML values
//!
//! Each struct implements `Default` with the built-in values from `defaults`,
//! so a deployment without a config file behaves exactly like the reference desk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::automation::{AutomationRule, MergePolicy};
use crate::routing::AgentSelection;

/// Environment variable naming the config file to load.
pub const CONFIG_ENV_VAR: &str = "COREDESK_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "coredesk.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a support desk deployment.
///
/// Load with `DeskConfig::load()` which searches:
/// 1. `$COREDESK_CONFIG` env var
/// 2. `./coredesk.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Baseline team and audit authors
    #[serde(default)]
    pub desk: DeskInfo,

    /// Names of the specialised teams the rules route to
    #[serde(default)]
    pub teams: TeamNames,

    /// Classifier keyword sets
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Order-reference extraction
    #[serde(default)]
    pub orders: OrderConfig,

    /// External directory lookups
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub automation: AutomationConfig,
}

impl DeskConfig {
    /// Load configuration using the standard search order:
    /// 1. `$COREDESK_CONFIG` environment variable
    /// 2. `./coredesk.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), baseline_team = %config.desk.baseline_team, "Loaded desk config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(baseline_team = %config.desk.baseline_team, "Loaded desk config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Desk config saved");
        Ok(())
    }

    /// Validate the config for internal consistency.
    ///
    /// Rules:
    /// - Baseline team and audit authors must be non-empty
    /// - Every keyword list must contain at least one non-blank keyword
    /// - Every order pattern must compile
    /// - Lookup timeout must be > 0
    /// - Explicit rules must have unique, non-empty names
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = super::validation::validate_semantics(self);
        errors.extend(super::validation::validate_rules(&self.automation.rules));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskInfo {
    /// Team every new ticket is created in
    pub baseline_team: String,
    /// Author of automated audit entries
    pub automation_author: String,
    /// Author of audit entries written by explicit store operations
    pub system_author: String,
}

impl Default for DeskInfo {
    fn default() -> Self {
        Self {
            baseline_team: defaults::BASELINE_TEAM.to_string(),
            automation_author: defaults::AUTOMATION_AUTHOR.to_string(),
            system_author: defaults::SYSTEM_AUTHOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamNames {
    pub finance: String,
    pub after_sales: String,
    pub second_level: String,
}

impl Default for TeamNames {
    fn default() -> Self {
        Self {
            finance: defaults::FINANCE_TEAM.to_string(),
            after_sales: defaults::AFTER_SALES_TEAM.to_string(),
            second_level: defaults::SECOND_LEVEL_TEAM.to_string(),
        }
    }
}

/// Keyword sets matched case-insensitively as substrings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub finance: Vec<String>,
    pub after_sales: Vec<String>,
    pub technical: Vec<String>,
    pub critical: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            finance: owned(defaults::FINANCE_KEYWORDS),
            after_sales: owned(defaults::AFTER_SALES_KEYWORDS),
            technical: owned(defaults::TECHNICAL_KEYWORDS),
            critical: owned(defaults::CRITICAL_KEYWORDS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Regex patterns tried in order; first pattern with a match wins
    pub patterns: Vec<String>,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            patterns: owned(defaults::ORDER_PATTERNS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub lookup_timeout_ms: u64,
}

impl DirectoryConfig {
    pub const fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: defaults::DIRECTORY_LOOKUP_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub agent_selection: AgentSelection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// How single-valued fields (team, status) are resolved when several rules match
    pub merge_policy: MergePolicy,
    /// Replaces the built-in rule list when non-empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<AutomationRule>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}
