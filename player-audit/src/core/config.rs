/*!
Configuration management for the player audit
*/

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::core::error::AuditError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Source database locations
    pub sources: SourceConfig,
    /// Retention policy settings
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Path to the auth/session database
    pub auth_db_path: PathBuf,
    /// Path to the in-world activity database
    pub players_db_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Minimum experience that counts as a keep signal
    pub min_xp: i64,
    /// Minimum action total that counts as a keep signal
    pub min_actions: i64,
    /// Logins within this many days count as recent
    pub inactivity_window_days: u32,
    /// Accounts kept no matter what
    pub keep_list: Vec<String>,
    /// Privilege grants retained on ingestion; everything else is discarded
    pub notable_privileges: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            auth_db_path: PathBuf::from("auth.sqlite"),
            players_db_path: PathBuf::from("players.sqlite"),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            min_xp: 1,
            min_actions: 1,
            inactivity_window_days: 90,
            keep_list: vec!["ADMIN".to_string()],
            notable_privileges: vec!["citizenship".to_string(), "staff".to_string()],
        }
    }
}

impl AuditConfig {
    /// Load a config from a TOML file. Missing keys fall back to the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AuditError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
