/*!
Error taxonomy for the audit run
*/

use std::path::PathBuf;
use thiserror::Error;

/// Every failure is fatal: the run aborts before any report is emitted, so a
/// partial or inconsistent report is never produced.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A source database could not be opened read-only.
    #[error("failed to open {kind} database at {path:?}: {source}")]
    OpenSource {
        kind: &'static str,
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A privilege row references an identity missing from the auth table.
    /// The two auth reads are not mutually consistent, which should surface
    /// immediately rather than be silently swallowed.
    #[error("privilege '{privilege}' references unknown auth id {auth_id}")]
    UnknownAuthId { auth_id: i64, privilege: String },

    /// A recognized metadata value failed to parse as an integer. Defaulting
    /// here would silently corrupt the derived action total.
    #[error("metadata '{key}' for player '{player}' is not an integer: '{value}'")]
    MalformedMetadata {
        player: String,
        key: String,
        value: String,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}
