/*!
Merged per-account entity store built from auth and activity facts
*/

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::core::error::AuditError;

/// Everything known about one account after merging both sources.
///
/// A record holding facts from only one source is an expected partial merge,
/// not an error. Timestamps that the sources never reported stay `None`
/// rather than using a magic sentinel value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerRecord {
    /// Identity from the auth source, absent if the account never authenticated.
    pub auth_id: Option<i64>,
    /// Unix timestamp of the most recent login, absent if unknown.
    pub last_login: Option<i64>,
    /// Unix timestamp of first world entry, absent if the activity source has no row.
    pub created_at: Option<i64>,
    /// Notable privileges held by the account. Grants outside the allow-list
    /// are discarded on ingestion.
    pub privileges: BTreeSet<String>,
    pub xp: i64,
    pub digged_nodes: i64,
    pub crafted: i64,
    pub placed_nodes: i64,
    pub inflicted_damage: i64,
    /// Stored for completeness; the retention policy never consults it.
    pub played_time: i64,
    /// Derived sum of the four raw activity counters. Never set directly.
    pub actions: i64,
}

impl PlayerRecord {
    fn recompute_actions(&mut self) {
        self.actions =
            self.digged_nodes + self.crafted + self.placed_nodes + self.inflicted_damage;
    }
}

/// Name-keyed store of merged records.
///
/// Both source readers apply their facts through `get_or_create`, so the
/// first mention from either side creates the record and later writes only
/// touch the fields that reader owns. Iteration order is lexicographic by
/// name, which the report relies on.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<String, PlayerRecord>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the record for `name`, creating a default one on first mention.
    /// Idempotent. Names are not validated here; the empty string is a
    /// recognized record that the retention policy carves out later.
    pub fn get_or_create(&mut self, name: &str) -> &mut PlayerRecord {
        self.players.entry(name.to_string()).or_default()
    }

    /// Apply an identity row from the auth source. Last write wins; the
    /// source is expected to emit each identity once.
    pub fn record_login(&mut self, name: &str, auth_id: i64, last_login: Option<i64>) {
        let record = self.get_or_create(name);
        record.auth_id = Some(auth_id);
        record.last_login = last_login;
    }

    /// Grant a privilege, keeping only names on the notable allow-list.
    pub fn grant_privilege(&mut self, name: &str, privilege: &str, notable: &[String]) {
        if notable.iter().any(|p| p == privilege) {
            self.get_or_create(name)
                .privileges
                .insert(privilege.to_string());
        } else {
            debug!(player = name, privilege, "discarding privilege outside the allow-list");
        }
    }

    /// Apply the creation timestamp from the activity source.
    pub fn record_creation(&mut self, name: &str, epoch: i64) {
        self.get_or_create(name).created_at = Some(epoch);
    }

    /// Apply one (key, value) metadata row from the activity source.
    ///
    /// Recognized keys overwrite the matching counter, after which the action
    /// total is recomputed from the four raw counters. Unrecognized keys are
    /// ignored without parsing; a recognized value that is not an integer is
    /// a fatal error.
    pub fn apply_metadata(&mut self, name: &str, key: &str, value: &str) -> Result<(), AuditError> {
        let record = self.get_or_create(name);
        let field = match key {
            "crafted" => &mut record.crafted,
            "digged_nodes" => &mut record.digged_nodes,
            "inflicted_damage" => &mut record.inflicted_damage,
            "placed_nodes" => &mut record.placed_nodes,
            "played_time" => &mut record.played_time,
            "xp" => &mut record.xp,
            _ => {
                debug!(player = name, key, "ignoring unrecognized metadata key");
                return Ok(());
            }
        };
        *field = value.parse().map_err(|_| AuditError::MalformedMetadata {
            player: name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })?;
        record.recompute_actions();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterate records in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlayerRecord)> {
        self.players.iter().map(|(name, record)| (name.as_str(), record))
    }
}
