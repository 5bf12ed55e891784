/*!
Read-only access to the two source databases.
Each reader makes one full pass over its tables and applies every fact to the
shared registry before the retention policy runs.
*/

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::info;

use crate::core::error::AuditError;
use crate::core::registry::PlayerRegistry;

/// Auth/session database: identities, login recency, privilege grants.
#[derive(Debug)]
pub struct AuthDatabase {
    conn: Connection,
}

impl AuthDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuditError> {
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |source| AuditError::OpenSource {
                kind: "auth",
                path: path.as_ref().to_path_buf(),
                source,
            },
        )?;
        Ok(Self { conn })
    }

    /// Apply every auth fact to the registry: one pass over identities, then
    /// one over privilege grants. A grant referencing an identity missing
    /// from the first pass is a fatal inconsistency.
    pub fn load_into(
        &self,
        registry: &mut PlayerRegistry,
        notable: &[String],
    ) -> Result<(), AuditError> {
        let mut id_map: HashMap<i64, String> = HashMap::new();

        let mut stmt = self.conn.prepare("SELECT id, name, last_login FROM auth")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?;

        let mut identities = 0usize;
        for row in rows {
            let (id, name, last_login) = row?;
            id_map.insert(id, name.clone());
            registry.record_login(&name, id, last_login);
            identities += 1;
        }

        let mut stmt = self.conn.prepare("SELECT id, privilege FROM user_privileges")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut grants = 0usize;
        for row in rows {
            let (id, privilege) = row?;
            let name = id_map.get(&id).ok_or_else(|| AuditError::UnknownAuthId {
                auth_id: id,
                privilege: privilege.clone(),
            })?;
            registry.grant_privilege(name, &privilege, notable);
            grants += 1;
        }

        info!(identities, grants, "loaded auth source");
        Ok(())
    }
}

/// In-world activity database: creation dates and accumulated metadata.
pub struct PlayersDatabase {
    conn: Connection,
}

impl PlayersDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuditError> {
        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
            |source| AuditError::OpenSource {
                kind: "players",
                path: path.as_ref().to_path_buf(),
                source,
            },
        )?;
        Ok(Self { conn })
    }

    /// Apply every activity fact to the registry: one pass over creation
    /// rows, then one over metadata rows.
    pub fn load_into(&self, registry: &mut PlayerRegistry) -> Result<(), AuditError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, CAST(strftime('%s', creation_date) AS INTEGER) FROM player",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
        })?;

        let mut created = 0usize;
        for row in rows {
            let (name, epoch) = row?;
            match epoch {
                Some(epoch) => registry.record_creation(&name, epoch),
                // Row exists but the creation date is unreadable; still
                // mention the name so the merge sees the record.
                None => {
                    registry.get_or_create(&name);
                }
            }
            created += 1;
        }

        let mut stmt = self.conn.prepare(
            "SELECT player, metadata, CAST(value AS TEXT) FROM player_metadata",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut applied = 0usize;
        for row in rows {
            let (name, key, value) = row?;
            registry.apply_metadata(&name, &key, &value)?;
            applied += 1;
        }

        info!(created, applied, "loaded activity source");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::policy::{Decision, RetentionPolicy};
    use crate::core::report::AuditReport;
    use rusqlite::params;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;
    const DAY: i64 = 86_400;

    fn notable() -> Vec<String> {
        vec!["citizenship".to_string(), "staff".to_string()]
    }

    fn write_auth_db(
        dir: &TempDir,
        identities: &[(i64, &str, Option<i64>)],
        grants: &[(i64, &str)],
    ) -> std::path::PathBuf {
        let path = dir.path().join("auth.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE auth (id INTEGER PRIMARY KEY, name TEXT, last_login INTEGER);
             CREATE TABLE user_privileges (id INTEGER, privilege TEXT);",
        )
        .unwrap();
        for (id, name, last_login) in identities {
            conn.execute(
                "INSERT INTO auth (id, name, last_login) VALUES (?1, ?2, ?3)",
                params![id, name, last_login],
            )
            .unwrap();
        }
        for (id, privilege) in grants {
            conn.execute(
                "INSERT INTO user_privileges (id, privilege) VALUES (?1, ?2)",
                params![id, privilege],
            )
            .unwrap();
        }
        path
    }

    fn write_players_db(
        dir: &TempDir,
        creations: &[(&str, &str)],
        metadata: &[(&str, &str, &str)],
    ) -> std::path::PathBuf {
        let path = dir.path().join("players.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE player (name TEXT PRIMARY KEY, creation_date TEXT);
             CREATE TABLE player_metadata (player TEXT, metadata TEXT, value TEXT);",
        )
        .unwrap();
        for (name, creation_date) in creations {
            conn.execute(
                "INSERT INTO player (name, creation_date) VALUES (?1, ?2)",
                params![name, creation_date],
            )
            .unwrap();
        }
        for (player, key, value) in metadata {
            conn.execute(
                "INSERT INTO player_metadata (player, metadata, value) VALUES (?1, ?2, ?3)",
                params![player, key, value],
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn open_fails_cleanly_when_the_source_is_missing() {
        let dir = TempDir::new().unwrap();
        let err = AuthDatabase::open(dir.path().join("nope.sqlite")).unwrap_err();
        assert!(matches!(err, AuditError::OpenSource { kind: "auth", .. }));
    }

    #[test]
    fn auth_pass_records_identity_and_login() {
        let dir = TempDir::new().unwrap();
        let path = write_auth_db(&dir, &[(5, "alice", Some(1_000)), (6, "bob", None)], &[]);

        let mut registry = PlayerRegistry::new();
        AuthDatabase::open(&path)
            .unwrap()
            .load_into(&mut registry, &notable())
            .unwrap();

        let alice = registry.get_or_create("alice");
        assert_eq!(alice.auth_id, Some(5));
        assert_eq!(alice.last_login, Some(1_000));
        assert_eq!(registry.get_or_create("bob").last_login, None);
    }

    #[test]
    fn privilege_grants_resolve_through_the_identity_map() {
        let dir = TempDir::new().unwrap();
        let path = write_auth_db(
            &dir,
            &[(5, "alice", Some(1_000))],
            &[(5, "citizenship"), (5, "fly")],
        );

        let mut registry = PlayerRegistry::new();
        AuthDatabase::open(&path)
            .unwrap()
            .load_into(&mut registry, &notable())
            .unwrap();

        let privileges = &registry.get_or_create("alice").privileges;
        assert!(privileges.contains("citizenship"));
        assert!(!privileges.contains("fly"));
    }

    #[test]
    fn grant_for_unknown_identity_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_auth_db(&dir, &[(5, "alice", None)], &[(99, "citizenship")]);

        let mut registry = PlayerRegistry::new();
        let err = AuthDatabase::open(&path)
            .unwrap()
            .load_into(&mut registry, &notable())
            .unwrap_err();
        assert!(matches!(err, AuditError::UnknownAuthId { auth_id: 99, .. }));
    }

    #[test]
    fn creation_dates_come_back_as_unix_seconds() {
        let dir = TempDir::new().unwrap();
        let path = write_players_db(&dir, &[("alice", "2015-06-01 12:00:00")], &[]);

        let mut registry = PlayerRegistry::new();
        PlayersDatabase::open(&path)
            .unwrap()
            .load_into(&mut registry)
            .unwrap();

        // strftime('%s', '2015-06-01 12:00:00') in UTC.
        assert_eq!(registry.get_or_create("alice").created_at, Some(1_433_160_000));
    }

    #[test]
    fn malformed_metadata_aborts_the_activity_pass() {
        let dir = TempDir::new().unwrap();
        let path = write_players_db(
            &dir,
            &[("alice", "2015-06-01 12:00:00")],
            &[("alice", "xp", "not-a-number")],
        );

        let mut registry = PlayerRegistry::new();
        let err = PlayersDatabase::open(&path)
            .unwrap()
            .load_into(&mut registry)
            .unwrap_err();
        assert!(matches!(err, AuditError::MalformedMetadata { .. }));
    }

    #[test]
    fn full_pipeline_flags_the_expected_accounts() {
        let dir = TempDir::new().unwrap();
        let auth = write_auth_db(
            &dir,
            &[
                // Stale login, no world record: dropped (auth-only).
                (5, "alice", Some(NOW - 200 * DAY)),
                // Real experience: kept.
                (3, "carol", Some(NOW - 400 * DAY)),
                // Recent login: kept.
                (4, "dave", Some(NOW - 10 * DAY)),
                // Keep list: kept despite zero activity.
                (1, "ADMIN", Some(NOW - 2_000 * DAY)),
            ],
            &[(3, "staff")],
        );
        let players = write_players_db(
            &dir,
            &[
                ("carol", "2015-06-01 12:00:00"),
                // Never authenticated: dropped (world-only).
                ("bob", "2014-01-01 00:00:00"),
            ],
            &[
                ("carol", "xp", "50"),
                ("carol", "digged_nodes", "12"),
                ("bob", "played_time", "30"),
            ],
        );

        let mut registry = PlayerRegistry::new();
        AuthDatabase::open(&auth)
            .unwrap()
            .load_into(&mut registry, &notable())
            .unwrap();
        PlayersDatabase::open(&players)
            .unwrap()
            .load_into(&mut registry)
            .unwrap();

        let policy = RetentionPolicy {
            min_xp: 1,
            min_actions: 1,
            login_threshold: NOW - 90 * DAY,
            keep_list: vec!["ADMIN".to_string()],
        };
        let report = AuditReport::build(&registry, &policy, NOW);

        let names: Vec<&str> = report.unused.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(report.total_players, 5);
        assert_eq!(report.unused_players, 2);
        assert_eq!(policy.decide("carol", registry.get_or_create("carol")), Decision::Keep);
    }
}
