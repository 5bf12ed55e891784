/*!
Report over the merged registry: which accounts to purge, plus summary counts
*/

use std::fmt::Write as _;

use serde::Serialize;

use crate::core::policy::{Decision, RetentionPolicy};
use crate::core::registry::PlayerRegistry;

/// One DROP-decided account, as the report shows it.
#[derive(Debug, Clone, Serialize)]
pub struct UnusedPlayer {
    pub name: String,
    pub auth_id: Option<i64>,
    pub xp: i64,
    pub actions: i64,
    /// Days since the last login, absent when the login time is unknown.
    pub age_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub total_players: usize,
    pub unused_players: usize,
    pub unused: Vec<UnusedPlayer>,
}

impl AuditReport {
    /// Evaluate every record against the policy. Registry iteration is
    /// already lexicographic by name, so the rows come out sorted.
    pub fn build(registry: &PlayerRegistry, policy: &RetentionPolicy, now: i64) -> Self {
        let mut unused = Vec::new();
        for (name, record) in registry.iter() {
            if policy.decide(name, record) == Decision::Drop {
                unused.push(UnusedPlayer {
                    name: name.to_string(),
                    auth_id: record.auth_id,
                    xp: record.xp,
                    actions: record.actions,
                    age_days: record.last_login.map(|t| (now - t) / 86_400),
                });
            }
        }
        Self {
            total_players: registry.len(),
            unused_players: unused.len(),
            unused,
        }
    }

    /// Fixed-width table of unused accounts followed by the summary lines.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for p in &self.unused {
            let age = p.age_days.map_or_else(|| "-".to_string(), |d| d.to_string());
            let id = p.auth_id.map_or_else(|| "-".to_string(), |id| id.to_string());
            let _ = writeln!(
                out,
                "{:<30} {:>9} {:>11} {:>5} {:>6}",
                p.name, p.xp, p.actions, age, id
            );
        }
        let _ = writeln!(out, "# Total Players:  {:7}", self.total_players);
        let _ = writeln!(out, "# Unused Players: {:7}", self.unused_players);
        out
    }

    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
