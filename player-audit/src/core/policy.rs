/*!
Ordered retention-rule chain deciding which accounts are safe to purge
*/

use serde::Serialize;
use tracing::debug;

use crate::core::config::RetentionConfig;
use crate::core::registry::PlayerRecord;

/// Holding this privilege keeps an account regardless of activity.
const RETAINING_PRIVILEGE: &str = "citizenship";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Keep,
    Drop,
}

/// Retention thresholds resolved against a single wall-clock reference.
///
/// Built once per run so every account is judged against the same instant,
/// even when the evaluation pass takes nonzero time.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    pub min_xp: i64,
    pub min_actions: i64,
    /// Logins strictly after this instant count as recent.
    pub login_threshold: i64,
    pub keep_list: Vec<String>,
}

struct RuleCtx<'a> {
    name: &'a str,
    record: &'a PlayerRecord,
    policy: &'a RetentionPolicy,
}

struct Rule {
    name: &'static str,
    outcome: Decision,
    applies: fn(&RuleCtx) -> bool,
}

/// The policy as an ordered table: the first rule whose predicate holds
/// decides, and later rules are unreachable once an earlier one fires.
/// Keep rules run from strongest signal to weakest; the drop rules after
/// them only see accounts with no positive signal at all.
const RULES: &[Rule] = &[
    // Placeholder records from malformed rows, never a real account.
    Rule {
        name: "empty-name",
        outcome: Decision::Keep,
        applies: |ctx| ctx.name.is_empty(),
    },
    Rule {
        name: "keep-list",
        outcome: Decision::Keep,
        applies: |ctx| ctx.policy.keep_list.iter().any(|n| n == ctx.name),
    },
    Rule {
        name: "min-xp",
        outcome: Decision::Keep,
        applies: |ctx| ctx.record.xp >= ctx.policy.min_xp,
    },
    Rule {
        name: "citizenship",
        outcome: Decision::Keep,
        applies: |ctx| ctx.record.privileges.contains(RETAINING_PRIVILEGE),
    },
    Rule {
        name: "min-actions",
        outcome: Decision::Keep,
        applies: |ctx| ctx.record.actions >= ctx.policy.min_actions,
    },
    // An unknown login time never counts as recent.
    Rule {
        name: "recent-login",
        outcome: Decision::Keep,
        applies: |ctx| {
            ctx.record
                .last_login
                .is_some_and(|t| t > ctx.policy.login_threshold)
        },
    },
    // Exists in auth but was never recorded as entering the world.
    Rule {
        name: "auth-only",
        outcome: Decision::Drop,
        applies: |ctx| ctx.record.auth_id.is_some() && ctx.record.created_at.is_none(),
    },
    // Exists in activity data but never authenticated. Rare.
    Rule {
        name: "world-only",
        outcome: Decision::Drop,
        applies: |ctx| ctx.record.auth_id.is_none() && ctx.record.created_at.is_some(),
    },
];

impl RetentionPolicy {
    /// Resolve the config against `now`, captured once at run start.
    pub fn new(retention: &RetentionConfig, now: i64) -> Self {
        Self {
            min_xp: retention.min_xp,
            min_actions: retention.min_actions,
            login_threshold: now - i64::from(retention.inactivity_window_days) * 86_400,
            keep_list: retention.keep_list.clone(),
        }
    }

    /// Decide retention for one account. Pure function of its inputs; the
    /// order of evaluation across accounts does not matter.
    pub fn decide(&self, name: &str, record: &PlayerRecord) -> Decision {
        self.decide_traced(name, record).0
    }

    /// Like `decide`, additionally reporting which rule fired.
    pub fn decide_traced(&self, name: &str, record: &PlayerRecord) -> (Decision, &'static str) {
        let ctx = RuleCtx {
            name,
            record,
            policy: self,
        };
        for rule in RULES {
            if (rule.applies)(&ctx) {
                debug!(player = name, rule = rule.name, "rule fired");
                return (rule.outcome, rule.name);
            }
        }
        // No positive signal and no single-sided anomaly: both identity and
        // creation signals are simultaneously absent.
        (Decision::Drop, "no-signal")
    }
}
