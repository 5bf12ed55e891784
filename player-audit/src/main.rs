/*!
Unused-account audit for a persistent multiplayer world.
Merges the auth and activity databases into one view per account, applies the
retention policy, and reports which accounts are safe to purge. Nothing is
ever deleted here; acting on the report is an external process.
*/

use std::path::PathBuf;

use clap::{Arg, Command};
use tracing::info;

use crate::core::config::AuditConfig;
use crate::core::error::AuditError;
use crate::core::policy::RetentionPolicy;
use crate::core::registry::PlayerRegistry;
use crate::core::report::AuditReport;
use crate::sources::{AuthDatabase, PlayersDatabase};

mod core;
mod sources;

fn main() -> Result<(), AuditError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("Player Audit")
        .version("1.0.0")
        .about("Finds unused player accounts by merging auth and activity data")
        .arg(
            Arg::new("auth-db")
                .short('a')
                .long("auth-db")
                .help("Path to the auth database")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("players-db")
                .short('p')
                .long("players-db")
                .help("Path to the player activity database")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("TOML config overriding the built-in defaults")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .help("Report format")
                .value_name("FORMAT")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write the report to a file instead of stdout")
                .value_name("PATH"),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };
    if let Some(path) = matches.get_one::<String>("auth-db") {
        config.sources.auth_db_path = PathBuf::from(path);
    }
    if let Some(path) = matches.get_one::<String>("players-db") {
        config.sources.players_db_path = PathBuf::from(path);
    }

    // One wall-clock reference for the whole run: every account is judged
    // against the same instant.
    let now = chrono::Utc::now().timestamp();
    let policy = RetentionPolicy::new(&config.retention, now);

    info!("🚀 starting player audit");
    info!("auth source: {:?}", config.sources.auth_db_path);
    info!("activity source: {:?}", config.sources.players_db_path);

    let mut registry = PlayerRegistry::new();

    // Both full passes must finish before any account is judged.
    AuthDatabase::open(&config.sources.auth_db_path)?
        .load_into(&mut registry, &config.retention.notable_privileges)?;
    PlayersDatabase::open(&config.sources.players_db_path)?
        .load_into(&mut registry)?;

    let report = AuditReport::build(&registry, &policy, now);

    let rendered = match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => report.render_json()?,
        _ => report.render_text(),
    };

    match matches.get_one::<String>("output") {
        Some(path) => std::fs::write(path, &rendered)?,
        None => print!("{rendered}"),
    }

    info!(
        total = report.total_players,
        unused = report.unused_players,
        "audit complete"
    );

    Ok(())
}
