//! CLI administration tool for safe-shortener.
//!
//! Provides commands for inspecting links, triggering re-checks, and
//! reviewing flagged URLs without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # List links, optionally by status
//! cargo run --bin admin -- links list --status inactive
//!
//! # Re-check one link now
//! cargo run --bin admin -- links recheck aZ3_k9Q-
//!
//! # Re-check every live/inactive link whose check interval has elapsed
//! cargo run --bin admin -- links recheck-stale
//!
//! # Show pending scheduled checks and recently flagged URLs
//! cargo run --bin admin -- checks list
//! cargo run --bin admin -- malicious list
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server; the PostgreSQL backend is required.

use safe_shortener::application::services::{CheckOutcome, RecheckScheduler};
use safe_shortener::config::{self, StorageBackend};
use safe_shortener::domain::entities::{LinkStatus, UrlMapping};
use safe_shortener::infrastructure::persistence::Stores;
use safe_shortener::server;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing safe-shortener.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Inspect and re-check links
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },

    /// Inspect scheduled re-checks
    Checks {
        #[command(subcommand)]
        action: ChecksAction,
    },

    /// Inspect URLs flagged by the safety check
    Malicious {
        #[command(subcommand)]
        action: MaliciousAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum LinksAction {
    /// List links, newest first
    List {
        /// Only show links with this stored status (pending, live, inactive, expired)
        #[arg(short, long)]
        status: Option<LinkStatus>,

        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },

    /// Probe one link now and record its new status
    Recheck {
        /// Short code of the link
        code: String,
    },

    /// Probe every live or inactive link whose check interval has elapsed
    RecheckStale {
        #[arg(short, long, default_value_t = 500)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum ChecksAction {
    /// List pending scheduled re-checks
    List,
}

#[derive(Subcommand)]
enum MaliciousAction {
    /// List recently flagged URLs
    List {
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env()?;
    if config.storage_backend != StorageBackend::Postgres {
        anyhow::bail!("The admin tool requires STORAGE_BACKEND=postgres");
    }
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;

    let pool = server::connect_pool(&config, database_url).await?;
    let stores = Stores::postgres(Arc::new(pool.clone()));

    match cli.command {
        Commands::Links { action } => match action {
            LinksAction::List { status, limit } => list_links(&stores, status, limit).await?,
            LinksAction::Recheck { code } => {
                let scheduler = scheduler(&config, &stores)?;
                recheck_one(&stores, &scheduler, &code).await?;
            }
            LinksAction::RecheckStale { limit } => {
                let scheduler = scheduler(&config, &stores)?;
                recheck_stale(&stores, &scheduler, limit).await?;
            }
        },
        Commands::Checks {
            action: ChecksAction::List,
        } => list_checks(&stores).await?,
        Commands::Malicious {
            action: MaliciousAction::List { limit },
        } => list_malicious(&stores, limit).await?,
        Commands::Db {
            action: DbAction::Check,
        } => check_db(&pool).await?,
    }

    Ok(())
}

fn scheduler(config: &config::Config, stores: &Stores) -> Result<RecheckScheduler> {
    let (_, probe) = server::outbound_clients(config)?;
    Ok(RecheckScheduler::new(
        stores.mappings.clone(),
        stores.checks.clone(),
        probe,
    ))
}

fn colored_status(status: LinkStatus) -> ColoredString {
    match status {
        LinkStatus::Live => status.as_str().green(),
        LinkStatus::Pending => status.as_str().yellow(),
        LinkStatus::Inactive => status.as_str().red(),
        LinkStatus::Expired => status.as_str().bright_black(),
    }
}

fn print_link_row(mapping: &UrlMapping) {
    println!(
        "  {:<10} {:<10} {:<17} {}",
        mapping.short_code.cyan(),
        colored_status(mapping.status),
        mapping
            .last_checked_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black(),
        mapping.original_url
    );
}

/// Lists links with their stored status.
///
/// The stored status can lag behind expiry; rows past their expiry date are
/// marked.
async fn list_links(stores: &Stores, status: Option<LinkStatus>, limit: i64) -> Result<()> {
    println!("{}", "🔗 Links".bright_blue().bold());
    println!();

    let links = stores
        .mappings
        .list(status, limit)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list links: {}", e))?;

    if links.is_empty() {
        println!("{}", "  No links found".yellow());
        return Ok(());
    }

    println!(
        "  {:<10} {:<10} {:<17} {}",
        "Code".bright_white().bold(),
        "Status".bright_white().bold(),
        "Last checked".bright_white().bold(),
        "URL".bright_white().bold()
    );
    println!("  {}", "─".repeat(75).bright_black());

    let now = Utc::now();
    for mapping in &links {
        print_link_row(mapping);
        if mapping.status != LinkStatus::Expired && mapping.is_expired_at(now) {
            println!("  {:<10} {}", "", "↳ past expiry date".bright_black());
        }
    }

    println!();
    println!("  Total: {}", links.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

fn print_outcome(code: &str, outcome: CheckOutcome) {
    match outcome {
        CheckOutcome::Updated { previous, current } if previous == current => {
            println!("  {} {} unchanged", code.cyan(), colored_status(current));
        }
        CheckOutcome::Updated { previous, current } => {
            println!(
                "  {} {} → {}",
                code.cyan(),
                colored_status(previous),
                colored_status(current)
            );
        }
        CheckOutcome::Suppressed => {
            println!("  {} {} (no probe)", code.cyan(), colored_status(LinkStatus::Expired));
        }
        CheckOutcome::Missing => {
            println!("  {} {}", code.cyan(), "no longer exists".red());
        }
    }
}

async fn recheck_one(stores: &Stores, scheduler: &RecheckScheduler, code: &str) -> Result<()> {
    println!("{}", "🔁 Re-check link".bright_blue().bold());
    println!();

    let mapping = stores
        .mappings
        .find_by_short_code(code)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .context("Link not found")?;

    let outcome = scheduler
        .run_check(mapping.id)
        .await
        .map_err(|e| anyhow::anyhow!("Re-check failed: {}", e))?;

    print_outcome(code, outcome);
    println!();

    Ok(())
}

async fn recheck_stale(stores: &Stores, scheduler: &RecheckScheduler, limit: i64) -> Result<()> {
    println!("{}", "🔁 Re-check stale links".bright_blue().bold());
    println!();

    let due = stores
        .mappings
        .list_due_for_recheck(Utc::now(), limit)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list stale links: {}", e))?;

    if due.is_empty() {
        println!("{}", "  Nothing to re-check".green());
        return Ok(());
    }

    let mut failed = 0usize;
    for mapping in &due {
        match scheduler.run_check(mapping.id).await {
            Ok(outcome) => print_outcome(&mapping.short_code, outcome),
            Err(e) => {
                failed += 1;
                println!("  {} {}", mapping.short_code.cyan(), e.to_string().red());
            }
        }
    }

    println!();
    println!(
        "  Checked: {}  Failed: {}",
        (due.len() - failed).to_string().bright_white().bold(),
        failed.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

async fn list_checks(stores: &Stores) -> Result<()> {
    println!("{}", "⏰ Scheduled re-checks".bright_blue().bold());
    println!();

    let checks = stores
        .checks
        .list_pending()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list scheduled checks: {}", e))?;

    if checks.is_empty() {
        println!("{}", "  No pending checks".yellow());
        return Ok(());
    }

    let now = Utc::now();
    for check in &checks {
        let when = check.fire_at.format("%Y-%m-%d %H:%M:%S").to_string();
        let when = if check.is_due(now) {
            format!("{when} (overdue)").red()
        } else {
            when.normal()
        };
        println!("  mapping {:<8} {}", check.mapping_id.to_string().cyan(), when);
    }
    println!();

    Ok(())
}

async fn list_malicious(stores: &Stores, limit: i64) -> Result<()> {
    println!("{}", "🚫 Flagged URLs".bright_blue().bold());
    println!();

    let logs = stores
        .malicious_logs
        .list_recent(limit)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list flagged URLs: {}", e))?;

    if logs.is_empty() {
        println!("{}", "  Nothing flagged".green());
        return Ok(());
    }

    for log in &logs {
        println!(
            "  {} {} {}",
            log.created_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .bright_black(),
            log.url.red(),
            log.ip_address.as_deref().unwrap_or("-").bright_black()
        );
        println!("    {} (risk {})", log.details, log.risk_score);
    }
    println!();

    Ok(())
}

/// Verifies the connection and reports row counts.
async fn check_db(pool: &PgPool) -> Result<()> {
    println!("{}", "🔍 Checking database connection...".bright_blue());

    let version: String = sqlx::query_scalar("SELECT version()")
        .fetch_one(pool)
        .await
        .context("Database query failed")?;

    println!("{}", "✅ Database connection successful".green());
    println!("  {}", version.bright_black());

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM url_mappings")
        .fetch_one(pool)
        .await?;
    let flagged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM malicious_logs")
        .fetch_one(pool)
        .await?;

    println!("  Links:   {}", links.to_string().bright_white().bold());
    println!("  Flagged: {}", flagged.to_string().bright_white().bold());

    Ok(())
}
