//! CLI for running and inspecting the Learn2Earn status sync by hand
//!
//! Every command prints a single JSON document on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use learn2earn_sync_core::common::Learn2EarnId;
use learn2earn_sync_core::domains::learn2earn::{
    derive_status, resolve_transition, AdminLog, BaseOpportunityStore, CompletionPolicy,
    Learn2Earn, Learn2EarnStatus, PgOpportunityStore, StatusSynchronizer, SyncReport, Transition,
};
use learn2earn_sync_core::kernel::{BaseClock, SyncDeps};
use learn2earn_sync_core::Config;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;

#[derive(Parser)]
#[command(name = "sync_cli")]
#[command(about = "Run or inspect the Learn2Earn status sync")]
struct Cli {
    /// Override SYNC_COMPLETION_POLICY (terminal | rederive)
    #[arg(long, global = true)]
    policy: Option<CompletionPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync now
    Run {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show audit entries for an opportunity
    History { id: Learn2EarnId },

    /// Show stored and derived status for an opportunity
    Inspect { id: Learn2EarnId },

    /// Count opportunities by stored status
    Stats,
}

// ============================================================================
// JSON Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(untagged)]
enum Response {
    Run(SyncReport),
    History {
        id: Learn2EarnId,
        entries: Vec<AdminLog>,
    },
    Inspect {
        opportunity: Learn2Earn,
        anchored: bool,
        derived_status: Learn2EarnStatus,
        would_change_to: Option<Learn2EarnStatus>,
    },
    Stats {
        counts: Vec<StatusCount>,
    },
}

#[derive(Serialize)]
struct StatusCount {
    status: Learn2EarnStatus,
    count: i64,
}

fn output(resp: &Response) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(resp)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let policy = cli.policy.unwrap_or(config.sync.completion_policy);

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let store = PgOpportunityStore::new(pool);
    let deps = SyncDeps::postgres(store.clone());

    let result = execute(cli.command, &deps, &store, policy).await;
    store.close().await;
    output(&result?)
}

async fn execute(
    command: Commands,
    deps: &SyncDeps,
    store: &PgOpportunityStore,
    policy: CompletionPolicy,
) -> Result<Response> {
    match command {
        Commands::Run { dry_run } => {
            let report = StatusSynchronizer::new(deps, policy)
                .with_dry_run(dry_run)
                .run_sync()
                .await?;
            Ok(Response::Run(report))
        }
        Commands::History { id } => {
            let entries = store.audit_history(id).await?;
            Ok(Response::History { id, entries })
        }
        Commands::Inspect { id } => {
            let opportunity = store
                .find(id)
                .await?
                .with_context(|| format!("Opportunity {} not found", id))?;
            let derived_status = derive_status(&opportunity, deps.clock.now());
            let anchored = opportunity.is_anchored();
            let would_change_to = match resolve_transition(opportunity.status, derived_status, policy) {
                Transition::Change { to, .. } if !anchored => Some(to),
                _ => None,
            };
            Ok(Response::Inspect {
                opportunity,
                anchored,
                derived_status,
                would_change_to,
            })
        }
        Commands::Stats => {
            let counts = Learn2Earn::count_by_status(store.pool())
                .await?
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect();
            Ok(Response::Stats { counts })
        }
    }
}
