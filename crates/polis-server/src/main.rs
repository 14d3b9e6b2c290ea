//! # Polis
//!
//! Runs one engine trigger point inside a single database transaction:
//! - `recompute` — consolidate community settings, recounting if thresholds moved
//! - `recount` — re-tally every resource and membership request of a community
//! - `propagate` — spread a ballot along the delegation graph and re-tally
//! - `resolve-request` — re-derive the ancestors of a child membership request
//!
//! The recount outcome is printed as JSON. A partial outcome exits with status 2.

use clap::{Parser, Subcommand};
use polis_db::Database;
use polis_engine::{Engine, RecountOutcome};
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "polis", version, about = "Consensus engine for self-governing communities")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recompute a community's consolidated settings.
    Recompute {
        #[arg(long)]
        community: Uuid,
    },
    /// Force a full recount of a community.
    Recount {
        #[arg(long)]
        community: Uuid,
    },
    /// Propagate a ballot to the delegate's principals.
    Propagate {
        #[arg(long)]
        ballot: Uuid,
    },
    /// Resolve the parents of a child membership request.
    ResolveRequest {
        #[arg(long)]
        request: Uuid,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "polis=info,polis_engine=info,polis_db=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let config = polis_common::config::init()?;

    init_tracing(cli.json);
    tracing::info!("Starting Polis v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(config).await?;
    db.migrate().await?;
    let engine = Engine::new(config.engine.clone());

    let mut uow = db.begin().await?;
    let outcome = match cli.command {
        Command::Recompute { community } => {
            engine.recompute_community_settings(&mut uow, community).await
        }
        Command::Recount { community } => engine.recount(&mut uow, community).await,
        Command::Propagate { ballot } => engine.propagate(&mut uow, ballot).await,
        Command::ResolveRequest { request } => {
            engine.resolve_parent_request(&mut uow, request).await
        }
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(code = e.error_code(), "Trigger failed, rolling back: {e}");
            uow.rollback().await?;
            return Err(e.into());
        }
    };
    uow.commit().await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    match outcome {
        RecountOutcome::Complete => Ok(ExitCode::SUCCESS),
        RecountOutcome::Partial { failures } => {
            tracing::warn!(failures = failures.len(), "Recount finished with failures");
            Ok(ExitCode::from(2))
        }
    }
}
