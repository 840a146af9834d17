//! Land Registry Command Line Host
//!
//! Loads a persisted registry, applies a single operation and persists the
//! result. Output is JSON on stdout; logs go to stderr.

mod config;

use crate::config::{HostConfig, LogFormat};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use land_registry::{
    Identity, LandRegistration, LandRegistry, Operation, Outcome, ParcelId, RegistryStore,
    SledRegistryStore,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "landreg")]
#[command(about = "Land title registry host", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./landreg.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Registry data directory
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log level filter (RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind the registry authority (first caller wins)
    SetAuthority {
        /// Authority identity
        #[arg(long)]
        identity: Identity,
    },
    /// Register a new parcel (authority only)
    Register(RegisterCommand),
    /// Transfer a parcel to a new owner (current owner only)
    Transfer {
        /// Calling identity
        #[arg(long)]
        caller: Identity,
        /// External parcel id (1-based)
        #[arg(long)]
        parcel_id: u64,
        /// Receiving identity
        #[arg(long)]
        new_owner: Identity,
    },
    /// Show a single parcel
    Verify {
        /// External parcel id (1-based)
        #[arg(long)]
        parcel_id: u64,
    },
    /// List parcels in creation order
    List {
        /// Only parcels currently held by this identity
        #[arg(long)]
        owner: Option<Identity>,
    },
    /// Show registry state summary
    Status,
    /// Print notifications emitted while rebuilding the registry
    Events {
        /// First sequence number to print
        #[arg(long, default_value_t = 0)]
        since: u64,
    },
    /// Apply a JSON array of operations in order
    Replay {
        /// Path to the operations file
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },
}

#[derive(Args)]
struct RegisterCommand {
    /// Calling identity
    #[arg(long)]
    caller: Identity,
    /// Location description
    #[arg(long)]
    location: String,
    /// Parcel area
    #[arg(long)]
    area: u64,
    /// Initial owner
    #[arg(long)]
    owner: Identity,
    /// External property reference
    #[arg(long)]
    property_id: String,
}

#[derive(Debug, Serialize)]
struct ReplayEntry {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = HostConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }

    init_logging(&config);

    let store = SledRegistryStore::open(&config.data_dir).with_context(|| {
        format!(
            "failed to open registry store at {}",
            config.data_dir.display()
        )
    })?;
    let registry = open_registry(&store)?;

    match cli.command {
        Commands::SetAuthority { identity } => {
            let outcome = commit(&registry, &store, Operation::SetAuthority { identity })?;
            print_json(&outcome)
        }
        Commands::Register(cmd) => {
            let op = Operation::RegisterLand {
                caller: cmd.caller,
                registration: LandRegistration::new(
                    cmd.location,
                    cmd.area,
                    cmd.owner,
                    cmd.property_id,
                ),
            };
            let outcome = commit(&registry, &store, op)?;
            print_json(&outcome)
        }
        Commands::Transfer {
            caller,
            parcel_id,
            new_owner,
        } => {
            let op = Operation::TransferOwnership {
                caller,
                parcel_id: ParcelId::new(parcel_id),
                new_owner,
            };
            let outcome = commit(&registry, &store, op)?;
            print_json(&outcome)
        }
        Commands::Verify { parcel_id } => {
            let parcel = registry.verify_land(ParcelId::new(parcel_id))?;
            print_json(&parcel)
        }
        Commands::List { owner } => {
            let parcels = match owner {
                Some(owner) => registry.lands_owned_by(&owner),
                None => registry.registered_lands(),
            };
            print_json(&parcels)
        }
        Commands::Status => print_json(&serde_json::json!({
            "phase": registry.phase(),
            "authority": registry.authority(),
            "parcels": registry.land_count(),
        })),
        Commands::Events { since } => print_json(&registry.events_since(since)),
        Commands::Replay { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let ops: Vec<Operation> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid operations in {}", file.display()))?;

            let entries = apply_batch(&registry, &store, ops)?;
            print_json(&entries)
        }
    }
}

/// Rebuild the registry from the committed operation log, falling back to
/// the stored snapshot when no log exists.
fn open_registry<S: RegistryStore + ?Sized>(store: &S) -> Result<LandRegistry> {
    let ops = store.operations()?;
    if ops.is_empty() {
        if let Some(snapshot) = store.load()? {
            info!("Restored registry from snapshot");
            return Ok(LandRegistry::from_snapshot(snapshot)?);
        }
        return Ok(LandRegistry::new());
    }

    let (registry, results) = LandRegistry::replay(&ops);
    for (index, result) in results.into_iter().enumerate() {
        if let Err(err) = result {
            return Err(err).with_context(|| {
                format!("committed operation {index} no longer applies to the log prefix")
            });
        }
    }
    info!("Rebuilt registry from {} operations", ops.len());
    Ok(registry)
}

/// Apply one operation; persist it only when the registry accepted it.
fn commit<S: RegistryStore + ?Sized>(
    registry: &LandRegistry,
    store: &S,
    op: Operation,
) -> Result<Outcome> {
    let outcome = registry.apply(&op)?;
    persist(registry, store, &op, outcome)?;
    Ok(outcome)
}

/// Apply operations in order. Rejections are reported per entry and the
/// batch carries on; a storage failure aborts the batch.
fn apply_batch<S: RegistryStore + ?Sized>(
    registry: &LandRegistry,
    store: &S,
    ops: Vec<Operation>,
) -> Result<Vec<ReplayEntry>> {
    let mut entries = Vec::with_capacity(ops.len());
    for (index, op) in ops.into_iter().enumerate() {
        let entry = match registry.apply(&op) {
            Ok(outcome) => {
                persist(registry, store, &op, outcome)
                    .with_context(|| format!("failed to persist operation {index}"))?;
                ReplayEntry {
                    index,
                    outcome: Some(outcome),
                    error: None,
                }
            }
            Err(err) if err.is_rejection() => ReplayEntry {
                index,
                outcome: None,
                error: Some(err.to_string()),
            },
            Err(err) => return Err(err.into()),
        };
        entries.push(entry);
    }
    Ok(entries)
}

fn persist<S: RegistryStore + ?Sized>(
    registry: &LandRegistry,
    store: &S,
    op: &Operation,
    outcome: Outcome,
) -> Result<()> {
    let position = store.append_operation(op)?;
    store.save(&registry.snapshot())?;
    store.flush()?;
    info!("Committed operation {} as {:?}", position, outcome);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(config: &HostConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
