use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lattice_core::impls::{
    InMemoryQueueStore, InventorySnapshot, RecordingDecisionSink, RecordingProvisioningSink,
    StaticInventory, StaticPricingSource,
};
use lattice_core::{SchedulerBuilder, SchedulerConfig, SchedulerHandle};

/// Plan task queues and host allocations over a JSON inventory snapshot.
#[derive(Debug, Parser)]
#[command(name = "lattice", version)]
struct Args {
    /// Scheduler config (JSON). Defaults apply when omitted.
    #[arg(long, env = "LATTICE_CONFIG")]
    config: Option<PathBuf>,

    /// Snapshot with distros, tasks, hosts and prices.
    #[arg(long)]
    snapshot: PathBuf,

    /// Cycles to run. 0 keeps running until Ctrl-C.
    #[arg(long, default_value_t = 1)]
    cycles: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lattice=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SchedulerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    config.apply_env_overrides()?;

    let raw = std::fs::read_to_string(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    let snapshot = InventorySnapshot::from_json(&raw).context("parsing snapshot")?;

    let decisions = Arc::new(RecordingDecisionSink::new());
    let scheduler = SchedulerBuilder::new(config)
        .inventory(Arc::new(StaticInventory::from_snapshot(&snapshot)))
        .queue_store(Arc::new(InMemoryQueueStore::new()))
        .pricing(Arc::new(StaticPricingSource::from_snapshot(&snapshot)))
        .provisioning(Arc::new(RecordingProvisioningSink::new()))
        .decisions(decisions.clone())
        .build()?;
    let scheduler = Arc::new(scheduler);

    if args.cycles == 0 {
        let handle = SchedulerHandle::spawn(scheduler);
        let mut drain = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    signal.context("waiting for Ctrl-C")?;
                    break;
                }
                _ = drain.tick() => {
                    for decision in decisions.drain().await {
                        println!("{}", serde_json::to_string(&decision)?);
                    }
                }
            }
        }
        info!("shutting down");
        handle.shutdown_and_join().await;
    } else {
        for cycle in 1..=args.cycles {
            let report = scheduler.run_cycle().await;
            info!(
                cycle,
                planned = report.planned(),
                failed = report.failed(),
                "cycle complete"
            );
        }
    }

    for decision in decisions.drain().await {
        println!("{}", serde_json::to_string(&decision)?);
    }
    Ok(())
}
