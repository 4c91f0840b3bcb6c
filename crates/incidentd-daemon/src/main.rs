//! incidentd - incident ticket lifecycle daemon.
//!
//! The scheduler half of the system: opens the ticket store, then either
//! runs exactly one retention cycle (`--once`, the cron-equivalent) or
//! loops, triggering one cycle per interval until interrupted.
//!
//! Optionally seeds a batch of synthetic tickets before each cycle
//! (`--seed-per-cycle`) and links one random pair from the batch, which
//! keeps a demo database populated the way the production ingestion path
//! would. Seeding is off by default.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use incidentd_core::clock::SystemClock;
use incidentd_core::config::RetentionConfig;
use incidentd_core::synth::TicketGenerator;
use incidentd_daemon::{LifecycleEngine, TicketStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "incidentd", version, about = "Incident ticket lifecycle daemon")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Run exactly one retention cycle and exit
    #[arg(long)]
    once: bool,

    /// Retention window in seconds (overrides the config file)
    #[arg(long)]
    window_secs: Option<u64>,

    /// Seconds between cycles when running as a daemon (overrides the
    /// config file)
    #[arg(long)]
    interval_secs: Option<u64>,

    /// Synthetic tickets to create before each cycle (overrides the config
    /// file; zero disables seeding)
    #[arg(long)]
    seed_per_cycle: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&args)?;
    config.validate().context("invalid configuration")?;

    info!(
        db = %config.db_path.display(),
        window_secs = config.window_secs,
        "opening ticket store"
    );
    let store =
        Arc::new(TicketStore::open(&config.db_path).context("failed to open ticket store")?);
    let engine = LifecycleEngine::new(store, Arc::new(SystemClock));
    let mut generator = seeding_generator(&config);

    if args.once {
        return run_cycle(&engine, &config, generator.as_mut());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run_loop(&engine, &config, generator.as_mut()))
}

/// Merges the optional config file with command-line overrides.
fn load_config(args: &Args) -> Result<RetentionConfig> {
    let mut config = match &args.config {
        Some(path) => RetentionConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RetentionConfig::default(),
    };

    if let Some(db) = &args.db {
        config.db_path.clone_from(db);
    }
    if let Some(window_secs) = args.window_secs {
        config.window_secs = window_secs;
    }
    if let Some(interval_secs) = args.interval_secs {
        config.interval_secs = interval_secs;
    }
    if let Some(seed_per_cycle) = args.seed_per_cycle {
        config.seed_per_cycle = seed_per_cycle;
    }
    Ok(config)
}

fn seeding_generator(config: &RetentionConfig) -> Option<TicketGenerator<StdRng>> {
    (config.seed_per_cycle > 0).then(|| TicketGenerator::new(StdRng::from_os_rng()))
}

/// One scheduler tick: optional synthetic seeding, then a retention cycle.
///
/// Per-ticket archival failures are a partial success: they are logged and
/// left for the next cycle, not escalated. Only a failed expired-ticket
/// scan is an error.
fn run_cycle(
    engine: &LifecycleEngine,
    config: &RetentionConfig,
    generator: Option<&mut TicketGenerator<StdRng>>,
) -> Result<()> {
    if let Some(generator) = generator {
        seed_tickets(engine, generator, config.seed_per_cycle as usize);
    }

    let report = engine
        .run_retention_cycle(config.window())
        .context("retention cycle failed")?;

    if !report.is_complete() {
        for (ticket_id, reason) in &report.failed {
            warn!(ticket_id = %ticket_id, reason = %reason, "ticket left active; will retry next cycle");
        }
    }
    Ok(())
}

fn seed_tickets(
    engine: &LifecycleEngine,
    generator: &mut TicketGenerator<StdRng>,
    count: usize,
) {
    let mut ids = Vec::with_capacity(count);
    for ticket in generator.batch(count) {
        match engine.create_ticket(&ticket) {
            Ok(id) => ids.push(id),
            Err(e) => warn!(error = %e, "failed to create synthetic ticket"),
        }
    }

    if let Some((parent, child)) = generator.pick_link(&ids) {
        match engine.link_dependency(parent, child) {
            Ok(edge_id) => {
                info!(edge_id = %edge_id, parent = %parent, child = %child, "linked synthetic pair");
            },
            Err(e) => warn!(error = %e, "failed to link synthetic pair"),
        }
    }
    info!(created = ids.len(), "seeded synthetic tickets");
}

async fn run_loop(
    engine: &LifecycleEngine,
    config: &RetentionConfig,
    mut generator: Option<&mut TicketGenerator<StdRng>>,
) -> Result<()> {
    info!(interval_secs = config.interval_secs, "retention scheduler starting");

    loop {
        if let Err(e) = run_cycle(engine, config, generator.as_deref_mut()) {
            // Keep the scheduler alive; a transient storage fault should
            // not take the daemon down with it.
            error!(error = %e, "retention cycle failed");
        }

        tokio::select! {
            () = tokio::time::sleep(config.interval()) => {},
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            },
        }
    }

    info!("retention scheduler stopped");
    Ok(())
}
