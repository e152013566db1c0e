//! logscript - Main Entry Point
//!
//! Loads a Rhai configuration script, builds the pipeline nodes it declares
//! and runs them for a bounded time, printing every delivered message as a
//! JSON line.

use anyhow::Context;
use clap::Parser;
use logscript::{
    config::{ConfigLoader, Settings},
    host::{HostSignal, PipelineHost},
    options::UnknownKeys,
    registry, Driver,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Run a script-configured log pipeline.
#[derive(Parser, Debug)]
#[command(name = "logscript", version, about, long_about = None)]
struct Cli {
    /// Configuration script to load
    config: PathBuf,

    /// Settings file (TOML or JSON); defaults to the platform config directory
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Only load and validate the configuration, then print the node list
    #[arg(long)]
    check: bool,

    /// Seconds to run the pipeline before shutting down
    #[arg(long, default_value_t = 5)]
    run_for: u64,

    /// Log option keys that no driver recognises
    #[arg(long)]
    warn_unknown_keys: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_or_default(cli.settings.as_deref())?;
    if cli.warn_unknown_keys {
        settings.projection.unknown_keys = UnknownKeys::Warn;
    }

    let _log_guard = logscript::logging::init_tracing(&settings.logging)?;

    tracing::info!("Starting logscript with {:?}", cli.config);

    let loader = ConfigLoader::from_settings(registry::global(), &settings);
    let loaded = loader
        .load_file(&cli.config)
        .with_context(|| format!("Cannot use configuration {:?}", cli.config))?;

    for (driver, key) in &loaded.unknown_keys {
        tracing::warn!("{}: unknown option '{}'", driver, key);
    }

    if cli.check {
        for (index, node) in loaded.nodes.iter().enumerate() {
            println!("{:>3}  {}", index, node.describe());
        }
        println!(
            "{} nodes, {} option errors",
            loaded.nodes.len(),
            loaded.config_errors.len()
        );
        return Ok(());
    }

    let script_sources = loaded
        .nodes
        .iter()
        .filter(|node| matches!(node, Driver::ScriptSource(_)))
        .count();

    let mut host = PipelineHost::new(settings.host.queue_capacity);
    host.register_all(loaded.nodes);
    host.init_all().context("Pipeline failed to start")?;

    let deadline = Instant::now() + Duration::from_secs(cli.run_for);
    let mut stopped = 0;
    loop {
        let slice = (Instant::now() + Duration::from_millis(100)).min(deadline);
        for signal in host.main_loop().run_until(slice, |_| false) {
            let node = signal.node();
            match &signal {
                HostSignal::SourceStopped { reason, .. } => {
                    stopped += 1;
                    tracing::info!("{} stopped: {:?}", node, reason);
                }
                HostSignal::LifecycleFault { message, .. } => {
                    tracing::error!("{}: {}", node, message);
                }
                HostSignal::SourceStarted { .. } => {
                    tracing::debug!("{} started", node);
                }
            }
        }
        print_messages(&host)?;

        if Instant::now() >= deadline {
            break;
        }
        if script_sources > 0 && stopped >= script_sources {
            tracing::info!("All script sources finished");
            break;
        }
    }

    let clean = host.deinit_all();
    print_messages(&host)?;
    if !clean {
        tracing::warn!("Some nodes did not shut down cleanly");
    }

    tracing::info!("logscript shutdown complete");
    Ok(())
}

fn print_messages(host: &PipelineHost) -> anyhow::Result<()> {
    for message in host.drain_messages() {
        println!("{}", serde_json::to_string(&message)?);
    }
    Ok(())
}
