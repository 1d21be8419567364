//! warden
//!
//! Runs one supervision cycle over the configured actors and exits. Meant to
//! be started periodically by a systemd timer.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tracing::{info, warn};
use warden_core::{
    FileLedgerStore, LedgerStore, MemoryLedgerStore, Orchestrator, SystemClock, SystemHost,
};
use warden_exec::LocalExecutor;

mod config;
mod logging;

use config::Config;

/// Self-healing supervisor for host services and links
#[derive(Parser, Debug)]
#[command(name = "warden", version, about)]
struct Args {
    /// Configuration file (defaults to WARDEN_CONFIG or the standard paths)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Probe and decide, but only log restarts, reboots and reclamation.
    /// Restart accounting is kept in memory for the run.
    #[arg(long)]
    dry_run: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let path = args.config.clone().or_else(Config::locate);
    let config = match &path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    logging::init(&config.log);

    match &path {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => warn!("no config file found, using defaults"),
    }

    config.supervisor.validate()?;

    if args.check_config {
        info!(actors = config.supervisor.actors.len(), "configuration is valid");
        return Ok(());
    }

    let supervisor = &config.supervisor;

    let executor = Arc::new(LocalExecutor::new());
    let host = Arc::new(
        SystemHost::new(executor, supervisor.timeouts.command()).with_dry_run(args.dry_run),
    );
    let store: Arc<dyn LedgerStore> = if args.dry_run {
        Arc::new(MemoryLedgerStore::new())
    } else {
        Arc::new(FileLedgerStore::new(&supervisor.ledger.state_dir))
    };

    let orchestrator = Orchestrator::new(supervisor, host, store, Arc::new(SystemClock));

    info!(
        actors = orchestrator.actor_count(),
        dry_run = args.dry_run,
        "starting check cycle"
    );

    let result = orchestrator.run_cycle().await;

    info!(
        healthy = result.healthy,
        blocked = result.blocked(),
        actions = result.actions.len(),
        "check cycle complete"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from(["warden", "--config", "/etc/warden/warden.toml", "--dry-run"]);

        assert_eq!(args.config, Some(PathBuf::from("/etc/warden/warden.toml")));
        assert!(args.dry_run);
        assert!(!args.check_config);
    }
}
