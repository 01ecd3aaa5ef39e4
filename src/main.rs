use anyhow::{Context, Result};
use clap::Parser;

use newtab_server::app::AppContext;
use newtab_server::cli::{self, Cli, Commands};
use newtab_server::core::HistoryStore;
use newtab_server::utils::{init_tracing, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = load_config(&cli)?;

    match cli.command {
        #[cfg(feature = "server")]
        None => handle_serve(config, false).await?,
        #[cfg(not(feature = "server"))]
        None => {
            println!("Built without the server feature.");
            println!("Use 'check', 'snapshot' or 'history'.");
        }
        #[cfg(feature = "server")]
        Some(Commands::Serve { cors }) => handle_serve(config, cors).await?,
        Some(Commands::Check) => handle_check(config)?,
        Some(Commands::Snapshot) => handle_snapshot(config).await?,
        Some(Commands::History { minutes }) => handle_history(config, minutes)?,
    }

    Ok(())
}

/// Settings file first, then CLI flags on top
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.settings.as_deref())?;

    if let Some(host) = &cli.bind_host {
        config.bind_host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(layout) = &cli.config {
        config.layout = layout.clone();
    }

    Ok(config)
}

#[cfg(feature = "server")]
async fn handle_serve(config: AppConfig, cors: bool) -> Result<()> {
    let ctx = std::sync::Arc::new(AppContext::new(config)?);
    newtab_server::server::run(ctx, cors).await
}

fn handle_check(mut config: AppConfig) -> Result<()> {
    // Checking a layout never needs the store
    config.sampler.enabled = false;
    let ctx = AppContext::new(config)?;

    println!("{}", cli::layout_report(&ctx.layout(), &ctx.config().layout));
    Ok(())
}

async fn handle_snapshot(mut config: AppConfig) -> Result<()> {
    config.sampler.enabled = false;
    let ctx = AppContext::new(config)?;

    println!("{}", cli::snapshot_json(&ctx).await?);
    Ok(())
}

fn handle_history(config: AppConfig, minutes: i64) -> Result<()> {
    let since = cli::history_since(minutes)?;
    if !config.sampler.enabled {
        println!("Sampler is disabled in the settings; no history recorded.");
        return Ok(());
    }

    let path = config.sampler.store_path()?;
    let store = HistoryStore::open(&path)
        .with_context(|| format!("Failed to open history store at {}", path.display()))?;
    let rows = store.load_since(since)?;

    println!("{}", cli::history_report(&rows, minutes));
    Ok(())
}
