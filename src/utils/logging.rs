/// Tracing subscriber setup
///
/// `RUST_LOG` wins when set. Otherwise the crate logs at info, or at debug
/// with `--verbose`, and everything else at warn.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn init_tracing(verbose: bool) -> Result<()> {
    let default_directive = if verbose {
        "warn,newtab_server=debug,tower_http=debug"
    } else {
        "warn,newtab_server=info"
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
