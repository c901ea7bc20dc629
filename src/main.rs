//! ==============================================================================
//! main.rs - simtemp host entry point
//! ==============================================================================
//!
//! usage:
//!     simtemp [CONFIG.toml] [sampling_ms=N] [threshold_mC=N]
//!
//! start-up:
//!     1. load configuration (explicit path, or config/simtemp.toml, or defaults)
//!     2. apply name=value overrides on top of [params]
//!     3. probe the device with the resulting boot parameters
//!     4. arm the sampling engine
//!     5. serve the device surface until ctrl-c
//!
//! ==============================================================================

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use simtemp::config::SimtempConfig;
use simtemp::hal::{MonotonicClock, SystemRandom};
use simtemp::server;
use simtemp::SimTemp;

/// RUST_LOG wins over the level from the config file
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_config(args: &[String]) -> Result<SimtempConfig> {
    let (params, paths): (Vec<&String>, Vec<&String>) = args.iter().partition(|a| a.contains('='));

    let mut config = match paths.as_slice() {
        [] => SimtempConfig::load_or_default(),
        [path] => SimtempConfig::load(path.as_str())?,
        _ => anyhow::bail!("expected at most one config path, got {}", paths.len()),
    };
    for arg in params {
        config.params.apply_arg(arg).context("invalid boot parameter")?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = load_config(&args)?;
    init_tracing(&config.logging.level);
    config.print_summary();

    let dev = SimTemp::probe(&config.params);
    let engine = dev.start(SystemRandom::new(), MonotonicClock::new(), config.logging.show_samples);

    tokio::select! {
        res = server::run_server(dev.clone(), &config.server.bind) => {
            if let Err(e) = &res {
                error!("device surface error: {:#}", e);
            }
            engine.shutdown().await;
            res
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            engine.shutdown().await;
            info!("simtemp sensor removed");
            Ok(())
        }
    }
}
