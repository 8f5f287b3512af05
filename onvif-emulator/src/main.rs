use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config_manager::{ConfigError, EmulatorConfig};
use onvif_server::{ClockMode, DispatchPolicy, Dispatcher};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// ONVIF Device Emulator
///
/// - Answers ONVIF device, media and PTZ queries with canned SOAP responses
/// - Advertises a fixed set of media profiles and stream URIs
/// - No camera hardware is driven

#[derive(Parser)]
#[command(name = "onvif-emulator")]
#[command(about = "Emulated ONVIF network camera control plane")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/onvif-emulator/emulator.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Report the host clock from GetSystemDateAndTime instead of the fixed time
    #[arg(long)]
    live_clock: bool,

    /// Classify requests by the SOAP Body element instead of substring search
    #[arg(long)]
    strict_dispatch: bool,

    /// Enable debug logging (request and response bodies)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the emulator (default)
    Serve,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => EmulatorConfig::default_path()?,
    };

    match cli.command {
        Some(Command::Init { force }) => init_config(&config_path, force),
        Some(Command::Serve) | None => {
            let config = load_config(&config_path, &cli)?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(serve(config))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "onvif_emulator=debug,onvif_server=debug"
    } else {
        "onvif_emulator=info,onvif_server=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    EmulatorConfig::default()
        .save_to(path)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!("Wrote default config to {}", path.display());
    Ok(())
}

/// Load the config file (defaults if absent) and apply CLI overrides
fn load_config(path: &Path, cli: &Cli) -> Result<EmulatorConfig> {
    let mut config = match EmulatorConfig::load_from(path) {
        Ok(config) => {
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        Err(ConfigError::NotFound(_)) => {
            tracing::info!("No config at {}, using defaults", path.display());
            EmulatorConfig::default()
        }
        Err(e) => return Err(e).with_context(|| format!("loading {}", path.display())),
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if cli.live_clock {
        config.dispatch.clock = ClockMode::Live;
    }
    if cli.strict_dispatch {
        config.dispatch.policy = DispatchPolicy::Element;
    }

    config.validate()?;
    Ok(config)
}

async fn serve(config: EmulatorConfig) -> Result<()> {
    let store = Arc::new(config.device_store()?);
    let dispatcher = Dispatcher::new(store, config.advertised_address())
        .with_policy(config.dispatch.policy)
        .with_clock(config.dispatch.clock);

    let store = dispatcher.store();
    let identity = store.identity();
    tracing::info!(
        "Emulating {} {} ({}), {} profile(s), {:?} dispatch, {:?} clock",
        identity.manufacturer,
        identity.model,
        identity.name,
        store.profiles().len(),
        dispatcher.policy(),
        dispatcher.clock(),
    );

    onvif_server::run_onvif_server(config.socket_addr(), dispatcher)
        .await
        .with_context(|| format!("ONVIF server on {}", config.socket_addr()))?;
    Ok(())
}
