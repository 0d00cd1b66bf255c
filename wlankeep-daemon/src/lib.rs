pub mod config;
pub mod console;
pub mod file_lock;
pub mod sink;
pub mod watch;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use wlankeep::{
    Event, NetworkCommandAdapter, ScriptedAdapter, TargetConfig, TimeoutConfig, WifiKeeper,
};

use crate::config::Overrides;
use crate::file_lock::acquire_app_lock;
use crate::watch::ConfigWatcher;

/// Settle delay used with the simulated utility.
const SIMULATED_SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "wlankeepd")]
#[command(about = "Keeps this host connected to one Wi-Fi network")]
#[command(disable_version_flag = true)]
#[command(version)]
pub struct Args {
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    pub version: bool,

    /// Settings file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Use a simulated network utility instead of netsh
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Keep the connection (default)
    Run,
    /// Show the connection status and visible networks
    Status {
        #[arg(long)]
        adapter: Option<String>,
    },
    /// List wireless adapters
    Adapters,
    /// List visible networks
    Networks {
        #[arg(long)]
        adapter: Option<String>,
    },
    /// List saved profiles
    Profiles,
    /// Connect to the target network once
    Connect {
        #[arg(long)]
        network: Option<String>,
        #[arg(long)]
        adapter: Option<String>,
    },
    /// Show or change the saved settings
    Configure {
        #[arg(long)]
        adapter: Option<String>,
        #[arg(long)]
        network: Option<String>,
        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
}

pub async fn run() -> Result<()> {
    run_with(Args::parse()).await
}

pub async fn run_with(args: Args) -> Result<()> {
    if args.version {
        println!(
            "wlankeepd {} ({})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_HASH")
        );
        return Ok(());
    }

    init_logging(args.debug);

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let settings = config::load(&config_path);

    match args.command.clone().unwrap_or(Command::Run) {
        Command::Run => run_daemon(&args, &config_path, settings).await,
        Command::Status { adapter } => {
            let adapter = adapter.unwrap_or_else(|| settings.selected_adapter.clone());
            show_status(&build_keeper(args.simulate, settings), &adapter).await
        }
        Command::Adapters => {
            let keeper = build_keeper(args.simulate, settings);
            for adapter in keeper.list_adapters().await? {
                println!("{:24} {}", adapter.name, adapter.state);
            }
            Ok(())
        }
        Command::Networks { adapter } => {
            let adapter = adapter.unwrap_or_else(|| settings.selected_adapter.clone());
            let keeper = build_keeper(args.simulate, settings);
            for network in keeper.list_networks(&adapter).await? {
                println!("{}", network.ssid);
            }
            Ok(())
        }
        Command::Profiles => {
            let keeper = build_keeper(args.simulate, settings);
            for profile in keeper.list_profiles().await? {
                println!("{}", profile.ssid);
            }
            Ok(())
        }
        Command::Connect { network, adapter } => {
            let overrides = Overrides {
                adapter,
                network,
                interval: None,
            };
            connect_once(build_keeper(args.simulate, overrides.apply(settings))).await
        }
        Command::Configure {
            adapter,
            network,
            interval,
        } => {
            let overrides = Overrides {
                adapter,
                network,
                interval,
            };
            configure(&config_path, settings, &overrides)
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "info,wlankeep=debug,wlankeep_daemon=debug"
    } else {
        "info"
    };
    // a logger may already be installed when embedded or under test
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .try_init();
}

/// A utility stand-in that always sees the target and connects to it.
pub fn simulated_adapter(settings: &TargetConfig) -> ScriptedAdapter {
    let adapter = if settings.selected_adapter.is_empty() {
        "Wi-Fi"
    } else {
        settings.selected_adapter.as_str()
    };

    let mut networks = vec!["Neighbor-2.4G".to_string(), "CoffeeShop".to_string()];
    if settings.is_configured() {
        networks.insert(0, settings.selected_network.clone());
    }
    let networks: String = networks
        .iter()
        .enumerate()
        .map(|(i, ssid)| format!("SSID {} : {ssid}\n", i + 1))
        .collect();

    let profiles = if settings.is_configured() {
        format!("    All User Profile     : {}\n", settings.selected_network)
    } else {
        String::new()
    };

    ScriptedAdapter::new()
        .with_interfaces([format!(
            "    Name                   : {adapter}\n    State                  : disconnected\n"
        )])
        .with_networks(networks)
        .with_profiles(profiles)
        .associating_on_connect()
}

fn build_keeper(simulate: bool, settings: TargetConfig) -> WifiKeeper {
    if simulate {
        info!("Using the simulated network utility");
        let adapter: Arc<dyn NetworkCommandAdapter> = Arc::new(simulated_adapter(&settings));
        WifiKeeper::with_timeouts(
            adapter,
            settings,
            TimeoutConfig::new().with_settle_delay(SIMULATED_SETTLE_DELAY),
        )
    } else {
        WifiKeeper::netsh(settings)
    }
}

async fn show_status(keeper: &WifiKeeper, adapter: &str) -> Result<()> {
    let (status, networks) = futures::try_join!(
        keeper.connection_status(adapter),
        keeper.list_networks(adapter)
    )?;

    if status.connected {
        println!("Connected to {} on {}", status.ssid, status.adapter_name);
        if !status.signal_strength.is_empty() {
            println!("Signal: {}", status.signal_strength);
        }
    } else {
        println!("Not connected");
    }

    println!("Visible networks:");
    for network in networks {
        let marker = if status.is_connected_to(&network.ssid) { "*" } else { " " };
        println!(" {marker} {}", network.ssid);
    }
    Ok(())
}

async fn connect_once(keeper: WifiKeeper) -> Result<()> {
    let mut events = keeper.subscribe();
    let outcome = keeper.connect_now().await;

    while let Ok(event) = events.try_recv() {
        if let Event::Notify(notification) = event {
            println!("{}", sink::render(&notification));
        }
    }

    let status = keeper.status().await;
    println!("{status}");
    if !outcome.is_connected() {
        anyhow::bail!("{}", status.message);
    }
    Ok(())
}

fn configure(path: &Path, settings: TargetConfig, overrides: &Overrides) -> Result<()> {
    if overrides.is_empty() {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let updated = overrides.apply(settings);
    config::save(path, &updated)?;
    println!("Saved settings to {}", path.display());
    Ok(())
}

async fn run_daemon(args: &Args, config_path: &Path, settings: TargetConfig) -> Result<()> {
    let _lock = acquire_app_lock()
        .map_err(anyhow::Error::msg)
        .context("Failed to start")?;

    info!("wlankeepd {} starting", env!("CARGO_PKG_VERSION"));
    info!("Settings file: {}", config_path.display());
    if !settings.is_configured() {
        warn!("No target network configured; run `wlankeepd configure --network <ssid>`");
    }

    let keeper = build_keeper(args.simulate, settings);
    let sink = sink::spawn(keeper.subscribe());
    let poller = keeper.start().context("Failed to start the poller")?;
    let watcher = watch::spawn(
        ConfigWatcher::new(config_path.to_path_buf()),
        keeper.config_publisher(),
    );

    println!("Commands: connect, status, quit");
    tokio::select! {
        _ = console::run(&keeper, &poller) => info!("Quit requested"),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Interrupted");
        }
    }

    watcher.abort();
    poller.stop().await;
    sink.abort();
    info!("wlankeepd stopped");
    Ok(())
}
