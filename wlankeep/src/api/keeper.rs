use std::sync::Arc;
use tokio::sync::broadcast;

use crate::Result;
use crate::api::models::{
    Adapter, ConnectionStatus, Event, Network, NetworkProfile, PollerError, StatusUpdate,
    TargetConfig, TickOutcome, TimeoutConfig,
};
use crate::core::command::{NetshAdapter, NetworkCommandAdapter};
use crate::core::context::{ConfigPublisher, KeeperContext};
use crate::core::machine::ConnectionMachine;
use crate::monitoring::poller::Poller;

/// Keeps a host associated with one wireless network.
///
/// This is the main entry point of the crate. It owns the connection state
/// machine and the shared context, and hands out the collaborator-facing
/// pieces: a [`ConfigPublisher`] for the settings side, event receivers for
/// the notification side, and a [`Poller`] for the schedule.
///
/// # Creating an Instance
///
/// ```no_run
/// use wlankeep::{TargetConfig, WifiKeeper};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keeper = WifiKeeper::netsh(TargetConfig::for_network("HomeNet"));
///
/// let poller = keeper.start()?;
/// let mut events = keeper.subscribe();
/// while let Ok(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// poller.stop().await;
/// # Ok(())
/// # }
/// ```
///
/// # One-off Queries
///
/// The listing methods go straight to the utility and do not touch the
/// published state.
///
/// ```no_run
/// use wlankeep::{TargetConfig, WifiKeeper};
///
/// # async fn example() -> wlankeep::Result<()> {
/// let keeper = WifiKeeper::netsh(TargetConfig::default());
///
/// for adapter in keeper.list_adapters().await? {
///     println!("{}: {}", adapter.name, adapter.state);
/// }
/// for profile in keeper.list_profiles().await? {
///     println!("saved: {}", profile.ssid);
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// `WifiKeeper` is `Clone`; clones share the same state machine, so a tick
/// from one and a manual connect from another publish through the same
/// state.
#[derive(Debug, Clone)]
pub struct WifiKeeper {
    machine: Arc<ConnectionMachine>,
    publisher: ConfigPublisher,
}

impl WifiKeeper {
    /// Creates a keeper driving `adapter` with default timeouts.
    pub fn new(adapter: impl NetworkCommandAdapter + 'static, config: TargetConfig) -> Self {
        Self::with_timeouts(Arc::new(adapter), config, TimeoutConfig::default())
    }

    /// Creates a keeper driving `netsh wlan` with default timeouts.
    pub fn netsh(config: TargetConfig) -> Self {
        Self::new(NetshAdapter::new(), config)
    }

    /// Creates a keeper with a shared adapter and custom timeouts.
    ///
    /// `timeouts.settle_delay` is used by the state machine; the command
    /// timeout belongs to the adapter and is not applied here.
    pub fn with_timeouts(
        adapter: Arc<dyn NetworkCommandAdapter>,
        config: TargetConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        let (context, publisher) = KeeperContext::new(config);
        let machine = ConnectionMachine::new(adapter, Arc::new(context), timeouts.settle_delay);
        Self {
            machine: Arc::new(machine),
            publisher,
        }
    }

    /// Lists the wireless adapters on the host.
    pub async fn list_adapters(&self) -> Result<Vec<Adapter>> {
        self.machine.adapter().list_adapters().await
    }

    /// Lists the networks visible to `adapter` (all adapters when empty).
    pub async fn list_networks(&self, adapter: &str) -> Result<Vec<Network>> {
        self.machine.adapter().scan_networks(adapter).await
    }

    /// Lists the saved connection profiles.
    pub async fn list_profiles(&self) -> Result<Vec<NetworkProfile>> {
        self.machine.adapter().list_profiles().await
    }

    /// Queries the live connection status of `adapter`.
    pub async fn connection_status(&self, adapter: &str) -> Result<ConnectionStatus> {
        self.machine.adapter().connection_status(adapter).await
    }

    /// Issues a raw connect command, bypassing the state machine.
    ///
    /// Use [`connect_now`](Self::connect_now) to connect to the configured
    /// target with status and notifications.
    pub async fn connect(&self, ssid: &str, adapter: &str) -> Result<()> {
        self.machine.adapter().connect(ssid, adapter).await
    }

    /// Runs one tick of the state machine.
    pub async fn tick(&self) -> TickOutcome {
        self.machine.tick().await
    }

    /// Connects to the configured target now, even if the schedule would
    /// not tick yet.
    pub async fn connect_now(&self) -> TickOutcome {
        self.machine.connect_now().await
    }

    /// The last published `(state, message)` pair.
    pub async fn status(&self) -> StatusUpdate {
        self.machine.context().status().await
    }

    /// Subscribes to status and notification events.
    ///
    /// Only events published after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.machine.context().subscribe()
    }

    /// The sender side of the target configuration.
    pub fn config_publisher(&self) -> ConfigPublisher {
        self.publisher.clone()
    }

    /// The target configuration the next tick will use.
    pub fn target(&self) -> TargetConfig {
        self.machine.context().target()
    }

    /// Starts polling on the current Tokio runtime.
    pub fn start(&self) -> std::result::Result<Poller, PollerError> {
        Poller::start(self.machine.clone())
    }
}
