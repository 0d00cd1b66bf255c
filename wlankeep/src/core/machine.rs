//! The connection state machine.
//!
//! A tick re-derives everything from the latest configuration and fresh
//! utility queries; the only state carried between ticks is the published
//! `(state, message)` pair held by the context.

use futures_timer::Delay;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::api::models::{
    ConnectionState, Notification, NotificationKind, StatusUpdate, TargetConfig, TickOutcome,
};
use crate::core::command::NetworkCommandAdapter;
use crate::core::context::KeeperContext;
use crate::types::constants::{messages, notifications};

pub(crate) struct ConnectionMachine {
    adapter: Arc<dyn NetworkCommandAdapter>,
    context: Arc<KeeperContext>,
    settle_delay: Duration,
}

impl std::fmt::Debug for ConnectionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMachine")
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

impl ConnectionMachine {
    pub(crate) fn new(
        adapter: Arc<dyn NetworkCommandAdapter>,
        context: Arc<KeeperContext>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            adapter,
            context,
            settle_delay,
        }
    }

    pub(crate) fn adapter(&self) -> &Arc<dyn NetworkCommandAdapter> {
        &self.adapter
    }

    pub(crate) fn context(&self) -> &Arc<KeeperContext> {
        &self.context
    }

    /// Runs one scheduled tick.
    pub(crate) async fn tick(&self) -> TickOutcome {
        let target = self.context.target();

        if !target.is_configured() {
            debug!("No target network configured");
            self.publish(&target, ConnectionState::Disconnected, messages::NOT_CONFIGURED, None)
                .await;
            return TickOutcome::NotConfigured;
        }

        let ssid = target.selected_network.as_str();
        match self.adapter.connection_status(&target.selected_adapter).await {
            Ok(status) if status.is_connected_to(ssid) => {
                debug!("Already connected to {ssid} ({})", status.signal_strength);
                self.publish(
                    &target,
                    ConnectionState::Connected,
                    messages::connected(ssid),
                    None,
                )
                .await;
                TickOutcome::AlreadyConnected
            }
            Ok(status) => {
                debug!(
                    "Not connected to {ssid} (connected={}, ssid={:?})",
                    status.connected, status.ssid
                );
                self.connect_if_in_range(&target).await
            }
            Err(e) => {
                warn!("Failed to query connection status: {e}");
                self.publish(&target, ConnectionState::Disconnected, messages::STATUS_ERROR, None)
                    .await;
                TickOutcome::StatusUnavailable
            }
        }
    }

    /// Runs a manual connect, skipping the "already connected" check.
    pub(crate) async fn connect_now(&self) -> TickOutcome {
        let target = self.context.target();

        if !target.is_configured() {
            warn!("Manual connect requested with no target network configured");
            let hint = Notification::new(
                NotificationKind::Failure,
                notifications::UNCONFIGURED_TITLE,
                notifications::UNCONFIGURED_BODY,
            );
            self.publish(
                &target,
                ConnectionState::Disconnected,
                messages::NOT_CONFIGURED,
                Some(hint),
            )
            .await;
            return TickOutcome::NotConfigured;
        }

        info!("Manual connect to {}", target.selected_network);
        self.connect_if_in_range(&target).await
    }

    /// Scans for the target, connects, waits for the link to settle and
    /// verifies it.
    async fn connect_if_in_range(&self, target: &TargetConfig) -> TickOutcome {
        let ssid = target.selected_network.as_str();
        let adapter = target.selected_adapter.as_str();

        match self.adapter.is_network_available(adapter, ssid).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("{ssid} is not visible");
                self.publish(
                    target,
                    ConnectionState::Disconnected,
                    messages::not_in_range(ssid),
                    None,
                )
                .await;
                return TickOutcome::OutOfRange;
            }
            Err(e) => {
                warn!("Failed to scan networks: {e}");
                self.publish(target, ConnectionState::Disconnected, messages::SCAN_ERROR, None)
                    .await;
                return TickOutcome::ScanFailed;
            }
        }

        self.publish(
            target,
            ConnectionState::Searching,
            messages::connecting(ssid),
            None,
        )
        .await;

        info!("Connecting to {ssid}");
        if let Err(e) = self.adapter.connect(ssid, adapter).await {
            warn!("Connect command for {ssid} failed: {e}");
            let failure = Notification::new(
                NotificationKind::Failure,
                notifications::FAILURE_TITLE,
                notifications::failure_body(ssid),
            );
            self.publish(
                target,
                ConnectionState::Disconnected,
                messages::CONNECT_FAILED,
                Some(failure),
            )
            .await;
            return TickOutcome::ConnectRejected;
        }

        if !self.settle_delay.is_zero() {
            debug!("Waiting {:?} for the link to settle", self.settle_delay);
            Delay::new(self.settle_delay).await;
        }

        match self.adapter.connection_status(adapter).await {
            Ok(status) if status.is_connected_to(ssid) => {
                info!("Connected to {ssid}");
                let success = Notification::new(
                    NotificationKind::Success,
                    notifications::SUCCESS_TITLE,
                    notifications::success_body(ssid),
                );
                self.publish(
                    target,
                    ConnectionState::Connected,
                    messages::connected(ssid),
                    Some(success),
                )
                .await;
                TickOutcome::Connected
            }
            Ok(status) => {
                warn!(
                    "Connection to {ssid} not verified (connected={}, ssid={:?})",
                    status.connected, status.ssid
                );
                self.publish(target, ConnectionState::Disconnected, messages::VERIFY_FAILED, None)
                    .await;
                TickOutcome::VerificationFailed
            }
            Err(e) => {
                warn!("Failed to verify connection to {ssid}: {e}");
                self.publish(target, ConnectionState::Disconnected, messages::VERIFY_FAILED, None)
                    .await;
                TickOutcome::VerificationFailed
            }
        }
    }

    async fn publish(
        &self,
        target: &TargetConfig,
        state: ConnectionState,
        message: impl Into<String>,
        notification: Option<Notification>,
    ) {
        self.context
            .transition(StatusUpdate::new(state, message), target, notification)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::api::models::{
        Adapter, ConnectionStatus, Event, ExecutionError, Network, NetworkProfile,
    };
    use crate::core::scripted::{Operation, ScriptedAdapter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    const HOME: &str = "Name : Wi-Fi\nState : connected\nSSID 1 : HomeNet\n";
    const DISCONNECTED: &str = "Name : Wi-Fi\nState : disconnected\n";
    const OFFICE: &str = "Name : Wi-Fi\nState : connected\nSSID : OfficeNet\nSignal : 70%\n";

    struct Harness {
        machine: ConnectionMachine,
        adapter: Arc<ScriptedAdapter>,
        context: Arc<KeeperContext>,
        events: broadcast::Receiver<Event>,
    }

    fn harness(adapter: ScriptedAdapter, target: TargetConfig) -> Harness {
        let adapter = Arc::new(adapter);
        let (context, publisher) = KeeperContext::new(target);
        drop(publisher);
        let context = Arc::new(context);
        let events = context.subscribe();
        let machine = ConnectionMachine::new(adapter.clone(), context.clone(), Duration::ZERO);
        Harness {
            machine,
            adapter,
            context,
            events,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn notifications(events: &[Event]) -> Vec<Notification> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Notify(n) => Some(n.clone()),
                Event::Status(_) => None,
            })
            .collect()
    }

    async fn assert_status(ctx: &KeeperContext, state: ConnectionState, message: &str) {
        assert_eq!(ctx.status().await, StatusUpdate::new(state, message));
    }

    #[tokio::test]
    async fn unconfigured_is_disconnected_regardless_of_status() {
        for interfaces in [HOME, DISCONNECTED, OFFICE, ""] {
            let mut h = harness(
                ScriptedAdapter::new()
                    .with_interfaces([interfaces])
                    .with_networks("SSID 1 : HomeNet\n"),
                TargetConfig::default(),
            );

            assert_eq!(h.machine.tick().await, TickOutcome::NotConfigured);
            assert_status(&h.context, ConnectionState::Disconnected, "No network configured").await;
            assert!(h.adapter.calls().is_empty());
            assert!(notifications(&drain(&mut h.events)).is_empty());
        }
    }

    #[tokio::test]
    async fn already_connected_short_circuits() {
        let h = harness(
            ScriptedAdapter::new().with_interfaces([HOME]),
            TargetConfig::for_network("HomeNet"),
        );

        assert_eq!(h.machine.tick().await, TickOutcome::AlreadyConnected);
        assert_status(&h.context, ConnectionState::Connected, "Connected to HomeNet").await;
        assert_eq!(h.adapter.calls(), vec![Operation::ConnectionStatus]);
    }

    #[tokio::test]
    async fn status_error_is_reported() {
        let h = harness(
            ScriptedAdapter::new().failing(Operation::ConnectionStatus),
            TargetConfig::for_network("HomeNet"),
        );

        assert_eq!(h.machine.tick().await, TickOutcome::StatusUnavailable);
        assert_status(&h.context, ConnectionState::Disconnected, "Error checking status").await;
    }

    #[tokio::test]
    async fn target_not_in_range() {
        let h = harness(
            ScriptedAdapter::new()
                .with_interfaces([HOME])
                .with_networks("SSID 1 : HomeNet\n"),
            TargetConfig::for_network("OfficeNet"),
        );

        assert_eq!(h.machine.tick().await, TickOutcome::OutOfRange);
        assert_status(&h.context, ConnectionState::Disconnected, "OfficeNet not in range").await;
        assert!(h.adapter.connect_requests().is_empty());
    }

    #[tokio::test]
    async fn scan_error_is_reported() {
        let h = harness(
            ScriptedAdapter::new()
                .with_interfaces([DISCONNECTED])
                .failing(Operation::ScanNetworks),
            TargetConfig::for_network("HomeNet"),
        );

        assert_eq!(h.machine.tick().await, TickOutcome::ScanFailed);
        assert_status(&h.context, ConnectionState::Disconnected, "Error scanning networks").await;
    }

    #[tokio::test]
    async fn connects_and_verifies() {
        let mut h = harness(
            ScriptedAdapter::new()
                .with_interfaces([DISCONNECTED, OFFICE])
                .with_networks("SSID 1 : HomeNet\nSSID 2 : OfficeNet\n"),
            TargetConfig::for_network("OfficeNet").with_adapter("Wi-Fi"),
        );

        assert_eq!(h.machine.tick().await, TickOutcome::Connected);
        assert_status(&h.context, ConnectionState::Connected, "Connected to OfficeNet").await;

        assert_eq!(
            drain(&mut h.events),
            vec![
                Event::Status(StatusUpdate::new(
                    ConnectionState::Searching,
                    "Connecting to OfficeNet..."
                )),
                Event::Status(StatusUpdate::new(
                    ConnectionState::Connected,
                    "Connected to OfficeNet"
                )),
                Event::Notify(Notification::new(
                    NotificationKind::Success,
                    "Connected",
                    "Successfully connected to OfficeNet"
                )),
            ]
        );

        let requests = h.adapter.connect_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].ssid, "OfficeNet");
        assert_eq!(requests[0].adapter, "Wi-Fi");
        assert_eq!(
            h.adapter.calls(),
            vec![
                Operation::ConnectionStatus,
                Operation::ScanNetworks,
                Operation::Connect,
                Operation::ConnectionStatus,
            ]
        );
    }

    #[tokio::test]
    async fn rejected_connect_notifies_failure() {
        let mut h = harness(
            ScriptedAdapter::new()
                .with_interfaces([DISCONNECTED])
                .with_networks("SSID 1 : HomeNet\n")
                .failing(Operation::Connect),
            TargetConfig::for_network("HomeNet"),
        );

        assert_eq!(h.machine.tick().await, TickOutcome::ConnectRejected);
        assert_status(&h.context, ConnectionState::Disconnected, "Connection failed").await;
        assert_eq!(
            notifications(&drain(&mut h.events)),
            vec![Notification::new(
                NotificationKind::Failure,
                "Connection Failed",
                "Could not connect to HomeNet"
            )]
        );
    }

    #[tokio::test]
    async fn wrong_ssid_after_settle_fails_verification() {
        let mut h = harness(
            ScriptedAdapter::new()
                .with_interfaces([HOME])
                .with_networks("SSID 1 : HomeNet\nSSID 2 : OfficeNet\n"),
            TargetConfig::for_network("OfficeNet"),
        );

        assert_eq!(h.machine.tick().await, TickOutcome::VerificationFailed);
        assert_status(
            &h.context,
            ConnectionState::Disconnected,
            "Connection verification failed",
        )
        .await;
        assert!(notifications(&drain(&mut h.events)).is_empty());
    }

    /// Answers the first status query and fails every later one.
    struct FlakyStatus {
        queries: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl NetworkCommandAdapter for FlakyStatus {
        async fn list_adapters(&self) -> Result<Vec<Adapter>> {
            Ok(Vec::new())
        }

        async fn scan_networks(&self, _adapter: &str) -> Result<Vec<Network>> {
            Ok(vec![Network {
                ssid: "HomeNet".into(),
            }])
        }

        async fn list_profiles(&self) -> Result<Vec<NetworkProfile>> {
            Ok(Vec::new())
        }

        async fn connection_status(&self, _adapter: &str) -> Result<ConnectionStatus> {
            if self.queries.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ConnectionStatus::default())
            } else {
                Err(ExecutionError::Timeout {
                    command: "netsh wlan show interfaces".into(),
                    after: Duration::from_secs(10),
                })
            }
        }

        async fn connect(&self, _ssid: &str, _adapter: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_verification_query_counts_as_verification_failure() {
        let (context, _publisher) = KeeperContext::new(TargetConfig::for_network("HomeNet"));
        let context = Arc::new(context);
        let machine = ConnectionMachine::new(
            Arc::new(FlakyStatus {
                queries: AtomicUsize::new(0),
            }),
            context.clone(),
            Duration::ZERO,
        );

        assert_eq!(machine.tick().await, TickOutcome::VerificationFailed);
        assert_status(
            &context,
            ConnectionState::Disconnected,
            "Connection verification failed",
        )
        .await;
    }

    #[tokio::test]
    async fn losing_the_link_notifies_once() {
        let mut h = harness(
            ScriptedAdapter::new()
                .with_interfaces([HOME, DISCONNECTED])
                .with_networks(""),
            TargetConfig::for_network("HomeNet"),
        );

        assert_eq!(h.machine.tick().await, TickOutcome::AlreadyConnected);
        assert_eq!(h.machine.tick().await, TickOutcome::OutOfRange);
        assert_eq!(h.machine.tick().await, TickOutcome::OutOfRange);

        assert_eq!(
            notifications(&drain(&mut h.events)),
            vec![Notification::new(
                NotificationKind::Lost,
                "Disconnected",
                "Lost connection to HomeNet"
            )]
        );
    }

    #[tokio::test]
    async fn connect_now_without_target_hints_at_settings() {
        let mut h = harness(ScriptedAdapter::new(), TargetConfig::default());

        assert_eq!(h.machine.connect_now().await, TickOutcome::NotConfigured);
        assert_status(&h.context, ConnectionState::Disconnected, "No network configured").await;
        assert_eq!(
            notifications(&drain(&mut h.events)),
            vec![Notification::new(
                NotificationKind::Failure,
                "Error",
                "No target network configured. Open Settings to configure."
            )]
        );
        assert!(h.adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn connect_now_skips_the_connected_check() {
        let h = harness(
            ScriptedAdapter::new()
                .with_interfaces([HOME])
                .with_networks("SSID 1 : HomeNet\n"),
            TargetConfig::for_network("HomeNet"),
        );

        assert_eq!(h.machine.connect_now().await, TickOutcome::Connected);
        assert_eq!(
            h.adapter.calls(),
            vec![
                Operation::ScanNetworks,
                Operation::Connect,
                Operation::ConnectionStatus,
            ]
        );
    }

    #[tokio::test]
    async fn settle_delay_precedes_verification() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .with_interfaces([DISCONNECTED])
                .with_networks("SSID 1 : HomeNet\n")
                .associating_on_connect(),
        );
        let (context, _publisher) = KeeperContext::new(TargetConfig::for_network("HomeNet"));
        let delay = Duration::from_millis(40);
        let machine = ConnectionMachine::new(adapter, Arc::new(context), delay);

        let started = std::time::Instant::now();
        assert_eq!(machine.tick().await, TickOutcome::Connected);
        assert!(started.elapsed() >= delay);
    }

    #[tokio::test]
    async fn concurrent_runs_publish_whole_pairs() {
        let mut h = harness(
            ScriptedAdapter::new()
                .with_interfaces([DISCONNECTED])
                .with_networks("SSID 1 : HomeNet\n")
                .associating_on_connect(),
            TargetConfig::for_network("HomeNet"),
        );

        let (a, b) = tokio::join!(h.machine.tick(), h.machine.connect_now());
        assert!(a.is_connected() || b.is_connected());

        for event in drain(&mut h.events) {
            if let Event::Status(update) = event {
                let expected = match update.state {
                    ConnectionState::Connected => "Connected to HomeNet",
                    ConnectionState::Searching => "Connecting to HomeNet...",
                    ConnectionState::Disconnected => continue,
                };
                assert_eq!(update.message, expected);
            }
        }
        assert_status(&h.context, ConnectionState::Connected, "Connected to HomeNet").await;
    }
}
