use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

use crate::types::constants::{messages, timeouts};

/// A wireless adapter as listed by `show interfaces`.
///
/// This is a snapshot: adapters are re-enumerated on every call and carry no
/// identity beyond their name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adapter {
    pub name: String,
    /// Free-form state text reported by the utility, e.g. `connected`.
    pub state: String,
}

/// A network visible to an adapter at scan time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub ssid: String,
}

/// A saved connection profile known to the utility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub ssid: String,
}

/// Live connection state of one adapter at the moment of the query.
///
/// `connected` is only ever `true` when `ssid` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub ssid: String,
    pub adapter_name: String,
    /// Opaque signal text as printed by the utility, e.g. `87%`.
    pub signal_strength: String,
}

impl ConnectionStatus {
    /// Returns whether this status shows an association with `ssid`.
    pub fn is_connected_to(&self, ssid: &str) -> bool {
        self.connected && self.ssid == ssid
    }
}

/// The network the keeper should hold on to.
///
/// Produced by the configuration collaborator; the keeper only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Adapter to drive. Empty means whichever adapter the utility picks.
    pub selected_adapter: String,
    /// SSID to keep associated with. Empty means unconfigured.
    pub selected_network: String,
    /// Seconds between scheduled ticks.
    #[serde(deserialize_with = "lenient_interval")]
    pub poll_interval: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            selected_adapter: String::new(),
            selected_network: String::new(),
            poll_interval: timeouts::DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl TargetConfig {
    /// Creates a configuration targeting `network` on any adapter.
    pub fn for_network(network: impl Into<String>) -> Self {
        Self {
            selected_network: network.into(),
            ..Self::default()
        }
    }

    /// Restricts the configuration to a single adapter.
    #[must_use]
    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.selected_adapter = adapter.into();
        self
    }

    /// Sets the poll interval in seconds.
    #[must_use]
    pub fn with_poll_interval(mut self, secs: u64) -> Self {
        self.poll_interval = secs;
        self
    }

    /// Returns whether a target network has been chosen.
    pub fn is_configured(&self) -> bool {
        !self.selected_network.is_empty()
    }

    /// Replaces a zero poll interval with the default.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.poll_interval == 0 {
            self.poll_interval = timeouts::DEFAULT_POLL_INTERVAL_SECS;
        }
        self
    }

    /// The poll interval as a `Duration`, never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval.max(1))
    }
}

/// Accepts any integer and maps non-positive values to the default interval.
fn lenient_interval<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    if raw <= 0 {
        Ok(timeouts::DEFAULT_POLL_INTERVAL_SECS)
    } else {
        Ok(raw as u64)
    }
}

/// Timeouts applied to utility calls and connection verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Upper bound on a single utility invocation.
    pub command_timeout: Duration,
    /// Pause between issuing a connect command and re-checking the link.
    pub settle_delay: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_timeout: timeouts::command_timeout(),
            settle_delay: timeouts::settle_delay(),
        }
    }
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// State of the keeper's connection state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Searching,
    Connected,
}

impl ConnectionState {
    /// Short text suitable for a tray tooltip.
    pub fn tooltip(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Searching => "Connecting...",
            Self::Connected => "Connected",
        }
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Searching => write!(f, "Searching"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// A published `(state, message)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub state: ConnectionState,
    pub message: String,
}

impl StatusUpdate {
    pub fn new(state: ConnectionState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }
}

impl Default for StatusUpdate {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected, messages::INITIALIZING)
    }
}

impl Display for StatusUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.state, self.message)
    }
}

/// The notification-worthy moments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Failure,
    Lost,
}

/// A user-facing notification. Delivery is best effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// What an event sink receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Emitted on every state publication.
    Status(StatusUpdate),
    /// Emitted for connect success, connect failure and connection loss.
    Notify(Notification),
}

/// Why a tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No target network is configured.
    NotConfigured,
    /// Already associated with the target network.
    AlreadyConnected,
    /// The status query failed.
    StatusUnavailable,
    /// The network scan failed.
    ScanFailed,
    /// The target network is not visible.
    OutOfRange,
    /// A connect command was issued and the link verified.
    Connected,
    /// The utility rejected the connect command.
    ConnectRejected,
    /// The connect command was accepted but the link did not come up.
    VerificationFailed,
}

impl TickOutcome {
    /// Returns whether the tick left the keeper connected to the target.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::AlreadyConnected | Self::Connected)
    }
}

/// Errors raised when the external utility cannot be run to completion.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The utility could not be launched.
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The utility ran but reported failure.
    #[error("`{command}` failed ({status}): {detail}")]
    Failed {
        command: String,
        status: String,
        detail: String,
    },

    /// The utility did not finish in time.
    #[error("`{command}` timed out after {after:?}")]
    Timeout { command: String, after: Duration },
}

/// Errors raised when starting the poller.
#[derive(Debug, Error)]
pub enum PollerError {
    /// `Poller::start` was called outside a Tokio runtime.
    #[error("no async runtime available to drive the poller")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_config_defaults() {
        let cfg = TargetConfig::default();
        assert!(!cfg.is_configured());
        assert_eq!(cfg.selected_adapter, "");
        assert_eq!(cfg.poll_interval, 5);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn target_config_builders() {
        let cfg = TargetConfig::for_network("HomeNet")
            .with_adapter("Wi-Fi")
            .with_poll_interval(30);
        assert!(cfg.is_configured());
        assert_eq!(cfg.selected_network, "HomeNet");
        assert_eq!(cfg.selected_adapter, "Wi-Fi");
        assert_eq!(cfg.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn target_config_normalizes_zero_interval() {
        let cfg = TargetConfig::for_network("x").with_poll_interval(0);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
        assert_eq!(cfg.normalized().poll_interval, 5);
    }

    #[test]
    fn target_config_deserializes_file_fields() {
        let cfg: TargetConfig = serde_json::from_str(
            r#"{"selected_adapter":"Wi-Fi","selected_network":"HomeNet","poll_interval":10}"#,
        )
        .unwrap();
        assert_eq!(cfg, TargetConfig::for_network("HomeNet").with_adapter("Wi-Fi").with_poll_interval(10));
    }

    #[test]
    fn target_config_tolerates_missing_and_negative_fields() {
        let cfg: TargetConfig = serde_json::from_str(r#"{"poll_interval":-3}"#).unwrap();
        assert_eq!(cfg, TargetConfig::default());

        let cfg: TargetConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, TargetConfig::default());
    }

    #[test]
    fn connection_status_match() {
        let status = ConnectionStatus {
            connected: true,
            ssid: "HomeNet".into(),
            ..Default::default()
        };
        assert!(status.is_connected_to("HomeNet"));
        assert!(!status.is_connected_to("OfficeNet"));
        assert!(!ConnectionStatus::default().is_connected_to(""));
    }

    #[test]
    fn connection_state_display_and_tooltip() {
        assert_eq!(format!("{}", ConnectionState::Disconnected), "Disconnected");
        assert_eq!(format!("{}", ConnectionState::Searching), "Searching");
        assert_eq!(format!("{}", ConnectionState::Connected), "Connected");
        assert_eq!(ConnectionState::Searching.tooltip(), "Connecting...");
    }

    #[test]
    fn status_update_initial_value() {
        let update = StatusUpdate::default();
        assert_eq!(update.state, ConnectionState::Disconnected);
        assert_eq!(update.message, "Initializing...");
        assert_eq!(format!("{update}"), "Disconnected: Initializing...");
    }

    #[test]
    fn timeout_config_builders() {
        let cfg = TimeoutConfig::new()
            .with_command_timeout(Duration::from_secs(3))
            .with_settle_delay(Duration::ZERO);
        assert_eq!(cfg.command_timeout, Duration::from_secs(3));
        assert_eq!(cfg.settle_delay, Duration::ZERO);
        assert_eq!(TimeoutConfig::default().settle_delay, Duration::from_secs(2));
    }

    #[test]
    fn tick_outcome_connected() {
        assert!(TickOutcome::Connected.is_connected());
        assert!(TickOutcome::AlreadyConnected.is_connected());
        assert!(!TickOutcome::VerificationFailed.is_connected());
        assert!(!TickOutcome::NotConfigured.is_connected());
    }

    #[test]
    fn execution_error_display() {
        let err = ExecutionError::Failed {
            command: "netsh wlan show interfaces".into(),
            status: "exit status: 1".into(),
            detail: "The Wireless AutoConfig Service (wlansvc) is not running.".into(),
        };
        assert_eq!(
            format!("{err}"),
            "`netsh wlan show interfaces` failed (exit status: 1): The Wireless AutoConfig Service (wlansvc) is not running."
        );

        let err = ExecutionError::Timeout {
            command: "netsh wlan show networks".into(),
            after: Duration::from_secs(10),
        };
        assert_eq!(format!("{err}"), "`netsh wlan show networks` timed out after 10s");
    }
}
