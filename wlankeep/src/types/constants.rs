//! Constants for the `netsh wlan` command line and its text output.
//!
//! The label strings below are a compatibility contract with the English
//! output of the utility. Localized or differently-versioned output is not
//! supported.

/// External utility invocation.
pub mod utility {
    pub const PROGRAM: &str = "netsh";
    pub const BASE_ARG: &str = "wlan";
}

/// Argument lists passed after the base argument.
pub mod args {
    pub const SHOW: &str = "show";
    pub const INTERFACES: &str = "interfaces";
    pub const NETWORKS: &str = "networks";
    pub const PROFILES: &str = "profiles";
    pub const CONNECT: &str = "connect";
    pub const NAME_PREFIX: &str = "name=";
    pub const INTERFACE_PREFIX: &str = "interface=";
}

/// Field labels found in the utility's output.
pub mod labels {
    pub const NAME: &str = "Name";
    pub const STATE: &str = "State";
    pub const SSID: &str = "SSID";
    pub const SIGNAL: &str = "Signal";
    pub const ALL_USER_PROFILE: &str = "All User Profile";
    pub const CURRENT_USER_PROFILE: &str = "Current User Profile";

    /// Value of the `State` field for an associated adapter.
    pub const STATE_CONNECTED: &str = "connected";
}

/// Status messages published with each state transition.
pub mod messages {
    pub const INITIALIZING: &str = "Initializing...";
    pub const NOT_CONFIGURED: &str = "No network configured";
    pub const STATUS_ERROR: &str = "Error checking status";
    pub const SCAN_ERROR: &str = "Error scanning networks";
    pub const CONNECT_FAILED: &str = "Connection failed";
    pub const VERIFY_FAILED: &str = "Connection verification failed";

    pub fn connected(ssid: &str) -> String {
        format!("Connected to {ssid}")
    }

    pub fn connecting(ssid: &str) -> String {
        format!("Connecting to {ssid}...")
    }

    pub fn not_in_range(ssid: &str) -> String {
        format!("{ssid} not in range")
    }
}

/// Titles and bodies of user-facing notifications.
pub mod notifications {
    pub const SUCCESS_TITLE: &str = "Connected";
    pub const FAILURE_TITLE: &str = "Connection Failed";
    pub const LOST_TITLE: &str = "Disconnected";
    pub const UNCONFIGURED_TITLE: &str = "Error";
    pub const UNCONFIGURED_BODY: &str =
        "No target network configured. Open Settings to configure.";

    pub fn success_body(ssid: &str) -> String {
        format!("Successfully connected to {ssid}")
    }

    pub fn failure_body(ssid: &str) -> String {
        format!("Could not connect to {ssid}")
    }

    pub fn lost_body(ssid: &str) -> String {
        format!("Lost connection to {ssid}")
    }
}

/// Timing defaults.
pub mod timeouts {
    use std::time::Duration;

    /// Default poll interval in seconds.
    pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

    /// Pause after a connect command before the link is re-checked.
    const SETTLE_DELAY_SECS: u64 = 2;

    /// Upper bound on a single utility invocation.
    const COMMAND_TIMEOUT_SECS: u64 = 10;

    pub fn settle_delay() -> Duration {
        Duration::from_secs(SETTLE_DELAY_SECS)
    }

    pub fn command_timeout() -> Duration {
        Duration::from_secs(COMMAND_TIMEOUT_SECS)
    }
}

/// Capacity of the event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
