//! Invocation of the external network utility.
//!
//! [`NetworkCommandAdapter`] is the seam between the keeper and the OS. The
//! production implementation, [`NetshAdapter`], shells out to `netsh wlan`
//! and feeds the text it prints through the parsers in `core::parse`.

use async_trait::async_trait;
use log::{debug, warn};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;

use crate::Result;
use crate::api::models::{
    Adapter, ConnectionStatus, ExecutionError, Network, NetworkProfile, TimeoutConfig,
};
use crate::core::parse::{parse_adapters, parse_connection_status, parse_networks, parse_profiles};
use crate::types::constants::{args, utility};

/// Queries and commands an already-configured network utility.
///
/// An empty adapter name means "no filter": the utility's default adapter
/// for commands, every adapter for queries.
#[async_trait]
pub trait NetworkCommandAdapter: Send + Sync {
    /// Lists the wireless adapters on the host.
    async fn list_adapters(&self) -> Result<Vec<Adapter>>;

    /// Lists the networks currently visible to `adapter`.
    async fn scan_networks(&self, adapter: &str) -> Result<Vec<Network>>;

    /// Lists the saved connection profiles.
    async fn list_profiles(&self) -> Result<Vec<NetworkProfile>>;

    /// Returns the live connection status of `adapter`.
    async fn connection_status(&self, adapter: &str) -> Result<ConnectionStatus>;

    /// Asks the utility to connect to the saved profile named `ssid`.
    ///
    /// Success means the utility accepted the request, not that the link is
    /// up.
    async fn connect(&self, ssid: &str, adapter: &str) -> Result<()>;

    /// Returns whether `ssid` is among the networks visible to `adapter`.
    async fn is_network_available(&self, adapter: &str, ssid: &str) -> Result<bool> {
        let networks = self.scan_networks(adapter).await?;
        Ok(networks.iter().any(|n| n.ssid == ssid))
    }
}

/// Argument list for `show interfaces`, used for both adapters and status.
pub(crate) fn interfaces_args() -> Vec<String> {
    vec![args::SHOW.into(), args::INTERFACES.into()]
}

/// Argument list for `show networks`, optionally bound to one adapter.
pub(crate) fn networks_args(adapter: &str) -> Vec<String> {
    let mut list = vec![args::SHOW.to_string(), args::NETWORKS.to_string()];
    if !adapter.is_empty() {
        list.push(format!("{}{adapter}", args::INTERFACE_PREFIX));
    }
    list
}

/// Argument list for `show profiles`.
pub(crate) fn profiles_args() -> Vec<String> {
    vec![args::SHOW.into(), args::PROFILES.into()]
}

/// Argument list for `connect`, optionally bound to one adapter.
pub(crate) fn connect_args(ssid: &str, adapter: &str) -> Vec<String> {
    let mut list = vec![
        args::CONNECT.to_string(),
        format!("{}{ssid}", args::NAME_PREFIX),
    ];
    if !adapter.is_empty() {
        list.push(format!("{}{adapter}", args::INTERFACE_PREFIX));
    }
    list
}

/// [`NetworkCommandAdapter`] backed by `netsh wlan`.
///
/// Every invocation is bounded by the configured command timeout; a child
/// still running when the timeout fires is killed.
#[derive(Debug, Clone)]
pub struct NetshAdapter {
    program: String,
    base_args: Vec<String>,
    command_timeout: std::time::Duration,
}

impl Default for NetshAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NetshAdapter {
    /// Creates an adapter running `netsh wlan` with default timeouts.
    pub fn new() -> Self {
        Self::with_config(TimeoutConfig::default())
    }

    /// Creates an adapter with custom timeouts.
    pub fn with_config(config: TimeoutConfig) -> Self {
        Self {
            program: utility::PROGRAM.to_string(),
            base_args: vec![utility::BASE_ARG.to_string()],
            command_timeout: config.command_timeout,
        }
    }

    /// Runs a different program in place of `netsh`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Replaces the arguments placed before every command (`wlan` by default).
    #[must_use]
    pub fn with_base_args<I, S>(mut self, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = base_args.into_iter().map(Into::into).collect();
        self
    }

    /// The command line for `args`, for logs and error messages.
    fn describe(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the utility and returns its standard output.
    async fn run(&self, args: &[String]) -> Result<String> {
        let command = self.describe(args);
        debug!("Running `{command}`");

        let child = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.command_timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                warn!("Failed to launch `{command}`: {source}");
                return Err(ExecutionError::Spawn { command, source });
            }
            Err(_) => {
                warn!(
                    "`{command}` timed out after {:?}",
                    self.command_timeout
                );
                return Err(ExecutionError::Timeout {
                    command,
                    after: self.command_timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            // netsh reports most errors on stdout
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            warn!("`{command}` failed ({}): {detail}", output.status);
            return Err(ExecutionError::Failed {
                command,
                status: output.status.to_string(),
                detail,
            });
        }

        Ok(stdout)
    }
}

#[async_trait]
impl NetworkCommandAdapter for NetshAdapter {
    async fn list_adapters(&self) -> Result<Vec<Adapter>> {
        let output = self.run(&interfaces_args()).await?;
        Ok(parse_adapters(&output))
    }

    async fn scan_networks(&self, adapter: &str) -> Result<Vec<Network>> {
        let output = self.run(&networks_args(adapter)).await?;
        Ok(parse_networks(&output))
    }

    async fn list_profiles(&self) -> Result<Vec<NetworkProfile>> {
        let output = self.run(&profiles_args()).await?;
        Ok(parse_profiles(&output))
    }

    async fn connection_status(&self, adapter: &str) -> Result<ConnectionStatus> {
        let output = self.run(&interfaces_args()).await?;
        Ok(parse_connection_status(&output, adapter))
    }

    async fn connect(&self, ssid: &str, adapter: &str) -> Result<()> {
        self.run(&connect_args(ssid, adapter)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_query_args() {
        assert_eq!(interfaces_args(), vec!["show", "interfaces"]);
        assert_eq!(profiles_args(), vec!["show", "profiles"]);
        assert_eq!(networks_args(""), vec!["show", "networks"]);
        assert_eq!(
            networks_args("Wi-Fi 2"),
            vec!["show", "networks", "interface=Wi-Fi 2"]
        );
    }

    #[test]
    fn test_connect_args() {
        assert_eq!(connect_args("HomeNet", ""), vec!["connect", "name=HomeNet"]);
        assert_eq!(
            connect_args("HomeNet", "Wi-Fi"),
            vec!["connect", "name=HomeNet", "interface=Wi-Fi"]
        );
    }

    #[test]
    fn test_describe_command_line() {
        let netsh = NetshAdapter::new();
        assert_eq!(
            netsh.describe(&networks_args("Wi-Fi")),
            "netsh wlan show networks interface=Wi-Fi"
        );

        let custom = NetshAdapter::new()
            .with_program("/usr/local/bin/wlanctl")
            .with_base_args(Vec::<String>::new());
        assert_eq!(custom.describe(&profiles_args()), "/usr/local/bin/wlanctl show profiles");
    }

    #[test]
    fn test_with_config_sets_timeout() {
        let netsh = NetshAdapter::with_config(
            TimeoutConfig::new().with_command_timeout(Duration::from_secs(3)),
        );
        assert_eq!(netsh.command_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let netsh = NetshAdapter::new().with_program("wlankeep-no-such-program-7f3a");
        match netsh.list_adapters().await {
            Err(ExecutionError::Spawn { command, .. }) => {
                assert_eq!(command, "wlankeep-no-such-program-7f3a wlan show interfaces");
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_program_is_failed_error() {
        let netsh = NetshAdapter::new().with_program("false");
        assert!(matches!(
            netsh.connect("HomeNet", "").await,
            Err(ExecutionError::Failed { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_is_parsed() {
        // trailing command arguments land in the script's positional parameters
        let netsh = NetshAdapter::new().with_program("sh").with_base_args([
            "-c",
            "printf 'SSID 1 : HomeNet\\nSSID 2 : OfficeNet\\n'",
            "sh",
        ]);
        let networks = netsh.scan_networks("").await.unwrap();
        let ssids: Vec<&str> = networks.iter().map(|n| n.ssid.as_str()).collect();
        assert_eq!(ssids, vec!["HomeNet", "OfficeNet"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_program_times_out() {
        let netsh = NetshAdapter::with_config(
            TimeoutConfig::new().with_command_timeout(Duration::from_millis(50)),
        )
        .with_program("sh")
        .with_base_args(["-c", "sleep 5", "sh"]);
        assert!(matches!(
            netsh.list_profiles().await,
            Err(ExecutionError::Timeout { .. })
        ));
    }
}
