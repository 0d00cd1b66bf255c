//! In-memory [`NetworkCommandAdapter`] fed with canned utility output.
//!
//! The canned texts go through the same parsers as real `netsh` output, so a
//! script exercises everything except the process boundary.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::Result;
use crate::api::models::{Adapter, ConnectionStatus, ExecutionError, Network, NetworkProfile};
use crate::core::command::{
    NetworkCommandAdapter, connect_args, interfaces_args, networks_args, profiles_args,
};
use crate::core::parse::{parse_adapters, parse_connection_status, parse_networks, parse_profiles};
use crate::types::constants::labels;

/// One adapter operation, used to script failures and inspect call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListAdapters,
    ScanNetworks,
    ListProfiles,
    ConnectionStatus,
    Connect,
}

/// A connect command received by a [`ScriptedAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub ssid: String,
    pub adapter: String,
}

#[derive(Debug, Default)]
struct Script {
    /// `show interfaces` outputs. Each query takes the front entry; the last
    /// one is sticky.
    interfaces: VecDeque<String>,
    networks: String,
    profiles: String,
    failing: HashSet<Operation>,
    associate_on_connect: bool,
    calls: Vec<Operation>,
    connects: Vec<ConnectRequest>,
}

/// Scriptable stand-in for the network utility.
///
/// ```
/// use wlankeep::ScriptedAdapter;
///
/// let adapter = ScriptedAdapter::new()
///     .with_interfaces(["Name : Wi-Fi\nState : disconnected\n"])
///     .with_networks("SSID 1 : HomeNet\n")
///     .associating_on_connect();
/// ```
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    script: Mutex<Script>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `show interfaces` outputs, consumed in order by status and
    /// adapter queries.
    #[must_use]
    pub fn with_interfaces<I, S>(self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().interfaces.extend(outputs.into_iter().map(Into::into));
        self
    }

    /// Sets the `show networks` output.
    #[must_use]
    pub fn with_networks(self, output: impl Into<String>) -> Self {
        self.set_networks(output);
        self
    }

    /// Sets the `show profiles` output.
    #[must_use]
    pub fn with_profiles(self, output: impl Into<String>) -> Self {
        self.lock().profiles = output.into();
        self
    }

    /// Makes `operation` fail until cleared with [`set_failing`](Self::set_failing).
    #[must_use]
    pub fn failing(self, operation: Operation) -> Self {
        self.set_failing(operation, true);
        self
    }

    /// Makes an accepted connect command associate the adapter with the
    /// requested network, as seen by later status queries.
    #[must_use]
    pub fn associating_on_connect(self) -> Self {
        self.lock().associate_on_connect = true;
        self
    }

    /// Appends a `show interfaces` output to the queue.
    pub fn push_interfaces(&self, output: impl Into<String>) {
        self.lock().interfaces.push_back(output.into());
    }

    /// Replaces the `show networks` output.
    pub fn set_networks(&self, output: impl Into<String>) {
        self.lock().networks = output.into();
    }

    pub fn set_failing(&self, operation: Operation, failing: bool) {
        let mut script = self.lock();
        if failing {
            script.failing.insert(operation);
        } else {
            script.failing.remove(&operation);
        }
    }

    /// Connect commands received so far, oldest first.
    pub fn connect_requests(&self) -> Vec<ConnectRequest> {
        self.lock().connects.clone()
    }

    /// Operations invoked so far, oldest first.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the call and returns the scripted failure, if any.
    fn enter(script: &mut Script, operation: Operation, args: Vec<String>) -> Result<()> {
        script.calls.push(operation);
        if script.failing.contains(&operation) {
            return Err(ExecutionError::Failed {
                command: format!("scripted {}", args.join(" ")),
                status: "exit status: 1".into(),
                detail: format!("scripted failure of {operation:?}"),
            });
        }
        Ok(())
    }

    fn next_interfaces(script: &mut Script) -> String {
        if script.interfaces.len() > 1 {
            script.interfaces.pop_front().unwrap_or_default()
        } else {
            script.interfaces.front().cloned().unwrap_or_default()
        }
    }
}

/// `show interfaces` output for an adapter associated with `ssid`.
fn associated_output(ssid: &str, adapter: &str) -> String {
    let name = if adapter.is_empty() { "Wi-Fi" } else { adapter };
    format!(
        "    {} : {name}\n    {} : {}\n    {} : {ssid}\n    {} : 99%\n",
        labels::NAME,
        labels::STATE,
        labels::STATE_CONNECTED,
        labels::SSID,
        labels::SIGNAL,
    )
}

#[async_trait]
impl NetworkCommandAdapter for ScriptedAdapter {
    async fn list_adapters(&self) -> Result<Vec<Adapter>> {
        let mut script = self.lock();
        Self::enter(&mut script, Operation::ListAdapters, interfaces_args())?;
        Ok(parse_adapters(&Self::next_interfaces(&mut script)))
    }

    async fn scan_networks(&self, adapter: &str) -> Result<Vec<Network>> {
        let mut script = self.lock();
        Self::enter(&mut script, Operation::ScanNetworks, networks_args(adapter))?;
        Ok(parse_networks(&script.networks))
    }

    async fn list_profiles(&self) -> Result<Vec<NetworkProfile>> {
        let mut script = self.lock();
        Self::enter(&mut script, Operation::ListProfiles, profiles_args())?;
        Ok(parse_profiles(&script.profiles))
    }

    async fn connection_status(&self, adapter: &str) -> Result<ConnectionStatus> {
        let mut script = self.lock();
        Self::enter(&mut script, Operation::ConnectionStatus, interfaces_args())?;
        Ok(parse_connection_status(
            &Self::next_interfaces(&mut script),
            adapter,
        ))
    }

    async fn connect(&self, ssid: &str, adapter: &str) -> Result<()> {
        let mut script = self.lock();
        script.connects.push(ConnectRequest {
            ssid: ssid.to_string(),
            adapter: adapter.to_string(),
        });
        Self::enter(&mut script, Operation::Connect, connect_args(ssid, adapter))?;
        if script.associate_on_connect {
            script.interfaces.clear();
            script.interfaces.push_back(associated_output(ssid, adapter));
        }
        Ok(())
    }
}
