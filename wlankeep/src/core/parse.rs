//! Parsing of `netsh wlan` text output.
//!
//! Every parser is line-oriented and best effort: lines that do not look like
//! `<Label> : <value>` fields, or whose label is not recognized, are skipped.
//! Malformed input degrades to partial or empty results and never fails.

use log::debug;

use crate::api::models::{Adapter, ConnectionStatus, Network, NetworkProfile};
use crate::types::constants::labels;

/// Splits a trimmed line into its label and value at the first colon.
fn field(line: &str) -> Option<(&str, &str)> {
    line.split_once(':')
        .map(|(label, value)| (label.trim(), value.trim()))
}

/// Returns the value of `line` if it is a field whose line starts with `label`.
fn prefixed_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    if line.starts_with(label) {
        field(line).map(|(_, value)| value)
    } else {
        None
    }
}

/// Returns whether `label` names an SSID field.
///
/// Accepts the bare `SSID` label of `show interfaces` and the indexed
/// `SSID <n>` label of `show networks`. Anything else starting with `SSID`
/// is a different field.
fn is_ssid_label(label: &str) -> bool {
    match label.strip_prefix(labels::SSID) {
        Some("") => true,
        Some(rest) if rest.starts_with(char::is_whitespace) => {
            let index = rest.trim_start();
            !index.is_empty() && index.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Returns the SSID carried by `line`, if it is an SSID field.
fn ssid_value(line: &str) -> Option<&str> {
    field(line)
        .filter(|(label, _)| is_ssid_label(label))
        .map(|(_, value)| value)
}

/// Parses `show interfaces` output into the list of adapters.
///
/// A `Name` line starts a new record and a `State` line fills in the current
/// one. Records without a name are dropped.
pub(crate) fn parse_adapters(output: &str) -> Vec<Adapter> {
    let mut adapters = Vec::new();
    let mut current = Adapter::default();

    for line in output.lines().map(str::trim) {
        if let Some(name) = prefixed_value(line, labels::NAME) {
            let finished = std::mem::replace(
                &mut current,
                Adapter {
                    name: name.to_string(),
                    state: String::new(),
                },
            );
            if !finished.name.is_empty() {
                adapters.push(finished);
            }
        } else if let Some(state) = prefixed_value(line, labels::STATE) {
            current.state = state.to_string();
        }
    }

    if !current.name.is_empty() {
        adapters.push(current);
    }

    adapters
}

/// Parses `show networks` output into the visible networks, in output order.
pub(crate) fn parse_networks(output: &str) -> Vec<Network> {
    output
        .lines()
        .map(str::trim)
        .filter_map(ssid_value)
        .filter(|ssid| !ssid.is_empty())
        .map(|ssid| Network {
            ssid: ssid.to_string(),
        })
        .collect()
}

/// Parses `show profiles` output into the saved profiles, in output order.
pub(crate) fn parse_profiles(output: &str) -> Vec<NetworkProfile> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.contains(labels::ALL_USER_PROFILE) || line.contains(labels::CURRENT_USER_PROFILE)
        })
        .filter_map(field)
        .map(|(_, value)| value)
        .filter(|ssid| !ssid.is_empty())
        .map(|ssid| NetworkProfile {
            ssid: ssid.to_string(),
        })
        .collect()
}

/// Parses `show interfaces` output into the status of one adapter.
///
/// An empty `adapter` accepts every adapter group, so later groups overwrite
/// earlier ones. With a named adapter the first group of that name wins:
/// parsing stops once its state, SSID and signal have all been read, or at
/// the next `Name` line once its state has been read. Fields the utility
/// prints after that point are not seen.
///
/// An adapter reported as connected without an SSID line is returned as
/// disconnected. An adapter that never appears yields a disconnected, empty
/// status.
pub(crate) fn parse_connection_status(output: &str, adapter: &str) -> ConnectionStatus {
    let mut status = ConnectionStatus::default();
    let mut current_adapter = "";
    let mut in_target = false;

    for line in output.lines().map(str::trim) {
        if let Some(name) = prefixed_value(line, labels::NAME) {
            if !adapter.is_empty() && !status.adapter_name.is_empty() {
                debug!("Ignoring later groups for adapter '{adapter}'");
                break;
            }
            current_adapter = name;
            in_target = adapter.is_empty() || name == adapter;
            continue;
        }

        if !in_target {
            continue;
        }

        if let Some(state) = prefixed_value(line, labels::STATE) {
            status.connected = state == labels::STATE_CONNECTED;
            status.adapter_name = current_adapter.to_string();
        } else if let Some(ssid) = ssid_value(line) {
            status.ssid = ssid.to_string();
        } else if let Some(signal) = prefixed_value(line, labels::SIGNAL) {
            status.signal_strength = signal.to_string();
        }

        if !adapter.is_empty() && is_complete(&status) {
            debug!("Found complete status for adapter '{adapter}', stopping early");
            break;
        }
    }

    status.connected &= !status.ssid.is_empty();
    status
}

fn is_complete(status: &ConnectionStatus) -> bool {
    !status.adapter_name.is_empty() && !status.ssid.is_empty() && !status.signal_strength.is_empty()
}
