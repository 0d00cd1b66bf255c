//! A Rust library for keeping a host connected to one Wi-Fi network.
//!
//! The keeper periodically checks whether the configured adapter is
//! associated with the configured network and, when it is not but the
//! network is in range, asks the OS network utility (`netsh wlan`) to
//! connect and verifies the result.
//!
//! - Listing adapters, visible networks and saved profiles
//! - Querying the live connection status of an adapter
//! - A state machine publishing `(state, message)` pairs and notifications
//! - A cancellable poller plus manual "connect now" triggers
//!
//! # Example
//!
//! ```no_run
//! use wlankeep::{Event, TargetConfig, WifiKeeper};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let keeper = WifiKeeper::netsh(TargetConfig::for_network("HomeNet").with_adapter("Wi-Fi"));
//! let mut events = keeper.subscribe();
//! let poller = keeper.start()?;
//!
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         Event::Status(update) => println!("{update}"),
//!         Event::Notify(note) => println!("{}: {}", note.title, note.body),
//!     }
//! }
//!
//! poller.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing Without `netsh`
//!
//! Everything the keeper does goes through [`NetworkCommandAdapter`].
//! [`ScriptedAdapter`] implements it over canned utility output, so the state
//! machine can be exercised on any platform:
//!
//! ```
//! use wlankeep::{ConnectionState, ScriptedAdapter, TargetConfig, TickOutcome, WifiKeeper};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let adapter = ScriptedAdapter::new()
//!     .with_interfaces(["Name : Wi-Fi\nState : connected\nSSID : HomeNet\n"]);
//! let keeper = WifiKeeper::new(adapter, TargetConfig::for_network("HomeNet"));
//!
//! assert_eq!(keeper.tick().await, TickOutcome::AlreadyConnected);
//! assert_eq!(keeper.status().await.state, ConnectionState::Connected);
//! # }
//! ```
//!
//! # Error Handling
//!
//! Utility calls return [`Result<T>`](Result), failing with
//! [`ExecutionError`] when the utility cannot be launched, exits with an
//! error or times out. The state machine never fails: it turns every error
//! into a published status message and retries on the next tick.
//!
//! # Limitations
//!
//! The parsers understand the English output of `netsh wlan`. Localized
//! output yields empty results rather than errors.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod monitoring;
mod types;

// Public API modules
pub mod api;

// Re-exported public API
pub use crate::api::keeper::WifiKeeper;
pub use crate::api::models::{
    Adapter, ConnectionState, ConnectionStatus, Event, ExecutionError, Network, NetworkProfile,
    Notification, NotificationKind, PollerError, StatusUpdate, TargetConfig, TickOutcome,
    TimeoutConfig,
};
pub use crate::core::command::{NetshAdapter, NetworkCommandAdapter};
pub use crate::core::context::ConfigPublisher;
pub use crate::core::scripted::{ConnectRequest, Operation, ScriptedAdapter};
pub use crate::monitoring::poller::Poller;

/// A specialized `Result` type for utility calls.
pub type Result<T> = std::result::Result<T, ExecutionError>;
