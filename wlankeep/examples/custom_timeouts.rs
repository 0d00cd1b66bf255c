/// Example keeping a connection with custom timeouts.
///
/// A longer command timeout helps on hosts where `netsh` is slow to answer,
/// and a longer settle delay gives slow access points time to associate
/// before the link is verified.
use std::sync::Arc;
use std::time::Duration;
use wlankeep::{Event, NetshAdapter, TargetConfig, TimeoutConfig, WifiKeeper};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let timeouts = TimeoutConfig::new()
        .with_command_timeout(Duration::from_secs(30))
        .with_settle_delay(Duration::from_secs(5));

    let network = std::env::var("WIFI_NETWORK").unwrap_or_else(|_| "MyNetwork".to_string());
    let keeper = WifiKeeper::with_timeouts(
        Arc::new(NetshAdapter::with_config(timeouts)),
        TargetConfig::for_network(network).with_poll_interval(15),
        timeouts,
    );

    let mut events = keeper.subscribe();
    let poller = keeper.start()?;

    // Print the first few events, then stop
    for _ in 0..5 {
        match events.recv().await? {
            Event::Status(update) => println!("{update}"),
            Event::Notify(note) => println!("[{}] {}", note.title, note.body),
        }
    }

    poller.stop().await;
    Ok(())
}
