//! Delivers keeper events to the log and the terminal.
//!
//! Status updates go to the log. Notifications are printed as one line on
//! stdout; delivery is best effort and never feeds back into the keeper.

use log::{debug, info, warn};
use std::io::Write;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use wlankeep::{Event, Notification, NotificationKind};

/// Formats a notification as a single terminal line.
pub fn render(notification: &Notification) -> String {
    let marker = match notification.kind {
        NotificationKind::Success => "+",
        NotificationKind::Failure => "!",
        NotificationKind::Lost => "-",
    };
    format!("[{marker}] {}: {}", notification.title, notification.body)
}

fn deliver(event: Event) {
    match event {
        Event::Status(update) => info!("{update}"),
        Event::Notify(notification) => {
            debug!("Notification: {notification:?}");
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{}", render(&notification)) {
                warn!("Failed to deliver notification: {e}");
            }
        }
    }
}

/// Spawns a task draining `events` until the keeper goes away.
pub fn spawn(mut events: Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => deliver(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event sink fell behind; skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Event sink stopped");
    })
}
