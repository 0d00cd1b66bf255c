//! Shared keeper state: the target configuration, the published status pair,
//! and the event channel.

use log::debug;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, watch};

use crate::api::models::{
    ConnectionState, Event, Notification, NotificationKind, StatusUpdate, TargetConfig,
};
use crate::types::constants::{EVENT_CHANNEL_CAPACITY, notifications};

/// Sender side of the target configuration.
///
/// Held by whatever owns the settings (a config file watcher, a settings
/// dialog). Ticks read the latest published value when they start; nothing
/// is pushed into a running tick.
#[derive(Debug, Clone)]
pub struct ConfigPublisher {
    tx: Arc<watch::Sender<TargetConfig>>,
}

impl ConfigPublisher {
    /// Publishes a new configuration. A zero poll interval is replaced by
    /// the default.
    pub fn publish(&self, config: TargetConfig) {
        let config = config.normalized();
        debug!(
            "Publishing target config: network={:?} adapter={:?} interval={}s",
            config.selected_network, config.selected_adapter, config.poll_interval
        );
        self.tx.send_replace(config);
    }

    /// Returns the most recently published configuration.
    pub fn current(&self) -> TargetConfig {
        self.tx.borrow().clone()
    }
}

/// State shared by the state machine, the poller and the public facade.
#[derive(Debug)]
pub(crate) struct KeeperContext {
    config: watch::Receiver<TargetConfig>,
    status: RwLock<StatusUpdate>,
    events: broadcast::Sender<Event>,
}

impl KeeperContext {
    pub(crate) fn new(config: TargetConfig) -> (Self, ConfigPublisher) {
        let (tx, rx) = watch::channel(config.normalized());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let context = Self {
            config: rx,
            status: RwLock::new(StatusUpdate::default()),
            events,
        };
        (context, ConfigPublisher { tx: Arc::new(tx) })
    }

    /// Snapshot of the current target configuration.
    pub(crate) fn target(&self) -> TargetConfig {
        self.config.borrow().clone()
    }

    pub(crate) async fn status(&self) -> StatusUpdate {
        self.status.read().await.clone()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Publishes `update` and emits its events, returning the previous pair.
    ///
    /// The previous state is read and replaced under one write lock, and the
    /// events go out before the lock is released, so observers see events in
    /// the same order as the states they describe. A move from `Connected`
    /// to `Disconnected` with a configured network emits a loss
    /// notification; `extra` follows it.
    pub(crate) async fn transition(
        &self,
        update: StatusUpdate,
        target: &TargetConfig,
        extra: Option<Notification>,
    ) -> StatusUpdate {
        let mut status = self.status.write().await;
        let previous = std::mem::replace(&mut *status, update.clone());

        if previous.state != update.state {
            debug!("State {} -> {}: {}", previous.state, update.state, update.message);
        }
        self.emit(Event::Status(update.clone()));

        if previous.state == ConnectionState::Connected
            && update.state == ConnectionState::Disconnected
            && target.is_configured()
        {
            self.emit(Event::Notify(Notification::new(
                NotificationKind::Lost,
                notifications::LOST_TITLE,
                notifications::lost_body(&target.selected_network),
            )));
        }

        if let Some(notification) = extra {
            self.emit(Event::Notify(notification));
        }

        previous
    }

    fn emit(&self, event: Event) {
        // no subscribers is not an error; delivery is best effort
        if self.events.send(event).is_err() {
            debug!("No event subscribers");
        }
    }
}
