//! Scheduled ticks of the connection state machine.
//!
//! The poller ticks once on start and then every poll interval until it is
//! stopped or dropped. Stopping only cancels future ticks; a tick already in
//! flight, including its settle delay, runs to completion.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};

use crate::api::models::{PollerError, TickOutcome};
use crate::core::machine::ConnectionMachine;

/// Handle to the background polling task.
///
/// Dropping the handle signals the task to stop; [`stop`](Poller::stop)
/// also waits for it to exit.
#[derive(Debug)]
pub struct Poller {
    machine: Arc<ConnectionMachine>,
    runtime: Handle,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawns the polling task on the current Tokio runtime.
    pub(crate) fn start(machine: Arc<ConnectionMachine>) -> Result<Self, PollerError> {
        let runtime = Handle::try_current().map_err(|_| PollerError::NoRuntime)?;
        let (shutdown, shutdown_rx) = watch::channel(false);

        let task = runtime.spawn(run(machine.clone(), shutdown_rx));
        debug!("Poller started");

        Ok(Self {
            machine,
            runtime,
            shutdown,
            task: Some(task),
        })
    }

    /// Runs a manual connect outside the schedule.
    ///
    /// The schedule is not reset; the manual run may overlap a scheduled
    /// tick.
    pub fn trigger(&self) -> JoinHandle<TickOutcome> {
        let machine = self.machine.clone();
        self.runtime.spawn(async move { machine.connect_now().await })
    }

    /// Returns whether the polling task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops future ticks and waits for the polling task to exit.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("Poller task ended abnormally: {e}");
        }
        debug!("Poller stopped");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run(machine: Arc<ConnectionMachine>, mut shutdown: watch::Receiver<bool>) {
    let mut period = machine.context().target().poll_interval();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // an error means every sender is gone, which is also a stop
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Poller received shutdown signal");
                    break;
                }
            }
            _ = ticker.tick() => {
                let outcome = machine.tick().await;
                debug!("Tick finished: {outcome:?}");

                let next = machine.context().target().poll_interval();
                if next != period {
                    info!("Poll interval changed from {period:?} to {next:?}");
                    period = next;
                    ticker = rebuild(period);
                }
            }
        }
    }
}

fn rebuild(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
