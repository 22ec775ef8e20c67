//! Background removal of expired cache entries

use crate::service::Shared;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Handle to the periodic sweep task
///
/// The task only holds a weak reference to the service state, so it never
/// keeps a dropped service alive, and it stops on the first tick after the
/// state is gone or as soon as it is cancelled.
pub(crate) struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    pub(crate) fn spawn(runtime: &Handle, shared: Weak<Shared>, period: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);

        let handle = runtime.spawn(async move {
            // First sweep one full period after construction
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    // Fires on cancel and when the sender is dropped
                    _ = stop.changed() => break,
                }

                let Some(shared) = shared.upgrade() else {
                    break;
                };
                if shared.sweep().is_none() {
                    break;
                }
            }

            debug!("Address cache sweep stopped");
        });

        Self { shutdown, handle }
    }

    /// Signal the task to stop, returning its handle for joining
    pub(crate) fn cancel(self) -> JoinHandle<()> {
        // The receiver is gone if the task already exited
        let _ = self.shutdown.send(true);
        self.handle
    }
}
