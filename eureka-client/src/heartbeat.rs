use std::sync::Arc;
use std::time;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::LifecycleError;
use crate::lifecycle::Lifecycle;
use crate::transport::RegistryTransport;

/// Spawn the heartbeat loop: one heartbeat every `period` until `shutdown` is cancelled.
///
/// Heartbeats run one at a time on the spawned task. When a heartbeat (and any
/// re-registration it triggers) outlasts the period, the next tick is delayed rather than
/// fired in a burst, so two heartbeats never start less than `period` apart.
///
/// If a heartbeat fails for good (a bounded retry policy ran out, or the descriptor cannot
/// be serialized), the state drops to DOWN and `shutdown` is cancelled so the owner can
/// deregister and exit. `period` must be non-zero.
pub(crate) fn spawn<T: RegistryTransport + 'static>(
    lifecycle: Arc<Lifecycle<T>>,
    period: time::Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => match lifecycle.heartbeat(&shutdown).await {
                    Ok(()) | Err(LifecycleError::Cancelled) => {}
                    Err(error) => {
                        error!(%error, "heartbeat loop giving up, requesting shutdown");
                        lifecycle.abandon();
                        shutdown.cancel();
                        break;
                    }
                },
            }
        }

        debug!("heartbeat loop stopped");
    })
}
