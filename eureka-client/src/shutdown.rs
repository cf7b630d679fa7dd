//! Graceful shutdown: stop heartbeating, deregister, give the DOWN update time to land.
use std::time;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LifecycleError;
use crate::lifecycle::Lifecycle;
use crate::transport::RegistryTransport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    Stopping,
    Terminated,
}

pub(crate) struct ShutdownCoordinator {
    phase: ShutdownPhase,
    token: CancellationToken,
    grace_period: time::Duration,
    heartbeat: Option<JoinHandle<()>>,
}

impl ShutdownCoordinator {
    pub(crate) fn new(token: CancellationToken, grace_period: time::Duration) -> Self {
        Self {
            phase: ShutdownPhase::Running,
            token,
            grace_period,
            heartbeat: None,
        }
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub(crate) fn phase(&self) -> ShutdownPhase {
        self.phase
    }

    pub(crate) fn grace_period(&self) -> time::Duration {
        self.grace_period
    }

    pub(crate) fn heartbeat_running(&self) -> bool {
        self.heartbeat
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub(crate) fn track_heartbeat(&mut self, handle: JoinHandle<()>) {
        self.heartbeat = Some(handle);
    }

    /// The heartbeat task is joined before DOWN is sent, so no heartbeat can race the
    /// deregistration. The grace period runs even if DOWN failed.
    pub(crate) async fn shutdown<T: RegistryTransport>(
        &mut self,
        lifecycle: &Lifecycle<T>,
    ) -> Result<(), LifecycleError> {
        if self.phase != ShutdownPhase::Running {
            debug!(phase = ?self.phase, "shutdown already in progress");
            return Ok(());
        }

        info!("shutting down registry agent");
        self.phase = ShutdownPhase::Stopping;
        self.token.cancel();

        if let Some(handle) = self.heartbeat.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "heartbeat task did not stop cleanly");
            }
        }

        let result = lifecycle.down().await;

        info!(grace_period = ?self.grace_period, "terminating after grace period");
        tokio::time::sleep(self.grace_period).await;
        self.phase = ShutdownPhase::Terminated;

        result
    }
}
