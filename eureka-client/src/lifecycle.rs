//! Registration lifecycle: register, mark up, heartbeat, mark down.
//!
//! Every failure past the initial registration recovers the same way: wait for the retry
//! interval, then register again from scratch. A missed heartbeat and a lost registration
//! are not told apart, and neither are 4xx and 5xx responses: anything but 200/204 is a
//! failure. How long to wait, and whether to give up, is the `RetryPolicy`'s decision.
use std::sync::Arc;
use std::time;

use http::StatusCode;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::address::{resolve_or_default, AddressResolver};
use crate::config::ClientConfig;
use crate::descriptor::{InstanceRequest, LifecycleState};
use crate::error::{ConfigError, LifecycleError, RegistryError, TransportError};
use crate::heartbeat;
use crate::identity::InstanceIdentity;
use crate::retry::RetryPolicy;
use crate::shutdown::{ShutdownCoordinator, ShutdownPhase};
use crate::transport::{HttpTransport, RegistryTransport};

/// Where a registration attempt starts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Create or replace the instance in STARTING.
    Register,
    /// Mark the registered instance UP.
    Up,
}

impl Transition {
    fn target(self) -> LifecycleState {
        match self {
            Transition::Register => LifecycleState::Starting,
            Transition::Up => LifecycleState::Up,
        }
    }
}

fn operation(state: LifecycleState) -> &'static str {
    match state {
        LifecycleState::Starting => "register",
        LifecycleState::Up => "up",
        LifecycleState::Down => "down",
    }
}

fn is_success(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::NO_CONTENT
}

/// State and collaborators shared between the caller and the heartbeat task.
pub(crate) struct Lifecycle<T> {
    identity: InstanceIdentity,
    transport: T,
    resolver: Box<dyn AddressResolver>,
    retry_policy: RetryPolicy,
    verbose: bool,
    state: watch::Sender<LifecycleState>,
    /// Held for a whole heartbeat, including any re-registration it triggers.
    heartbeat_lock: Mutex<()>,
}

impl<T: RegistryTransport> Lifecycle<T> {
    /// Drive the instance to UP, starting at `from`. Only returns once the registry accepted
    /// the UP update, the retry policy gave up, or `shutdown` fired during a retry wait.
    pub(crate) async fn establish(
        &self,
        from: Transition,
        shutdown: &CancellationToken,
    ) -> Result<(), LifecycleError> {
        let mut transition = from;
        let mut failures = 0;

        loop {
            if shutdown.is_cancelled() {
                return Err(LifecycleError::Cancelled);
            }

            match self.update_status(transition.target()).await {
                Ok(()) => match transition {
                    Transition::Register => {
                        info!(
                            app = self.identity.app_name(),
                            instance_id = self.identity.instance_id(),
                            "registered with the registry"
                        );
                        self.state.send_replace(LifecycleState::Starting);
                        transition = Transition::Up;
                    }
                    Transition::Up => {
                        info!(
                            instance_id = self.identity.instance_id(),
                            "status updated to UP"
                        );
                        self.state.send_replace(LifecycleState::Up);
                        return Ok(());
                    }
                },
                Err(RegistryError::Serialization(e)) => {
                    error!(error = %e, "cannot serialize instance descriptor");
                    return Err(LifecycleError::Serialization(e));
                }
                Err(error) => {
                    failures += 1;
                    warn!(
                        operation = operation(transition.target()),
                        attempt = failures,
                        %error,
                        "registry request failed"
                    );
                    self.wait_before_retry(failures, error, shutdown).await?;
                    if transition == Transition::Up {
                        metrics::counter!("eureka_reregistrations_total").increment(1);
                    }
                    transition = Transition::Register;
                }
            }
        }
    }

    /// Send one heartbeat. A failed heartbeat is followed by a full re-registration.
    pub(crate) async fn heartbeat(
        &self,
        shutdown: &CancellationToken,
    ) -> Result<(), LifecycleError> {
        let _running = self.heartbeat_lock.lock().await;
        let result = self
            .transport
            .put_heartbeat(self.identity.app_name(), self.identity.instance_id())
            .await;

        match self.check("heartbeat", result) {
            Ok(()) => {
                if self.verbose {
                    info!("heartbeat to registry [OK]");
                } else {
                    debug!("heartbeat to registry [OK]");
                }
                Ok(())
            }
            Err(error) => {
                warn!(%error, "heartbeat to registry [FAILED], re-registering");
                self.wait_before_retry(1, error, shutdown).await?;
                metrics::counter!("eureka_reregistrations_total").increment(1);
                self.establish(Transition::Register, shutdown).await
            }
        }
    }

    /// The heartbeat loop stopped for good: nothing keeps the registration alive anymore.
    pub(crate) fn abandon(&self) {
        self.state.send_replace(LifecycleState::Down);
    }

    /// Mark the instance DOWN. Sent once, never retried.
    pub(crate) async fn down(&self) -> Result<(), LifecycleError> {
        self.state.send_replace(LifecycleState::Down);

        match self.update_status(LifecycleState::Down).await {
            Ok(()) => {
                info!(
                    instance_id = self.identity.instance_id(),
                    "status updated to DOWN"
                );
                Ok(())
            }
            Err(RegistryError::Serialization(e)) => {
                error!(error = %e, "cannot serialize instance descriptor");
                Err(LifecycleError::Serialization(e))
            }
            Err(error) => {
                warn!(%error, "updating status to DOWN failed");
                Err(LifecycleError::Deregistration(error))
            }
        }
    }

    async fn update_status(&self, state: LifecycleState) -> Result<(), RegistryError> {
        let address = resolve_or_default(self.resolver.as_ref());
        let request = InstanceRequest::new(&self.identity, state, address);
        let body = serde_json::to_string(&request)?;

        debug!(status = %state, %address, "sending instance descriptor");
        let result = self
            .transport
            .post_instance(self.identity.app_name(), body)
            .await;

        self.check(operation(state), result)
    }

    fn check(
        &self,
        operation: &'static str,
        result: Result<StatusCode, TransportError>,
    ) -> Result<(), RegistryError> {
        let (outcome, result) = match result {
            Ok(status) if is_success(status) => ("success", Ok(())),
            Ok(status) => ("rejected", Err(RegistryError::Rejected(status))),
            Err(error) => ("unreachable", Err(RegistryError::Transport(error))),
        };

        let labels = [("operation", operation), ("outcome", outcome)];
        metrics::counter!("eureka_registry_requests_total", &labels).increment(1);

        result
    }

    async fn wait_before_retry(
        &self,
        attempt: u32,
        last_error: RegistryError,
        shutdown: &CancellationToken,
    ) -> Result<(), LifecycleError> {
        if !self.retry_policy.should_retry(attempt) {
            error!(attempts = attempt, error = %last_error, "giving up on the registry");
            return Err(LifecycleError::RetriesExhausted {
                attempts: attempt,
                last_error,
            });
        }

        let interval = self.retry_policy.retry_interval(attempt);
        debug!(?interval, attempt, "waiting before retrying");

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(LifecycleError::Cancelled),
            _ = tokio::time::sleep(interval) => Ok(()),
        }
    }
}

/// Registers one instance with the registry and keeps it alive until shut down.
///
/// `register` and `up` block the calling task until the registry accepts the instance;
/// the heartbeat loop then runs on its own task until `shutdown` is called or the shutdown
/// token is cancelled. The agent never exits the process: after `shutdown` returns the
/// caller decides what to do.
pub struct RegistryAgent<T> {
    lifecycle: Arc<Lifecycle<T>>,
    heartbeat_interval: time::Duration,
    coordinator: ShutdownCoordinator,
}

impl RegistryAgent<HttpTransport> {
    /// Build an agent talking HTTP to `config.registry_url`, signing requests with the
    /// identity's credentials.
    pub fn from_config<R: AddressResolver + 'static>(
        config: ClientConfig,
        resolver: R,
    ) -> Result<Self, ConfigError> {
        let identity =
            InstanceIdentity::new(&config.app_name, config.port, config.credentials.clone());
        let transport = HttpTransport::new(
            &config.registry_url,
            identity.credentials().clone(),
            config.request_timeout,
        )?;

        Self::assemble(identity, config, transport, resolver)
    }
}

impl<T: RegistryTransport + 'static> RegistryAgent<T> {
    pub fn new<R: AddressResolver + 'static>(
        config: ClientConfig,
        transport: T,
        resolver: R,
    ) -> Result<Self, ConfigError> {
        let identity =
            InstanceIdentity::new(&config.app_name, config.port, config.credentials.clone());

        Self::assemble(identity, config, transport, resolver)
    }

    fn assemble<R: AddressResolver + 'static>(
        identity: InstanceIdentity,
        config: ClientConfig,
        transport: T,
        resolver: R,
    ) -> Result<Self, ConfigError> {
        if config.heartbeat_interval.is_zero() {
            return Err(ConfigError::ZeroHeartbeatInterval);
        }

        let (state, _) = watch::channel(LifecycleState::Starting);

        Ok(Self {
            lifecycle: Arc::new(Lifecycle {
                identity,
                transport,
                resolver: Box::new(resolver),
                retry_policy: config.retry_policy,
                verbose: config.verbose,
                state,
                heartbeat_lock: Mutex::new(()),
            }),
            heartbeat_interval: config.heartbeat_interval,
            coordinator: ShutdownCoordinator::new(
                CancellationToken::new(),
                config.shutdown_grace_period,
            ),
        })
    }

    /// Use `token` to signal shutdown instead of a private one. Cancelling it stops the
    /// heartbeat loop and interrupts retry waits; `shutdown` must still be called to
    /// deregister.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.coordinator = ShutdownCoordinator::new(token, self.coordinator.grace_period());
        self
    }

    pub fn identity(&self) -> &InstanceIdentity {
        &self.lifecycle.identity
    }

    pub fn state(&self) -> LifecycleState {
        *self.lifecycle.state.borrow()
    }

    /// Watch lifecycle state changes. The state drops to DOWN if the heartbeat loop gives
    /// up on the registry; the shutdown token is cancelled at the same time.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.state.subscribe()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.coordinator.token()
    }

    pub fn shutdown_phase(&self) -> ShutdownPhase {
        self.coordinator.phase()
    }

    /// Register in STARTING, then mark UP and start heartbeating. Retries until the
    /// registry accepts both updates.
    pub async fn register(&mut self) -> Result<(), LifecycleError> {
        self.lifecycle
            .establish(Transition::Register, &self.coordinator.token())
            .await?;
        self.start_heartbeat();
        Ok(())
    }

    /// Mark UP and start heartbeating. A failed update falls back to `register`.
    pub async fn up(&mut self) -> Result<(), LifecycleError> {
        self.lifecycle
            .establish(Transition::Up, &self.coordinator.token())
            .await?;
        self.start_heartbeat();
        Ok(())
    }

    /// Send a single heartbeat, re-registering if it fails. Waits for a heartbeat already
    /// running on the loop, so the two never overlap.
    pub async fn send_heartbeat(&self) -> Result<(), LifecycleError> {
        self.lifecycle.heartbeat(&self.coordinator.token()).await
    }

    /// Best-effort deregistration: one DOWN update, failures are returned but not retried.
    pub async fn down(&self) -> Result<(), LifecycleError> {
        self.lifecycle.down().await
    }

    /// Stop heartbeating, deregister, and wait out the grace period.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        self.coordinator.shutdown(&self.lifecycle).await
    }

    fn start_heartbeat(&mut self) {
        if self.coordinator.heartbeat_running() {
            return;
        }

        let token = self.coordinator.token();
        if token.is_cancelled() {
            return;
        }

        let handle = heartbeat::spawn(self.lifecycle.clone(), self.heartbeat_interval, token);
        self.coordinator.track_heartbeat(handle);
    }
}
