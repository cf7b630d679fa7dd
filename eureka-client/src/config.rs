use std::time;

use crate::identity::Credentials;
use crate::retry::RetryPolicy;

/// Everything a `RegistryAgent` needs to know, read once at construction.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the registry, e.g. `http://localhost:8761/eureka`.
    pub registry_url: String,
    pub app_name: String,
    /// Port the instance serves on, advertised in the descriptor.
    pub port: u16,
    pub credentials: Credentials,
    /// Log every successful heartbeat at INFO instead of DEBUG.
    pub verbose: bool,
    pub heartbeat_interval: time::Duration,
    /// How long to wait after deregistering before reporting termination.
    pub shutdown_grace_period: time::Duration,
    pub request_timeout: time::Duration,
    pub retry_policy: RetryPolicy,
}

impl ClientConfig {
    pub fn new(registry_url: &str, app_name: &str) -> Self {
        Self {
            registry_url: registry_url.to_owned(),
            app_name: app_name.to_owned(),
            port: 8080,
            credentials: Credentials::default(),
            verbose: false,
            heartbeat_interval: time::Duration::from_secs(10),
            shutdown_grace_period: time::Duration::from_secs(3),
            request_timeout: time::Duration::from_secs(5),
            retry_policy: RetryPolicy::constant(time::Duration::from_secs(10)),
        }
    }
}
