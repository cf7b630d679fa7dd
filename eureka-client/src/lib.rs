//! Client-side registration with a Eureka-style service registry: register the running
//! instance, keep it alive with heartbeats, and deregister it on shutdown.
pub mod address;
pub mod config;
pub mod descriptor;
pub mod error;
mod heartbeat;
pub mod identity;
pub mod lifecycle;
pub mod retry;
pub mod shutdown;
pub mod signals;
pub mod transport;

#[cfg(test)]
mod test_utils;

pub use address::{AddressResolver, FixedAddress, LocalIpResolver};
pub use config::ClientConfig;
pub use descriptor::LifecycleState;
pub use error::{ConfigError, LifecycleError, RegistryError, TransportError};
pub use identity::{Credentials, InstanceIdentity};
pub use lifecycle::RegistryAgent;
pub use retry::RetryPolicy;
pub use shutdown::ShutdownPhase;
pub use transport::{HttpTransport, RegistryTransport};
