//! Keep this service instance registered with a Eureka registry until SIGINT/SIGTERM.
use anyhow::Context;
use envconfig::Envconfig;
use eureka_client::address::{AddressResolver, FixedAddress, LocalIpResolver};
use eureka_client::signals::wait_for_shutdown_signal;
use eureka_client::{LifecycleError, LifecycleState, RegistryAgent};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::init_from_env().context("invalid configuration")?;

    if let Some(bind) = config.metrics_bind {
        PrometheusBuilder::new()
            .with_http_listener(bind)
            .install()
            .context("failed to start metrics exporter")?;
        info!(%bind, "serving metrics");
    }

    let resolver: Box<dyn AddressResolver> = match config.advertised_address {
        Some(address) => Box::new(FixedAddress(address)),
        None => Box::new(LocalIpResolver),
    };
    let mut agent = RegistryAgent::from_config(config.client_config(), resolver)
        .context("failed to build registry agent")?;

    let shutdown = agent.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "cannot listen for shutdown signals, shutting down");
        }
        shutdown.cancel();
    });

    info!(
        app = agent.identity().app_name(),
        instance_id = agent.identity().instance_id(),
        registry = %config.registry_url,
        "registering"
    );
    match agent.register().await {
        Ok(()) | Err(LifecycleError::Cancelled) => {}
        Err(e) => {
            error!(error = %e, "registration aborted");
            agent.shutdown_token().cancel();
        }
    }

    agent.shutdown_token().cancelled().await;
    if agent.state() == LifecycleState::Down {
        warn!("registration lost, shutting down");
    }
    if let Err(e) = agent.shutdown().await {
        error!(error = %e, "instance may still be listed as UP");
    }

    info!("terminated");
    Ok(())
}
