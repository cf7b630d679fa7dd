use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time;

use envconfig::Envconfig;
use eureka_client::{ClientConfig, Credentials, RetryPolicy};

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "EUREKA_URL", default = "http://localhost:8761/eureka")]
    pub registry_url: String,

    pub app_name: NonEmptyString,

    #[envconfig(default = "8080")]
    pub port: u16,

    #[envconfig(default = "")]
    pub username: String,

    #[envconfig(default = "")]
    pub password: String,

    #[envconfig(default = "false")]
    pub verbose: bool,

    #[envconfig(default = "10000")]
    pub heartbeat_interval: EnvMsDuration,

    #[envconfig(default = "3000")]
    pub shutdown_grace_period: EnvMsDuration,

    #[envconfig(default = "5000")]
    pub request_timeout: EnvMsDuration,

    /// Advertise this address instead of the default-route interface's.
    pub advertised_address: Option<IpAddr>,

    /// Serve Prometheus metrics on this address when set.
    pub metrics_bind: Option<SocketAddr>,

    #[envconfig(nested = true)]
    pub retry_policy: RetryPolicyConfig,
}

impl Config {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            port: self.port,
            credentials: Credentials::new(&self.username, &self.password),
            verbose: self.verbose,
            heartbeat_interval: self.heartbeat_interval.0,
            shutdown_grace_period: self.shutdown_grace_period.0,
            request_timeout: self.request_timeout.0,
            retry_policy: self.retry_policy.provide(),
            ..ClientConfig::new(&self.registry_url, self.app_name.as_str())
        }
    }
}

#[derive(Envconfig, Clone)]
pub struct RetryPolicyConfig {
    #[envconfig(default = "1")]
    pub backoff_coefficient: u32,

    #[envconfig(default = "10000")]
    pub initial_interval: EnvMsDuration,

    pub maximum_interval: Option<EnvMsDuration>,

    pub max_attempts: Option<u32>,
}

impl RetryPolicyConfig {
    pub fn provide(&self) -> RetryPolicy {
        let mut builder = RetryPolicy::build(self.backoff_coefficient, self.initial_interval.0);

        if let Some(interval) = self.maximum_interval {
            builder = builder.maximum_interval(interval.0);
        }
        if let Some(attempts) = self.max_attempts {
            builder = builder.maximum_attempts(attempts);
        }

        builder.provide()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[derive(Debug, Clone)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StringIsEmptyError;

impl FromStr for NonEmptyString {
    type Err = StringIsEmptyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(StringIsEmptyError)
        } else {
            Ok(NonEmptyString(s.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use eureka_client::{ConfigError, FixedAddress, RegistryAgent};

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::init_from_hashmap(&env(&[("APP_NAME", "MY-SERVICE")]))
            .expect("config should load");
        let client = config.client_config();

        assert_eq!(client.registry_url, "http://localhost:8761/eureka");
        assert_eq!(client.app_name, "MY-SERVICE");
        assert_eq!(client.port, 8080);
        assert!(!client.verbose);
        assert_eq!(client.heartbeat_interval, time::Duration::from_secs(10));
        assert_eq!(client.shutdown_grace_period, time::Duration::from_secs(3));
        assert_eq!(
            client.retry_policy.retry_interval(5),
            time::Duration::from_secs(10)
        );
        assert!(client.retry_policy.should_retry(1_000));
        assert!(config.advertised_address.is_none());
        assert!(config.metrics_bind.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::init_from_hashmap(&env(&[
            ("EUREKA_URL", "http://registry:8761/eureka"),
            ("APP_NAME", "svc"),
            ("PORT", "9000"),
            ("USERNAME", "admin"),
            ("PASSWORD", "secret"),
            ("VERBOSE", "true"),
            ("HEARTBEAT_INTERVAL", "500"),
            ("ADVERTISED_ADDRESS", "10.0.0.9"),
            ("BACKOFF_COEFFICIENT", "2"),
            ("INITIAL_INTERVAL", "100"),
            ("MAXIMUM_INTERVAL", "300"),
            ("MAX_ATTEMPTS", "5"),
        ]))
        .expect("config should load");
        let client = config.client_config();

        assert_eq!(client.registry_url, "http://registry:8761/eureka");
        assert_eq!(client.port, 9000);
        assert_eq!(client.credentials.username, "admin");
        assert_eq!(client.credentials.password, "secret");
        assert!(client.verbose);
        assert_eq!(client.heartbeat_interval, time::Duration::from_millis(500));
        assert_eq!(
            config.advertised_address,
            Some("10.0.0.9".parse().unwrap())
        );
        assert_eq!(
            client.retry_policy.retry_interval(3),
            time::Duration::from_millis(300)
        );
        assert!(!client.retry_policy.should_retry(5));
    }

    #[test]
    fn test_app_name_is_required() {
        assert!(Config::init_from_hashmap(&env(&[])).is_err());
        assert!(Config::init_from_hashmap(&env(&[("APP_NAME", "")])).is_err());
    }

    #[test]
    fn test_zero_heartbeat_interval_is_rejected() {
        let config = Config::init_from_hashmap(&env(&[
            ("APP_NAME", "svc"),
            ("HEARTBEAT_INTERVAL", "0"),
        ]))
        .expect("config should load");

        let result = RegistryAgent::from_config(
            config.client_config(),
            FixedAddress("10.0.0.9".parse().unwrap()),
        );

        assert!(matches!(result, Err(ConfigError::ZeroHeartbeatInterval)));
    }
}
