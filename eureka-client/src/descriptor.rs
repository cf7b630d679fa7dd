//! The instance descriptor: the document POSTed to `/apps/{app}` on every status change.
use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

use crate::identity::InstanceIdentity;

const SCHEME: &str = "http";
const SECURE_PORT: &str = "443";
const DATA_CENTER_CLASS: &str = "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";
const DATA_CENTER_NAME: &str = "MyOwn";

/// Registration status of this instance, as reported to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Starting,
    Up,
    Down,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Starting => "STARTING",
            LifecycleState::Up => "UP",
            LifecycleState::Down => "DOWN",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
pub struct InstanceRequest {
    pub instance: InstanceDescriptor,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDescriptor {
    pub host_name: String,
    pub app: String,
    pub vip_address: String,
    pub secure_vip_address: String,
    pub instance_id: String,
    pub ip_addr: String,
    pub status: LifecycleState,
    pub port: PortInfo,
    pub secure_port: PortInfo,
    pub health_check_url: String,
    pub status_page_url: String,
    pub home_page_url: String,
    pub data_center_info: DataCenterInfo,
}

#[derive(Debug, Serialize)]
pub struct PortInfo {
    #[serde(rename = "$")]
    pub port: String,
    #[serde(rename = "@enabled")]
    pub enabled: String,
}

impl PortInfo {
    fn new(port: &str, enabled: bool) -> Self {
        Self {
            port: port.to_owned(),
            enabled: enabled.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DataCenterInfo {
    #[serde(rename = "@class")]
    pub class: String,
    pub name: String,
}

impl InstanceRequest {
    /// Describe `identity` in `state`, reachable at `address`.
    ///
    /// The host name is always the advertised address rather than the OS hostname, so
    /// other services can reach us without relying on DNS.
    pub fn new(identity: &InstanceIdentity, state: LifecycleState, address: IpAddr) -> Self {
        let port = identity.port().to_string();
        let ip_addr = address.to_string();
        let home_page_url = match address {
            IpAddr::V4(_) => format!("{}://{}:{}/", SCHEME, ip_addr, port),
            IpAddr::V6(_) => format!("{}://[{}]:{}/", SCHEME, ip_addr, port),
        };
        let vip_address = identity.app_name().to_lowercase();

        Self {
            instance: InstanceDescriptor {
                host_name: ip_addr.clone(),
                app: identity.app_name().to_owned(),
                secure_vip_address: vip_address.clone(),
                vip_address,
                instance_id: identity.instance_id().to_owned(),
                ip_addr,
                status: state,
                port: PortInfo::new(&port, true),
                secure_port: PortInfo::new(SECURE_PORT, false),
                health_check_url: format!("{}health", home_page_url),
                status_page_url: format!("{}info", home_page_url),
                home_page_url,
                data_center_info: DataCenterInfo {
                    class: DATA_CENTER_CLASS.to_owned(),
                    name: DATA_CENTER_NAME.to_owned(),
                },
            },
        }
    }
}
