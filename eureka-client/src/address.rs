use std::net::{IpAddr, Ipv4Addr};

use tracing::warn;

use crate::error::AddressResolutionError;

/// Advertised when the external address cannot be resolved.
pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Resolves the network address this instance should advertise to the registry.
pub trait AddressResolver: Send + Sync {
    fn resolve(&self) -> Result<IpAddr, AddressResolutionError>;
}

impl<R: AddressResolver + ?Sized> AddressResolver for Box<R> {
    fn resolve(&self) -> Result<IpAddr, AddressResolutionError> {
        (**self).resolve()
    }
}

/// Address of the interface carrying the default route.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalIpResolver;

impl AddressResolver for LocalIpResolver {
    fn resolve(&self) -> Result<IpAddr, AddressResolutionError> {
        local_ip_address::local_ip().map_err(|e| AddressResolutionError(e.to_string()))
    }
}

/// Always advertise the same, configured address.
#[derive(Clone, Copy, Debug)]
pub struct FixedAddress(pub IpAddr);

impl AddressResolver for FixedAddress {
    fn resolve(&self) -> Result<IpAddr, AddressResolutionError> {
        Ok(self.0)
    }
}

/// Resolve the address to advertise, falling back to loopback. Registration must never
/// block on address discovery.
pub fn resolve_or_default(resolver: &dyn AddressResolver) -> IpAddr {
    match resolver.resolve() {
        Ok(address) => address,
        Err(error) => {
            warn!(%error, default = %DEFAULT_ADDRESS, "using default address");
            DEFAULT_ADDRESS
        }
    }
}
