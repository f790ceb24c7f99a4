use std::borrow::Cow;
use std::io;
use std::net::IpAddr;

use hickory_resolver::name_server::{GenericConnector, TokioRuntimeProvider};
use hickory_resolver::TokioAsyncResolver;

use super::{ResolutionError, Resolver};
use crate::config::AddressFamily;

/// System-configured DNS resolver (reads `/etc/resolv.conf` and friends).
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryResolver {
    pub fn from_system_conf() -> io::Result<Self> {
        let (conf, opts) =
            hickory_resolver::system_conf::read_system_conf().map_err(io::Error::other)?;
        let resolver = TokioAsyncResolver::new(
            conf,
            opts,
            GenericConnector::new(TokioRuntimeProvider::new()),
        );
        Ok(Self { resolver })
    }
}

impl Resolver for HickoryResolver {
    async fn lookup(
        &self,
        host: &str,
        family: AddressFamily,
    ) -> Result<Vec<IpAddr>, ResolutionError> {
        // only issue one query with .
        let name = if host.ends_with('.') {
            Cow::Borrowed(host)
        } else {
            Cow::Owned(format!("{host}."))
        };
        match family {
            AddressFamily::Ipv4 => self
                .resolver
                .ipv4_lookup(name.as_ref())
                .await
                .map(|lookup| lookup.iter().map(|a| IpAddr::V4(a.0)).collect())
                .map_err(|err| ResolutionError::new(family, err.to_string())),
            AddressFamily::Ipv6 => self
                .resolver
                .ipv6_lookup(name.as_ref())
                .await
                .map(|lookup| lookup.iter().map(|aaaa| IpAddr::V6(aaaa.0)).collect())
                .map_err(|err| ResolutionError::new(family, err.to_string())),
        }
    }
}
