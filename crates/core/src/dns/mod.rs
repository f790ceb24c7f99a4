//! Name resolution capability consumed by the dial driver.
//!
//! The driver only needs one operation: resolve a host name to the addresses
//! of a single family. Keeping that behind a trait makes the race testable
//! without real DNS and lets callers plug in their own resolver.

use std::borrow::Cow;
use std::future::Future;
use std::net::IpAddr;

use crate::config::AddressFamily;

mod hickory;

pub use hickory::HickoryResolver;

/// One address family's lookup failed or produced nothing usable.
///
/// Not fatal on its own: the dial keeps going as long as the other family
/// can still yield candidates.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{family} lookup failed: {cause}")]
pub struct ResolutionError {
    pub family: AddressFamily,
    pub cause: Cow<'static, str>,
}

impl ResolutionError {
    pub fn new(family: AddressFamily, cause: impl Into<Cow<'static, str>>) -> Self {
        Self {
            family,
            cause: cause.into(),
        }
    }

    pub(crate) fn no_records(family: AddressFamily) -> Self {
        Self::new(family, "no usable addresses")
    }
}

/// Make the dial driver testable and resolver-agnostic.
pub trait Resolver: Send + Sync + 'static {
    /// Resolve `host` to the addresses of `family`, in the resolver's
    /// preference order. May block indefinitely; the caller bounds it.
    fn lookup(
        &self,
        host: &str,
        family: AddressFamily,
    ) -> impl Future<Output = Result<Vec<IpAddr>, ResolutionError>> + Send;
}
