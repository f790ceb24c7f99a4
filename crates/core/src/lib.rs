//! Dual-stack TCP connection establishment following RFC 8305
//! ("Happy Eyeballs v2"): race the A and AAAA lookups, interleave the
//! resulting candidates, stagger the connection attempts, and hand the
//! caller the first connection that completes while everything else is
//! torn down.

/// Dial configuration and logging setup.
pub mod config;

/// The dial driver: resolution race, candidate interleaving, staggered
/// connection attempts, and winner/teardown semantics.
pub mod dial;

/// Name resolution capability and the system (hickory) resolver.
pub mod dns;

/// Transport capability and the plain TCP transport.
pub mod transport;

pub use config::{AddressFamily, DialConfig};
pub use dial::{connect, AttemptError, Connector, DialError};
pub use dns::{HickoryResolver, ResolutionError, Resolver};
pub use transport::{TcpTransport, Transport};
