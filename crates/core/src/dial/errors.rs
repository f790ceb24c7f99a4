use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use crate::dns::ResolutionError;

/// One connection attempt failed (refused, unreachable, timed out).
///
/// Not fatal on its own; the dial keeps working through the remaining
/// candidates.
#[derive(Debug, thiserror::Error)]
#[error("connect to {addr} failed: {source}")]
pub struct AttemptError {
    pub addr: SocketAddr,
    #[source]
    pub source: io::Error,
}

/// Terminal outcome of a failed dial.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    /// Both lookups failed before a single attempt was possible.
    #[error("no addresses for either family ({v6}; {v4})")]
    NoAddresses {
        v6: ResolutionError,
        v4: ResolutionError,
    },
    /// Every candidate was attempted and failed, and no lookup can produce
    /// more. Carries each individual cause for diagnostics.
    #[error("all connection attempts failed: {}", fmt_causes(.attempts, .lookups))]
    Exhausted {
        attempts: Vec<AttemptError>,
        lookups: Vec<ResolutionError>,
    },
    /// The configured overall timeout elapsed before any attempt succeeded.
    #[error("no connection established within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn fmt_causes(attempts: &[AttemptError], lookups: &[ResolutionError]) -> String {
    let mut causes: Vec<String> = attempts.iter().map(|e| e.to_string()).collect();
    causes.extend(lookups.iter().map(|e| e.to_string()));
    causes.join("; ")
}
