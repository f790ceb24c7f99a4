use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time to keep waiting for the preferred family's answer after the
/// other family has already resolved (RFC 8305 section 8, "Resolution Delay").
pub const DEFAULT_RESOLUTION_DELAY: Duration = Duration::from_millis(50);
/// Default spacing between successive staggered connection attempts
/// (RFC 8305 section 8, "Connection Attempt Delay").
pub const DEFAULT_CONNECTION_ATTEMPT_DELAY: Duration = Duration::from_millis(250);

/// IP address family of a candidate or a DNS query (A vs AAAA).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    pub fn other(self) -> Self {
        match self {
            AddressFamily::Ipv4 => AddressFamily::Ipv6,
            AddressFamily::Ipv6 => AddressFamily::Ipv4,
        }
    }

    pub(crate) const BOTH: [AddressFamily; 2] = [AddressFamily::Ipv6, AddressFamily::Ipv4];
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// Timing and preference knobs for one dial.
///
/// The defaults are the values RFC 8305 section 8 recommends; most callers
/// should start from [`DialConfig::default`] and override selectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialConfig {
    /// How long to hold back fallback-family candidates while the preferred
    /// family's lookup is still outstanding.
    pub resolution_delay: Duration,
    /// Minimum spacing between the starts of two successive connection
    /// attempts.
    pub connection_attempt_delay: Duration,
    /// Family whose candidates are tried first and interleaved ahead.
    pub preferred_family: AddressFamily,
    /// Upper bound on the whole dial, resolution included. `None` means the
    /// dial only fails once every candidate is exhausted.
    pub overall_timeout: Option<Duration>,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            resolution_delay: DEFAULT_RESOLUTION_DELAY,
            connection_attempt_delay: DEFAULT_CONNECTION_ATTEMPT_DELAY,
            preferred_family: AddressFamily::Ipv6,
            overall_timeout: None,
        }
    }
}

impl DialConfig {
    pub fn resolution_delay(&mut self, delay: Duration) -> &mut Self {
        self.resolution_delay = delay;
        self
    }

    pub fn connection_attempt_delay(&mut self, delay: Duration) -> &mut Self {
        self.connection_attempt_delay = delay;
        self
    }

    pub fn preferred_family(&mut self, family: AddressFamily) -> &mut Self {
        self.preferred_family = family;
        self
    }

    pub fn overall_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.overall_timeout = Some(timeout);
        self
    }
}

pub fn set_logger(level: Option<tracing::level_filters::LevelFilter>) {
    static LOGGER_SET: AtomicBool = AtomicBool::new(false);
    if LOGGER_SET
        .compare_exchange(
            false,
            true,
            std::sync::atomic::Ordering::Release,
            std::sync::atomic::Ordering::SeqCst,
        )
        .is_err()
    {
        return;
    }

    let default_filter = if cfg!(any(test, debug_assertions)) {
        tracing::level_filters::LevelFilter::DEBUG
    } else {
        tracing::level_filters::LevelFilter::INFO
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.unwrap_or(default_filter).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_rfc8305() {
        let config = DialConfig::default();
        assert_eq!(config.resolution_delay, Duration::from_millis(50));
        assert_eq!(config.connection_attempt_delay, Duration::from_millis(250));
        assert_eq!(config.preferred_family, AddressFamily::Ipv6);
        assert!(config.overall_timeout.is_none());
    }

    #[test]
    fn family_of_addr() {
        assert_eq!(
            AddressFamily::of(&"192.0.2.1".parse().unwrap()),
            AddressFamily::Ipv4
        );
        assert_eq!(
            AddressFamily::of(&"2001:db8::1".parse().unwrap()),
            AddressFamily::Ipv6
        );
        assert_eq!(AddressFamily::Ipv4.other(), AddressFamily::Ipv6);
    }
}
