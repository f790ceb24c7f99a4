//! The resolution half of the race: one lookup task per address family.
//!
//! Outcomes land on a channel in completion order; the driver applies the
//! timing policy. An empty answer is normalized into a failure here so the
//! driver only ever sees "usable addresses" or "this family is done for".

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::AddressFamily;
use crate::dns::{ResolutionError, Resolver};

/// Produced exactly once per family per dial, in completion order.
#[derive(Debug)]
pub(crate) struct ResolutionOutcome {
    pub(crate) family: AddressFamily,
    pub(crate) result: Result<Vec<IpAddr>, ResolutionError>,
}

/// Start both family lookups. Each task holds the dial's cancellation token
/// and quits silently once the dial no longer needs it.
pub(crate) fn spawn_lookups<R: Resolver>(
    resolver: Arc<R>,
    host: String,
    cancel: CancellationToken,
    outcomes: mpsc::Sender<ResolutionOutcome>,
) {
    for family in AddressFamily::BOTH {
        let resolver = resolver.clone();
        let host = host.clone();
        let cancel = cancel.clone();
        let outcomes = outcomes.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = resolver.lookup(&host, family) => result,
            };
            let result = match result {
                Ok(addrs) if addrs.is_empty() => Err(ResolutionError::no_records(family)),
                other => other,
            };
            // receiver gone means the dial already finished
            let _ = outcomes.send(ResolutionOutcome { family, result }).await;
        });
    }
}

/// Which families have answered, and with what.
#[derive(Debug, Default)]
pub(crate) struct LookupTracker {
    slots: [Option<Result<usize, ResolutionError>>; 2],
}

impl LookupTracker {
    fn slot(family: AddressFamily) -> usize {
        match family {
            AddressFamily::Ipv4 => 0,
            AddressFamily::Ipv6 => 1,
        }
    }

    pub(crate) fn record_success(&mut self, family: AddressFamily, addresses: usize) {
        debug_assert!(self.slots[Self::slot(family)].is_none());
        self.slots[Self::slot(family)] = Some(Ok(addresses));
    }

    pub(crate) fn record_failure(&mut self, family: AddressFamily, err: ResolutionError) {
        debug_assert!(self.slots[Self::slot(family)].is_none());
        self.slots[Self::slot(family)] = Some(Err(err));
    }

    pub(crate) fn both_final(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Remove and return one family's recorded failure, if that is what it
    /// ended with.
    pub(crate) fn take_failure(&mut self, family: AddressFamily) -> Option<ResolutionError> {
        match self.slots[Self::slot(family)].take() {
            Some(Err(err)) => Some(err),
            other => {
                self.slots[Self::slot(family)] = other;
                None
            }
        }
    }

    /// Remove and return every recorded failure.
    pub(crate) fn take_failures(&mut self) -> Vec<ResolutionError> {
        AddressFamily::BOTH
            .into_iter()
            .filter_map(|family| self.take_failure(family))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver {
        v4: Result<Vec<IpAddr>, ResolutionError>,
        v6: Result<Vec<IpAddr>, ResolutionError>,
    }

    impl Resolver for FixedResolver {
        async fn lookup(
            &self,
            _host: &str,
            family: AddressFamily,
        ) -> Result<Vec<IpAddr>, ResolutionError> {
            match family {
                AddressFamily::Ipv4 => self.v4.clone(),
                AddressFamily::Ipv6 => self.v6.clone(),
            }
        }
    }

    #[tokio::test]
    async fn empty_answers_become_failures() {
        let resolver = Arc::new(FixedResolver {
            v4: Ok(vec![]),
            v6: Ok(vec!["2001:db8::1".parse().unwrap()]),
        });
        let (tx, mut rx) = mpsc::channel(2);
        spawn_lookups(resolver, "example.com".into(), CancellationToken::new(), tx);

        let mut saw_v4_failure = false;
        let mut saw_v6_addrs = false;
        for _ in 0..2 {
            let outcome = rx.recv().await.unwrap();
            match outcome.family {
                AddressFamily::Ipv4 => saw_v4_failure = outcome.result.is_err(),
                AddressFamily::Ipv6 => saw_v6_addrs = outcome.result.is_ok(),
            }
        }
        assert!(saw_v4_failure);
        assert!(saw_v6_addrs);
    }

    #[tokio::test]
    async fn canceled_lookups_emit_nothing() {
        struct HangingResolver;
        impl Resolver for HangingResolver {
            async fn lookup(
                &self,
                _host: &str,
                _family: AddressFamily,
            ) -> Result<Vec<IpAddr>, ResolutionError> {
                std::future::pending().await
            }
        }

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(2);
        spawn_lookups(Arc::new(HangingResolver), "example.com".into(), cancel.clone(), tx);
        cancel.cancel();
        // both tasks drop their sender without sending
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn tracker_keeps_failures_until_taken() {
        let mut tracker = LookupTracker::default();
        tracker.record_success(AddressFamily::Ipv6, 2);
        tracker.record_failure(
            AddressFamily::Ipv4,
            ResolutionError::no_records(AddressFamily::Ipv4),
        );
        assert!(tracker.both_final());
        assert!(tracker.take_failure(AddressFamily::Ipv6).is_none());
        let failures = tracker.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].family, AddressFamily::Ipv4);
    }
}
