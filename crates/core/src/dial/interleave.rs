//! Candidate ordering across address families.
//!
//! Candidates are kept in one FIFO per family and merged on demand:
//! alternate families starting with the preferred one, and once a family
//! runs dry hand out the remainder of the other as-is (RFC 8305 section 5).
//! Merging on demand instead of up front is what makes late resolution
//! results cheap to absorb: a family that arrives mid-dial just fills its
//! queue, and because each fallback pick parks the turn back on the
//! preferred family, freshly arrived preferred candidates jump ahead of
//! queued fallback ones. Candidates already handed out are gone from the
//! queues and can never be handed out twice.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};

use crate::config::AddressFamily;

pub(crate) struct CandidateQueue {
    port: u16,
    preferred_family: AddressFamily,
    /// Family the next pick should come from, when it has candidates.
    next_family: AddressFamily,
    preferred: VecDeque<SocketAddr>,
    fallback: VecDeque<SocketAddr>,
}

impl CandidateQueue {
    pub(crate) fn new(preferred_family: AddressFamily, port: u16) -> Self {
        Self {
            port,
            preferred_family,
            next_family: preferred_family,
            preferred: VecDeque::new(),
            fallback: VecDeque::new(),
        }
    }

    /// Append one family's resolved addresses, in resolver order.
    pub(crate) fn extend(&mut self, family: AddressFamily, addrs: impl IntoIterator<Item = IpAddr>) {
        let port = self.port;
        self.queue_mut(family)
            .extend(addrs.into_iter().map(|ip| SocketAddr::new(ip, port)));
    }

    /// Hand out the next candidate, alternating families where possible.
    pub(crate) fn next(&mut self) -> Option<SocketAddr> {
        let take_from = if self.queue(self.next_family).is_empty() {
            self.next_family.other()
        } else {
            self.next_family
        };
        let addr = self.queue_mut(take_from).pop_front()?;
        self.next_family = take_from.other();
        Some(addr)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.preferred.is_empty() && self.fallback.is_empty()
    }

    fn queue(&self, family: AddressFamily) -> &VecDeque<SocketAddr> {
        if family == self.preferred_family {
            &self.preferred
        } else {
            &self.fallback
        }
    }

    fn queue_mut(&mut self, family: AddressFamily) -> &mut VecDeque<SocketAddr> {
        if family == self.preferred_family {
            &mut self.preferred
        } else {
            &mut self.fallback
        }
    }
}
