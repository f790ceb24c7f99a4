//! Dual-stack connection establishment (RFC 8305, "Happy Eyeballs v2").
//!
//! A dial races two name lookups (A and AAAA) and a staggered series of
//! connection attempts against each other. One driver task owns all of the
//! race's mutable state and consumes events over channels; lookups and
//! attempts run as spawned tasks holding the dial's cancellation token, so
//! the first success tears every loser down exactly once.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::{AddressFamily, DialConfig};
use crate::dns::{HickoryResolver, Resolver};
use crate::transport::{TcpTransport, Transport};

mod errors;
mod interleave;
mod resolution;
mod state;

pub use errors::{AttemptError, DialError};

use interleave::CandidateQueue;
use resolution::{LookupTracker, ResolutionOutcome};
use state::{advance, DialEvent, DialPhase};

/// Establish a TCP connection to `host:port` with the system resolver.
///
/// Convenience wrapper over [`Connector`] for the common case.
pub async fn connect(
    host: &str,
    port: u16,
    config: DialConfig,
) -> Result<tokio::net::TcpStream, DialError> {
    Connector::from_system_conf(config)?.connect(host, port).await
}

/// A reusable dual-stack dialer: a resolver, a transport, and timing policy.
pub struct Connector<R = HickoryResolver, T = TcpTransport> {
    resolver: Arc<R>,
    transport: Arc<T>,
    config: DialConfig,
}

impl Connector {
    pub fn from_system_conf(config: DialConfig) -> std::io::Result<Self> {
        Ok(Self::with_parts(
            HickoryResolver::from_system_conf()?,
            TcpTransport,
            config,
        ))
    }
}

impl<R: Resolver, T: Transport> Connector<R, T> {
    pub fn with_parts(resolver: R, transport: T, config: DialConfig) -> Self {
        Self {
            resolver: Arc::new(resolver),
            transport: Arc::new(transport),
            config,
        }
    }

    pub fn config(&self) -> &DialConfig {
        &self.config
    }

    /// Dial `host:port`, returning the first connection to complete.
    pub async fn connect(&self, host: &str, port: u16) -> Result<T::Connection, DialError> {
        match self.config.overall_timeout {
            Some(limit) => match time::timeout(limit, self.race(host, port)).await {
                Ok(result) => result,
                Err(_) => Err(DialError::Timeout(limit)),
            },
            None => self.race(host, port).await,
        }
    }

    async fn race(&self, host: &str, port: u16) -> Result<T::Connection, DialError> {
        // address literals skip the resolution race entirely
        if let Ok(ip) = host.parse::<IpAddr>() {
            let addr = SocketAddr::new(ip, port);
            tracing::debug!(%addr, "host is an address literal, dialing directly");
            return self.transport.connect(addr).await.map_err(|source| {
                DialError::Exhausted {
                    attempts: vec![AttemptError { addr, source }],
                    lookups: Vec::new(),
                }
            });
        }

        let cancel = CancellationToken::new();
        // an abandoned dial (overall timeout, caller drop) cancels its tasks
        let _cancel_guard = cancel.clone().drop_guard();

        let (outcome_tx, outcome_rx) = mpsc::channel(AddressFamily::BOTH.len());
        resolution::spawn_lookups(
            self.resolver.clone(),
            host.to_owned(),
            cancel.clone(),
            outcome_tx,
        );

        let (attempt_tx, attempt_rx) = mpsc::channel(8);
        let driver = RaceDriver {
            transport: self.transport.clone(),
            preferred_family: self.config.preferred_family,
            resolution_delay: self.config.resolution_delay,
            attempt_delay: self.config.connection_attempt_delay,
            cancel,
            outcome_rx,
            attempt_tx,
            attempt_rx,
            state: RaceState::new(),
            queue: CandidateQueue::new(self.config.preferred_family, port),
            preferred_deadline: None,
            next_dispatch: None,
        };
        driver.run().await
    }
}

type AttemptResult<C> = (usize, Result<C, AttemptError>);

/// One dispatched connection attempt. Terminal outcomes are final.
#[derive(Debug)]
struct AttemptRecord {
    addr: SocketAddr,
    started_at: Instant,
    outcome: AttemptOutcome,
}

#[derive(Debug)]
enum AttemptOutcome {
    Pending,
    Succeeded,
    Failed(AttemptError),
    Canceled,
}

/// All mutable state of one dial. Owned and mutated by the driver task only.
struct RaceState {
    phase: DialPhase,
    lookups: LookupTracker,
    attempts: Vec<AttemptRecord>,
}

impl RaceState {
    fn new() -> Self {
        Self {
            phase: DialPhase::Resolving,
            lookups: LookupTracker::default(),
            attempts: Vec::new(),
        }
    }

    fn apply(&mut self, event: DialEvent) {
        let next = advance(self.phase, event).expect("event not legal in this phase");
        debug_assert!(next.ordinal() >= self.phase.ordinal());
        self.phase = next;
    }

    fn start_attempt(&mut self, addr: SocketAddr, now: Instant) -> usize {
        self.attempts.push(AttemptRecord {
            addr,
            started_at: now,
            outcome: AttemptOutcome::Pending,
        });
        self.attempts.len() - 1
    }

    fn finish_attempt(&mut self, index: usize, outcome: AttemptOutcome) {
        let record = &mut self.attempts[index];
        if matches!(record.outcome, AttemptOutcome::Pending) {
            record.outcome = outcome;
        }
    }

    fn cancel_pending(&mut self) -> usize {
        let mut canceled = 0;
        for record in &mut self.attempts {
            if matches!(record.outcome, AttemptOutcome::Pending) {
                record.outcome = AttemptOutcome::Canceled;
                canceled += 1;
            }
        }
        canceled
    }

    fn pending_attempts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|record| matches!(record.outcome, AttemptOutcome::Pending))
            .count()
    }

    fn drain_attempt_failures(&mut self) -> Vec<AttemptError> {
        self.attempts
            .drain(..)
            .filter_map(|record| match record.outcome {
                AttemptOutcome::Failed(err) => Some(err),
                _ => None,
            })
            .collect()
    }
}

/// The single logical owner of a dial in flight.
struct RaceDriver<T: Transport> {
    transport: Arc<T>,
    preferred_family: AddressFamily,
    resolution_delay: Duration,
    attempt_delay: Duration,
    cancel: CancellationToken,
    outcome_rx: mpsc::Receiver<ResolutionOutcome>,
    attempt_tx: mpsc::Sender<AttemptResult<T::Connection>>,
    attempt_rx: mpsc::Receiver<AttemptResult<T::Connection>>,
    state: RaceState,
    queue: CandidateQueue,
    /// Armed while fallback candidates are held back for the preferred
    /// family's answer.
    preferred_deadline: Option<Instant>,
    /// Earliest start time of the next attempt. `None` before the first one.
    next_dispatch: Option<Instant>,
}

impl<T: Transport> RaceDriver<T> {
    async fn run(mut self) -> Result<T::Connection, DialError> {
        loop {
            if let Some(err) = self.terminal_failure() {
                self.state.apply(DialEvent::Exhausted);
                self.cancel.cancel();
                return Err(err);
            }
            self.dispatch_due();

            let want_lookups = !self.state.lookups.both_final();
            let want_attempts = self.state.pending_attempts() > 0;
            let preferred_timer = self.preferred_deadline;
            let dispatch_timer = if self.state.phase.can_dial() && !self.queue.is_empty() {
                self.next_dispatch
            } else {
                None
            };

            tokio::select! {
                outcome = self.outcome_rx.recv(), if want_lookups => {
                    let Some(outcome) = outcome else { continue };
                    self.on_lookup(outcome);
                }
                result = self.attempt_rx.recv(), if want_attempts => {
                    let Some((index, result)) = result else { continue };
                    match result {
                        Ok(conn) => return Ok(self.declare_winner(index, conn)),
                        Err(err) => self.on_attempt_failure(index, err),
                    }
                }
                _ = time::sleep_until(sleep_target(preferred_timer)), if preferred_timer.is_some() => {
                    self.preferred_deadline = None;
                    self.state.apply(DialEvent::PreferredWaitElapsed);
                    tracing::debug!(
                        family = %self.preferred_family,
                        "no answer from the preferred family in time, dialing what we have"
                    );
                }
                _ = time::sleep_until(sleep_target(dispatch_timer)), if dispatch_timer.is_some() => {
                    // next loop iteration dispatches
                }
            }
        }
    }

    /// Terminal-failure check: nothing in flight, nothing left to try.
    fn terminal_failure(&mut self) -> Option<DialError> {
        if !self.state.lookups.both_final()
            || !self.queue.is_empty()
            || self.state.pending_attempts() > 0
        {
            return None;
        }
        if self.state.attempts.is_empty() {
            // both lookups necessarily failed: a success always queues
            // at least one candidate
            let v6 = self
                .state
                .lookups
                .take_failure(AddressFamily::Ipv6)
                .expect("family without candidates must have failed");
            let v4 = self
                .state
                .lookups
                .take_failure(AddressFamily::Ipv4)
                .expect("family without candidates must have failed");
            Some(DialError::NoAddresses { v6, v4 })
        } else {
            Some(DialError::Exhausted {
                attempts: self.state.drain_attempt_failures(),
                lookups: self.state.lookups.take_failures(),
            })
        }
    }

    /// Start the next candidate if the phase and the stagger timer allow it.
    fn dispatch_due(&mut self) {
        if !self.state.phase.can_dial() || self.queue.is_empty() {
            return;
        }
        let now = Instant::now();
        if self.next_dispatch.is_some_and(|at| at > now) {
            return;
        }
        let Some(addr) = self.queue.next() else { return };
        let index = self.state.start_attempt(addr, now);
        spawn_attempt(
            self.transport.clone(),
            addr,
            index,
            self.cancel.clone(),
            self.attempt_tx.clone(),
        );
        self.next_dispatch = Some(now + self.attempt_delay);
        tracing::debug!(%addr, index, "connection attempt started");
    }

    fn on_lookup(&mut self, outcome: ResolutionOutcome) {
        let ResolutionOutcome { family, result } = outcome;
        let event = if family == self.preferred_family {
            DialEvent::PreferredResolved
        } else {
            DialEvent::FallbackResolved
        };
        match result {
            Ok(addrs) => {
                tracing::debug!(%family, addresses = addrs.len(), "lookup answered");
                self.state.lookups.record_success(family, addrs.len());
                self.queue.extend(family, addrs);
            }
            Err(err) => {
                tracing::debug!(%family, %err, "lookup failed");
                self.state.lookups.record_failure(family, err);
            }
        }

        let before = self.state.phase;
        self.state.apply(event);
        match (before, self.state.phase) {
            (DialPhase::Resolving, DialPhase::AwaitingPreferred) => {
                self.preferred_deadline = Some(Instant::now() + self.resolution_delay);
            }
            (DialPhase::AwaitingPreferred, _) => self.preferred_deadline = None,
            _ => {}
        }
    }

    fn on_attempt_failure(&mut self, index: usize, err: AttemptError) {
        let elapsed = self.state.attempts[index].started_at.elapsed();
        tracing::debug!(addr = %err.addr, index, ?elapsed, %err, "connection attempt failed");
        self.state.finish_attempt(index, AttemptOutcome::Failed(err));
    }

    /// First success wins; everything else is canceled exactly once and its
    /// eventual result discarded.
    fn declare_winner(&mut self, index: usize, conn: T::Connection) -> T::Connection {
        self.state.finish_attempt(index, AttemptOutcome::Succeeded);
        self.state.apply(DialEvent::WinnerFound);
        let canceled = self.state.cancel_pending();
        self.cancel.cancel();
        tracing::debug!(
            addr = %self.state.attempts[index].addr,
            canceled,
            "connection established"
        );
        conn
    }
}

fn sleep_target(at: Option<Instant>) -> Instant {
    at.unwrap_or_else(Instant::now)
}

fn spawn_attempt<T: Transport>(
    transport: Arc<T>,
    addr: SocketAddr,
    index: usize,
    cancel: CancellationToken,
    results: mpsc::Sender<AttemptResult<T::Connection>>,
) {
    tokio::spawn(async move {
        let result = tokio::select! {
            // dropping the in-flight connect releases whatever it had set up
            _ = cancel.cancelled() => return,
            result = transport.connect(addr) => {
                result.map_err(|source| AttemptError { addr, source })
            }
        };
        // receiver gone means a winner was already handed to the caller
        let _ = results.send((index, result)).await;
    });
}
