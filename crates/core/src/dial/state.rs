//! Phase tracking for one dial.
//!
//! Every phase change goes through [`advance`], a total function over the
//! (phase, event) pairs that can legally occur. Anything outside the table is
//! a driver bug, not a runtime condition. Phases only ever move forward;
//! [`DialPhase::ordinal`] encodes the order and `advance` is checked against
//! it in the tests.

/*
        Phase change diagram
        Resolving : both lookups outstanding after requesting A and AAAA
        Resolving         -> Dialing           : preferred family's lookup finishes
        Resolving         -> AwaitingPreferred : fallback family's lookup finishes first
        AwaitingPreferred -> Dialing           : preferred lookup finishes within the hold
        AwaitingPreferred -> FallbackDialing   : hold timer elapses
        FallbackDialing   -> MergedDialing     : preferred lookup finishes late
        Dialing           -> Dialing           : fallback lookup finishes (queue re-merged)
        Dialing | FallbackDialing | MergedDialing -> Connected : an attempt wins
        any non-terminal  -> Failed            : every candidate and lookup is spent
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialPhase {
    /// Both family lookups are still outstanding.
    Resolving,
    /// The fallback family answered first; its candidates are held back while
    /// the preferred family gets a bounded head start.
    AwaitingPreferred,
    /// Dialing with no hold in effect: the preferred family has answered, or
    /// every lookup is already final.
    Dialing,
    /// Dialing fallback candidates while the preferred lookup is still out.
    FallbackDialing,
    /// The preferred lookup landed mid-dial and its candidates were merged in.
    MergedDialing,
    Connected,
    Failed,
}

impl DialPhase {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, DialPhase::Connected | DialPhase::Failed)
    }

    /// Whether connection attempts may be dispatched in this phase.
    pub(crate) fn can_dial(self) -> bool {
        matches!(
            self,
            DialPhase::Dialing | DialPhase::FallbackDialing | DialPhase::MergedDialing
        )
    }

    /// Position in the forward-only ordering of phases.
    pub(crate) fn ordinal(self) -> u8 {
        match self {
            DialPhase::Resolving => 0,
            DialPhase::AwaitingPreferred => 1,
            DialPhase::Dialing => 2,
            DialPhase::FallbackDialing => 3,
            DialPhase::MergedDialing => 4,
            DialPhase::Connected => 5,
            DialPhase::Failed => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialEvent {
    /// The preferred family's lookup completed (with addresses or an error).
    PreferredResolved,
    /// The fallback family's lookup completed (with addresses or an error).
    FallbackResolved,
    /// The bounded wait for the preferred family elapsed.
    PreferredWaitElapsed,
    /// An attempt succeeded.
    WinnerFound,
    /// No candidates remain and no lookup can produce more.
    Exhausted,
}

/// The transition table. Returns `None` for pairs the driver must never feed.
pub(crate) fn advance(phase: DialPhase, event: DialEvent) -> Option<DialPhase> {
    use DialEvent::*;
    use DialPhase::*;
    let next = match (phase, event) {
        (Resolving, PreferredResolved) => Dialing,
        (Resolving, FallbackResolved) => AwaitingPreferred,
        (AwaitingPreferred, PreferredResolved) => Dialing,
        (AwaitingPreferred, PreferredWaitElapsed) => FallbackDialing,
        (Dialing, FallbackResolved) => Dialing,
        (FallbackDialing, PreferredResolved) => MergedDialing,
        (Dialing | FallbackDialing | MergedDialing, WinnerFound) => Connected,
        (phase, Exhausted) if !phase.is_terminal() => Failed,
        _ => return None,
    };
    Some(next)
}
