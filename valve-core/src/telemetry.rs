//! Fixed-size history of valve status transitions.
//!
//! Both the firmware and the bench keep the last few transitions for status
//! reporting. Records carry a monotonically increasing [`EventId`] so readers
//! can tell when older entries have been overwritten.

use core::time::Duration;

use heapless::HistoryBuf;

use crate::time::Millis;
use crate::valve::ValveStatus;

/// Sequence number assigned to each recorded transition.
pub type EventId = u32;

/// Default number of transitions retained.
pub const TRANSITION_LOG_CAPACITY: usize = 16;

/// One recorded status change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub id: EventId,
    pub at: Millis,
    pub from: ValveStatus,
    pub to: ValveStatus,
    /// Time spent in `from`, if an earlier transition was recorded.
    pub dwell: Option<Duration>,
}

/// Ring of the most recent [`Transition`]s.
pub struct TransitionLog<const N: usize = TRANSITION_LOG_CAPACITY> {
    ring: HistoryBuf<Transition, N>,
    next_id: EventId,
}

impl<const N: usize> Default for TransitionLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TransitionLog<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_id: 0,
        }
    }

    /// Appends a transition, evicting the oldest once full.
    pub fn record(&mut self, at: Millis, from: ValveStatus, to: ValveStatus) -> EventId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let dwell = self
            .ring
            .recent()
            .map(|previous| Duration::from_millis(u64::from(at.elapsed_since(previous.at))));
        self.ring.write(Transition {
            id,
            at,
            from,
            to,
            dwell,
        });
        id
    }

    /// Most recent transition.
    #[must_use]
    pub fn latest(&self) -> Option<&Transition> {
        self.ring.recent()
    }

    /// Transitions in the order they happened.
    pub fn iter_oldest(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.ring.oldest_ordered()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total number of transitions recorded, including evicted ones.
    #[must_use]
    pub fn recorded(&self) -> EventId {
        self.next_id
    }
}
