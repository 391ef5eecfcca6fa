//! Pending burst state for deduplication
//!
//! `Idle` means no timer is scheduled. The first delivery of a burst moves
//! the state to `Pending` together with its timer, so there is never more
//! than one timer per listener. `take` hands the whole burst back in one
//! step and resets to `Idle`.

use tokio::task::JoinHandle;

use crate::transport::Delivery;

#[derive(Debug, Default)]
pub(crate) enum BurstState {
    #[default]
    Idle,
    Pending {
        deliveries: Vec<Delivery>,
        timer: JoinHandle<()>,
    },
}

/// A drained burst: the delivery to process and the superseded ones
#[derive(Debug)]
pub(crate) struct Burst {
    pub latest: Delivery,
    pub discarded: Vec<Delivery>,
}

impl BurstState {
    /// Add to the pending burst
    ///
    /// Returns the delivery back when the state is `Idle`; the caller must
    /// then schedule a timer and call `begin`.
    pub fn push(&mut self, delivery: Delivery) -> Option<Delivery> {
        match self {
            Self::Idle => Some(delivery),
            Self::Pending { deliveries, .. } => {
                deliveries.push(delivery);
                None
            }
        }
    }

    /// Start a burst with its first delivery and timer
    pub fn begin(&mut self, first: Delivery, timer: JoinHandle<()>) {
        debug_assert!(!self.is_pending(), "burst already pending");
        *self = Self::Pending {
            deliveries: vec![first],
            timer,
        };
    }

    /// Take the burst and reset to `Idle`
    pub fn take(&mut self) -> Option<Burst> {
        match std::mem::take(self) {
            Self::Idle => None,
            Self::Pending { mut deliveries, .. } => {
                let latest = deliveries.pop()?;
                Some(Burst {
                    latest,
                    discarded: deliveries,
                })
            }
        }
    }

    /// Cancel the timer and drop the buffered deliveries unacknowledged
    ///
    /// Returns how many deliveries were dropped.
    pub fn abort(&mut self) -> usize {
        match std::mem::take(self) {
            Self::Idle => 0,
            Self::Pending { deliveries, timer } => {
                timer.abort();
                deliveries.len()
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Pending { deliveries, .. } => deliveries.len(),
        }
    }
}
