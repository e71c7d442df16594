//! Projectile lifecycle events.
//!
//! The simulation source reports exactly three things per slot, always in
//! this order: the projectile was created, it moved (any number of times),
//! it was removed. Trail stores implement [`TrailListener`] and receive the
//! events synchronously on the simulation thread.
//!
//! [`EventLog`] is an optional FIFO for hosts that collect events during a
//! simulation step and hand them over in one go afterwards.

use std::collections::VecDeque;

use crate::error::TrailError;
use crate::projectile::ProjectileState;

/// One lifecycle notification for a projectile slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TrailEvent {
    /// A projectile was fired into `slot` at host time `time`.
    Created {
        slot: usize,
        state: ProjectileState,
        time: f32,
    },
    /// The projectile in `slot` advanced.
    Moved { slot: usize, state: ProjectileState },
    /// The projectile in `slot` is gone; the slot may be reused afterwards.
    Removed { slot: usize, state: ProjectileState },
}

impl TrailEvent {
    pub fn slot(&self) -> usize {
        match *self {
            TrailEvent::Created { slot, .. }
            | TrailEvent::Moved { slot, .. }
            | TrailEvent::Removed { slot, .. } => slot,
        }
    }
}

/// Receiver of projectile lifecycle events.
///
/// Implementations must either apply an event completely or return an error
/// without changing any state.
pub trait TrailListener {
    fn on_created(&mut self, slot: usize, state: &ProjectileState, time: f32)
        -> Result<(), TrailError>;

    fn on_moved(&mut self, slot: usize, state: &ProjectileState) -> Result<(), TrailError>;

    fn on_removed(&mut self, slot: usize, state: &ProjectileState) -> Result<(), TrailError>;

    /// Route `event` to the matching callback.
    fn handle(&mut self, event: &TrailEvent) -> Result<(), TrailError> {
        match event {
            TrailEvent::Created { slot, state, time } => self.on_created(*slot, state, *time),
            TrailEvent::Moved { slot, state } => self.on_moved(*slot, state),
            TrailEvent::Removed { slot, state } => self.on_removed(*slot, state),
        }
    }
}

/// Ordered queue of pending lifecycle events.
#[derive(Debug, Default)]
pub struct EventLog {
    queue: VecDeque<TrailEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue with room for `capacity` events before it has to grow.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: TrailEvent) {
        self.queue.push_back(event);
    }

    pub fn created(&mut self, slot: usize, state: ProjectileState, time: f32) {
        self.push(TrailEvent::Created { slot, state, time });
    }

    pub fn moved(&mut self, slot: usize, state: ProjectileState) {
        self.push(TrailEvent::Moved { slot, state });
    }

    pub fn removed(&mut self, slot: usize, state: ProjectileState) {
        self.push(TrailEvent::Removed { slot, state });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Deliver queued events to `listener` in arrival order.
    ///
    /// Returns how many events were applied. On the first rejected event
    /// delivery stops: the offending event is dropped and everything queued
    /// after it stays in the log.
    pub fn deliver<L: TrailListener + ?Sized>(
        &mut self,
        listener: &mut L,
    ) -> Result<usize, TrailError> {
        let mut delivered = 0;
        while let Some(event) = self.queue.pop_front() {
            if let Err(e) = listener.handle(&event) {
                log::warn!("dropping {:?}: {}", event, e);
                return Err(e);
            }
            delivered += 1;
        }
        Ok(delivered)
    }
}
