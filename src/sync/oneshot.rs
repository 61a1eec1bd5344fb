//! One-Shot Signal
//!
//! A slot that is filled exactly once by one thread and read by another.
//! The value and the notification travel together: a reader can only see
//! the value after the signal has fired, and the writer stores the value
//! before anyone is woken.
//!
//! # Lost wakeups
//! ```text
//!   waiter                         sender
//!   lock slot
//!   empty → register self
//!   unlock
//!                                  lock slot, store value
//!                                  take waiters, unlock
//!                                  unblock(waiter)   ← may run first
//!   block()                        ← returns at once (wake pending)
//!   lock slot → value present
//! ```
//! Correctness relies on the [`Scheduler`] contract: an `unblock` that
//! arrives before the matching `block` is remembered.

use alloc::vec::Vec;

use spin::Mutex;

use super::{Scheduler, ThreadId};

enum Slot<T> {
    Empty { waiters: Vec<ThreadId> },
    Full(T),
}

/// A value published once and observed by blocking readers.
pub struct OneShot<T: Copy> {
    slot: Mutex<Slot<T>>,
}

impl<T: Copy> OneShot<T> {
    /// Create an empty signal.
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty {
                waiters: Vec::new(),
            }),
        }
    }

    /// Publish `value` and wake every waiter.
    ///
    /// Returns `false` (and changes nothing) if the signal already fired.
    pub fn send(&self, value: T, scheduler: &dyn Scheduler) -> bool {
        let previous = {
            let mut slot = self.slot.lock();
            if let Slot::Full(_) = *slot {
                return false;
            }
            core::mem::replace(&mut *slot, Slot::Full(value))
        };

        let Slot::Empty { waiters } = previous else {
            return false;
        };
        for thread in waiters {
            scheduler.unblock(thread);
        }
        true
    }

    /// Block the calling thread until the value is published.
    pub fn wait(&self, scheduler: &dyn Scheduler) -> T {
        let me = scheduler.current();
        loop {
            {
                let mut slot = self.slot.lock();
                match &mut *slot {
                    Slot::Full(value) => return *value,
                    Slot::Empty { waiters } => {
                        if !waiters.contains(&me) {
                            waiters.push(me);
                        }
                    }
                }
            }
            scheduler.block();
        }
    }

    /// Read the value without blocking, if it has been published.
    pub fn peek(&self) -> Option<T> {
        match &*self.slot.lock() {
            Slot::Full(value) => Some(*value),
            Slot::Empty { .. } => None,
        }
    }
}

impl<T: Copy> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}
