//! Synchronization primitives
//!
//! Blocking is delegated to the scheduler collaborator; this module only
//! decides when to block and whom to wake.

mod oneshot;

pub use oneshot::OneShot;

/// Identifies a kernel thread to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u64);

/// Thread scheduler collaborator.
///
/// # Contract
/// `unblock(t)` issued while `t` is not blocked must make the next
/// `block()` by `t` return immediately (a pending wakeup). `block()` may
/// also return spuriously; callers re-check their condition.
pub trait Scheduler: Send + Sync {
    /// The calling thread.
    fn current(&self) -> ThreadId;

    /// Suspend the calling thread until it is unblocked.
    fn block(&self);

    /// Make `thread` runnable again.
    fn unblock(&self, thread: ThreadId);
}
