//! Parent/Child Process Link
//!
//! One record per parent→child edge, carrying two messages from child to
//! parent: the load result, then the exit status.
//!
//! # State machine
//! ```text
//!   LoadPending ──► LoadFailed
//!        │
//!        └──────► Running ──► Exited(status)
//! ```
//!
//! # Ownership
//! The record is shared through an [`Arc`]. The parent keeps one end in its
//! [`Children`] set and only reads; the child holds a [`ChildLink`] and is
//! the only writer. Whichever side lets go last frees it, so a parent that
//! exits first never pulls the record out from under a child that is still
//! loading, and a child that exits first leaves its status behind for a
//! later `wait`.
//!
//! # Liveness
//! Dropping a [`ChildLink`] publishes `Failed` and exit status `-1` for
//! any message the child never sent. A child that dies before loading
//! (or is never created at all) therefore still releases its parent.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::sync::{OneShot, Scheduler};

use super::KILLED_STATUS;

/// A process identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[repr(transparent)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a child constructing its address space and loading its
/// executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

/// Observable state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    LoadPending,
    LoadFailed,
    Running,
    Exited(i32),
}

/// Synchronization record between a parent and one child.
pub struct ProcessLink {
    load: OneShot<LoadOutcome>,
    exit: OneShot<i32>,
}

impl ProcessLink {
    /// Create a fresh link in the `LoadPending` state.
    ///
    /// Returns the parent's end and the child's end.
    pub fn pair(scheduler: Arc<dyn Scheduler>) -> (Arc<ProcessLink>, ChildLink) {
        let link = Arc::new(ProcessLink {
            load: OneShot::new(),
            exit: OneShot::new(),
        });
        let child = ChildLink {
            link: Arc::clone(&link),
            scheduler,
        };
        (link, child)
    }

    /// Block until the child reports its load result.
    pub fn wait_load(&self, scheduler: &dyn Scheduler) -> LoadOutcome {
        self.load.wait(scheduler)
    }

    /// Block until the child has exited and return its status.
    pub fn wait_exit(&self, scheduler: &dyn Scheduler) -> i32 {
        self.exit.wait(scheduler)
    }

    /// Current state, without blocking.
    pub fn state(&self) -> LinkState {
        match (self.load.peek(), self.exit.peek()) {
            (None, _) => LinkState::LoadPending,
            (Some(LoadOutcome::Failed), _) => LinkState::LoadFailed,
            (Some(LoadOutcome::Loaded), None) => LinkState::Running,
            (Some(LoadOutcome::Loaded), Some(status)) => LinkState::Exited(status),
        }
    }
}

impl fmt::Debug for ProcessLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessLink({:?})", self.state())
    }
}

/// The child's end of a [`ProcessLink`]; the only way to write to it.
pub struct ChildLink {
    link: Arc<ProcessLink>,
    scheduler: Arc<dyn Scheduler>,
}

impl ChildLink {
    /// Publish the load result. Only the first report counts.
    pub fn report_load(&self, outcome: LoadOutcome) -> bool {
        log::trace!("link: load {:?}", outcome);
        self.link.load.send(outcome, &*self.scheduler)
    }

    /// Publish the exit status and let go of the link.
    pub fn report_exit(self, status: i32) {
        log::trace!("link: exit {}", status);
        self.link.exit.send(status, &*self.scheduler);
    }

    /// The shared record.
    pub fn link(&self) -> &Arc<ProcessLink> {
        &self.link
    }
}

impl Drop for ChildLink {
    fn drop(&mut self) {
        let scheduler = &*self.scheduler;
        if self.link.load.send(LoadOutcome::Failed, scheduler) {
            log::debug!("link: child gone before loading");
        }
        self.link.exit.send(KILLED_STATUS, scheduler);
    }
}

impl fmt::Debug for ChildLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChildLink").field(&*self.link).finish()
    }
}

/// A parent's links to the children it may still wait for.
#[derive(Debug, Default)]
pub struct Children {
    entries: Vec<(Pid, Arc<ProcessLink>)>,
}

impl Children {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a newly started child.
    pub fn insert(&mut self, pid: Pid, link: Arc<ProcessLink>) {
        self.entries.push((pid, link));
    }

    /// Remove and return the link for `pid`, if it is a child not yet
    /// waited for.
    pub fn take(&mut self, pid: Pid) -> Option<Arc<ProcessLink>> {
        let pos = self.entries.iter().position(|(p, _)| *p == pid)?;
        Some(self.entries.swap_remove(pos).1)
    }

    /// Forget every child. Children still running keep their own end.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
