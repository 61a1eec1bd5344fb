//! PantherOS - User Program Boundary
//!
//! The system-call layer of the PantherOS teaching kernel: everything that
//! runs between a user process trapping into the kernel and the kernel
//! resuming (or killing) it.
//!
//! # Responsibilities
//! - Decode the call number and arguments from an untrusted user stack
//! - Validate and translate every user address before it is dereferenced
//! - Multiplex open files through per-process descriptor tables
//! - Synchronize parent/child load and exit reporting
//!
//! # Collaborators
//! The filesystem, address spaces, console, scheduler and process creation
//! live outside this crate and are reached through [`FileSystem`],
//! [`AddressSpace`], [`Console`], [`Scheduler`], [`ProcessHost`] and
//! [`Loader`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod console;
pub mod fs;
mod kernel;
pub mod mm;
pub mod process;
pub mod sync;
pub mod syscall;

#[cfg(test)]
mod testing;

pub use console::Console;
pub use fs::{Fd, FileSystem, FileTable, FsLock};
pub use kernel::{Kernel, LoadedImage, Loader, ProcessHost};
pub use mm::{AddressSpace, Mapping, PageFlags, VirtAddr};
pub use process::{ChildLink, LoadOutcome, Pid, Process, ProcessLink};
pub use sync::{OneShot, Scheduler, ThreadId};
pub use syscall::{Request, Syscall, TrapExit, TrapFrame, Violation};
