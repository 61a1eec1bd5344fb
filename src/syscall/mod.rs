//! System Call Interface
//!
//! The boundary between user processes and the kernel.
//!
//! # Security Model
//! - Whitelist approach: only the calls in [`Syscall`] are dispatched
//! - Every user address is validated, then translated, before use
//! - Trust violations terminate the caller; operational failures are
//!   reported through the return register
//!
//! # Calls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmdline) -> pid
//! - 3: wait(pid) -> status
//! - 4: create(path, size) -> bool
//! - 5: remove(path) -> bool
//! - 6: open(path) -> fd
//! - 7: filesize(fd) -> bytes
//! - 8: read(fd, buf, len) -> bytes
//! - 9: write(fd, buf, len) -> bytes
//! - 10: seek(fd, pos)
//! - 11: tell(fd) -> pos
//! - 12: close(fd)

pub mod args;
mod frame;
mod handler;
pub mod numbers;
mod request;
pub mod validate;

pub use args::fetch_args;
pub use frame::{TrapExit, TrapFrame};
pub use numbers::Syscall;
pub use request::Request;
pub use validate::{UserBuffer, UserBufferMut, Violation};
