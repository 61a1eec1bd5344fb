//! Typed Syscall Requests
//!
//! Turns the call number and raw argument words into one variant per
//! supported call. Pointer arguments stay [`VirtAddr`]s here: they are
//! validated and translated by the handler that uses them.

use crate::fs::Fd;
use crate::mm::{AddressSpace, VirtAddr};

use super::args::fetch_args;
use super::numbers::Syscall;
use super::validate::{read_user_word, Violation};

/// A decoded system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Halt,
    Exit { status: i32 },
    Exec { cmdline: VirtAddr },
    Wait { pid: i32 },
    Create { path: VirtAddr, initial_size: u32 },
    Remove { path: VirtAddr },
    Open { path: VirtAddr },
    Filesize { fd: Fd },
    Read { fd: Fd, buf: VirtAddr, len: u32 },
    Write { fd: Fd, buf: VirtAddr, len: u32 },
    Seek { fd: Fd, position: u32 },
    Tell { fd: Fd },
    Close { fd: Fd },
    /// A call number outside the supported set.
    Unrecognized(u32),
}

impl Request {
    /// Read the call at `esp` and its arguments.
    ///
    /// The call number's own address is validated before it is read.
    pub fn decode(space: &dyn AddressSpace, esp: VirtAddr) -> Result<Self, Violation> {
        let number = read_user_word(space, esp)?;
        let Some(call) = Syscall::from_number(number) else {
            return Ok(Request::Unrecognized(number));
        };

        let args = fetch_args(space, esp, call.arg_count())?;
        let ptr = |i| VirtAddr::from_word(args.word(i));
        let fd = |i| Fd::from_word(args.word(i));

        let request = match call {
            Syscall::Halt => Request::Halt,
            Syscall::Exit => Request::Exit {
                status: args.word(0) as i32,
            },
            Syscall::Exec => Request::Exec { cmdline: ptr(0) },
            Syscall::Wait => Request::Wait {
                pid: args.word(0) as i32,
            },
            Syscall::Create => Request::Create {
                path: ptr(0),
                initial_size: args.word(1),
            },
            Syscall::Remove => Request::Remove { path: ptr(0) },
            Syscall::Open => Request::Open { path: ptr(0) },
            Syscall::Filesize => Request::Filesize { fd: fd(0) },
            Syscall::Read => Request::Read {
                fd: fd(0),
                buf: ptr(1),
                len: args.word(2),
            },
            Syscall::Write => Request::Write {
                fd: fd(0),
                buf: ptr(1),
                len: args.word(2),
            },
            Syscall::Seek => Request::Seek {
                fd: fd(0),
                position: args.word(1),
            },
            Syscall::Tell => Request::Tell { fd: fd(0) },
            Syscall::Close => Request::Close { fd: fd(0) },
        };
        Ok(request)
    }
}
