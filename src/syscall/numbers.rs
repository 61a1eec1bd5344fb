//! System call numbers
//!
//! The closed set of calls a user program may make, and how many stack
//! words each one takes.

/// A supported system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Syscall {
    /// Power the machine off.
    Halt = 0,
    /// Terminate the calling process.
    Exit = 1,
    /// Start a new process from a command line.
    Exec = 2,
    /// Wait for a child to exit.
    Wait = 3,
    /// Create a file.
    Create = 4,
    /// Delete a file.
    Remove = 5,
    /// Open a file.
    Open = 6,
    /// Size of an open file.
    Filesize = 7,
    /// Read from a descriptor.
    Read = 8,
    /// Write to a descriptor.
    Write = 9,
    /// Move a file position.
    Seek = 10,
    /// Report a file position.
    Tell = 11,
    /// Close a descriptor.
    Close = 12,
}

impl Syscall {
    /// Every supported call, in number order.
    pub const ALL: [Syscall; 13] = [
        Syscall::Halt,
        Syscall::Exit,
        Syscall::Exec,
        Syscall::Wait,
        Syscall::Create,
        Syscall::Remove,
        Syscall::Open,
        Syscall::Filesize,
        Syscall::Read,
        Syscall::Write,
        Syscall::Seek,
        Syscall::Tell,
        Syscall::Close,
    ];

    /// Decode a raw call number.
    pub const fn from_number(number: u32) -> Option<Self> {
        let call = match number {
            0 => Syscall::Halt,
            1 => Syscall::Exit,
            2 => Syscall::Exec,
            3 => Syscall::Wait,
            4 => Syscall::Create,
            5 => Syscall::Remove,
            6 => Syscall::Open,
            7 => Syscall::Filesize,
            8 => Syscall::Read,
            9 => Syscall::Write,
            10 => Syscall::Seek,
            11 => Syscall::Tell,
            12 => Syscall::Close,
            _ => return None,
        };
        Some(call)
    }

    /// The raw call number.
    #[inline]
    pub const fn number(self) -> u32 {
        self as u32
    }

    /// Number of argument words above the call number.
    pub const fn arg_count(self) -> usize {
        match self {
            Syscall::Halt => 0,
            Syscall::Exit
            | Syscall::Exec
            | Syscall::Wait
            | Syscall::Remove
            | Syscall::Open
            | Syscall::Filesize
            | Syscall::Tell
            | Syscall::Close => 1,
            Syscall::Create | Syscall::Seek => 2,
            Syscall::Read | Syscall::Write => 3,
        }
    }
}
