//! Processes
//!
//! The per-process state the syscall layer owns: descriptor table, links
//! to children, the link to its own parent, and the address space it
//! validates user pointers against.

mod link;

use alloc::boxed::Box;
use alloc::string::String;

use crate::fs::FileTable;
use crate::mm::AddressSpace;

pub use link::{ChildLink, Children, LinkState, LoadOutcome, Pid, ProcessLink};

/// Exit status of a process killed by the kernel.
pub const KILLED_STATUS: i32 = -1;

/// Longest process name, in bytes.
pub const MAX_NAME_LEN: usize = 15;

/// Derive a process name from its command line: the program name,
/// truncated to [`MAX_NAME_LEN`] bytes.
pub fn process_name(cmdline: &str) -> &str {
    let program = cmdline.split_whitespace().next().unwrap_or("");
    if program.len() <= MAX_NAME_LEN {
        return program;
    }
    let mut end = MAX_NAME_LEN;
    while !program.is_char_boundary(end) {
        end -= 1;
    }
    &program[..end]
}

/// A user process, from the syscall layer's point of view.
///
/// `H` is the filesystem's open-file handle type.
///
/// A process must be torn down with [`Kernel::exit_process`] before it is
/// dropped. Dropping it earlier still releases its parent, but its open
/// handles never reach [`FileSystem::close`].
///
/// [`Kernel::exit_process`]: crate::Kernel::exit_process
/// [`FileSystem::close`]: crate::FileSystem::close
pub struct Process<H> {
    pub(crate) pid: Pid,
    pub(crate) name: String,
    pub(crate) space: Box<dyn AddressSpace>,
    pub(crate) files: FileTable<H>,
    pub(crate) children: Children,
    pub(crate) parent: Option<ChildLink>,
    pub(crate) exit_status: Option<i32>,
}

impl<H> Process<H> {
    /// Create a process record.
    ///
    /// `parent` is `None` only for the initial process.
    pub fn new(pid: Pid, cmdline: &str, space: Box<dyn AddressSpace>, parent: Option<ChildLink>) -> Self {
        Self {
            pid,
            name: String::from(process_name(cmdline)),
            space,
            files: FileTable::new(),
            children: Children::new(),
            parent,
            exit_status: None,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address space user pointers are checked against.
    pub fn space(&self) -> &dyn AddressSpace {
        &*self.space
    }

    pub fn files(&self) -> &FileTable<H> {
        &self.files
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    /// Status the process exited with, once torn down.
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    pub fn has_exited(&self) -> bool {
        self.exit_status.is_some()
    }
}

impl<H> Drop for Process<H> {
    fn drop(&mut self) {
        if !self.has_exited() && (!self.files.is_empty() || self.files.has_executable()) {
            log::warn!(
                "{} [{}]: dropped without teardown, {} descriptor(s) leaked",
                self.name,
                self.pid,
                self.files.len()
            );
        }
    }
}

impl<H> core::fmt::Debug for Process<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("files", &self.files.len())
            .field("next_fd", &self.files.next_fd())
            .field("children", &self.children.len())
            .field("exit_status", &self.exit_status)
            .finish()
    }
}
