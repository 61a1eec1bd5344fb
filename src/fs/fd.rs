//! File Descriptor Table
//!
//! A per-process table mapping small integers to open files.
//!
//! # Design
//! - Ordered list of entries, scanned linearly (processes hold few files)
//! - Descriptors are handed out from a counter that only grows, so a closed
//!   number is never reused while the process lives
//! - 0 and 1 are reserved for the console and never enter the table
//! - The process's own executable is parked here too, so teardown has one
//!   place to release everything

use alloc::vec::Vec;

use super::FileSystem;

/// A file descriptor as seen by user programs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Console input.
    pub const STDIN: Self = Self(0);

    /// Console output.
    pub const STDOUT: Self = Self(1);

    /// First descriptor handed out for a file.
    pub const FIRST_FILE: Self = Self(2);

    /// Wrap a raw descriptor value.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Reinterpret a user stack word as a descriptor.
    #[inline]
    pub const fn from_word(word: u32) -> Self {
        Self(word as i32)
    }

    /// Get the raw value.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

/// One open file owned by a process.
#[derive(Debug)]
struct FdEntry<H> {
    fd: Fd,
    handle: H,
}

/// Descriptor table for one process.
///
/// Owned by the process and never shared, so it carries no lock of its own.
/// Handles are released through the filesystem, which the caller must have
/// locked.
#[derive(Debug)]
pub struct FileTable<H> {
    entries: Vec<FdEntry<H>>,
    /// `None` once every descriptor number has been handed out.
    next: Option<i32>,
    executable: Option<H>,
}

impl<H> FileTable<H> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: Some(Fd::FIRST_FILE.0),
            executable: None,
        }
    }

    /// Take ownership of `handle` under the next descriptor number.
    ///
    /// Gives the handle back if the descriptor space is exhausted.
    pub fn allocate(&mut self, handle: H) -> Result<Fd, H> {
        let Some(raw) = self.next else {
            return Err(handle);
        };
        let fd = Fd(raw);
        self.next = raw.checked_add(1);
        self.entries.push(FdEntry { fd, handle });
        log::trace!("fd: allocated {}", fd.0);
        Ok(fd)
    }

    /// Find the open file behind `fd`.
    pub fn lookup(&self, fd: Fd) -> Option<&H> {
        self.entries.iter().find(|e| e.fd == fd).map(|e| &e.handle)
    }

    /// Find the open file behind `fd` for reading, writing or seeking.
    pub fn lookup_mut(&mut self, fd: Fd) -> Option<&mut H> {
        self.entries
            .iter_mut()
            .find(|e| e.fd == fd)
            .map(|e| &mut e.handle)
    }

    /// Close `fd`, releasing its handle. Absent descriptors are ignored.
    ///
    /// Returns whether a descriptor was closed.
    pub fn close<F>(&mut self, fd: Fd, fs: &mut F) -> bool
    where
        F: FileSystem<File = H>,
    {
        let Some(pos) = self.entries.iter().position(|e| e.fd == fd) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        fs.close(entry.handle);
        log::trace!("fd: closed {}", fd.0);
        true
    }

    /// Keep the running executable open for the life of the process.
    ///
    /// Replaces (and returns) any executable already recorded.
    pub fn set_executable(&mut self, handle: H) -> Option<H> {
        self.executable.replace(handle)
    }

    /// Check whether the executable handle is still held.
    pub fn has_executable(&self) -> bool {
        self.executable.is_some()
    }

    /// Release every descriptor and the executable handle.
    ///
    /// Leaves the table empty; calling it again does nothing.
    pub fn close_all<F>(&mut self, fs: &mut F)
    where
        F: FileSystem<File = H>,
    {
        if let Some(exe) = self.executable.take() {
            fs.close(exe);
        }
        for entry in self.entries.drain(..) {
            fs.close(entry.handle);
        }
    }

    /// Number of open descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no descriptor is open.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The descriptor the next allocation will return, if any remain.
    pub fn next_fd(&self) -> Option<Fd> {
        self.next.map(Fd)
    }
}

impl<H> Default for FileTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
