//! Filesystem Boundary
//!
//! The filesystem itself is a collaborator and is not reentrant. Every call
//! into it goes through [`FsLock`], a single global lock whose guard is the
//! only way to obtain `&mut` access to the filesystem. Dropping the guard
//! releases the lock, so early returns cannot leak it.
//!
//! # Lock discipline
//! - Held for create, remove, open, read, write, seek, tell, filesize, close
//! - Held while a child loads its executable
//! - Never held while blocking on a process link or talking to the console

pub mod fd;

use spin::{Mutex, MutexGuard};

pub use fd::{Fd, FileTable};

/// Filesystem collaborator.
///
/// All methods take `&mut self`: the implementation may assume it is never
/// entered twice at once.
pub trait FileSystem: Send {
    /// An open file. Owned by exactly one descriptor (or executable slot)
    /// and released by passing it back to [`FileSystem::close`].
    type File: Send;

    fn create(&mut self, path: &str, initial_size: u32) -> bool;
    fn remove(&mut self, path: &str) -> bool;
    fn open(&mut self, path: &str) -> Option<Self::File>;

    /// Read into `buf` at the file position; returns bytes read.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> usize;

    /// Write `buf` at the file position; returns bytes written.
    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> usize;

    fn seek(&mut self, file: &mut Self::File, position: u32);
    fn tell(&mut self, file: &Self::File) -> u32;
    fn length(&mut self, file: &Self::File) -> u32;
    fn close(&mut self, file: Self::File);
}

/// The global Filesystem Lock.
pub struct FsLock<F: FileSystem> {
    inner: Mutex<F>,
}

impl<F: FileSystem> FsLock<F> {
    /// Wrap a filesystem.
    pub const fn new(fs: F) -> Self {
        Self {
            inner: Mutex::new(fs),
        }
    }

    /// Acquire the lock. Released when the guard drops.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, F> {
        self.inner.lock()
    }

    /// Run `f` with the lock held.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut F) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Check whether some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}
