//! Console Seam
//!
//! Keyboard input and console output for descriptors 0 and 1, plus the
//! per-process termination message.

/// Console device collaborator.
///
/// Implementations serialize their own output; the syscall layer never
/// holds the Filesystem Lock while talking to the console.
pub trait Console: Send + Sync {
    /// Block until a key is available and return it.
    fn getc(&self) -> u8;

    /// Write `bytes` to the console as one unit.
    fn putbuf(&self, bytes: &[u8]);
}
