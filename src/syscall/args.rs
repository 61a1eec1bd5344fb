//! Syscall Argument Marshaling
//!
//! Arguments sit in consecutive stack words directly above the call
//! number:
//!
//! ```text
//! esp + 12 │ arg 2 │
//! esp +  8 │ arg 1 │
//! esp +  4 │ arg 0 │
//! esp      │ call  │
//! ```
//!
//! Each slot's address is validated before the slot is read. A caller can
//! park the call number at the very top of its stack so the argument
//! slots run off the mapped region; that must kill the caller, not the
//! kernel. What a word means is decided later, by the request decoder.

use crate::mm::{AddressSpace, VirtAddr, WORD_SIZE};

use super::validate::{read_user_word, Violation};

/// Most arguments any call takes.
pub const MAX_ARGS: usize = 3;

/// Raw argument words copied off the user stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Args {
    words: [u32; MAX_ARGS],
    count: usize,
}

impl Args {
    /// The `index`th argument word.
    ///
    /// # Panics
    /// Panics if `index` is not below the fetched count.
    #[inline]
    pub fn word(&self, index: usize) -> u32 {
        self.as_slice()[index]
    }

    /// Fetched words, in order.
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.words[..self.count]
    }
}

/// Copy `count` argument words from the stack above `esp`.
///
/// Stops at the first slot that fails validation; no slot is read before
/// its address has been checked.
pub fn fetch_args(space: &dyn AddressSpace, esp: VirtAddr, count: usize) -> Result<Args, Violation> {
    debug_assert!(count <= MAX_ARGS);
    let count = count.min(MAX_ARGS);

    let mut words = [0u32; MAX_ARGS];
    for (i, word) in words.iter_mut().enumerate().take(count) {
        let slot = esp
            .checked_add(WORD_SIZE * (i + 1))
            .ok_or(Violation::AddressOverflow(esp))?;
        *word = read_user_word(space, slot)?;
    }
    Ok(Args { words, count })
}
