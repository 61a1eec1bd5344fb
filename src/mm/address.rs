//! User Virtual Address Types
//!
//! Type-safe wrapper for addresses handed up by user processes. A
//! [`VirtAddr`] is only a number: it never converts to a pointer on its
//! own. The kernel reaches user memory exclusively through a translated
//! [`Mapping`](super::Mapping).
//!
//! # Layout (32-bit user ABI)
//! ```text
//! 0x0000_0000 ┌──────────────────────┐
//!             │ reserved, never mapped│
//! 0x0804_8000 ├──────────────────────┤ USER_BASE
//!             │ code / data / heap   │
//!             │         ...          │
//!             │ stack (grows down)   │
//! 0xC000_0000 ├──────────────────────┤ PHYS_BASE
//!             │ kernel               │
//! 0xFFFF_FFFF └──────────────────────┘
//! ```

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// Size of one user stack slot (call number, arguments)
pub const WORD_SIZE: usize = 4;

/// First address past the user portion of every address space.
pub const PHYS_BASE: usize = 0xC000_0000;

/// Lowest address a user program may legally reference.
/// Everything below it, including the null page, is never mapped.
pub const USER_BASE: usize = 0x0804_8000;

/// A user-space virtual address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// The null address.
    pub const NULL: Self = Self(0);

    /// Create a new virtual address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Create an address from a raw user stack word.
    #[inline]
    pub const fn from_word(word: u32) -> Self {
        Self(word as usize)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if the address lies below [`PHYS_BASE`].
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 < PHYS_BASE
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Get the page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Bytes left in this address's page, counting the address itself.
    #[inline]
    pub const fn page_remaining(self) -> usize {
        PAGE_SIZE - self.page_offset()
    }

    /// Add an offset, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
