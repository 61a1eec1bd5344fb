//! Address Space Seam
//!
//! The virtual-memory subsystem owns page tables; the syscall layer only
//! asks two questions of it: is this address inside the user range, and
//! where (if anywhere) does it live in kernel memory.

use core::ptr::NonNull;

use bitflags::bitflags;

use super::address::VirtAddr;

bitflags! {
    /// Permission bits of a user page table entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PageFlags: u32 {
        /// Page is mapped.
        const PRESENT = 1 << 0;
        /// Page may be written.
        const WRITABLE = 1 << 1;
        /// Page is accessible from user mode.
        const USER = 1 << 2;

        /// Ordinary user data page.
        const USER_DATA = Self::PRESENT.bits() | Self::WRITABLE.bits() | Self::USER.bits();
        /// User code or read-only data.
        const USER_RODATA = Self::PRESENT.bits() | Self::USER.bits();
    }
}

/// A translated user address.
///
/// `kernel` points at the byte backing the user address. The bytes from
/// there to the end of the same user page are contiguous in kernel memory;
/// nothing past the page boundary is covered.
#[derive(Debug, Clone, Copy)]
pub struct Mapping {
    pub kernel: NonNull<u8>,
    pub flags: PageFlags,
}

/// One process's view of memory, as seen by the syscall layer.
pub trait AddressSpace: Send {
    /// Check that `addr` lies in the user-addressable range.
    ///
    /// The range must be a single interval: buffer validation only checks
    /// its endpoints.
    fn is_user_vaddr(&self, addr: VirtAddr) -> bool {
        addr.is_user()
    }

    /// Walk the page directory for `addr`.
    ///
    /// Returns `None` if the page is not mapped, even when the address
    /// itself is in range.
    fn lookup(&self, addr: VirtAddr) -> Option<Mapping>;
}
