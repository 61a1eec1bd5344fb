//! System Call Input Validation
//!
//! Every address a user process hands to the kernel passes through here
//! before anything is dereferenced.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: any violation is fatal to the calling process
//! - A buffer must be in range at both ends, and every page it touches
//!   must translate; a buffer may straddle a mapped/unmapped boundary
//! - In-range is not enough: each page must also translate through the
//!   process's page directory
//! - A buffer is fully validated and translated before the first byte moves

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::mm::{AddressSpace, Mapping, PageFlags, VirtAddr, USER_BASE, WORD_SIZE};

/// A trust violation. Always fatal to the process that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The null address.
    NullPointer,
    /// Outside the user-addressable range.
    KernelAddress(VirtAddr),
    /// In the reserved region below the first user page.
    BelowUserBase(VirtAddr),
    /// `addr + len` wraps around the address space.
    AddressOverflow(VirtAddr),
    /// In range, but no user page is mapped there.
    Unmapped(VirtAddr),
    /// The kernel was asked to write into a read-only page.
    ReadOnly(VirtAddr),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullPointer => write!(f, "null pointer"),
            Self::KernelAddress(a) => write!(f, "kernel address {}", a),
            Self::BelowUserBase(a) => write!(f, "address {} below user base", a),
            Self::AddressOverflow(a) => write!(f, "range at {} overflows", a),
            Self::Unmapped(a) => write!(f, "unmapped address {}", a),
            Self::ReadOnly(a) => write!(f, "read-only address {}", a),
        }
    }
}

/// Check a single user address.
///
/// Accepts iff the address is non-null, at or above [`USER_BASE`], and in
/// the process's user range.
pub fn validate_pointer(space: &dyn AddressSpace, addr: VirtAddr) -> Result<(), Violation> {
    if addr.is_null() {
        return Err(Violation::NullPointer);
    }
    if !space.is_user_vaddr(addr) {
        return Err(Violation::KernelAddress(addr));
    }
    if addr.as_usize() < USER_BASE {
        return Err(Violation::BelowUserBase(addr));
    }
    Ok(())
}

/// Check every byte address in `[addr, addr + len)`.
///
/// The legal user range is one contiguous interval, so the range checks
/// pass for every byte iff they pass for the first and the last. Whether
/// each page is actually mapped is a separate, per-page question answered
/// during translation.
pub fn validate_buffer(space: &dyn AddressSpace, addr: VirtAddr, len: usize) -> Result<(), Violation> {
    if len == 0 {
        return Ok(());
    }
    let last = addr
        .checked_add(len - 1)
        .ok_or(Violation::AddressOverflow(addr))?;
    validate_pointer(space, addr)?;
    validate_pointer(space, last)
}

/// Translate a user address to the kernel pointer backing it.
///
/// Returns `None` if the page is unmapped or not user-accessible.
pub fn translate_to_kernel(space: &dyn AddressSpace, addr: VirtAddr) -> Option<NonNull<u8>> {
    user_mapping(space, addr).map(|m| m.kernel)
}

fn user_mapping(space: &dyn AddressSpace, addr: VirtAddr) -> Option<Mapping> {
    space
        .lookup(addr)
        .filter(|m| m.flags.contains(PageFlags::PRESENT | PageFlags::USER))
}

/// Translate or fail with [`Violation::Unmapped`].
fn translate(space: &dyn AddressSpace, addr: VirtAddr, writable: bool) -> Result<Mapping, Violation> {
    let mapping = user_mapping(space, addr).ok_or(Violation::Unmapped(addr))?;
    if writable && !mapping.flags.contains(PageFlags::WRITABLE) {
        return Err(Violation::ReadOnly(addr));
    }
    Ok(mapping)
}

/// Validate and translate a range, one contiguous kernel segment per page.
fn segments(
    space: &dyn AddressSpace,
    addr: VirtAddr,
    len: usize,
    writable: bool,
) -> Result<Vec<(NonNull<u8>, usize)>, Violation> {
    validate_buffer(space, addr, len)?;

    let mut out = Vec::new();
    let mut cursor = addr;
    let mut remaining = len;
    while remaining > 0 {
        let mapping = translate(space, cursor, writable)?;
        let n = remaining.min(cursor.page_remaining());
        out.push((mapping.kernel, n));
        cursor = VirtAddr::new(cursor.as_usize() + n);
        remaining -= n;
    }
    Ok(out)
}

/// A validated user-space buffer the kernel reads from.
///
/// This type guarantees that:
/// - Every byte is within user-space bounds
/// - Every page is mapped and user-accessible
///
/// It borrows the address space, so it cannot outlive the mappings it
/// was built from.
#[derive(Debug)]
pub struct UserBuffer<'a> {
    segments: Vec<(NonNull<u8>, usize)>,
    len: usize,
    _space: PhantomData<&'a dyn AddressSpace>,
}

impl UserBuffer<'_> {
    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Feed the buffer to `sink` one page-contiguous chunk at a time.
    ///
    /// `sink` returns how many bytes it took; a short take stops the walk.
    /// Returns the total taken.
    pub fn drain(&self, mut sink: impl FnMut(&[u8]) -> usize) -> usize {
        let mut total = 0;
        for &(ptr, n) in &self.segments {
            // SAFETY:
            // - ptr came from the address space's translation of a validated
            //   user address and covers n bytes within one mapped page
            // - the borrow of the address space keeps the mapping alive
            let chunk = unsafe { core::slice::from_raw_parts(ptr.as_ptr(), n) };
            let took = sink(chunk).min(n);
            total += took;
            if took < n {
                break;
            }
        }
        total
    }

    /// Copy the whole buffer into kernel memory.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        self.drain(|chunk| {
            out.extend_from_slice(chunk);
            chunk.len()
        });
        out
    }
}

/// A validated user-space buffer the kernel writes into.
///
/// Same guarantees as [`UserBuffer`], plus every page is writable.
#[derive(Debug)]
pub struct UserBufferMut<'a> {
    segments: Vec<(NonNull<u8>, usize)>,
    len: usize,
    _space: PhantomData<&'a dyn AddressSpace>,
}

impl UserBufferMut<'_> {
    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Let `source` fill the buffer one page-contiguous chunk at a time.
    ///
    /// `source` returns how many bytes it wrote; a short fill stops the
    /// walk. Returns the total written.
    pub fn fill(&mut self, mut source: impl FnMut(&mut [u8]) -> usize) -> usize {
        let mut total = 0;
        for &(ptr, n) in &self.segments {
            // SAFETY: Same as UserBuffer::drain, plus the page is writable
            // and only one chunk is borrowed at a time
            let chunk = unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), n) };
            let wrote = source(chunk).min(n);
            total += wrote;
            if wrote < n {
                break;
            }
        }
        total
    }
}

/// Validate a user-space buffer the kernel will read.
///
/// A zero-length buffer is accepted without looking at the address, since
/// nothing will be dereferenced.
pub fn validate_user_read(
    space: &dyn AddressSpace,
    addr: VirtAddr,
    len: usize,
) -> Result<UserBuffer<'_>, Violation> {
    Ok(UserBuffer {
        segments: segments(space, addr, len, false)?,
        len,
        _space: PhantomData,
    })
}

/// Validate a user-space buffer the kernel will write.
pub fn validate_user_write(
    space: &dyn AddressSpace,
    addr: VirtAddr,
    len: usize,
) -> Result<UserBufferMut<'_>, Violation> {
    Ok(UserBufferMut {
        segments: segments(space, addr, len, true)?,
        len,
        _space: PhantomData,
    })
}

/// Read one little-endian stack word at `addr`.
pub fn read_user_word(space: &dyn AddressSpace, addr: VirtAddr) -> Result<u32, Violation> {
    let mut word = [0u8; WORD_SIZE];
    let buf = validate_user_read(space, addr, WORD_SIZE)?;
    let mut filled = 0;
    buf.drain(|chunk| {
        word[filled..filled + chunk.len()].copy_from_slice(chunk);
        filled += chunk.len();
        chunk.len()
    });
    Ok(u32::from_le_bytes(word))
}

/// Copy a NUL-terminated string out of user memory.
///
/// Each byte is validated and translated on its own, so a string running
/// off the end of its mapping is caught at the first bad byte. The
/// terminator is not included.
pub fn copy_in_string(space: &dyn AddressSpace, addr: VirtAddr) -> Result<Vec<u8>, Violation> {
    let mut out = Vec::new();
    let mut cursor = addr;
    loop {
        validate_pointer(space, cursor)?;
        let mapping = translate(space, cursor, false)?;
        // SAFETY: mapping covers at least the byte at cursor
        let byte = unsafe { mapping.kernel.as_ptr().read() };
        if byte == 0 {
            return Ok(out);
        }
        out.push(byte);
        cursor = cursor
            .checked_add(1)
            .ok_or(Violation::AddressOverflow(cursor))?;
    }
}
