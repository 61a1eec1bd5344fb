//! Memory management module for the syscall layer
//!
//! Provides:
//! - User virtual address types and layout constants
//! - The address-space seam used to translate user addresses
//! - Kernel heap allocation
//!
//! # Security Principles
//! - User addresses are plain numbers until translated
//! - Translation reports page permissions, not just presence

pub mod address;
pub mod heap;
mod space;

pub use address::{VirtAddr, PAGE_SIZE, PHYS_BASE, USER_BASE, WORD_SIZE};
pub use heap::{heap_stats, init_heap, HeapStats};
pub use space::{AddressSpace, Mapping, PageFlags};
