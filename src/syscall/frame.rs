//! Trap Frame
//!
//! The slice of saved user state the syscall layer needs.

/// User state captured when a process traps into the kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// User stack pointer; points at the call number.
    pub esp: u32,
    /// Return-value register, restored into the user process on resume.
    pub eax: u32,
}

impl TrapFrame {
    /// Create a frame for a trap with the given stack pointer.
    pub const fn new(esp: u32) -> Self {
        Self { esp, eax: 0 }
    }

    /// Store a signed result in the return register.
    #[inline]
    pub fn set_return(&mut self, value: i32) {
        self.eax = value as u32;
    }

    /// The return register read as a signed value.
    #[inline]
    pub fn return_value(&self) -> i32 {
        self.eax as i32
    }
}

/// What the trap entry must do with the current thread after a trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapExit {
    /// Return to user mode with the (possibly updated) frame.
    Resume,
    /// The process has been torn down; the thread must exit and never
    /// return to user mode.
    Terminated(i32),
    /// The machine has been powered off.
    Halted,
}
