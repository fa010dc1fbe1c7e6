//! Interrupt masking for critical sections.
//!
//! Frame-pool and page-table mutations are short, non-reentrant sections
//! that must not be preempted by an interrupt handler re-entering the
//! allocator. [`IrqGuard`] saves the interrupt-enable flag, disables
//! interrupts, and restores the saved state on drop;
//! [`SpinLock::lock_irq`] pairs that with lock acquisition.
//!
//! On hosted builds (tests) there is no interrupt flag to mask; the guard
//! degrades to a no-op so the core logic stays runnable under `cargo test`.

use crate::{SpinLock, SpinLockGuard};

/// A spin-lock guard that also keeps interrupts disabled while held.
///
/// Created via [`SpinLock::lock_irq`]; interrupts are disabled *before*
/// the lock is taken and restored *after* it is released (fields drop in
/// declaration order, so the lock guard goes first).
pub struct IrqSpinLockGuard<'a, T> {
    _guard: SpinLockGuard<'a, T>,
    _irq: IrqGuard,
}

impl<T> SpinLock<T> {
    /// Acquire the lock with interrupts disabled for the guard's lifetime.
    #[inline]
    pub fn lock_irq(&self) -> IrqSpinLockGuard<'_, T> {
        let irq = IrqGuard::new();
        let guard = self.lock();
        IrqSpinLockGuard {
            _guard: guard,
            _irq: irq,
        }
    }
}

impl<T> core::ops::Deref for IrqSpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self._guard
    }
}

impl<T> core::ops::DerefMut for IrqSpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self._guard
    }
}

/// RAII guard that disables interrupts on creation and restores the
/// previous state on drop.
pub struct IrqGuard {
    /// Whether interrupts were enabled when the guard was created.
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    /// Disable interrupts if they are currently enabled; remember the state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let enabled = interrupts_enabled();
        if enabled {
            disable_interrupts();
        }
        Self {
            were_enabled: enabled,
        }
    }
}

impl Drop for IrqGuard {
    /// Restore interrupts only if they were previously enabled.
    fn drop(&mut self) {
        if self.were_enabled {
            enable_interrupts();
        }
    }
}

/// Returns whether the interrupt-enable flag (`EFLAGS.IF`) is set.
#[cfg(all(target_arch = "x86", target_os = "none"))]
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    let flags: u32;
    unsafe {
        core::arch::asm!("pushfd; pop {}", out(reg) flags, options(nostack, preserves_flags));
    }
    (flags & (1 << 9)) != 0
}

/// Disables hardware interrupts (`cli`).
#[cfg(all(target_arch = "x86", target_os = "none"))]
#[inline]
pub fn disable_interrupts() {
    unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
}

/// Enables hardware interrupts (`sti`).
#[cfg(all(target_arch = "x86", target_os = "none"))]
#[inline]
pub fn enable_interrupts() {
    unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
}

/// Hosted stand-in: no interrupt flag exists, report "disabled".
#[cfg(not(all(target_arch = "x86", target_os = "none")))]
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    false
}

/// Hosted stand-in: nothing to mask.
#[cfg(not(all(target_arch = "x86", target_os = "none")))]
#[inline]
pub fn disable_interrupts() {}

/// Hosted stand-in: nothing to restore.
#[cfg(not(all(target_arch = "x86", target_os = "none")))]
#[inline]
pub fn enable_interrupts() {}
