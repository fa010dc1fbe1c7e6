//! The paging-hardware seam.

use kernel_memory_addresses::PhysAddr;

/// The three register touchpoints paging needs from the CPU.
///
/// Isolating them behind a trait keeps every line of allocator and
/// fault-handling logic runnable on a host: tests substitute a recording
/// fake, the kernel uses [`X86PagingHardware`].
pub trait PagingHardware {
    /// Install `root` as the translation root (CR3).
    fn load_root(&self, root: PhysAddr);

    /// Switch the CPU from physical to translated addressing (CR0.PG).
    /// Irreversible for the kernel's lifetime.
    fn enable_paging(&self);

    /// Discard cached translations (CR3 reload) after table edits.
    fn flush_tlb(&self);
}

/// The real thing: control-register access on 32-bit x86.
#[cfg(all(target_arch = "x86", target_os = "none"))]
pub struct X86PagingHardware;

#[cfg(all(target_arch = "x86", target_os = "none"))]
impl PagingHardware for X86PagingHardware {
    fn load_root(&self, root: PhysAddr) {
        unsafe {
            core::arch::asm!(
                "mov cr3, {0}",
                in(reg) root.as_u32(),
                options(nostack, preserves_flags)
            );
        }
    }

    fn enable_paging(&self) {
        unsafe {
            core::arch::asm!(
                "mov {0}, cr0",
                "or {0}, 0x80000000",
                "mov cr0, {0}",
                out(reg) _,
                options(nostack)
            );
        }
    }

    fn flush_tlb(&self) {
        unsafe {
            core::arch::asm!(
                "mov {0}, cr3",
                "mov cr3, {0}",
                out(reg) _,
                options(nostack, preserves_flags)
            );
        }
    }
}
