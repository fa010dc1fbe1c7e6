//! Page-fault context and outcomes.

use bitfield_struct::bitfield;
use kernel_memory_addresses::VirtAddr;

/// The page-fault error code as pushed by the CPU.
#[bitfield(u32)]
pub struct PageFaultErrorCode {
    /// Bit 0: set means the fault hit a *present* page whose permissions
    /// disallowed the access (a protection violation); clear means the
    /// page was simply not present — the demand-paging case.
    pub protection_violation: bool,

    /// Bit 1: the faulting access was a write.
    pub write: bool,

    /// Bit 2: the faulting access came from user mode.
    pub user_mode: bool,

    #[bits(29)]
    __: u32,
}

/// Captured snapshot of one page fault, as handed over by the trap glue.
#[derive(Copy, Clone, Debug)]
pub struct FaultContext {
    /// The faulting linear address (CR2 at trap time).
    pub address: VirtAddr,
    /// The error code pushed with the trap.
    pub error_code: PageFaultErrorCode,
}

/// A fault the handler refuses to satisfy.
///
/// This kernel has no user-space recovery or signalling mechanism; every
/// variant is fatal for the faulting context at the trap boundary.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FaultError {
    /// The fault hit a present page with disallowed access; no mapping is
    /// created for those.
    #[error("protection violation at {0}")]
    ProtectionViolation(VirtAddr),

    /// No registered virtual memory pool claims the address — demand
    /// paging never maps an unclaimed address, however plausible.
    #[error("no registered pool claims address {0}")]
    IllegitimateAddress(VirtAddr),

    /// The process pool ran dry while installing the table or the page.
    #[error("out of physical frames while mapping {0}")]
    OutOfFrames(VirtAddr),
}
