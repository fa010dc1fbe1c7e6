use bitfield_struct::bitfield;
use kernel_memory_addresses::FrameNumber;

/// A single 32-bit paging entry.
///
/// On 32-bit non-PAE x86 the directory and table levels share one entry
/// layout: permission bits in the low word, the frame number in bits
/// 31..12. A directory entry's frame is a second-level table; a table
/// entry's frame is the mapped data page.
///
/// ### Bit layout
///
/// | Bits  | Name | Meaning |
/// |-------|------|---------|
/// | 0     | `P`  | Present: valid entry if set; clear faults on access |
/// | 1     | `RW` | Writable if set |
/// | 2     | `US` | User-mode accessible if set |
/// | 3     | `PWT`| Write-through caching |
/// | 4     | `PCD`| Disable caching |
/// | 5     | `A`  | Accessed (set by the CPU) |
/// | 6     | `D`  | Dirty (leaf only, set by the CPU) |
/// | 7     | `PS` | Page size; always 0 here (no 4 MiB pages) |
/// | 8     | `G`  | Global (leaf only) |
/// | 9–11  | —    | Available to the OS |
/// | 12–31 | addr | Physical frame number |
#[bitfield(u32)]
pub struct PageEntry {
    /// Present (P, bit 0). A clear entry faults on access, which is what
    /// drives demand paging.
    pub present: bool,

    /// Writable (RW, bit 1). Clear means read-only.
    pub writable: bool,

    /// User/Supervisor (US, bit 2). Clear restricts to supervisor mode.
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5). Set by the CPU on first access.
    pub accessed: bool,

    /// Dirty (D, bit 6). Set by the CPU on first write to a leaf.
    pub dirty: bool,

    /// Page Size (PS, bit 7). Large pages are not used; must stay 0.
    pub large_page: bool,

    /// Global (G, bit 8). Leaf only.
    pub global_translation: bool,

    /// Available to the OS (bits 9..=11); hardware ignores these.
    #[bits(3)]
    pub os_available: u8,

    /// Physical frame number (bits 12..=31).
    #[bits(20)]
    frame_bits: u32,
}

impl PageEntry {
    /// The frame this entry points at (a table frame at the directory
    /// level, a data frame at the table level).
    #[inline]
    #[must_use]
    pub const fn frame(&self) -> FrameNumber {
        FrameNumber::new(self.frame_bits())
    }

    /// Point this entry at `frame`.
    #[inline]
    #[must_use]
    pub const fn with_frame(self, frame: FrameNumber) -> Self {
        self.with_frame_bits(frame.as_u32())
    }

    /// A not-present, supervisor, read-write entry — the initial state of
    /// every directory slot.
    #[inline]
    #[must_use]
    pub const fn absent_kernel_rw() -> Self {
        Self::new().with_writable(true)
    }

    /// A not-present, user, read-write entry — the initial state of every
    /// slot in a freshly faulted-in second-level table.
    #[inline]
    #[must_use]
    pub const fn absent_user_rw() -> Self {
        Self::new().with_writable(true).with_user_access(true)
    }

    /// A present supervisor read-write entry pointing at `frame`; used for
    /// the direct-mapped region and the self-map.
    #[inline]
    #[must_use]
    pub const fn present_kernel_rw(frame: FrameNumber) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_frame(frame)
    }

    /// A present user read-write entry pointing at `frame`; used for
    /// demand-mapped tables and pages.
    #[inline]
    #[must_use]
    pub const fn present_user_rw(frame: FrameNumber) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
            .with_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_bit_patterns() {
        assert_eq!(PageEntry::absent_kernel_rw().into_bits(), 0x2);
        assert_eq!(PageEntry::absent_user_rw().into_bits(), 0x6);
        assert_eq!(
            PageEntry::present_kernel_rw(FrameNumber::new(5)).into_bits(),
            (5 << 12) | 0x3
        );
        assert_eq!(
            PageEntry::present_user_rw(FrameNumber::new(0xfffff)).into_bits(),
            0xffff_f007
        );
    }

    #[test]
    fn frame_round_trip() {
        let entry = PageEntry::present_user_rw(FrameNumber::new(1234));
        assert_eq!(entry.frame(), FrameNumber::new(1234));
        assert!(entry.present());
        assert!(entry.writable());
        assert!(entry.user_access());
        assert!(!entry.large_page());
    }
}
