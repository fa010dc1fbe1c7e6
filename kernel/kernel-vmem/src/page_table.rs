//! Typed paging structures, index math, and the recursive-alias formulas.

use crate::page_entry::PageEntry;
use kernel_info::memory::ENTRIES_PER_TABLE;
use kernel_memory_addresses::{FRAME_SIZE, VirtAddr};

/// Index into the page directory (virtual address bits `[31:22]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DirectoryIndex(u16);

/// Index into a second-level page table (virtual address bits `[21:12]`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

impl DirectoryIndex {
    /// Construct from a raw index; must be in `0..1024`.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        debug_assert!(index < ENTRIES_PER_TABLE);
        Self(index as u16)
    }

    /// Extract the directory index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn from_address(va: VirtAddr) -> Self {
        Self::new((va.as_u32() >> 22) as usize)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl TableIndex {
    /// Construct from a raw index; must be in `0..1024`.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        debug_assert!(index < ENTRIES_PER_TABLE);
        Self(index as u16)
    }

    /// Extract the table index from a virtual address.
    #[inline]
    #[must_use]
    pub const fn from_address(va: VirtAddr) -> Self {
        Self::new(((va.as_u32() >> 12) & 0x3ff) as usize)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for DirectoryIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::fmt::Debug for DirectoryIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "directory[{}]", self.0)
    }
}

impl core::fmt::Display for TableIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::fmt::Debug for TableIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "table[{}]", self.0)
    }
}

/// Split a virtual address into its directory and table indices.
#[inline]
#[must_use]
pub const fn split_indices(va: VirtAddr) -> (DirectoryIndex, TableIndex) {
    (
        DirectoryIndex::from_address(va),
        TableIndex::from_address(va),
    )
}

/// The directory slot that maps the directory onto itself.
pub const RECURSIVE_SLOT: DirectoryIndex = DirectoryIndex::new(ENTRIES_PER_TABLE - 1);

/// Virtual address at which a second-level table is reachable through the
/// recursive slot: the walk resolves the recursive slot once, so the
/// "page" addressed here *is* the table for directory slot `index`.
///
/// ```rust
/// # use kernel_vmem::page_table::{table_alias, DirectoryIndex};
/// assert_eq!(table_alias(DirectoryIndex::new(0)).as_u32(), 0xffc0_0000);
/// assert_eq!(table_alias(DirectoryIndex::new(1)).as_u32(), 0xffc0_1000);
/// ```
#[inline]
#[must_use]
pub const fn table_alias(index: DirectoryIndex) -> VirtAddr {
    VirtAddr::new(((RECURSIVE_SLOT.as_usize() as u32) << 22) | ((index.as_usize() as u32) << 12))
}

/// Virtual address at which the page directory itself is reachable: the
/// walk resolves the recursive slot twice.
///
/// ```rust
/// # use kernel_vmem::page_table::directory_alias;
/// assert_eq!(directory_alias().as_u32(), 0xffff_f000);
/// ```
#[inline]
#[must_use]
pub const fn directory_alias() -> VirtAddr {
    table_alias(RECURSIVE_SLOT)
}

/// The page directory: 1024 entries, one frame, 4 KiB-aligned.
///
/// Entry `i` covers virtual addresses `[i * 4 MiB, (i + 1) * 4 MiB)`.
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PageEntry; ENTRIES_PER_TABLE],
}

/// A second-level page table: 1024 entries, one frame, 4 KiB-aligned.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageEntry; ENTRIES_PER_TABLE],
}

const _: () = {
    assert!(size_of::<PageDirectory>() == FRAME_SIZE as usize);
    assert!(size_of::<PageTable>() == FRAME_SIZE as usize);
};

impl PageDirectory {
    #[inline]
    #[must_use]
    pub const fn get(&self, index: DirectoryIndex) -> PageEntry {
        self.entries[index.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, index: DirectoryIndex, entry: PageEntry) {
        self.entries[index.as_usize()] = entry;
    }

    /// Reset every slot to not-present supervisor read-write.
    pub fn init_absent(&mut self) {
        self.entries = [PageEntry::absent_kernel_rw(); ENTRIES_PER_TABLE];
    }
}

impl PageTable {
    #[inline]
    #[must_use]
    pub const fn get(&self, index: TableIndex) -> PageEntry {
        self.entries[index.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, index: TableIndex, entry: PageEntry) {
        self.entries[index.as_usize()] = entry;
    }

    /// Reset every slot to not-present user read-write.
    pub fn init_absent(&mut self) {
        self.entries = [PageEntry::absent_user_rw(); ENTRIES_PER_TABLE];
    }
}
