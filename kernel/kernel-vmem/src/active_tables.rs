//! Access to the paging structures of a loaded address space.

use crate::page_table::{DirectoryIndex, PageDirectory, PageTable, directory_alias, table_alias};
use kernel_memory_addresses::FrameNumber;

/// Reaches the directory and second-level tables of an address space.
///
/// Two worlds implement this:
///
/// - [`RecursiveTables`] on real hardware, where the recursive self-map
///   makes the structures of the **currently loaded** space addressable
///   at fixed virtual aliases.
/// - An arena-backed walker in tests, which resolves `root` and the
///   directory entries against fake physical memory.
///
/// `root` identifies the address space; the recursive implementation
/// ignores it (the alias always names the loaded space) and is only
/// correct when the space owning `root` is the loaded one.
pub trait ActiveTables {
    /// Borrow the page directory of the space rooted at `root`.
    ///
    /// # Safety
    /// The paging structures must be reachable (loaded space on hardware,
    /// arena-resident in tests) and not concurrently mutated.
    unsafe fn directory_mut<'a>(&self, root: FrameNumber) -> &'a mut PageDirectory;

    /// Borrow the second-level table behind directory slot `index`, which
    /// must be present.
    ///
    /// # Safety
    /// As for [`directory_mut`](Self::directory_mut); additionally the
    /// directory entry at `index` must point at a live table frame.
    unsafe fn table_mut<'a>(&self, root: FrameNumber, index: DirectoryIndex) -> &'a mut PageTable;
}

/// [`ActiveTables`] via the recursive self-map: pure address arithmetic,
/// no physical-pointer bookkeeping.
///
/// Only meaningful once paging is enabled and only for the loaded address
/// space; `root` is ignored.
pub struct RecursiveTables;

impl ActiveTables for RecursiveTables {
    unsafe fn directory_mut<'a>(&self, _root: FrameNumber) -> &'a mut PageDirectory {
        // Safety: with paging on, the self-map guarantees a directory at
        // this alias; the caller vouches that the owning space is loaded.
        unsafe { &mut *(directory_alias().as_usize() as *mut PageDirectory) }
    }

    unsafe fn table_mut<'a>(&self, _root: FrameNumber, index: DirectoryIndex) -> &'a mut PageTable {
        // Safety: as above; the caller vouches the directory entry at
        // `index` is present, so the alias resolves to its table.
        unsafe { &mut *(table_alias(index).as_usize() as *mut PageTable) }
    }
}
