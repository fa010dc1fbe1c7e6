//! A single two-level address space.

use crate::active_tables::ActiveTables;
use crate::context::PagingContext;
use crate::fault::{FaultContext, FaultError};
use crate::hardware::PagingHardware;
use crate::page_entry::PageEntry;
use crate::page_table::{
    DirectoryIndex, PageDirectory, PageTable, RECURSIVE_SLOT, TableIndex, split_indices,
};
use kernel_frames::{NoSpace, release_frames};
use kernel_info::memory::{ENTRIES_PER_TABLE, MAX_REGISTERED_POOLS, TABLE_SPAN};
use kernel_memory_addresses::{FrameNumber, PhysAddr, PhysMapper, VirtAddr};
use kernel_sync::SpinLock;
use log::{debug, error, info};

/// Answers "is this address inside one of your live regions?".
///
/// Virtual memory pools implement this and register themselves with their
/// address space; the fault handler polls the registered set to decide
/// whether a not-present fault is legitimate demand paging or a stray
/// access. The check must be a pure membership test, no side effects.
pub trait AddressCheck {
    fn is_legitimate(&self, address: VirtAddr) -> bool;
}

/// A locked checker can sit in an address space's table: legitimacy polling
/// from the fault handler locks it briefly for the membership test.
impl<T: AddressCheck> AddressCheck for SpinLock<T> {
    fn is_legitimate(&self, address: VirtAddr) -> bool {
        self.lock_irq().is_legitimate(address)
    }
}

/// The per-address-space checker table has a fixed number of slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("virtual memory pool table is full")]
pub struct CheckerTableFull;

struct CheckerSet<'m> {
    slots: [Option<&'m dyn AddressCheck>; MAX_REGISTERED_POOLS],
    len: usize,
}

/// One two-level translation structure plus the virtual memory pools
/// registered against it.
///
/// Construction populates three things from the process pool:
/// the directory itself, the direct mapping of the low shared region
/// (kernel code/data — always present, never faulted), and the recursive
/// self-map in the last directory slot. Everything else appears lazily
/// through [`handle_fault`](Self::handle_fault) and disappears through
/// [`free_page`](Self::free_page).
///
/// # Invariants
/// - Every present entry points at a frame currently tracked as allocated
///   by some frame pool; a dangling mapping to a freed frame is a bug.
/// - The self-map entry always points at the directory's own frame.
pub struct AddressSpace<'m, M: PhysMapper + ActiveTables> {
    mapper: &'m M,
    /// The directory's frame.
    root: FrameNumber,
    /// Registered pools, weakly referenced: the space answers fault
    /// legitimacy through them but does not own them.
    checkers: SpinLock<CheckerSet<'m>>,
}

impl<'m, M: PhysMapper + ActiveTables> AddressSpace<'m, M> {
    /// Build a fresh address space.
    ///
    /// # Errors
    /// [`NoSpace`] if the process pool cannot supply the directory frame
    /// or a shared-region table frame.
    pub fn new<H: PagingHardware>(ctx: &PagingContext<'m, M, H>) -> Result<Self, NoSpace> {
        let mapper = ctx.mapper();
        let root = ctx.process_pool().lock_irq().allocate(1)?;

        // Construction happens before this space can be loaded, so the
        // structures are reached through raw physical access here; the
        // fault and free paths below go through the recursive alias.
        let directory: &mut PageDirectory = unsafe { mapper.phys_to_mut(root.base()) };
        directory.init_absent();

        // Direct-map the shared low region one table at a time. These
        // mappings exist in every address space and are never faulted in.
        let shared_tables = ctx.shared_size() / TABLE_SPAN;
        for slot in 0..shared_tables {
            let table_frame = ctx.process_pool().lock_irq().allocate(1)?;
            let table: &mut PageTable = unsafe { mapper.phys_to_mut(table_frame.base()) };
            for entry in 0..ENTRIES_PER_TABLE {
                let frame = FrameNumber::new(slot * ENTRIES_PER_TABLE as u32 + entry as u32);
                table.set(TableIndex::new(entry), PageEntry::present_kernel_rw(frame));
            }
            directory.set(
                DirectoryIndex::new(slot as usize),
                PageEntry::present_kernel_rw(table_frame),
            );
        }

        // The self-map: the last slot points back at the directory, which
        // keeps the paging structures addressable at fixed aliases once
        // this space is loaded.
        directory.set(RECURSIVE_SLOT, PageEntry::present_kernel_rw(root));

        info!("Constructed address space with directory in frame {root}");
        Ok(Self {
            mapper,
            root,
            checkers: SpinLock::new(CheckerSet {
                slots: [None; MAX_REGISTERED_POOLS],
                len: 0,
            }),
        })
    }

    /// The directory's frame; `root().base()` is what goes into the
    /// hardware's translation-root register.
    #[must_use]
    pub const fn root(&self) -> FrameNumber {
        self.root
    }

    /// Register a virtual memory pool for fault legitimacy checks.
    ///
    /// # Errors
    /// [`CheckerTableFull`] once all [`MAX_REGISTERED_POOLS`] slots are
    /// taken; the failure is reported, never silently dropped.
    pub fn register_pool(&self, checker: &'m dyn AddressCheck) -> Result<(), CheckerTableFull> {
        let mut checkers = self.checkers.lock_irq();
        if checkers.len == MAX_REGISTERED_POOLS {
            error!("Cannot register virtual memory pool: checker table is full");
            return Err(CheckerTableFull);
        }
        let len = checkers.len;
        checkers.slots[len] = Some(checker);
        checkers.len += 1;
        debug!("Registered virtual memory pool #{len}");
        Ok(())
    }

    /// Whether any registered pool claims `address`.
    #[must_use]
    pub fn is_legitimate(&self, address: VirtAddr) -> bool {
        let checkers = self.checkers.lock_irq();
        checkers.slots[..checkers.len]
            .iter()
            .flatten()
            .any(|checker| checker.is_legitimate(address))
    }

    /// Handle a page fault against this (loaded) address space.
    ///
    /// Protection faults and faults outside every registered pool are
    /// refused. For a legitimate not-present fault, the second-level
    /// table is allocated lazily if the directory slot is still absent,
    /// then a data frame is installed at the faulting page — both from
    /// the process pool. Runs with interrupts disabled (trap context);
    /// frame allocation cannot re-fault because pool bitmaps and paging
    /// structures are always resident.
    ///
    /// # Errors
    /// See [`FaultError`]; all variants are fatal at the trap boundary.
    pub fn handle_fault<H: PagingHardware>(
        &self,
        ctx: &PagingContext<'_, M, H>,
        fault: &FaultContext,
    ) -> Result<(), FaultError> {
        let address = fault.address;

        if fault.error_code.protection_violation() {
            error!("Protection fault at {address}: present page, disallowed access");
            return Err(FaultError::ProtectionViolation(address));
        }

        if !self.is_legitimate(address) {
            error!("Page fault at {address}: no registered pool claims this address");
            return Err(FaultError::IllegitimateAddress(address));
        }

        let (directory_index, table_index) = split_indices(address);
        let directory = unsafe { self.mapper.directory_mut(self.root) };

        if !directory.get(directory_index).present() {
            let table_frame = ctx
                .process_pool()
                .lock_irq()
                .allocate(1)
                .map_err(|_| FaultError::OutOfFrames(address))?;
            directory.set(directory_index, PageEntry::present_user_rw(table_frame));
            let table = unsafe { self.mapper.table_mut(self.root, directory_index) };
            table.init_absent();
            debug!("Allocated table in frame {table_frame} for directory slot {directory_index}");
        }

        let page_frame = ctx
            .process_pool()
            .lock_irq()
            .allocate(1)
            .map_err(|_| FaultError::OutOfFrames(address))?;
        let table = unsafe { self.mapper.table_mut(self.root, directory_index) };
        table.set(table_index, PageEntry::present_user_rw(page_frame));

        debug!("Demand-mapped {address} to frame {page_frame}");
        Ok(())
    }

    /// Tear down the mapping at `address`, if any: release the mapped
    /// frame back through the pool directory, clear the table entry, and
    /// flush stale translations.
    ///
    /// Returns the released frame, or `None` when the page was never
    /// faulted in (untouched pages of a region have no frame to give
    /// back).
    pub fn free_page<H: PagingHardware>(
        &self,
        ctx: &PagingContext<'_, M, H>,
        address: VirtAddr,
    ) -> Option<FrameNumber> {
        let (directory_index, table_index) = split_indices(address);

        let directory = unsafe { self.mapper.directory_mut(self.root) };
        if !directory.get(directory_index).present() {
            return None;
        }

        let table = unsafe { self.mapper.table_mut(self.root, directory_index) };
        let entry = table.get(table_index);
        if !entry.present() {
            return None;
        }

        let frame = entry.frame();
        release_frames(ctx.registry(), frame);
        table.set(table_index, PageEntry::new());
        // The hardware may still hold the stale translation.
        ctx.hardware().flush_tlb();

        debug!("Unmapped {address}, released frame {frame}");
        Some(frame)
    }

    /// Translate `address` if mapped.
    #[must_use]
    pub fn translate(&self, address: VirtAddr) -> Option<PhysAddr> {
        let (directory_index, table_index) = split_indices(address);

        let directory = unsafe { self.mapper.directory_mut(self.root) };
        if !directory.get(directory_index).present() {
            return None;
        }

        let table = unsafe { self.mapper.table_mut(self.root, directory_index) };
        let entry = table.get(table_index);
        entry
            .present()
            .then(|| entry.frame().base() + address.page_offset())
    }
}
