//! Process-wide paging configuration.

use crate::active_tables::ActiveTables;
use crate::address_space::AddressSpace;
use crate::hardware::PagingHardware;
use core::sync::atomic::{AtomicBool, Ordering};
use kernel_frames::{FramePool, FramePoolRegistry};
use kernel_info::memory::TABLE_SPAN;
use kernel_memory_addresses::PhysMapper;
use kernel_sync::SpinLock;
use log::{debug, info};

/// Everything the paging subsystem needs to know about the machine:
/// which frame pool backs kernel-owned structures, which backs
/// process-owned tables and pages, where releases are routed, how the
/// hardware is driven, and how large the direct-mapped shared region is.
///
/// Created exactly once, before any [`AddressSpace`]; handed into paging
/// operations by reference rather than parked in file-scope statics.
pub struct PagingContext<'c, M: PhysMapper + ActiveTables, H: PagingHardware> {
    mapper: &'c M,
    hardware: &'c H,
    kernel_pool: &'c SpinLock<FramePool<'c, M>>,
    process_pool: &'c SpinLock<FramePool<'c, M>>,
    registry: &'c FramePoolRegistry<'c, 'c, M>,
    shared_size: u32,
    paging_enabled: AtomicBool,
}

impl<'c, M: PhysMapper + ActiveTables, H: PagingHardware> PagingContext<'c, M, H> {
    /// Record the process-wide paging configuration.
    ///
    /// `shared_size` is the number of bytes of low memory every address
    /// space direct-maps at construction; it must split evenly into
    /// second-level tables (multiples of 4 MiB).
    pub fn new(
        mapper: &'c M,
        hardware: &'c H,
        kernel_pool: &'c SpinLock<FramePool<'c, M>>,
        process_pool: &'c SpinLock<FramePool<'c, M>>,
        registry: &'c FramePoolRegistry<'c, 'c, M>,
        shared_size: u32,
    ) -> Self {
        assert!(shared_size > 0, "shared region must cover the kernel image");
        assert!(
            shared_size % TABLE_SPAN == 0,
            "shared region must be a whole number of second-level tables"
        );

        info!("Paging configured: {} MiB shared region", shared_size >> 20);
        Self {
            mapper,
            hardware,
            kernel_pool,
            process_pool,
            registry,
            shared_size,
            paging_enabled: AtomicBool::new(false),
        }
    }

    /// Install `space` as the one the hardware translates through; it
    /// becomes the implicit target of subsequent faults.
    pub fn load(&self, space: &AddressSpace<'_, M>) {
        self.hardware.load_root(space.root().base());
        debug!("Loaded address space rooted at frame {}", space.root());
    }

    /// Switch from physical to translated addressing. One-time and
    /// irreversible for the kernel's lifetime.
    pub fn enable_paging(&self) {
        let was_enabled = self.paging_enabled.swap(true, Ordering::AcqRel);
        assert!(!was_enabled, "paging is already enabled");
        self.hardware.enable_paging();
        info!("Paging enabled");
    }

    /// Whether [`enable_paging`](Self::enable_paging) has run.
    #[must_use]
    pub fn paging_enabled(&self) -> bool {
        self.paging_enabled.load(Ordering::Acquire)
    }

    /// The physical-memory access seam.
    #[must_use]
    pub const fn mapper(&self) -> &'c M {
        self.mapper
    }

    /// The paging-hardware seam.
    #[must_use]
    pub const fn hardware(&self) -> &'c H {
        self.hardware
    }

    /// Pool backing kernel-owned allocations (e.g. bitmap info frames).
    #[must_use]
    pub const fn kernel_pool(&self) -> &'c SpinLock<FramePool<'c, M>> {
        self.kernel_pool
    }

    /// Pool backing directories, tables, and demand-mapped pages.
    #[must_use]
    pub const fn process_pool(&self) -> &'c SpinLock<FramePool<'c, M>> {
        self.process_pool
    }

    /// The pool directory used for release routing.
    #[must_use]
    pub const fn registry(&self) -> &'c FramePoolRegistry<'c, 'c, M> {
        self.registry
    }

    /// Bytes of low memory direct-mapped into every address space.
    #[must_use]
    pub const fn shared_size(&self) -> u32 {
        self.shared_size
    }
}
