//! The region list and its bookkeeping.

use kernel_info::memory::MAX_REGIONS;
use kernel_memory_addresses::{FRAME_SIZE, PhysMapper, VirtAddr};
use kernel_vmem::{ActiveTables, AddressCheck, AddressSpace, PagingContext, PagingHardware};
use log::{debug, error, info};

/// One live region: a contiguous span of virtual addresses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegionDescriptor {
    start: VirtAddr,
    length: u32,
}

impl RegionDescriptor {
    const EMPTY: Self = Self {
        start: VirtAddr::new(0),
        length: 0,
    };

    /// First address of the region.
    #[must_use]
    pub const fn start(&self) -> VirtAddr {
        self.start
    }

    /// Length of the region in bytes.
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Whether `address` falls inside `[start, start + length)`.
    fn contains(&self, address: VirtAddr) -> bool {
        address >= self.start
            && u64::from(address.as_u32()) < u64::from(self.start.as_u32()) + u64::from(self.length)
    }
}

/// A virtual memory pool: allocates and releases regions inside the
/// address-space window `[base_address, base_address + size)`.
///
/// # Invariants
/// - Descriptor 0 always reserves the pool's own bookkeeping page.
/// - Descriptors are ordered, non-overlapping, and `used_size` is the sum
///   of their lengths; it never exceeds `size`.
///
/// The pool holds no back-pointers; the paging context and address space
/// it operates against are passed per call, and registration with the
/// address space is the caller's next statement after construction:
///
/// ```ignore
/// let heap = SpinLock::new(VMPool::new(base, size));
/// space.register_pool(&heap)?;
/// ```
pub struct VMPool {
    base_address: VirtAddr,
    size: u32,
    used_size: u32,
    regions: [RegionDescriptor; MAX_REGIONS],
    region_count: usize,
}

impl VMPool {
    /// Create a pool managing `size` bytes of virtual address space at
    /// `base_address`. The first page is reserved for the pool's own
    /// bookkeeping (descriptor slot 0).
    #[must_use]
    pub fn new(base_address: VirtAddr, size: u32) -> Self {
        assert!(
            size >= FRAME_SIZE,
            "pool too small for its bookkeeping page"
        );
        debug_assert!(base_address.page_offset() == 0);

        let mut regions = [RegionDescriptor::EMPTY; MAX_REGIONS];
        regions[0] = RegionDescriptor {
            start: base_address,
            length: FRAME_SIZE,
        };

        info!("Constructed virtual memory pool: {size} bytes at {base_address}");
        Self {
            base_address,
            size,
            used_size: FRAME_SIZE,
            regions,
            region_count: 1,
        }
    }

    /// Allocate a region of `length` bytes.
    ///
    /// Returns the region's start address, or `None` for a zero-length
    /// request (trivial success, nothing allocated). The new region
    /// begins immediately after the previous region's end — released
    /// space is never reused for later requests.
    ///
    /// # Panics
    /// When the descriptor table is full or the request would push
    /// `used_size` past `size`. The kernel has no recovery path for
    /// allocator exhaustion here, so both are fatal; the checks precede
    /// any mutation.
    pub fn allocate(&mut self, length: u32) -> Option<VirtAddr> {
        if length == 0 {
            return None;
        }

        if self.region_count == MAX_REGIONS {
            error!("Region table full: cannot allocate {length} bytes");
            panic!("virtual memory pool region table is full");
        }
        if u64::from(self.used_size) + u64::from(length) > u64::from(self.size) {
            error!(
                "Pool exhausted: {length} bytes requested, {} of {} used",
                self.used_size, self.size
            );
            panic!("virtual memory pool exhausted");
        }

        let previous = self.regions[self.region_count - 1];
        let start = previous.start + previous.length;

        self.regions[self.region_count] = RegionDescriptor { start, length };
        self.region_count += 1;
        self.used_size += length;

        debug!("Allocated region: {length} bytes at {start}");
        Some(start)
    }

    /// Release the region starting exactly at `start`.
    ///
    /// Every page-aligned address within the region's length is unmapped
    /// through [`AddressSpace::free_page`] (untouched pages simply have
    /// no frame to give back), the descriptor list is compacted, and the
    /// address space is reloaded so the hardware drops its cached state.
    ///
    /// # Panics
    /// If no region starts at `start` — partial-region releases and
    /// made-up addresses are usage errors.
    pub fn release<M: PhysMapper + ActiveTables, H: PagingHardware>(
        &mut self,
        ctx: &PagingContext<'_, M, H>,
        space: &AddressSpace<'_, M>,
        start: VirtAddr,
    ) {
        let Some(index) = self.regions[..self.region_count]
            .iter()
            .position(|region| region.start == start)
        else {
            error!("No region starts at {start}");
            panic!("release of unknown region at {start}");
        };
        let region = self.regions[index];

        let mut offset = 0;
        while offset < region.length {
            space.free_page(ctx, region.start + offset);
            offset += FRAME_SIZE;
        }

        self.used_size -= region.length;
        for slot in index..self.region_count - 1 {
            self.regions[slot] = self.regions[slot + 1];
        }
        self.regions[self.region_count - 1] = RegionDescriptor::EMPTY;
        self.region_count -= 1;

        // The hardware's cached state must match the updated tables.
        ctx.load(space);
        debug!("Released region: {} bytes at {start}", region.length);
    }

    /// Whether `address` falls inside a live region. This is the fault
    /// handler's sole admission criterion for demand paging; it has no
    /// side effects.
    #[must_use]
    pub fn is_legitimate(&self, address: VirtAddr) -> bool {
        self.regions[..self.region_count]
            .iter()
            .any(|region| region.contains(address))
    }

    /// First address of the managed window.
    #[must_use]
    pub const fn base_address(&self) -> VirtAddr {
        self.base_address
    }

    /// Size of the managed window in bytes.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Sum of all live region lengths.
    #[must_use]
    pub const fn used_size(&self) -> u32 {
        self.used_size
    }

    /// The live region descriptors, in order.
    #[must_use]
    pub fn regions(&self) -> &[RegionDescriptor] {
        &self.regions[..self.region_count]
    }
}

/// A pool vouches for addresses inside its live regions. Wrapping it in a
/// `SpinLock` yields an [`AddressCheck`] (blanket impl) that the fault
/// handler polls under a brief lock.
impl AddressCheck for VMPool {
    fn is_legitimate(&self, address: VirtAddr) -> bool {
        VMPool::is_legitimate(self, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeHardware, TestPhys};
    use kernel_frames::{FramePool, FramePoolRegistry};
    use kernel_info::memory::TABLE_SPAN;
    use kernel_memory_addresses::FrameNumber;
    use kernel_vmem::{FaultContext, PageFaultErrorCode};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    const POOL_BASE: u32 = 0x1000_0000;
    const POOL_SIZE: u32 = 16 * FRAME_SIZE;

    fn heap() -> VMPool {
        VMPool::new(VirtAddr::new(POOL_BASE), POOL_SIZE)
    }

    fn not_present_fault(address: u32) -> FaultContext {
        FaultContext {
            address: VirtAddr::new(address),
            error_code: PageFaultErrorCode::new().with_write(true).with_user_mode(true),
        }
    }

    /// Boot-shaped wiring for the tests that exercise the paging side.
    macro_rules! fixture {
        ($phys:ident, $process:ident, $hw:ident, $ctx:ident) => {
            let $phys = TestPhys::with_frames(64);
            let kernel = kernel_sync::SpinLock::new(FramePool::new(
                &$phys,
                FrameNumber::new(48),
                8,
                Some(FrameNumber::new(0)),
            ));
            let $process = kernel_sync::SpinLock::new(FramePool::new(
                &$phys,
                FrameNumber::new(8),
                40,
                Some(FrameNumber::new(1)),
            ));
            let registry = FramePoolRegistry::new();
            registry.register(&kernel).expect("register");
            registry.register(&$process).expect("register");
            let $hw = FakeHardware::new();
            let $ctx = kernel_vmem::PagingContext::new(
                &$phys, &$hw, &kernel, &$process, &registry, TABLE_SPAN,
            );
        };
    }

    #[test]
    fn construction_reserves_the_bookkeeping_page() {
        let pool = heap();

        assert_eq!(pool.used_size(), FRAME_SIZE);
        assert_eq!(pool.regions().len(), 1);
        assert_eq!(pool.regions()[0].start(), VirtAddr::new(POOL_BASE));
        assert_eq!(pool.regions()[0].length(), FRAME_SIZE);

        assert!(pool.is_legitimate(VirtAddr::new(POOL_BASE)));
        assert!(pool.is_legitimate(VirtAddr::new(POOL_BASE + FRAME_SIZE - 1)));
        assert!(!pool.is_legitimate(VirtAddr::new(POOL_BASE + FRAME_SIZE)));
    }

    #[test]
    fn allocate_bumps_from_the_previous_region_end() {
        let mut pool = heap();

        let first = pool.allocate(2 * FRAME_SIZE).expect("allocate");
        assert_eq!(first, VirtAddr::new(POOL_BASE + FRAME_SIZE));

        let second = pool.allocate(0x800).expect("allocate");
        assert_eq!(second, VirtAddr::new(POOL_BASE + 3 * FRAME_SIZE));

        assert_eq!(pool.used_size(), FRAME_SIZE + 2 * FRAME_SIZE + 0x800);
        assert!(pool.is_legitimate(second + 0x7ff));
        assert!(!pool.is_legitimate(second + 0x800));
    }

    #[test]
    fn zero_length_requests_allocate_nothing() {
        let mut pool = heap();
        let used = pool.used_size();

        assert_eq!(pool.allocate(0), None);
        assert_eq!(pool.used_size(), used);
        assert_eq!(pool.regions().len(), 1);
    }

    #[test]
    fn exact_fill_succeeds_and_one_more_byte_is_fatal() {
        let mut pool = heap();

        pool.allocate(POOL_SIZE - FRAME_SIZE).expect("exact fill");
        assert_eq!(pool.used_size(), POOL_SIZE);

        let regions_before: Vec<RegionDescriptor> = pool.regions().to_vec();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pool.allocate(1);
        }));

        assert!(outcome.is_err());
        assert_eq!(pool.used_size(), POOL_SIZE);
        assert_eq!(pool.regions(), regions_before.as_slice());
    }

    #[test]
    fn region_table_capacity_is_fatal() {
        let mut pool = heap();
        for _ in 1..MAX_REGIONS {
            pool.allocate(16).expect("allocate");
        }
        assert_eq!(pool.regions().len(), MAX_REGIONS);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pool.allocate(16);
        }));
        assert!(outcome.is_err());
    }

    #[test]
    fn releasing_a_middle_region_compacts_the_list() {
        fixture!(phys, process, hw, ctx);
        let space = kernel_vmem::AddressSpace::new(&ctx).expect("address space");
        let mut pool = heap();

        let first = pool.allocate(FRAME_SIZE).expect("allocate");
        let second = pool.allocate(2 * FRAME_SIZE).expect("allocate");
        let third = pool.allocate(FRAME_SIZE).expect("allocate");
        let used_before = pool.used_size();

        pool.release(&ctx, &space, second);

        assert_eq!(pool.used_size(), used_before - 2 * FRAME_SIZE);
        assert_eq!(pool.regions().len(), 3);
        assert_eq!(pool.regions()[1].start(), first);
        assert_eq!(pool.regions()[1].length(), FRAME_SIZE);
        assert_eq!(pool.regions()[2].start(), third);
        assert_eq!(pool.regions()[2].length(), FRAME_SIZE);

        assert!(!pool.is_legitimate(second));
        assert!(pool.is_legitimate(third));
        // The address space was reloaded so cached translations die.
        assert!(hw.loads.get() > 0);
    }

    #[test]
    fn release_of_an_unknown_address_is_fatal() {
        fixture!(phys, process, hw, ctx);
        let space = kernel_vmem::AddressSpace::new(&ctx).expect("address space");
        let mut pool = heap();
        pool.allocate(FRAME_SIZE).expect("allocate");

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pool.release(&ctx, &space, VirtAddr::new(POOL_BASE + 0x800));
        }));
        assert!(outcome.is_err());
    }

    #[test]
    fn release_gives_demand_paged_frames_back() {
        fixture!(phys, process, hw, ctx);
        let pool = kernel_sync::SpinLock::new(heap());
        let space = kernel_vmem::AddressSpace::new(&ctx).expect("address space");
        space.register_pool(&pool).expect("register");

        let region = pool.lock().allocate(2 * FRAME_SIZE).expect("allocate");

        // Touch both pages: one table plus two leaves come out of the
        // process pool.
        let free_before = process.lock().free_frame_count();
        space
            .handle_fault(&ctx, &not_present_fault(region.as_u32()))
            .expect("fault");
        space
            .handle_fault(&ctx, &not_present_fault(region.as_u32() + FRAME_SIZE))
            .expect("fault");
        assert_eq!(process.lock().free_frame_count(), free_before - 3);

        pool.lock().release(&ctx, &space, region);

        // Both leaves returned; the table stays resident.
        assert_eq!(process.lock().free_frame_count(), free_before - 1);
        assert_eq!(space.translate(region), None);
        assert_eq!(space.translate(region + FRAME_SIZE), None);
        assert!(!pool.lock().is_legitimate(region));
    }
}
