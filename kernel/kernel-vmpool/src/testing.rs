//! Test scaffolding: arena-backed physical memory and a recording
//! paging-hardware fake, wired the way boot would wire the real thing.

use core::cell::Cell;
use kernel_memory_addresses::{FRAME_SHIFT, FrameNumber, PhysAddr, PhysMapper};
use kernel_vmem::{ActiveTables, DirectoryIndex, PageDirectory, PageTable, PagingHardware};

/// A 4 KiB-aligned raw frame used as "physical RAM" backing store.
#[repr(align(4096))]
pub struct Aligned4K(#[allow(dead_code)] [u8; 4096]);

impl Aligned4K {
    fn new_zeroed() -> Self {
        Self([0u8; 4096])
    }
}

/// A tiny in-memory "RAM": frame number `n` is `frames[n]`, physical
/// addresses are byte offsets from zero.
pub struct TestPhys {
    frames: Vec<Aligned4K>,
}

impl TestPhys {
    pub fn with_frames(n: usize) -> Self {
        let mut frames = Vec::with_capacity(n);
        for _ in 0..n {
            frames.push(Aligned4K::new_zeroed());
        }
        Self { frames }
    }

    fn frame_mut_ptr(&self, index: usize) -> *mut u8 {
        &self.frames[index] as *const Aligned4K as *mut u8
    }
}

impl PhysMapper for TestPhys {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysAddr) -> &'a mut T {
        let index = (pa.as_u32() >> FRAME_SHIFT) as usize;
        debug_assert_eq!(pa.frame_offset(), 0);
        unsafe { &mut *(self.frame_mut_ptr(index) as *mut T) }
    }
}

impl ActiveTables for TestPhys {
    unsafe fn directory_mut<'a>(&self, root: FrameNumber) -> &'a mut PageDirectory {
        unsafe { self.phys_to_mut(root.base()) }
    }

    unsafe fn table_mut<'a>(&self, root: FrameNumber, index: DirectoryIndex) -> &'a mut PageTable {
        let directory: &mut PageDirectory = unsafe { self.phys_to_mut(root.base()) };
        let entry = directory.get(index);
        debug_assert!(entry.present(), "table_mut through an absent entry");
        unsafe { self.phys_to_mut(entry.frame().base()) }
    }
}

/// Records what the paging code asks of the CPU.
pub struct FakeHardware {
    pub loads: Cell<usize>,
    pub flushes: Cell<usize>,
    pub enabled: Cell<bool>,
}

impl FakeHardware {
    pub fn new() -> Self {
        Self {
            loads: Cell::new(0),
            flushes: Cell::new(0),
            enabled: Cell::new(false),
        }
    }
}

impl PagingHardware for FakeHardware {
    fn load_root(&self, _root: PhysAddr) {
        self.loads.set(self.loads.get() + 1);
    }

    fn enable_paging(&self) {
        self.enabled.set(true);
    }

    fn flush_tlb(&self) {
        self.flushes.set(self.flushes.get() + 1);
    }
}
