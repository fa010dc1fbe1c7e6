//! Test scaffolding: an in-memory stand-in for physical RAM.

use kernel_memory_addresses::{FRAME_SHIFT, PhysAddr, PhysMapper};

/// A 4 KiB-aligned raw frame used as "physical RAM" backing store.
#[repr(align(4096))]
pub struct Aligned4K(#[allow(dead_code)] [u8; 4096]);

impl Aligned4K {
    fn new_zeroed() -> Self {
        Self([0u8; 4096])
    }
}

/// A tiny in-memory "RAM": frame number `n` is `frames[n]`, physical
/// addresses are byte offsets from zero. Only frames that are actually
/// dereferenced (here: bitmap info frames) need to exist.
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
        // The arena is the single owner of the fake RAM; tests hand out
        // disjoint frames.
        &self.frames[index] as *const Aligned4K as *mut u8
    }
}

impl PhysMapper for TestPhys {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysAddr) -> &'a mut T {
        let index = (pa.as_u32() >> FRAME_SHIFT) as usize;
        // Structures never straddle a frame boundary in these tests.
        debug_assert_eq!(pa.frame_offset(), 0);
        unsafe { &mut *(self.frame_mut_ptr(index) as *mut T) }
    }
}
