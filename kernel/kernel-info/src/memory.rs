//! # Physical Memory Layout
//!
//! The machine model is small and fixed: 32 MiB of physical memory, split
//! into a kernel zone and a process zone, with a 1 MiB memory-mapped I/O
//! hole that must never be handed out as RAM.

pub use kernel_memory_addresses::{FRAME_SHIFT, FRAME_SIZE};

/// Fan-out of the page directory and of each second-level page table.
pub const ENTRIES_PER_TABLE: usize = 1024;

/// Bytes of virtual address space covered by one second-level table.
pub const TABLE_SPAN: u32 = FRAME_SIZE * ENTRIES_PER_TABLE as u32; // 4 MiB

/// First frame of the kernel zone (physical 2 MiB).
pub const KERNEL_POOL_START_FRAME: u32 = (2 << 20) / FRAME_SIZE;

/// Number of frames in the kernel zone (2 MiB worth).
pub const KERNEL_POOL_FRAMES: u32 = (2 << 20) / FRAME_SIZE;

/// First frame of the process zone (physical 4 MiB).
pub const PROCESS_POOL_START_FRAME: u32 = (4 << 20) / FRAME_SIZE;

/// Number of frames in the process zone (28 MiB worth).
pub const PROCESS_POOL_FRAMES: u32 = (28 << 20) / FRAME_SIZE;

/// First frame of the memory-mapped I/O hole (physical 15 MiB).
pub const MEM_HOLE_START_FRAME: u32 = (15 << 20) / FRAME_SIZE;

/// Number of frames in the I/O hole (1 MiB worth).
pub const MEM_HOLE_FRAMES: u32 = (1 << 20) / FRAME_SIZE;

/// Bytes of low memory that every address space maps one-to-one
/// (kernel code, data, and the frame-pool bitmaps live here).
pub const SHARED_REGION_SIZE: u32 = 4 << 20;

/// Capacity of the frame-pool directory used for release routing.
pub const MAX_FRAME_POOLS: usize = 8;

/// Capacity of the per-address-space table of registered virtual
/// memory pools consulted during fault handling.
pub const MAX_REGISTERED_POOLS: usize = 16;

/// Capacity of a virtual memory pool's region descriptor table.
pub const MAX_REGIONS: usize = 32;

const _: () = {
    // Bitmap granularity: both zones must fill their state bytes exactly,
    // and each zone's 2-bit-per-frame bitmap must fit a single frame.
    assert!(KERNEL_POOL_FRAMES % 4 == 0);
    assert!(PROCESS_POOL_FRAMES % 4 == 0);
    assert!(KERNEL_POOL_FRAMES <= 4 * FRAME_SIZE);
    assert!(PROCESS_POOL_FRAMES <= 4 * FRAME_SIZE);

    // The zones are adjacent and the hole lies inside the process zone.
    assert!(KERNEL_POOL_START_FRAME + KERNEL_POOL_FRAMES == PROCESS_POOL_START_FRAME);
    assert!(MEM_HOLE_START_FRAME >= PROCESS_POOL_START_FRAME);
    assert!(
        MEM_HOLE_START_FRAME + MEM_HOLE_FRAMES <= PROCESS_POOL_START_FRAME + PROCESS_POOL_FRAMES
    );

    // The shared region must cover the kernel zone and split evenly into
    // second-level tables.
    assert!(SHARED_REGION_SIZE % TABLE_SPAN == 0);
    assert!(SHARED_REGION_SIZE >= (KERNEL_POOL_START_FRAME + KERNEL_POOL_FRAMES) * FRAME_SIZE);
};
