//! The pool directory: release routing for bare frame numbers.

use crate::pool::FramePool;
use kernel_info::memory::MAX_FRAME_POOLS;
use kernel_memory_addresses::{FrameNumber, PhysMapper};
use kernel_sync::SpinLock;
use log::{debug, error};

/// The pool directory has a fixed number of slots; registering beyond
/// that is a boot-time configuration error.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("frame pool directory is full")]
pub struct RegistryFull;

/// One directory entry. The frame range is snapshotted at registration so
/// routing never has to take a pool's lock just to inspect its bounds.
struct Entry<'p, 'm, M: PhysMapper> {
    base: FrameNumber,
    count: u32,
    pool: &'p SpinLock<FramePool<'m, M>>,
}

impl<M: PhysMapper> Clone for Entry<'_, '_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: PhysMapper> Copy for Entry<'_, '_, M> {}

struct Entries<'p, 'm, M: PhysMapper> {
    slots: [Option<Entry<'p, 'm, M>>; MAX_FRAME_POOLS],
    len: usize,
}

/// Ordered directory of every frame pool in the system.
///
/// Pools do not own their registry entry and the registry does not own
/// the pools; it holds non-owning handles, kept sorted by base frame so
/// a bare frame number can be routed back to its owning pool. Written
/// only at pool construction time, read by [`release_frames`] — an
/// append-only structure under the single-writer-at-boot assumption.
pub struct FramePoolRegistry<'p, 'm, M: PhysMapper> {
    entries: SpinLock<Entries<'p, 'm, M>>,
}

impl<'p, 'm, M: PhysMapper> FramePoolRegistry<'p, 'm, M> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: SpinLock::new(Entries {
                slots: [const { None }; MAX_FRAME_POOLS],
                len: 0,
            }),
        }
    }

    /// Add a pool to the directory; call this right after constructing
    /// the pool, before any of its frames can escape to a releaser.
    ///
    /// Pool ranges must not overlap.
    ///
    /// # Errors
    /// [`RegistryFull`] once all [`MAX_FRAME_POOLS`] slots are taken.
    pub fn register(&self, pool: &'p SpinLock<FramePool<'m, M>>) -> Result<(), RegistryFull> {
        let (base, count) = {
            let pool = pool.lock();
            (pool.base_frame(), pool.frame_count())
        };

        let mut entries = self.entries.lock_irq();
        if entries.len == MAX_FRAME_POOLS {
            error!("Cannot register frame pool at frame {base}: directory is full");
            return Err(RegistryFull);
        }

        // Keep the directory sorted by base frame.
        let position = entries.slots[..entries.len]
            .iter()
            .flatten()
            .position(|entry| entry.base > base)
            .unwrap_or(entries.len);

        if position > 0 {
            let previous = entries.slots[position - 1].as_ref().unwrap();
            assert!(
                previous.base.as_u32() + previous.count <= base.as_u32(),
                "frame pool ranges overlap"
            );
        }
        if position < entries.len {
            let next = entries.slots[position].as_ref().unwrap();
            assert!(
                base.as_u32() + count <= next.base.as_u32(),
                "frame pool ranges overlap"
            );
        }

        for index in (position..entries.len).rev() {
            entries.slots[index + 1] = entries.slots[index];
        }
        entries.slots[position] = Some(Entry { base, count, pool });
        entries.len += 1;

        debug!("Registered frame pool: frames {base}..{}", base + count);
        Ok(())
    }

    /// Number of registered pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.entries.lock().len
    }

    /// The pool whose range contains `frame`, if any.
    fn owner_of(&self, frame: FrameNumber) -> Option<&'p SpinLock<FramePool<'m, M>>> {
        let entries = self.entries.lock_irq();
        entries.slots[..entries.len]
            .iter()
            .flatten()
            .find(|entry| {
                frame >= entry.base && frame.as_u32() < entry.base.as_u32() + entry.count
            })
            .map(|entry| entry.pool)
    }
}

impl<M: PhysMapper> Default for FramePoolRegistry<'_, '_, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Release the run headed by `first_frame`, whichever pool it came from.
///
/// Callers typically know only a frame number at release time, not the
/// pool that produced it, so this is a free function over the pool
/// directory rather than a method on a pool.
///
/// Returns the number of frames released.
///
/// # Panics
/// If no registered pool contains `first_frame`, or if `first_frame` is
/// not the head of an allocated run — both are double-free/bad-argument
/// class errors that would corrupt the bitmap invariants if ignored.
pub fn release_frames<M: PhysMapper>(
    registry: &FramePoolRegistry<'_, '_, M>,
    first_frame: FrameNumber,
) -> u32 {
    let Some(pool) = registry.owner_of(first_frame) else {
        error!("Frame {first_frame} belongs to no registered pool");
        panic!("release of frame {first_frame} outside every registered pool");
    };
    pool.lock_irq().release_run(first_frame)
}
