//! The contiguous frame pool.

use crate::state::{self, FRAMES_PER_BYTE, FRAMES_PER_INFO_FRAME, FrameState};
use kernel_memory_addresses::{FRAME_SIZE, FrameNumber, PhysMapper};
use log::{debug, error};

/// Number of info frames needed to hold the bitmap for a pool of `n`
/// frames: one frame of bitmap describes [`FRAMES_PER_INFO_FRAME`] frames.
///
/// Pure sizing math for callers laying out a pool before construction.
///
/// ```rust
/// # use kernel_frames::{needed_info_frames, FRAMES_PER_INFO_FRAME};
/// assert_eq!(needed_info_frames(1), 1);
/// assert_eq!(needed_info_frames(FRAMES_PER_INFO_FRAME), 1);
/// assert_eq!(needed_info_frames(FRAMES_PER_INFO_FRAME + 1), 2);
/// ```
#[must_use]
pub const fn needed_info_frames(n: u32) -> u32 {
    n.div_ceil(FRAMES_PER_INFO_FRAME)
}

/// Failure value for [`FramePool::allocate`]: the request was empty or no
/// run of the requested length is free.
///
/// Exhaustion is the one recoverable allocator error — callers may retry
/// with a smaller request or surface it as a higher-level allocation
/// failure.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("no run of {requested} contiguous free frames")]
pub struct NoSpace {
    /// The run length that could not be satisfied.
    pub requested: u32,
}

/// Manages a contiguous range of physical frames belonging to one zone.
///
/// The per-frame state bitmap lives in a designated *info frame* of
/// physical memory, not in this struct; see the crate docs for the
/// two-bit encoding.
///
/// # Invariants
/// - `free_frames` always equals the number of frames whose state is
///   [`FrameState::Free`].
/// - Every maximal sequence of `ALLOCATED` frames is preceded by exactly
///   one `HEAD_OF_RUN` frame; runs never overlap.
/// - The bitmap occupies `frame_count / 4` bytes of the info frame and
///   never spills past it.
pub struct FramePool<'m, M: PhysMapper> {
    mapper: &'m M,
    /// First frame of the managed range.
    base_frame: FrameNumber,
    /// Number of frames in the managed range.
    frame_count: u32,
    /// Running tally of frames in state `FREE`.
    free_frames: u32,
    /// Frame holding the state bitmap.
    info_frame: FrameNumber,
}

impl<'m, M: PhysMapper> FramePool<'m, M> {
    /// Create a pool managing `frame_count` frames starting at `base_frame`.
    ///
    /// `frame_count` must be positive, a multiple of 4 (so the bitmap fills
    /// its bytes exactly), and small enough that the bitmap fits a single
    /// frame.
    ///
    /// When `info_frame` is `None` the pool stores its bitmap in its own
    /// first frame, which is immediately marked `HEAD_OF_RUN` and no longer
    /// counts as free. Otherwise the caller supplies an already-allocated
    /// frame (typically obtained from another pool) and the full range
    /// starts free.
    ///
    /// The pool is not yet reachable for release routing; see
    /// [`FramePoolRegistry::register`](crate::FramePoolRegistry::register).
    pub fn new(
        mapper: &'m M,
        base_frame: FrameNumber,
        frame_count: u32,
        info_frame: Option<FrameNumber>,
    ) -> Self {
        assert!(frame_count > 0, "empty frame pool");
        assert!(
            frame_count % FRAMES_PER_BYTE == 0,
            "frame count must be a multiple of {FRAMES_PER_BYTE}"
        );
        assert!(
            frame_count <= FRAMES_PER_INFO_FRAME,
            "state bitmap for {frame_count} frames does not fit one frame"
        );

        let mut pool = Self {
            mapper,
            base_frame,
            frame_count,
            free_frames: frame_count,
            info_frame: info_frame.unwrap_or(base_frame),
        };

        let used_bytes = (frame_count / FRAMES_PER_BYTE) as usize;
        pool.bitmap_mut()[..used_bytes].fill(0);

        if info_frame.is_none() {
            // The bitmap occupies the pool's own first frame.
            pool.set_state(0, FrameState::HeadOfRun);
            pool.free_frames -= 1;
        }

        debug!(
            "Frame pool initialized: frames {}..{}, bitmap in frame {}, {} free",
            base_frame,
            base_frame + frame_count,
            pool.info_frame,
            pool.free_frames
        );
        pool
    }

    /// Allocate a run of `n` contiguous frames.
    ///
    /// Scans the bitmap left to right and takes the **first** fit; no
    /// best-fit heuristics. The scan is linear in the pool size, which the
    /// one-frame bitmap bound keeps acceptable.
    ///
    /// On success the run's first frame is marked `HEAD_OF_RUN`, the rest
    /// `ALLOCATED`, and the head's absolute frame number is returned.
    ///
    /// # Errors
    /// [`NoSpace`] if `n` is zero, exceeds the free tally, or no run of
    /// `n` consecutive free frames exists. Nothing is mutated on failure.
    pub fn allocate(&mut self, n: u32) -> Result<FrameNumber, NoSpace> {
        if n == 0 || n > self.free_frames {
            return Err(NoSpace { requested: n });
        }

        let mut run_start = 0;
        let mut run_len = 0;
        for index in 0..self.frame_count {
            if self.state(index) == FrameState::Free {
                if run_len == 0 {
                    run_start = index;
                }
                run_len += 1;
                if run_len == n {
                    self.mark_run(run_start, n);
                    self.free_frames -= n;
                    let head = self.base_frame + run_start;
                    debug!("Allocated run of {n} frames at frame {head}");
                    return Ok(head);
                }
            } else {
                run_len = 0;
            }
        }

        Err(NoSpace { requested: n })
    }

    /// Mark the exact range `[first, first + n)` as one allocated run.
    ///
    /// Administrative variant of [`allocate`](Self::allocate) used to carve
    /// out known holes (e.g. a memory-mapped I/O gap) without searching.
    /// The range must lie fully inside the pool. **No availability check is
    /// performed** — the caller guarantees the range is currently free.
    pub fn reserve_exact(&mut self, first: FrameNumber, n: u32) {
        assert!(n > 0, "empty reservation");
        assert!(
            first >= self.base_frame
                && first.as_u32() + n <= self.base_frame.as_u32() + self.frame_count,
            "reservation {first}+{n} outside pool range"
        );

        let start = first.as_u32() - self.base_frame.as_u32();
        self.mark_run(start, n);
        self.free_frames -= n;
        debug!("Reserved {n} frames at frame {first}");
    }

    /// Release the run whose head is `head`; used by
    /// [`release_frames`](crate::release_frames) after routing.
    ///
    /// Clears the head, then walks forward clearing `ALLOCATED` frames
    /// until the next `FREE` or `HEAD_OF_RUN` boundary (which is left
    /// untouched). Returns the number of frames released.
    ///
    /// # Panics
    /// If `head` is not currently `HEAD_OF_RUN` — a double free or a bad
    /// argument. Continuing would corrupt the run bookkeeping, so this is
    /// fatal.
    pub(crate) fn release_run(&mut self, head: FrameNumber) -> u32 {
        let start = head.as_u32() - self.base_frame.as_u32();
        if self.state(start) != FrameState::HeadOfRun {
            error!("Frame {head} is not the head of an allocated run");
            panic!("release of frame {head} which is not a run head");
        }

        self.set_state(start, FrameState::Free);
        let mut released = 1;
        for index in start + 1..self.frame_count {
            if self.state(index) != FrameState::Allocated {
                break;
            }
            self.set_state(index, FrameState::Free);
            released += 1;
        }

        self.free_frames += released;
        debug!("Released run of {released} frames at frame {head}");
        released
    }

    /// Whether `frame` lies within this pool's managed range.
    #[must_use]
    pub fn contains(&self, frame: FrameNumber) -> bool {
        frame >= self.base_frame
            && frame.as_u32() < self.base_frame.as_u32() + self.frame_count
    }

    /// First frame of the managed range.
    #[must_use]
    pub const fn base_frame(&self) -> FrameNumber {
        self.base_frame
    }

    /// Number of frames in the managed range.
    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Current number of frames in state `FREE`.
    #[must_use]
    pub const fn free_frame_count(&self) -> u32 {
        self.free_frames
    }

    /// State of the frame at pool-relative `index`.
    pub(crate) fn state(&self, index: u32) -> FrameState {
        debug_assert!(index < self.frame_count);
        state::read(self.bitmap(), index)
    }

    fn set_state(&mut self, index: u32, new: FrameState) {
        debug_assert!(index < self.frame_count);
        state::write(self.bitmap_mut(), index, new);
    }

    /// Mark `[start, start + n)` (pool-relative) as a freshly allocated run.
    fn mark_run(&mut self, start: u32, n: u32) {
        self.set_state(start, FrameState::HeadOfRun);
        for index in start + 1..start + n {
            self.set_state(index, FrameState::Allocated);
        }
    }

    fn bitmap(&self) -> &[u8; FRAME_SIZE as usize] {
        // Safety: the info frame is reserved for this pool's bitmap for the
        // pool's whole lifetime; nobody else writes it.
        unsafe { self.mapper.phys_to_mut(self.info_frame.base()) }
    }

    fn bitmap_mut(&mut self) -> &mut [u8; FRAME_SIZE as usize] {
        // Safety: as for `bitmap`, plus `&mut self` rules out aliasing
        // within the pool itself.
        unsafe { self.mapper.phys_to_mut(self.info_frame.base()) }
    }
}
