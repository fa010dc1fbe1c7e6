//! # Contiguous Physical Frame Allocation
//!
//! A [`FramePool`] owns one contiguous range of physical frames (a zone,
//! e.g. "kernel" or "process") and hands out **runs** — contiguous
//! sequences of frames allocated by a single request.
//!
//! ## State bitmap
//!
//! Per-frame state is packed two bits per frame into a bitmap that lives
//! *inside* a physical frame (reached through [`PhysMapper`]), four frames
//! per byte:
//!
//! ```text
//! 00  FREE          available
//! 01  HEAD_OF_RUN   first frame of an allocated run
//! 11  ALLOCATED     continuation of a run
//! 10  (reserved)    never written; reading it means the bitmap is corrupt
//! ```
//!
//! A run is recorded as one `HEAD_OF_RUN` frame followed by `n - 1`
//! `ALLOCATED` frames. Releasing needs only the head's frame number: clear
//! the head, then walk forward clearing `ALLOCATED` frames until the next
//! `FREE` or `HEAD_OF_RUN` boundary.
//!
//! ## Release routing
//!
//! At release time callers usually know a bare frame number but not which
//! pool produced it. [`release_frames`] is therefore a free function over a
//! [`FramePoolRegistry`] — an ordered directory of all pools — that routes
//! the frame number to the pool whose range contains it.
//!
//! [`PhysMapper`]: kernel_memory_addresses::PhysMapper

#![cfg_attr(not(any(test, doctest)), no_std)]

mod pool;
mod registry;
mod state;
#[cfg(test)]
mod testing;

pub use crate::pool::{FramePool, NoSpace, needed_info_frames};
pub use crate::registry::{FramePoolRegistry, RegistryFull, release_frames};
pub use crate::state::{FRAMES_PER_INFO_FRAME, FrameState};
