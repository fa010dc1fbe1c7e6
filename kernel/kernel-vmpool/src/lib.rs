//! # Virtual Memory Pools
//!
//! A [`VMPool`] manages one window of a process's virtual address space
//! as a list of named **regions** — contiguous spans handed out by
//! [`VMPool::allocate`] and torn down by [`VMPool::release`]. No physical
//! memory backs a region up front; pages materialize one page fault at a
//! time, because the pool registers itself with its address space as an
//! [`AddressCheck`] and vouches for addresses inside its live regions.
//!
//! Region addresses are bump-allocated: each new region starts where the
//! previous one ends, and space freed by a release is reclaimed only
//! through the descriptor compaction that release performs — never reused
//! for later, differently-sized requests. The resulting fragmentation is
//! an accepted property of the design, not an oversight.
//!
//! Descriptor slot 0 always reserves the pool's own bookkeeping page at
//! the base address.
//!
//! [`AddressCheck`]: kernel_vmem::AddressCheck

#![cfg_attr(not(any(test, doctest)), no_std)]

mod pool;
#[cfg(test)]
mod testing;

pub use crate::pool::{RegionDescriptor, VMPool};
