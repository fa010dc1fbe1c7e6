//! # Kernel Synchronization Primitives
//!
//! A [`SpinLock`] and an interrupt-masking guard ([`irq::IrqGuard`]).
//!
//! The memory subsystems run in a single execution context; the only
//! preemption source is a hardware interrupt. Short critical sections
//! (bitmap scans, page-table edits, registry updates) therefore pair the
//! spin lock with interrupt masking via [`SpinLock::lock_irq`].

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod irq;
mod spin_lock;

pub use crate::spin_lock::{SpinLock, SpinLockGuard};
