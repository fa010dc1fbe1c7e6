//! # Kernel Configuration Constants
//!
//! Compile-time facts shared between the frame allocator and the paging
//! subsystem. Everything here is a plain constant: changing one (say, the
//! frame size) ripples into bitmap sizing, table fan-out, and the zone
//! layout, so the cross-checks at the bottom of [`memory`] keep the values
//! honest at compile time.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod memory;
