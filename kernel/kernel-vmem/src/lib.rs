//! # Virtual Memory Support
//!
//! Two-level x86 (32-bit, non-PAE) paging with demand-paged leaf mappings.
//!
//! ## Virtual Address → Physical Address Walk
//!
//! Each 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```
//!
//! The CPU uses the two index fields to walk two levels of page tables,
//! each containing 1024 entries of 4 bytes:
//!
//! ```text
//!  Directory  →  Page Table  →  Physical Frame
//!    │             │
//!    │             └───► table entry maps one 4 KiB page
//!    └─────────────────► directory entry points to one page table
//! ```
//!
//! One directory covers 1024 × 4 MiB = the full 4 GiB address space; each
//! second-level table covers 4 MiB.
//!
//! ## The recursive self-map
//!
//! Directory slot 1023 points back at the directory itself. Through that
//! slot the hardware walk lands *in the paging structures*: the directory
//! becomes addressable at a fixed virtual address and every second-level
//! table at an address computed purely from its directory index — no
//! physical-pointer bookkeeping needed once paging is on. The alias
//! formulas live in [`page_table::directory_alias`] and
//! [`page_table::table_alias`] and are the *only* way the fault and
//! page-free paths reach tables on real hardware (via
//! [`RecursiveTables`]).
//!
//! ## Demand paging
//!
//! Address spaces start almost empty: besides the self-map, only the
//! low shared region (kernel code/data) is mapped at construction. Every
//! other mapping appears on first touch, in the page-fault handler:
//! the faulting address is checked against the registered virtual-memory
//! pools ([`AddressCheck`]), then a second-level table (if missing) and a
//! data frame are taken from the process frame pool and installed. Once
//! mapped, a page stays resident; there is no eviction.
//!
//! Frame allocation itself never re-enters the fault path: pool bitmaps
//! and paging structures live in always-resident frames by construction.
//!
//! The trap glue that decodes the CPU's fault frame and picks the current
//! address space lives with the interrupt plumbing, not here; it calls
//! [`AddressSpace::handle_fault`] with a captured [`FaultContext`].

#![cfg_attr(not(any(test, doctest)), no_std)]

mod active_tables;
mod address_space;
mod context;
mod fault;
mod hardware;
mod page_entry;
pub mod page_table;
#[cfg(test)]
mod testing;

pub use crate::active_tables::{ActiveTables, RecursiveTables};
pub use crate::address_space::{AddressCheck, AddressSpace, CheckerTableFull};
pub use crate::context::PagingContext;
pub use crate::fault::{FaultContext, FaultError, PageFaultErrorCode};
pub use crate::hardware::PagingHardware;
#[cfg(all(target_arch = "x86", target_os = "none"))]
pub use crate::hardware::X86PagingHardware;
pub use crate::page_entry::PageEntry;
pub use crate::page_table::{DirectoryIndex, PageDirectory, PageTable, TableIndex};
