//! Physical and virtual byte addresses.

use crate::FRAME_SIZE;
use core::ops::{Add, AddAssign};

/// A **physical** memory address (machine bus address).
///
/// Newtype over `u32` to prevent mixing with virtual addresses.
/// No alignment guarantees by itself.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysAddr(u32);

/// A **virtual** memory address (translated through the active paging
/// structures once paging is enabled).
///
/// Newtype over `u32` to prevent mixing with physical addresses.
/// No alignment guarantees by itself.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtAddr(u32);

impl PhysAddr {
    #[must_use]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Byte offset of this address within its frame.
    #[must_use]
    pub const fn frame_offset(self) -> u32 {
        self.0 & (FRAME_SIZE - 1)
    }
}

impl VirtAddr {
    #[must_use]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Byte offset of this address within its page.
    #[must_use]
    pub const fn page_offset(self) -> u32 {
        self.0 & (FRAME_SIZE - 1)
    }
}

impl Add<u32> for VirtAddr {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.checked_add(rhs).expect("VirtAddr add"))
    }
}

impl Add<u32> for PhysAddr {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.checked_add(rhs).expect("PhysAddr add"))
    }
}

impl AddAssign<u32> for VirtAddr {
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

impl AddAssign<u32> for PhysAddr {
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

impl From<u32> for PhysAddr {
    fn from(addr: u32) -> Self {
        Self(addr)
    }
}

impl From<u32> for VirtAddr {
    fn from(addr: u32) -> Self {
        Self(addr)
    }
}

impl core::fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl core::fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:08x} (Physical)", self.0)
    }
}

impl core::fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl core::fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:08x} (Virtual)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_masks_low_bits() {
        assert_eq!(VirtAddr::new(0x1234).page_offset(), 0x234);
        assert_eq!(VirtAddr::new(0x1000).page_offset(), 0);
        assert_eq!(PhysAddr::new(0xffff_ffff).frame_offset(), 0xfff);
    }

    #[test]
    fn add_is_checked() {
        let va = VirtAddr::new(0x1000) + 0x234;
        assert_eq!(va, VirtAddr::new(0x1234));
    }

    #[test]
    #[should_panic(expected = "VirtAddr add")]
    fn add_overflow_panics() {
        let _ = VirtAddr::new(0xffff_f000) + 0x2000;
    }
}
