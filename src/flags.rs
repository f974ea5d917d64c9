// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Loop-expander flags word (spec.md §4.5, §6). A plain bit-set over `u16`
//! so that vendor-specific flags the caller may pass through (spec.md §6)
//! are preserved rather than rejected.

/// Prohibit multi-ROC HAL calls; iterate ROCs one by one.
pub const FORCE_SERIAL: u16 = 0x0001;
/// Do not mask pixels outside the swept set.
pub const FORCE_UNMASKED: u16 = 0x0002;
/// Enforce that incoming pixels appear in column-major raster order.
pub const CHECK_ORDER: u16 = 0x0004;
/// Suppress the final sort of repacked results.
pub const NOSORT: u16 = 0x0008;
/// Threshold extraction iterates DAC values low->high instead of high->low.
pub const RISING_EDGE: u16 = 0x0010;

/// A loop-expander flags word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(pub u16);

impl Flags {
    pub fn none() -> Self {
        Flags(0)
    }

    pub fn contains(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    pub fn with(self, bit: u16) -> Self {
        Flags(self.0 | bit)
    }
}

impl From<u16> for Flags {
    fn from(bits: u16) -> Self {
        Flags(bits)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contains_checks_individual_bits() {
        let flags = Flags::none().with(FORCE_SERIAL).with(NOSORT);
        assert!(flags.contains(FORCE_SERIAL));
        assert!(flags.contains(NOSORT));
        assert!(!flags.contains(CHECK_ORDER));
    }

    #[test]
    fn vendor_bits_pass_through_unexamined() {
        let vendor_bit = 0x8000;
        let flags = Flags::none().with(vendor_bit);
        assert!(flags.contains(vendor_bit));
    }
}
