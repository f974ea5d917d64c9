// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! TBM (token-bit manager) configuration and alpha/beta core-register
//! encoding (component C2, spec.md §3/§6).

use packed_struct::prelude::*;
use std::collections::HashMap;

/// High-nibble core selector for the alpha core.
pub const ALPHA_CORE: u8 = 0xE0;
/// High-nibble core selector for the beta core.
pub const BETA_CORE: u8 = 0xF0;
/// Bit that distinguishes alpha (clear) from beta (set) in a register byte.
const CORE_SELECT_BIT: u8 = 0x10;

/// Wire layout of a TBM register byte: bits [7:5] are the fixed `0b111`
/// prefix shared by both cores, bit 4 selects alpha/beta, bits [3:0] are
/// the base register id (spec.md §6).
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq)]
#[packed_struct(size_bytes = "1", bit_numbering = "lsb0")]
struct RegisterByte {
    #[packed_field(bits = "0:3")]
    base: Integer<u8, packed_bits::Bits4>,
    #[packed_field(bits = "4")]
    beta: bool,
    #[packed_field(bits = "5:7")]
    prefix: Integer<u8, packed_bits::Bits3>,
}

/// Encode a full TBM register byte from a core selector and a base register
/// id (low nibble).
pub fn encode_register(core: u8, base: u8) -> u8 {
    let byte = RegisterByte {
        base: (base & 0x0f).into(),
        beta: core & CORE_SELECT_BIT != 0,
        prefix: 0b111.into(),
    };
    byte.pack()[0]
}

/// Flip the core-select bit of a register byte, turning an alpha register
/// into the corresponding beta register and vice versa.
pub fn flip_core(register: u8) -> u8 {
    let mut byte = RegisterByte::unpack(&[register]).expect("1-byte packed struct cannot fail to unpack");
    byte.beta = !byte.beta;
    byte.pack()[0]
}

/// Configuration of one TBM core (alpha or beta). A physical TBM chip is
/// always represented by two consecutive `TbmConfig` entries in
/// [`crate::dut::Dut::tbms`] (spec.md §3).
#[derive(Debug, Clone)]
pub struct TbmConfig {
    pub device_type: u8,
    pub enable: bool,
    dacs: HashMap<u8, u32>,
}

impl TbmConfig {
    pub fn new(device_type: u8, enable: bool) -> Self {
        Self {
            device_type,
            enable,
            dacs: HashMap::new(),
        }
    }

    /// Build a core config directly from a map of register-byte -> value.
    pub fn from_registers(device_type: u8, enable: bool, dacs: HashMap<u8, u32>) -> Self {
        Self {
            device_type,
            enable,
            dacs,
        }
    }

    pub fn set_register(&mut self, register: u8, value: u32) {
        self.dacs.insert(register, value);
    }

    pub fn register(&self, register: u8) -> Option<u32> {
        self.dacs.get(&register).copied()
    }

    pub fn registers(&self) -> &HashMap<u8, u32> {
        &self.dacs
    }

    /// Synthesize the other core's config by flipping bit 4 of every
    /// register id and copying the values (spec.md §3: "If only one core
    /// config is provided, the second is synthesised by flipping bit 4 of
    /// each register id and copying values").
    pub fn synthesize_other_core(&self) -> Self {
        let dacs = self
            .dacs
            .iter()
            .map(|(&reg, &value)| (flip_core(reg), value))
            .collect();
        Self {
            device_type: self.device_type,
            enable: self.enable,
            dacs,
        }
    }
}
