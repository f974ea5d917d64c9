// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Process-wide name->code dictionaries (component C1).
//!
//! Each dictionary is an immutable value table built once (`lazy_static`) and
//! looked up case-insensitively. A `RegisterDict` additionally carries the
//! maximum permitted value ("size") of each register so callers can tell
//! "unknown name" (lookup returns `None`) from "known name, value out of
//! range" (lookup succeeds, caller must clamp).

use lazy_static::lazy_static;
use std::collections::HashMap;

/// A single register: its numeric id and the maximum value it may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterEntry {
    pub id: u8,
    pub size: u32,
}

/// Case-insensitive name -> register lookup table.
pub struct RegisterDict {
    entries: HashMap<&'static str, RegisterEntry>,
}

impl RegisterDict {
    fn new(pairs: &[(&'static str, u8, u32)]) -> Self {
        let mut entries = HashMap::with_capacity(pairs.len());
        for (name, id, size) in pairs {
            entries.insert(*name, RegisterEntry { id: *id, size: *size });
        }
        Self { entries }
    }

    /// Look up a register by name, case-insensitively. Returns `None` if the
    /// name is not known to this dictionary.
    pub fn lookup(&self, name: &str) -> Option<RegisterEntry> {
        let lower = name.to_lowercase();
        self.entries.get(lower.as_str()).copied()
    }

    pub fn name_of(&self, id: u8) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.id == id)
            .map(|(name, _)| *name)
    }
}

/// Case-insensitive name -> bitmask table, used for pattern-generator and
/// probe signal mnemonics that can be OR-combined.
pub struct SignalDict {
    entries: HashMap<&'static str, u16>,
}

impl SignalDict {
    fn new(pairs: &[(&'static str, u16)]) -> Self {
        let mut entries = HashMap::with_capacity(pairs.len());
        for (name, bit) in pairs {
            entries.insert(*name, *bit);
        }
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<u16> {
        let lower = name.to_lowercase();
        self.entries.get(lower.as_str()).copied()
    }

    /// Split `spec` on `;`, look up each token and OR the results together.
    /// Returns `None` (unknown name) if any token fails to resolve.
    pub fn lookup_combined(&self, spec: &str) -> Option<u16> {
        let mut combined = 0u16;
        for token in spec.split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            combined |= self.lookup(token)?;
        }
        Some(combined)
    }
}

/// Case-insensitive name -> device-type code table.
pub struct DeviceTypeDict {
    entries: HashMap<&'static str, u8>,
}

impl DeviceTypeDict {
    fn new(pairs: &[(&'static str, u8)]) -> Self {
        let mut entries = HashMap::with_capacity(pairs.len());
        for (name, code) in pairs {
            entries.insert(*name, *code);
        }
        Self { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<u8> {
        let lower = name.to_lowercase();
        self.entries.get(lower.as_str()).copied()
    }
}

lazy_static! {
    /// ROC DAC name -> (register id, max value) table.
    pub static ref ROC_DAC: RegisterDict = RegisterDict::new(&[
        ("vdig", 0x01, 255),
        ("vana", 0x02, 255),
        ("vsh", 0x03, 255),
        ("vcomp", 0x04, 255),
        ("vwllpr", 0x05, 255),
        ("vwllsh", 0x06, 255),
        ("vhlddel", 0x07, 255),
        ("vtrim", 0x08, 255),
        ("vthrcomp", 0x09, 255),
        ("vibias_bus", 0x0a, 255),
        ("phoffset", 0x0b, 255),
        ("vcomp_adc", 0x0c, 255),
        ("phscale", 0x0d, 255),
        ("vicolor", 0x0e, 255),
        ("vcal", 0x0f, 255),
        ("caldel", 0x10, 255),
        ("ctrlreg", 0x11, 255),
        ("wbc", 0x12, 255),
    ]);

    /// TBM base-register name -> (base id [0,15], max value) table. The core
    /// selector (alpha/beta high nibble) is applied separately (see
    /// [`crate::tbm`]).
    pub static ref TBM_REG: RegisterDict = RegisterDict::new(&[
        ("base0", 0x0, 255),
        ("base1", 0x1, 255),
        ("base2", 0x2, 255),
        ("base4", 0x4, 255),
        ("base8", 0x8, 255),
        ("basea", 0xa, 255),
        ("basec", 0xc, 255),
        ("basee", 0xe, 255),
    ]);

    /// DTB delay-signal name -> (id, max delay in clock cycles) table.
    pub static ref DTB_DELAY: RegisterDict = RegisterDict::new(&[
        ("clk", 0x00, 20),
        ("ctr", 0x01, 20),
        ("sda", 0x02, 20),
        ("tin", 0x03, 20),
        ("deser160phase", 0x04, 7),
        ("level", 0x05, 4),
        ("triggerlatency", 0x06, 255),
        ("tindelay", 0x07, 20),
        ("toutdelay", 0x08, 20),
    ]);

    /// Pattern-generator signal mnemonic -> bit mask.
    pub static ref PG_SIGNAL: SignalDict = SignalDict::new(&[
        ("none", 0x0000),
        ("resetroc", 0x0001),
        ("resettbm", 0x0002),
        ("cal", 0x0004),
        ("trg", 0x0008),
        ("tok", 0x0010),
        ("sync", 0x0020),
        ("calxy", 0x0040),
        ("rescalfor", 0x0080),
    ]);

    /// Digital-probe signal mnemonic -> code.
    pub static ref PROBE_DIGITAL: SignalDict = SignalDict::new(&[
        ("off", 0),
        ("clk", 1),
        ("sda", 2),
        ("ctr", 3),
        ("tin", 4),
        ("tout", 5),
        ("trigger", 6),
    ]);

    /// Analog-probe signal mnemonic -> code.
    pub static ref PROBE_ANALOG: SignalDict = SignalDict::new(&[
        ("off", 0),
        ("vana", 1),
        ("vthrcomp", 2),
        ("ctrlreg", 3),
        ("vcal", 4),
    ]);

    /// Device-type string -> device code, shared between ROC and TBM configs.
    pub static ref DEVICE_TYPE: DeviceTypeDict = DeviceTypeDict::new(&[
        ("psi46digv2", 0),
        ("psi46digv2_1", 1),
        ("psi46digv21", 2),
        ("psi46digv21respin", 3),
        ("tbm08", 4),
        ("tbm09", 5),
        ("tbm09c", 6),
        ("tbm10c", 7),
    ]);
}
