// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! The in-memory DUT (device-under-test) model (component C2, spec.md §3).

use crate::dict;
use crate::pixel::PixelConfig;
use crate::roc::RocConfig;
use crate::tbm::TbmConfig;
use std::collections::HashMap;

/// One pattern-generator entry: a signal word and the delay (in clock
/// cycles) before the next entry fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PgEntry {
    pub pattern_word: u16,
    pub delay: u8,
}

/// Power-supply settings recognised by [`crate::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSettings {
    pub va: f64,
    pub vd: f64,
    pub ia: f64,
    pub id: f64,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            va: 2.5,
            vd: 3.0,
            ia: 3.0,
            id: 3.0,
        }
    }
}

/// The full in-memory model of the device under test.
#[derive(Debug, Clone)]
pub struct Dut {
    pub hub_id: u8,
    sig_delays: HashMap<u8, u8>,
    pub pg_setup: Vec<PgEntry>,
    pub pg_sum: u32,
    pub power: PowerSettings,
    pub tbms: Vec<TbmConfig>,
    pub rocs: Vec<RocConfig>,
    pub initialized: bool,
    pub programmed: bool,
}

impl Default for Dut {
    fn default() -> Self {
        Self {
            hub_id: 0,
            sig_delays: HashMap::new(),
            pg_setup: Vec::new(),
            pg_sum: 0,
            power: PowerSettings::default(),
            tbms: Vec::new(),
            rocs: Vec::new(),
            initialized: false,
            programmed: false,
        }
    }
}

impl Dut {
    pub fn new() -> Self {
        Self::default()
    }

    // -- pure query operations (spec.md §4.2) -------------------------------

    /// Enabled ROCs, in model order.
    pub fn enabled_rocs(&self) -> impl Iterator<Item = &RocConfig> {
        self.rocs.iter().filter(|r| r.enable)
    }

    /// i2c addresses of enabled ROCs, in model order.
    pub fn enabled_roc_addresses(&self) -> Vec<u8> {
        self.enabled_rocs().map(|r| r.i2c_address).collect()
    }

    /// Enabled TBM cores, in model order.
    pub fn enabled_tbms(&self) -> impl Iterator<Item = &TbmConfig> {
        self.tbms.iter().filter(|t| t.enable)
    }

    /// Enabled pixels of the ROC at `roc_index`, or an empty slice if the
    /// index is out of range.
    pub fn enabled_pixels(&self, roc_index: usize) -> Vec<&PixelConfig> {
        match self.rocs.get(roc_index) {
            Some(roc) => roc.enabled_pixels().collect(),
            None => Vec::new(),
        }
    }

    /// Current value of DAC `name` on ROC `roc_index`, if both resolve.
    pub fn dac_value(&self, roc_index: usize, name: &str) -> Option<u32> {
        let entry = dict::ROC_DAC.lookup(name)?;
        self.rocs.get(roc_index)?.dac(entry.id)
    }

    /// Total number of masked pixels across all ROCs.
    pub fn masked_pixel_count(&self) -> usize {
        self.rocs.iter().map(|r| r.masked_pixel_count()).sum()
    }

    /// True iff every pixel on every ROC is enabled.
    pub fn all_pixels_enabled(&self) -> bool {
        self.rocs.iter().all(|r| r.all_pixels_enabled())
    }

    /// Number of enabled ROCs.
    pub fn enabled_roc_count(&self) -> usize {
        self.enabled_rocs().count()
    }

    // -- signal-delay access (validated via crate::validate) -----------------

    pub(crate) fn set_sig_delay(&mut self, id: u8, value: u8) {
        self.sig_delays.insert(id, value);
    }

    pub fn sig_delay(&self, id: u8) -> Option<u8> {
        self.sig_delays.get(&id).copied()
    }

    /// Power off: clears `programmed` but preserves the rest of the model
    /// (spec.md §3, Lifecycle).
    pub fn power_off(&mut self) {
        self.programmed = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn roc(i2c: u8, enable: bool) -> RocConfig {
        RocConfig::new(0, i2c, enable)
    }

    #[test]
    fn enabled_roc_addresses_skip_disabled() {
        let mut dut = Dut::new();
        dut.rocs.push(roc(0, true));
        dut.rocs.push(roc(1, false));
        dut.rocs.push(roc(2, true));
        assert_eq!(dut.enabled_roc_addresses(), vec![0, 2]);
    }

    #[test]
    fn power_off_preserves_model_but_clears_programmed() {
        let mut dut = Dut::new();
        dut.rocs.push(roc(0, true));
        dut.programmed = true;
        dut.power_off();
        assert!(!dut.programmed);
        assert_eq!(dut.rocs.len(), 1);
    }

    #[test]
    fn default_power_settings_match_spec() {
        let power = PowerSettings::default();
        assert_eq!(power.va, 2.5);
        assert_eq!(power.vd, 3.0);
        assert_eq!(power.ia, 3.0);
        assert_eq!(power.id, 3.0);
    }
}
