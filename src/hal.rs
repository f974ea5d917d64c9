// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! The hardware-abstraction boundary this crate drives but does not
//! implement (spec.md §1, "Out of scope"; §9, "Dynamic dispatch via
//! member-function pointers").
//!
//! `Hal` is the capability interface for the testboard-level operations the
//! programmer (C4) and DAQ controller (C6) invoke: powering the board,
//! programming chips, and running the trigger/drain cycle. Every method is a
//! blocking call, matching the single-threaded cooperative model of
//! spec.md §5 — the HAL may run its own USB I/O thread internally, but never
//! exposes anything but synchronous entry points here.
//!
//! The per-sweep data-producing entry points (`pixel`/`multi-pixel`/
//! `ROC`/`multi-ROC` of spec.md §4.5) are intentionally *not* part of this
//! trait: [`crate::looper`] treats them as an optional four-operation
//! capability object supplied by the caller, so that a sweep that only uses
//! e.g. `multi-ROC` doesn't force a fake implementation of `pixel`.

use crate::error::Result;
use std::collections::HashMap;

/// Current trigger-buffer occupancy as reported by the testboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStatus {
    pub filled: usize,
    pub capacity: usize,
}

impl BufferStatus {
    pub fn fraction_full(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.filled as f64 / self.capacity as f64
        }
    }

    pub fn percent_full(&self) -> u32 {
        (100.0 * self.fraction_full()).floor() as u32
    }
}

/// Blocking operations exposed by the testboard HAL.
pub trait Hal {
    fn power_on(&mut self) -> Result<()>;
    fn power_off(&mut self) -> Result<()>;
    fn set_hub_id(&mut self, hub_id: u8) -> Result<()>;

    /// Initialize one TBM core with its register map.
    fn tbm_init(&mut self, tbm_index: usize, dacs: &HashMap<u8, u32>) -> Result<()>;
    /// Initialize one ROC with its i2c address, device type and DAC map.
    fn roc_init(&mut self, i2c_address: u8, device_type: u8, dacs: &HashMap<u8, u32>) -> Result<()>;

    /// Mask (and optionally load trims for) every pixel on the addressed
    /// ROC(s). `roc_addresses = None` means "every enabled ROC".
    fn mask_all(&mut self, roc_addresses: Option<&[u8]>, trim: bool) -> Result<()>;
    /// Upload the full per-pixel trim table to the testboard's soft core.
    fn push_trims_to_nios(&mut self) -> Result<()>;

    /// Program the pattern generator with a validated sequence.
    fn program_pattern_generator(&mut self, entries: &[(u16, u8)]) -> Result<()>;

    /// Select a probe signal (`d1`/`d2`/`a1`/`a2`) to the named mnemonic.
    fn select_probe(&mut self, probe: &str, code: u8) -> Result<()>;

    // -- DAQ (component C6) --------------------------------------------------

    fn daq_clear(&mut self) -> Result<()>;
    fn daq_start(&mut self, deser_phase: u8, n_enabled_tbms: usize, buffer_size: usize) -> Result<()>;
    fn daq_stop(&mut self) -> Result<()>;
    fn daq_status(&mut self) -> Result<BufferStatus>;
    fn daq_trigger(&mut self, n: u32, period: u32) -> Result<()>;
    fn daq_trigger_loop_start(&mut self, period: u32) -> Result<()>;
    fn daq_trigger_loop_halt(&mut self) -> Result<()>;

    /// Drain whatever raw bytes are currently sitting in the buffer.
    fn daq_get_raw_buffer(&mut self) -> Result<Vec<u8>>;
    /// Drain and decode one event at a time, returning `None` when empty.
    fn daq_get_raw_event(&mut self) -> Result<Option<Vec<u8>>>;

    fn set_calibrate(&mut self, enable: bool) -> Result<()>;
    fn enable_all_columns(&mut self, enable: bool) -> Result<()>;

    /// Stub: intended semantics unknown in the source this was distilled
    /// from (spec.md §9, Open Questions). Always returns -1.
    fn readback_value(&self) -> i32 {
        -1
    }
}
