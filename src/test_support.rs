// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! In-memory [`Hal`] fake used by this crate's own unit and integration
//! tests. Not part of the public API surface consumers drive a real
//! testboard through; it only records what was asked of it and plays back
//! pre-seeded responses.

use crate::error::Result;
use crate::hal::{BufferStatus, Hal};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct FakeHal {
    pub powered_on: bool,
    pub hub_id: Option<u8>,
    pub tbm_inits: Vec<(usize, HashMap<u8, u32>)>,
    pub roc_inits: Vec<(u8, u8, HashMap<u8, u32>)>,
    pub mask_all_calls: Vec<(Option<Vec<u8>>, bool)>,
    pub trims_pushed: u32,
    pub pg_programs: Vec<Vec<(u16, u8)>>,
    pub probe_selects: Vec<(String, u8)>,

    pub daq_cleared: u32,
    pub daq_started: bool,
    pub daq_stopped: bool,
    pub calibrate: bool,
    pub columns_enabled: bool,
    pub triggers: Vec<(u32, u32)>,
    pub trigger_loop_period: Option<u32>,

    /// Pre-seeded buffer status returned by the next `daq_status` call.
    pub status: BufferStatus,
    /// Pre-seeded raw buffer drained by `daq_get_raw_buffer`.
    pub raw_buffer: Vec<u8>,
    /// Pre-seeded raw event queue drained one at a time by `daq_get_raw_event`.
    pub raw_events: Vec<Vec<u8>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self {
            status: BufferStatus {
                filled: 0,
                capacity: 4096,
            },
            ..Default::default()
        }
    }
}

impl Hal for FakeHal {
    fn power_on(&mut self) -> Result<()> {
        self.powered_on = true;
        Ok(())
    }

    fn power_off(&mut self) -> Result<()> {
        self.powered_on = false;
        Ok(())
    }

    fn set_hub_id(&mut self, hub_id: u8) -> Result<()> {
        self.hub_id = Some(hub_id);
        Ok(())
    }

    fn tbm_init(&mut self, tbm_index: usize, dacs: &HashMap<u8, u32>) -> Result<()> {
        self.tbm_inits.push((tbm_index, dacs.clone()));
        Ok(())
    }

    fn roc_init(&mut self, i2c_address: u8, device_type: u8, dacs: &HashMap<u8, u32>) -> Result<()> {
        self.roc_inits.push((i2c_address, device_type, dacs.clone()));
        Ok(())
    }

    fn mask_all(&mut self, roc_addresses: Option<&[u8]>, trim: bool) -> Result<()> {
        self.mask_all_calls
            .push((roc_addresses.map(|a| a.to_vec()), trim));
        Ok(())
    }

    fn push_trims_to_nios(&mut self) -> Result<()> {
        self.trims_pushed += 1;
        Ok(())
    }

    fn program_pattern_generator(&mut self, entries: &[(u16, u8)]) -> Result<()> {
        self.pg_programs.push(entries.to_vec());
        Ok(())
    }

    fn select_probe(&mut self, probe: &str, code: u8) -> Result<()> {
        self.probe_selects.push((probe.to_string(), code));
        Ok(())
    }

    fn daq_clear(&mut self) -> Result<()> {
        self.daq_cleared += 1;
        self.raw_buffer.clear();
        self.raw_events.clear();
        self.status.filled = 0;
        Ok(())
    }

    fn daq_start(&mut self, _deser_phase: u8, _n_enabled_tbms: usize, capacity: usize) -> Result<()> {
        self.daq_started = true;
        self.daq_stopped = false;
        self.status.capacity = capacity;
        Ok(())
    }

    fn daq_stop(&mut self) -> Result<()> {
        self.daq_started = false;
        self.daq_stopped = true;
        Ok(())
    }

    fn daq_status(&mut self) -> Result<BufferStatus> {
        Ok(self.status)
    }

    fn daq_trigger(&mut self, n: u32, period: u32) -> Result<()> {
        self.triggers.push((n, period));
        Ok(())
    }

    fn daq_trigger_loop_start(&mut self, period: u32) -> Result<()> {
        self.trigger_loop_period = Some(period);
        Ok(())
    }

    fn daq_trigger_loop_halt(&mut self) -> Result<()> {
        self.trigger_loop_period = None;
        Ok(())
    }

    fn daq_get_raw_buffer(&mut self) -> Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.raw_buffer))
    }

    fn daq_get_raw_event(&mut self) -> Result<Option<Vec<u8>>> {
        if self.raw_events.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.raw_events.remove(0)))
        }
    }

    fn set_calibrate(&mut self, enable: bool) -> Result<()> {
        self.calibrate = enable;
        Ok(())
    }

    fn enable_all_columns(&mut self, enable: bool) -> Result<()> {
        self.columns_enabled = enable;
        Ok(())
    }
}
