// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! DAQ controller (component C6, spec.md §4.6): an Idle/Running lifecycle
//! around the testboard's trigger buffer.

use crate::dut::Dut;
use crate::error::{Error, ErrorKind, Result};
use crate::event::{decode_event, Event};
use crate::hal::Hal;
use crate::program;

/// Depth of the testboard's trigger buffer this controller programs into
/// the HAL at `start()` (spec.md §4.6, "ambient" sizing not given by the
/// distilled spec).
pub const DAQ_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
}

/// Result of a [`DaqController::status`] poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    /// `false` once the run should be stopped: either it is not running, or
    /// the buffer has crossed the 90% mark (spec.md §4.6).
    pub ok: bool,
    pub percent_full: u32,
}

/// Idle/Running controller over one DAQ run.
#[derive(Debug)]
pub struct DaqController {
    state: State,
}

impl Default for DaqController {
    fn default() -> Self {
        Self { state: State::Idle }
    }
}

impl DaqController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Clear the buffer, re-apply the baseline-safe mask/trim state, arm
    /// calibrate injection and open all columns, then start the testboard's
    /// trigger engine. Fails if a run is already in progress.
    pub fn start(&mut self, dut: &mut Dut, hal: &mut dyn Hal, deser_phase: u8) -> Result<()> {
        if self.state == State::Running {
            return Err(Error::from(ErrorKind::Dut(
                "DAQ run already in progress".into(),
            )));
        }

        hal.daq_clear()?;
        program::push_trims_to_nios(hal)?;
        program::mask_all(dut, hal, true)?;
        hal.set_calibrate(true)?;
        hal.enable_all_columns(true)?;

        let n_tbms = dut.enabled_tbms().count();
        hal.daq_start(deser_phase, n_tbms, DAQ_BUFFER_SIZE)?;
        self.state = State::Running;
        Ok(())
    }

    /// Stop the run: halt the testboard, restore the baseline-safe mask
    /// state, and disarm calibrate injection and the probed columns.
    pub fn stop(&mut self, dut: &mut Dut, hal: &mut dyn Hal) -> Result<()> {
        if self.state != State::Running {
            return Err(Error::from(ErrorKind::Dut("DAQ is not running".into())));
        }
        hal.daq_stop()?;
        program::mask_all(dut, hal, false)?;
        hal.set_calibrate(false)?;
        hal.enable_all_columns(false)?;
        self.state = State::Idle;
        Ok(())
    }

    /// Poll the trigger-buffer occupancy. Logs a warning and reports
    /// `ok = false` once occupancy crosses 90%, signalling the caller to
    /// stop the run before it overflows.
    pub fn status(&self, hal: &mut dyn Hal) -> Result<StatusReport> {
        if self.state != State::Running {
            return Ok(StatusReport {
                ok: false,
                percent_full: 0,
            });
        }
        let buffer = hal.daq_status()?;
        let percent_full = buffer.percent_full();
        if buffer.fraction_full() > 0.9 {
            log::warn!(
                "DAQ buffer at {}% capacity, imminent overflow",
                percent_full
            );
            return Ok(StatusReport {
                ok: false,
                percent_full,
            });
        }
        Ok(StatusReport {
            ok: true,
            percent_full,
        })
    }

    /// Fire `n` triggers spaced `period` clock cycles apart. `period` is
    /// raised to the pattern generator's cycle length if given shorter
    /// (spec.md §4.6); the effective period actually used is returned.
    /// Returns `None` without triggering if the controller is not running
    /// or the buffer is past the 90% mark.
    pub fn trigger(
        &self,
        hal: &mut dyn Hal,
        dut: &Dut,
        n: u32,
        period: u32,
    ) -> Result<Option<u32>> {
        if !self.status(hal)?.ok {
            return Ok(None);
        }
        let effective = clamp_to_pg_sum(dut, period);
        hal.daq_trigger(n, effective)?;
        Ok(Some(effective))
    }

    /// Start a free-running trigger generator at `period` (clamped as in
    /// [`Self::trigger`]). Returns the effective period, or `None` if not
    /// running.
    pub fn trigger_loop_start(&self, hal: &mut dyn Hal, dut: &Dut, period: u32) -> Result<Option<u32>> {
        if !self.status(hal)?.ok {
            return Ok(None);
        }
        let effective = clamp_to_pg_sum(dut, period);
        hal.daq_trigger_loop_start(effective)?;
        Ok(Some(effective))
    }

    pub fn trigger_loop_halt(&self, hal: &mut dyn Hal) -> Result<()> {
        hal.daq_trigger_loop_halt()
    }

    /// Drain the whole buffer as raw bytes, without decoding.
    pub fn get_raw_buffer(&self, hal: &mut dyn Hal) -> Result<Vec<u8>> {
        hal.daq_get_raw_buffer()
    }

    /// Drain one undecoded event frame, or `None` if the buffer is empty.
    pub fn get_raw_event(&self, hal: &mut dyn Hal) -> Result<Option<Vec<u8>>> {
        hal.daq_get_raw_event()
    }

    /// Drain and decode one event, or `None` if the buffer is empty.
    pub fn get_event(&self, hal: &mut dyn Hal) -> Result<Option<Event>> {
        Ok(hal.daq_get_raw_event()?.map(|raw| decode_event(&raw)))
    }

    /// Drain every raw event frame currently buffered, undecoded.
    pub fn get_raw_event_buffer(&self, hal: &mut dyn Hal) -> Result<Vec<Vec<u8>>> {
        let mut out = Vec::new();
        while let Some(raw) = hal.daq_get_raw_event()? {
            out.push(raw);
        }
        Ok(out)
    }

    /// Drain and decode every event currently buffered.
    pub fn get_event_buffer(&self, hal: &mut dyn Hal) -> Result<Vec<Event>> {
        let mut out = Vec::new();
        while let Some(raw) = hal.daq_get_raw_event()? {
            out.push(decode_event(&raw));
        }
        Ok(out)
    }
}

fn clamp_to_pg_sum(dut: &Dut, period: u32) -> u32 {
    if period < dut.pg_sum {
        log::warn!(
            "trigger period {} shorter than pattern generator cycle {}, raising",
            period,
            dut.pg_sum
        );
        dut.pg_sum
    } else {
        period
    }
}
