// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Loop expander ("The Loop", component C5, spec.md §4.5) — the heart of
//! the core. Selects one of four execution strategies based on DUT enable
//! state and caller flags, then assembles the per-trigger event stream.
//!
//! The four HAL entry points of spec.md §4.5 are modeled as an optional
//! four-operation capability object ([`Entries`]) rather than as member
//! function pointers (spec.md §9): a sweep that only needs `multi_roc`
//! doesn't have to fabricate a `pixel` implementation.

use crate::dut::Dut;
use crate::error::Result;
use crate::event::Event;
use crate::flags::{Flags, FORCE_SERIAL, FORCE_UNMASKED};
use crate::hal::Hal;
use crate::program;

/// The four optional HAL entry points a sweep can be driven through.
/// `P` is the caller's opaque sweep-parameter type (e.g. a DAC id + range).
pub struct Entries<'a, P> {
    pub pixel: Option<Box<dyn FnMut(u8, u8, u8, &P) -> Result<Vec<Event>> + 'a>>,
    pub multi_pixel: Option<Box<dyn FnMut(&[u8], u8, u8, &P) -> Result<Vec<Event>> + 'a>>,
    pub roc: Option<Box<dyn FnMut(u8, &P) -> Result<Vec<Event>> + 'a>>,
    pub multi_roc: Option<Box<dyn FnMut(&[u8], &P) -> Result<Vec<Event>> + 'a>>,
}

impl<'a, P> Default for Entries<'a, P> {
    fn default() -> Self {
        Self {
            pixel: None,
            multi_pixel: None,
            roc: None,
            multi_roc: None,
        }
    }
}

/// Outcome of a sweep: the concatenated event stream plus the
/// decoder-error count observed during this run (spec.md §4.5).
#[derive(Debug, Default)]
pub struct LoopResult {
    pub events: Vec<Event>,
    pub decoder_errors: u32,
}

fn trim_and_mask_roc(dut: &mut Dut, hal: &mut dyn Hal, i2c_address: u8) -> Result<()> {
    hal.push_trims_to_nios()?;
    for roc in dut.rocs.iter_mut().filter(|r| r.i2c_address == i2c_address) {
        roc.mask_all();
    }
    hal.mask_all(Some(&[i2c_address]), true)
}

/// Run one sweep. `params` is opaque to the loop expander; it is forwarded
/// verbatim to whichever HAL entry point is selected.
pub fn run_loop<P>(
    dut: &mut Dut,
    hal: &mut dyn Hal,
    entries: &mut Entries<P>,
    params: &P,
    flags: Flags,
) -> Result<LoopResult> {
    let unmasked = flags.contains(FORCE_UNMASKED);
    let serial = flags.contains(FORCE_SERIAL);

    // Mask discipline around the sweep (spec.md §4.5).
    if !unmasked {
        program::push_trims_to_nios(hal)?;
        program::mask_all(dut, hal, false)?;
    } else if !serial {
        program::push_trims_to_nios(hal)?;
    }
    // `unmasked && serial`: trimming is deferred to a per-ROC basis inside
    // the serial ROC-entry path below.

    let result = run_strategy(dut, hal, entries, params, flags)?;

    if !unmasked {
        program::mask_all(dut, hal, false)?;
    }

    Ok(result)
}

fn run_strategy<P>(
    dut: &mut Dut,
    hal: &mut dyn Hal,
    entries: &mut Entries<P>,
    params: &P,
    flags: Flags,
) -> Result<LoopResult> {
    let enabled_roc_count = dut.enabled_roc_count();
    let parallel_eligible = enabled_roc_count > 1 && !flags.contains(FORCE_SERIAL);
    let all_pixels_enabled = dut.all_pixels_enabled();

    let mut events = Vec::new();

    if parallel_eligible {
        if all_pixels_enabled && entries.multi_roc.is_some() {
            log::debug!("loop expander: multi-ROC strategy");
            let addresses = dut.enabled_roc_addresses();
            let call = entries.multi_roc.as_mut().unwrap();
            events.extend(call(&addresses, params)?);
        } else if let Some(call) = entries.multi_pixel.as_mut() {
            log::debug!("loop expander: multi-pixel (parallel) strategy");
            let addresses = dut.enabled_roc_addresses();
            // Caveat (spec.md §4.5/§9): assumes every enabled ROC shares the
            // enabled-pixel set of the *first* enabled ROC.
            let first_roc_pixels: Vec<(u8, u8)> = match dut.rocs.iter().find(|r| r.enable) {
                Some(roc) => roc.enabled_pixels().map(|p| p.coord()).collect(),
                None => Vec::new(),
            };
            for (col, row) in first_roc_pixels {
                events.extend(call(&addresses, col, row, params)?);
            }
        } else {
            log::error!("loop expander: no applicable parallel entry point, aborting sweep");
            return Ok(LoopResult::default());
        }
    } else {
        if all_pixels_enabled && entries.roc.is_some() {
            log::debug!("loop expander: serial ROC strategy");
            let addresses = dut.enabled_roc_addresses();
            for i2c_address in addresses {
                if flags.contains(FORCE_SERIAL) && flags.contains(FORCE_UNMASKED) {
                    trim_and_mask_roc(dut, hal, i2c_address)?;
                }
                let call = entries.roc.as_mut().unwrap();
                events.extend(call(i2c_address, params)?);
            }
        } else if let Some(call) = entries.pixel.as_mut() {
            log::debug!("loop expander: serial per-pixel strategy");
            let roc_pixels: Vec<(u8, Vec<(u8, u8)>)> = dut
                .enabled_rocs()
                .map(|roc| {
                    (
                        roc.i2c_address,
                        roc.enabled_pixels().map(|p| p.coord()).collect(),
                    )
                })
                .collect();
            for (i2c_address, pixels) in roc_pixels {
                for (col, row) in pixels {
                    events.extend(call(i2c_address, col, row, params)?);
                }
            }
        } else {
            log::error!("loop expander: no applicable serial entry point, aborting sweep");
            return Ok(LoopResult::default());
        }
    }

    let decoder_errors = events.iter().map(|e| e.num_decoder_errors).sum();
    Ok(LoopResult {
        events,
        decoder_errors,
    })
}
