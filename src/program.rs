// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Programmer (component C4, spec.md §4.4): flushes validated DUT state to
//! the HAL.

use crate::dut::Dut;
use crate::error::Result;
use crate::hal::Hal;

/// Power on the testboard, set the hub id, initialize every enabled TBM and
/// ROC from the model, then mask every pixel (baseline safe state).
///
/// On success, `dut.programmed` is set to `true`. The model survives a
/// subsequent power cycle; calling this again re-runs the same sequence
/// (spec.md §3, Lifecycle).
pub fn program_dut(dut: &mut Dut, hal: &mut dyn Hal) -> Result<()> {
    hal.power_on()?;
    hal.set_hub_id(dut.hub_id)?;

    for (index, tbm) in dut.tbms.iter().enumerate() {
        if tbm.enable {
            hal.tbm_init(index, tbm.registers())?;
        }
    }

    for roc in dut.enabled_rocs() {
        hal.roc_init(roc.i2c_address, roc.device_type, registers_of(roc))?;
    }

    mask_all(dut, hal, true)?;
    dut.programmed = true;
    Ok(())
}

/// Helper: the ROC's DAC map isn't public as a reference-friendly type in
/// [`crate::roc::RocConfig`]'s public API, so the programmer reconstructs it
/// here from the register entries it already validated.
fn registers_of(roc: &crate::roc::RocConfig) -> &std::collections::HashMap<u8, u32> {
    roc.dac_map()
}

/// Drop/load masks (and trims, if `trim`) for every enabled ROC.
pub fn mask_all(dut: &mut Dut, hal: &mut dyn Hal, trim: bool) -> Result<()> {
    let addresses = dut.enabled_roc_addresses();
    for roc in dut.rocs.iter_mut().filter(|r| r.enable) {
        roc.mask_all();
    }
    hal.mask_all(Some(&addresses), trim)
}

/// Upload the full trim table to the testboard's soft core so firmware-side
/// parallel routines can run without per-pixel round-trips.
pub fn push_trims_to_nios(hal: &mut dyn Hal) -> Result<()> {
    hal.push_trims_to_nios()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::FakeHal;
    use crate::validate::{self, RocInput, TbmInput};

    fn sample_dut() -> Dut {
        let mut dut = Dut::new();
        let rocs = vec![RocInput {
            device_type: "psi46digv21".into(),
            enable: true,
            dacs: vec![("vana".into(), 120)],
            pixels: vec![],
        }];
        let tbms = vec![TbmInput {
            device_type: "tbm08".into(),
            enable: true,
            registers: vec![("base0".into(), 1)],
        }];
        validate::init_dut(&mut dut, rocs, tbms).unwrap();
        dut
    }

    #[test]
    fn program_dut_sets_programmed_flag() {
        let mut dut = sample_dut();
        let mut hal = FakeHal::new();
        program_dut(&mut dut, &mut hal).unwrap();
        assert!(dut.programmed);
        assert!(hal.powered_on);
        assert_eq!(hal.roc_inits.len(), 1);
        assert_eq!(hal.tbm_inits.len(), 1);
    }

    #[test]
    fn power_off_then_on_reprograms_from_preserved_model() {
        let mut dut = sample_dut();
        let mut hal = FakeHal::new();
        program_dut(&mut dut, &mut hal).unwrap();
        dut.power_off();
        assert!(!dut.programmed);
        assert_eq!(dut.rocs.len(), 1, "model must survive power-off");

        program_dut(&mut dut, &mut hal).unwrap();
        assert!(dut.programmed);
        assert_eq!(hal.roc_inits.len(), 2, "re-program re-runs roc_init");
    }
}
