// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Test orchestration and data-pipeline core for a hybrid-pixel-detector
//! test framework: DUT configuration and validation, HAL-driven
//! programming, sweep expansion, DAQ control, and event reduction.
//!
//! This crate is the driver of a testboard, not the testboard driver
//! itself: [`hal::Hal`] is the boundary a concrete USB/FPGA backend
//! implements; everything above it — dictionaries, the DUT model,
//! validation, programming, the loop expander, the DAQ controller, the
//! condenser and the repacker — lives here and is backend-agnostic.

pub mod condense;
pub mod daq;
pub mod dict;
pub mod dut;
pub mod error;
pub mod event;
pub mod flags;
pub mod hal;
pub mod looper;
pub mod pixel;
pub mod program;
pub mod repack;
pub mod roc;
pub mod tbm;
pub mod validate;

#[cfg(test)]
pub mod test_support;

pub use dut::Dut;
pub use error::{Error, ErrorKind, Result};
pub use event::{Event, Pixel};
pub use hal::Hal;

/// End-to-end exercise of the full pipeline: validate a small DUT, program
/// it onto a fake HAL, run a one-register DAC sweep through the loop
/// expander, condense the resulting per-trigger bursts, and repack them
/// into a DAC scan (spec.md §2, "Data flow").
#[cfg(test)]
mod sweep_test {
    use crate::condense::{condense_triggers, CondenseMode};
    use crate::dut::Dut;
    use crate::event::{Event, Pixel};
    use crate::flags::Flags;
    use crate::looper::{run_loop, Entries};
    use crate::program;
    use crate::repack::repack_dac_scan;
    use crate::test_support::FakeHal;
    use crate::validate::{self, PixelInput, RocInput, TbmInput};

    struct VcalSweep {
        dac_min: u32,
        dac_max: u32,
        dac_step: u32,
        n_triggers: u32,
    }

    #[test]
    fn validate_program_sweep_condense_repack_round_trip() {
        let mut dut = Dut::new();
        let rocs = vec![RocInput {
            device_type: "psi46digv21".into(),
            enable: true,
            dacs: vec![("vana".into(), 100)],
            pixels: vec![PixelInput {
                column: 0,
                row: 0,
                trim: 7,
                enable: true,
                mask: false,
            }],
        }];
        let tbms = vec![TbmInput {
            device_type: "tbm08".into(),
            enable: true,
            registers: vec![("base0".into(), 1)],
        }];
        validate::init_dut(&mut dut, rocs, tbms).unwrap();
        assert!(dut.initialized);

        let mut hal = FakeHal::new();
        program::program_dut(&mut dut, &mut hal).unwrap();
        assert!(dut.programmed);

        // Sweep "vcal" from 0 to 20 step 10 (3 points), 4 triggers each. The
        // single-pixel entry point internally walks the DAC range and
        // concatenates every trigger's event, matching the ordering the
        // repacker expects (spec.md §4.8, "data is read in natural order").
        let n_points: usize = 3;
        let params = VcalSweep {
            dac_min: 0,
            dac_max: 20,
            dac_step: 10,
            n_triggers: 4,
        };

        let mut entries: Entries<VcalSweep> = Entries::default();
        entries.pixel = Some(Box::new(move |i2c, column, row, params: &VcalSweep| {
            let mut events = Vec::new();
            let mut dac = params.dac_min;
            while dac <= params.dac_max {
                for _ in 0..params.n_triggers {
                    events.push(Event::new(0, 0, vec![Pixel::new(i2c, column, row, 17)]));
                }
                dac += params.dac_step;
            }
            Ok(events)
        }));

        let result = run_loop(&mut dut, &mut hal, &mut entries, &params, Flags::none()).unwrap();
        assert_eq!(result.events.len(), n_points * params.n_triggers as usize);

        let condensed = condense_triggers(&result.events, params.n_triggers, CondenseMode::PulseHeight).unwrap();
        assert_eq!(condensed.len(), n_points);
        for group in &condensed {
            assert_eq!(group.pixels[0].value, 17);
            assert!(group.pixels[0].variance.abs() < 1e-9);
        }

        let scan = repack_dac_scan(&condensed, params.dac_min, params.dac_max, params.dac_step, Flags::none());
        assert_eq!(scan.len(), 3);
        assert_eq!(scan.iter().map(|p| p.dac_value).collect::<Vec<_>>(), vec![0, 10, 20]);

        // the whole DUT is masked again after the sweep (mask discipline).
        assert_eq!(dut.masked_pixel_count(), 1);
    }
}
