// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Configuration validator (component C3, spec.md §4.3).
//!
//! All operations here either mutate the DUT model on success or return
//! [`crate::error::Error`] with kind `InvalidConfig` on unrecoverable input.
//! Soft, auto-corrected problems (clamping, terminator fix-up, duplicate
//! overwrites) are logged via `log::warn!` and do not fail the call.

use crate::dict::{self, RegisterDict};
use crate::dut::{Dut, PgEntry, PowerSettings};
use crate::error::{Error, ErrorKind, Result};
use crate::pixel::PixelConfig;
use crate::roc::RocConfig;
use crate::tbm::{self, TbmConfig};

/// Maximum number of pattern-generator entries (spec.md §3).
pub const PG_MAX_ENTRIES: usize = 256;

/// Which dictionary [`verify_register`] should consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    RocDac,
    TbmReg,
    DtbDelay,
}

impl RegisterKind {
    fn dict(self) -> &'static RegisterDict {
        match self {
            RegisterKind::RocDac => &dict::ROC_DAC,
            RegisterKind::TbmReg => &dict::TBM_REG,
            RegisterKind::DtbDelay => &dict::DTB_DELAY,
        }
    }
}

/// Raw (unvalidated) pixel input as supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct PixelInput {
    pub column: u8,
    pub row: u8,
    pub trim: u8,
    pub enable: bool,
    pub mask: bool,
}

/// Raw (unvalidated) ROC input as supplied by the caller.
#[derive(Debug, Clone)]
pub struct RocInput {
    pub device_type: String,
    pub enable: bool,
    pub dacs: Vec<(String, u32)>,
    pub pixels: Vec<PixelInput>,
}

/// Raw (unvalidated) TBM core input as supplied by the caller. A TBM chip is
/// either one core config (the other is synthesized) or a matched
/// alpha/beta pair.
#[derive(Debug, Clone)]
pub struct TbmInput {
    pub device_type: String,
    pub enable: bool,
    pub registers: Vec<(String, u32)>,
}

/// Look up `name` in the dictionary selected by `kind` and clamp `value` to
/// the register's maximum, warning on overflow. Returns `(id, clamped
/// value)`, or `InvalidConfig` if the name is unknown.
pub fn verify_register(name: &str, kind: RegisterKind, value: u32) -> Result<(u8, u32)> {
    let entry = kind.dict().lookup(name).ok_or_else(|| {
        Error::from(ErrorKind::InvalidConfig(format!(
            "unknown register name '{}'",
            name
        )))
    })?;
    let clamped = if value > entry.size {
        log::warn!(
            "register '{}': value {} exceeds maximum {}, clamping",
            name,
            value,
            entry.size
        );
        entry.size
    } else {
        value
    };
    Ok((entry.id, clamped))
}

/// Validate a set of named power-supply limits, apply defaults for missing
/// keys, clamp any key that requests more than its default (a safety
/// ceiling), and reject negative or near-zero settings (spec.md §4.3).
pub fn check_power(settings: &[(&str, f64)]) -> Result<PowerSettings> {
    let mut power = PowerSettings::default();
    for &(key, value) in settings {
        if value < 0.0 {
            return Err(ErrorKind::InvalidConfig(format!(
                "power setting '{}' must not be negative: {}",
                key, value
            ))
            .into());
        }
        let default = match key {
            "va" => power.va,
            "vd" => power.vd,
            "ia" => power.ia,
            "id" => power.id,
            other => {
                return Err(ErrorKind::InvalidConfig(format!(
                    "unrecognised power setting '{}'",
                    other
                ))
                .into());
            }
        };
        let clamped = if value >= default {
            log::warn!(
                "power setting '{}': {} exceeds safe default {}, clamping",
                key,
                value,
                default
            );
            default
        } else {
            value
        };
        match key {
            "va" => power.va = clamped,
            "vd" => power.vd = clamped,
            "ia" => power.ia = clamped,
            "id" => power.id = clamped,
            _ => unreachable!(),
        }
    }
    for (key, value) in [("va", power.va), ("vd", power.vd), ("ia", power.ia), ("id", power.id)] {
        if value < 0.01 {
            return Err(ErrorKind::InvalidConfig(format!(
                "power setting '{}' is below the minimum usable level: {}",
                key, value
            ))
            .into());
        }
    }
    Ok(power)
}

/// Validate DTB delay settings and install them into `dut`. Duplicate names
/// in the same call overwrite the earlier value with a warning.
pub fn check_delays(dut: &mut Dut, settings: &[(&str, u8)]) -> Result<()> {
    for &(name, value) in settings {
        let (id, clamped) = verify_register(name, RegisterKind::DtbDelay, value as u32)?;
        if dut.sig_delay(id).is_some() {
            log::warn!("delay signal '{}' specified more than once, overwriting", name);
        }
        dut.set_sig_delay(id, clamped as u8);
    }
    Ok(())
}

/// Validate a pattern-generator program and install it (plus the cached
/// cycle length `pg_sum`) into `dut`.
///
/// * length must be `<= PG_MAX_ENTRIES`;
/// * every entry's signal string is split on `;` and OR-combined;
/// * an interior (non-final) zero delay is fatal: it would stop the PG
///   before the program finishes;
/// * the final entry's delay is forced to 0 (with a warning) if the caller
///   supplied a non-zero value.
pub fn verify_pattern_generator(dut: &mut Dut, entries: &[(&str, u8)]) -> Result<()> {
    if entries.is_empty() {
        return Err(ErrorKind::InvalidConfig("pattern generator program is empty".into()).into());
    }
    if entries.len() > PG_MAX_ENTRIES {
        return Err(ErrorKind::InvalidConfig(format!(
            "pattern generator program has {} entries, maximum is {}",
            entries.len(),
            PG_MAX_ENTRIES
        ))
        .into());
    }

    let last_index = entries.len() - 1;
    let mut pg_setup = Vec::with_capacity(entries.len());
    for (index, &(signal, delay)) in entries.iter().enumerate() {
        let pattern_word = dict::PG_SIGNAL.lookup_combined(signal).ok_or_else(|| {
            Error::from(ErrorKind::InvalidConfig(format!(
                "unknown pattern generator signal in '{}'",
                signal
            )))
        })?;

        let delay = if index == last_index {
            if delay != 0 {
                log::warn!("pattern generator: forcing terminating delay to 0 (was {})", delay);
            }
            0
        } else {
            if delay == 0 {
                return Err(ErrorKind::InvalidConfig(
                    "pattern generator has an interior entry with delay 0, which would stop it early".into(),
                )
                .into());
            }
            delay
        };

        pg_setup.push(PgEntry { pattern_word, delay });
    }

    // cycle length: sum(delay + 1)
    let pg_sum: u32 = pg_setup.iter().map(|entry| entry.delay as u32 + 1).sum();

    dut.pg_setup = pg_setup;
    dut.pg_sum = pg_sum;
    Ok(())
}

/// Build a validated [`RocConfig`] from raw caller input, checking pixel
/// range and duplicates.
fn build_roc(i2c_address: u8, input: &RocInput) -> Result<RocConfig> {
    let device_type = dict::DEVICE_TYPE.lookup(&input.device_type).ok_or_else(|| {
        Error::from(ErrorKind::InvalidConfig(format!(
            "unknown ROC device type '{}'",
            input.device_type
        )))
    })?;

    let mut roc = RocConfig::new(device_type, i2c_address, input.enable);

    for (name, value) in &input.dacs {
        let (id, clamped) = verify_register(name, RegisterKind::RocDac, *value)?;
        roc.set_dac(id, clamped);
    }

    if input.pixels.len() > crate::pixel::ROC_MAX_PIXELS {
        return Err(ErrorKind::InvalidConfig(format!(
            "ROC has {} pixels, maximum is {}",
            input.pixels.len(),
            crate::pixel::ROC_MAX_PIXELS
        ))
        .into());
    }

    let mut pixels = Vec::with_capacity(input.pixels.len());
    for p in &input.pixels {
        let pixel = PixelConfig::new(p.column, p.row, p.trim, p.enable, p.mask);
        if !pixel.in_range() {
            return Err(ErrorKind::InvalidConfig(format!(
                "pixel ({}, {}) is out of range",
                p.column, p.row
            ))
            .into());
        }
        pixels.push(pixel);
    }
    roc.set_pixels(pixels);

    if let Some((col, row)) = roc.find_duplicate_pixel() {
        return Err(ErrorKind::InvalidConfig(format!(
            "duplicate pixel ({}, {}) on ROC {}",
            col, row, i2c_address
        ))
        .into());
    }

    Ok(roc)
}

/// Build the two `TbmConfig` cores (alpha, beta) described by one
/// [`TbmInput`]. Register names are resolved against [`dict::TBM_REG`], then
/// encoded with the alpha core selector; if the caller's registers already
/// distinguish alpha/beta (by supplying two `TbmInput`s, one per core —
/// see [`init_dut`]) this is called once per core instead.
fn build_tbm_core(core: u8, input: &TbmInput) -> Result<TbmConfig> {
    let device_type = dict::DEVICE_TYPE.lookup(&input.device_type).ok_or_else(|| {
        Error::from(ErrorKind::InvalidConfig(format!(
            "unknown TBM device type '{}'",
            input.device_type
        )))
    })?;
    let mut tbm = TbmConfig::new(device_type, input.enable);
    for (name, value) in &input.registers {
        let (base, clamped) = verify_register(name, RegisterKind::TbmReg, *value)?;
        tbm.set_register(tbm::encode_register(core, base), clamped);
    }
    Ok(tbm)
}

/// Initialize a fresh DUT from raw ROC and TBM inputs. ROC i2c addresses are
/// assigned implicitly from list position (spec.md §3). TBM inputs are
/// consumed two-at-a-time (even index = alpha, odd index = beta); a trailing
/// unmatched input has its second core synthesized.
///
/// On success, `dut.initialized` is set to `true`.
pub fn init_dut(dut: &mut Dut, rocs: Vec<RocInput>, tbms: Vec<TbmInput>) -> Result<()> {
    let mut built_rocs = Vec::with_capacity(rocs.len());
    for (index, input) in rocs.iter().enumerate() {
        built_rocs.push(build_roc(index as u8, input)?);
    }

    let mut built_tbms = Vec::with_capacity(tbms.len() * 2);
    let mut iter = tbms.iter();
    while let Some(alpha_input) = iter.next() {
        let alpha = build_tbm_core(tbm::ALPHA_CORE, alpha_input)?;
        let beta = match iter.next() {
            Some(beta_input) => build_tbm_core(tbm::BETA_CORE, beta_input)?,
            None => alpha.synthesize_other_core(),
        };
        built_tbms.push(alpha);
        built_tbms.push(beta);
    }

    dut.rocs = built_rocs;
    dut.tbms = built_tbms;
    dut.initialized = true;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn pix(col: u8, row: u8) -> PixelInput {
        PixelInput {
            column: col,
            row,
            trim: 0,
            enable: true,
            mask: false,
        }
    }

    #[test]
    fn verify_register_clamps_overflow() {
        let (id, value) = verify_register("vana", RegisterKind::RocDac, 1000).unwrap();
        assert_eq!(id, 0x02);
        assert_eq!(value, 255);
    }

    #[test]
    fn verify_register_rejects_unknown_name() {
        assert!(verify_register("bogus", RegisterKind::RocDac, 1).is_err());
    }

    /// Boundary scenario 4: `checkPower([("va", 5.0)])` warns and clamps va
    /// to 2.5.
    #[test]
    fn check_power_clamps_to_default() {
        let power = check_power(&[("va", 5.0)]).unwrap();
        assert_eq!(power.va, 2.5);
        assert_eq!(power.vd, 3.0);
    }

    #[test]
    fn check_power_rejects_negative() {
        assert!(check_power(&[("va", -1.0)]).is_err());
    }

    #[test]
    fn check_power_rejects_near_zero() {
        // va below default is accepted unless it dips under 0.01
        assert!(check_power(&[("va", 0.0)]).is_err());
    }

    /// Boundary scenario 1: `verifyPatternGenerator([("resetroc;trg", 10),
    /// ("tok", 0)])` succeeds with pg_sum = 12.
    #[test]
    fn pattern_generator_cycle_length() {
        let mut dut = Dut::new();
        verify_pattern_generator(&mut dut, &[("resetroc;trg", 10), ("tok", 0)]).unwrap();
        assert_eq!(dut.pg_sum, 12);
        assert_eq!(dut.pg_setup.last().unwrap().delay, 0);
    }

    /// Boundary scenario 2: `verifyPatternGenerator([("trg", 0), ("tok",
    /// 0)])` throws InvalidConfig (interior zero).
    #[test]
    fn pattern_generator_rejects_interior_zero_delay() {
        let mut dut = Dut::new();
        assert!(verify_pattern_generator(&mut dut, &[("trg", 0), ("tok", 0)]).is_err());
    }

    #[test]
    fn pattern_generator_forces_terminator_to_zero() {
        let mut dut = Dut::new();
        verify_pattern_generator(&mut dut, &[("trg", 5), ("tok", 3)]).unwrap();
        assert_eq!(dut.pg_setup.last().unwrap().delay, 0);
    }

    #[test]
    fn pattern_generator_rejects_too_many_entries() {
        let mut dut = Dut::new();
        let entries: Vec<(&str, u8)> = (0..300).map(|_| ("tok", 1)).collect();
        assert!(verify_pattern_generator(&mut dut, &entries).is_err());
    }

    /// Boundary scenario 3: a single-core TBM input synthesizes the second
    /// core.
    #[test]
    fn init_dut_synthesizes_missing_tbm_core() {
        let mut dut = Dut::new();
        let tbm_input = TbmInput {
            device_type: "tbm08".into(),
            enable: true,
            registers: vec![("base0".into(), 0x42)],
        };
        init_dut(&mut dut, Vec::new(), vec![tbm_input]).unwrap();
        assert_eq!(dut.tbms.len(), 2);
        assert_eq!(dut.tbms[0].register(0xe0), Some(0x42));
        assert_eq!(dut.tbms[1].register(0xf0), Some(0x42));
        assert!(dut.initialized);
    }

    #[test]
    fn init_dut_assigns_i2c_address_from_position() {
        let mut dut = Dut::new();
        let rocs = vec![
            RocInput {
                device_type: "psi46digv21".into(),
                enable: true,
                dacs: vec![],
                pixels: vec![pix(0, 0)],
            },
            RocInput {
                device_type: "psi46digv21".into(),
                enable: true,
                dacs: vec![],
                pixels: vec![pix(0, 0)],
            },
        ];
        init_dut(&mut dut, rocs, Vec::new()).unwrap();
        assert_eq!(dut.rocs[0].i2c_address, 0);
        assert_eq!(dut.rocs[1].i2c_address, 1);
    }

    #[test]
    fn init_dut_rejects_duplicate_pixels() {
        let mut dut = Dut::new();
        let rocs = vec![RocInput {
            device_type: "psi46digv21".into(),
            enable: true,
            dacs: vec![],
            pixels: vec![pix(0, 0), pix(0, 0)],
        }];
        assert!(init_dut(&mut dut, rocs, Vec::new()).is_err());
    }

    #[test]
    fn init_dut_rejects_out_of_range_pixel() {
        let mut dut = Dut::new();
        let rocs = vec![RocInput {
            device_type: "psi46digv21".into(),
            enable: true,
            dacs: vec![],
            pixels: vec![pix(52, 0)],
        }];
        assert!(init_dut(&mut dut, rocs, Vec::new()).is_err());
    }
}
