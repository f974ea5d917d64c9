// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! ROC (readout chip) configuration (component C2).

use crate::pixel::PixelConfig;
use std::collections::HashMap;

/// Configuration of a single readout chip.
#[derive(Debug, Clone)]
pub struct RocConfig {
    /// Device-type code, looked up via [`crate::dict::DEVICE_TYPE`].
    pub device_type: u8,
    /// Hub/I2C address; equals the zero-based position of this ROC in
    /// [`crate::dut::Dut::rocs`] at init time (spec.md §3).
    pub i2c_address: u8,
    pub enable: bool,
    dacs: HashMap<u8, u32>,
    pixels: Vec<PixelConfig>,
}

impl RocConfig {
    pub fn new(device_type: u8, i2c_address: u8, enable: bool) -> Self {
        Self {
            device_type,
            i2c_address,
            enable,
            dacs: HashMap::new(),
            pixels: Vec::new(),
        }
    }

    /// Install already-validated pixels. The caller (component C3) is
    /// responsible for range-checking and duplicate detection before
    /// calling this.
    pub fn set_pixels(&mut self, pixels: Vec<PixelConfig>) {
        self.pixels = pixels;
    }

    pub fn pixels(&self) -> &[PixelConfig] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [PixelConfig] {
        &mut self.pixels
    }

    /// First duplicate `(column, row)` pair found, if any (spec.md §3: "no
    /// two pixels in one ROC share (column, row)").
    pub fn find_duplicate_pixel(&self) -> Option<(u8, u8)> {
        let mut seen = std::collections::HashSet::new();
        for pixel in &self.pixels {
            let coord = pixel.coord();
            if !seen.insert(coord) {
                return Some(coord);
            }
        }
        None
    }

    pub fn set_dac(&mut self, id: u8, value: u32) {
        self.dacs.insert(id, value);
    }

    pub fn dac(&self, id: u8) -> Option<u32> {
        self.dacs.get(&id).copied()
    }

    /// The full register-id -> value map, as handed to the HAL by the
    /// programmer (component C4).
    pub fn dac_map(&self) -> &HashMap<u8, u32> {
        &self.dacs
    }

    /// Enabled pixels, in their stored (raster) order.
    pub fn enabled_pixels(&self) -> impl Iterator<Item = &PixelConfig> {
        self.pixels.iter().filter(|p| p.enable)
    }

    /// True iff every pixel on this ROC is enabled.
    pub fn all_pixels_enabled(&self) -> bool {
        self.pixels.iter().all(|p| p.enable)
    }

    /// Number of masked pixels.
    pub fn masked_pixel_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.mask).count()
    }

    /// Set the mask of every pixel (component C4's baseline-safe state).
    /// Pushing trims to the HAL is a separate operation
    /// ([`crate::program::push_trims_to_nios`]); this only updates the
    /// in-model mask bits.
    pub fn mask_all(&mut self) {
        for pixel in &mut self.pixels {
            pixel.mask = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pixel(col: u8, row: u8) -> PixelConfig {
        PixelConfig::new(col, row, 0, true, false)
    }

    #[test]
    fn detects_duplicate_pixel() {
        let mut roc = RocConfig::new(0, 0, true);
        roc.set_pixels(vec![pixel(1, 1), pixel(2, 2), pixel(1, 1)]);
        assert_eq!(roc.find_duplicate_pixel(), Some((1, 1)));
    }

    #[test]
    fn no_duplicate_when_all_unique() {
        let mut roc = RocConfig::new(0, 0, true);
        roc.set_pixels(vec![pixel(1, 1), pixel(2, 2)]);
        assert_eq!(roc.find_duplicate_pixel(), None);
    }

    #[test]
    fn all_pixels_enabled_predicate() {
        let mut roc = RocConfig::new(0, 0, true);
        roc.set_pixels(vec![pixel(0, 0), pixel(0, 1)]);
        assert!(roc.all_pixels_enabled());
        roc.pixels_mut()[0].enable = false;
        assert!(!roc.all_pixels_enabled());
    }

    #[test]
    fn mask_all_masks_every_pixel() {
        let mut roc = RocConfig::new(0, 0, true);
        roc.set_pixels(vec![pixel(0, 0), pixel(0, 1)]);
        roc.mask_all();
        assert!(roc.pixels().iter().all(|p| p.mask));
    }
}
