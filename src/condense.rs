// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Event condenser (component C7, spec.md §4.7): reduces contiguous
//! `n_triggers`-sized runs of raw per-trigger events into one condensed
//! event per sweep point.

use crate::error::{Error, ErrorKind, Result};
use crate::event::{Event, Pixel};
use std::collections::HashMap;

/// Reduction strategy applied within each group of `n_triggers` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondenseMode {
    /// Output value = hit count across the group.
    Efficiency,
    /// Output value/variance = per-pixel mean/sample-variance across the
    /// group, via Welford's online algorithm.
    PulseHeight,
}

/// Reduce `events` into one condensed [`Event`] per contiguous group of
/// `n_triggers` raw events (spec.md §4.7).
///
/// `events.len()` must be a non-zero multiple of `n_triggers`; otherwise this
/// is a critical configuration error (a malformed sweep), and an empty
/// result is returned alongside the error.
pub fn condense_triggers(events: &[Event], n_triggers: u32, mode: CondenseMode) -> Result<Vec<Event>> {
    if n_triggers == 0 || events.len() % n_triggers as usize != 0 {
        log::error!(
            "condenser: {} events not divisible by n_triggers={}, aborting",
            events.len(),
            n_triggers
        );
        return Err(Error::from(ErrorKind::Dut(format!(
            "event count {} not divisible by n_triggers {}",
            events.len(),
            n_triggers
        ))));
    }

    let group_size = n_triggers as usize;
    let mut out = Vec::with_capacity(events.len() / group_size.max(1));
    for group in events.chunks(group_size) {
        out.push(condense_group(group, mode));
    }
    Ok(out)
}

fn condense_group(group: &[Event], mode: CondenseMode) -> Event {
    match mode {
        CondenseMode::Efficiency => condense_efficiency(group),
        CondenseMode::PulseHeight => condense_pulse_height(group),
    }
}

fn condense_efficiency(group: &[Event]) -> Event {
    let mut hits: HashMap<(u8, u8, u8), i16> = HashMap::new();
    let mut order: Vec<(u8, u8, u8)> = Vec::new();
    let mut decoder_errors = 0;

    for event in group {
        decoder_errors += event.num_decoder_errors;
        for pixel in &event.pixels {
            let address = pixel.address();
            let entry = hits.entry(address).or_insert_with(|| {
                order.push(address);
                0
            });
            *entry += 1;
        }
    }

    let pixels = order
        .into_iter()
        .map(|(roc_id, column, row)| {
            let mut pixel = Pixel::new(roc_id, column, row, hits[&(roc_id, column, row)]);
            pixel.variance = 0.0;
            pixel
        })
        .collect();

    Event {
        header: group.first().map(|e| e.header).unwrap_or(0),
        trailer: group.last().map(|e| e.trailer).unwrap_or(0),
        pixels,
        num_decoder_errors: decoder_errors,
    }
}

struct Welford {
    k: u32,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn new() -> Self {
        Self {
            k: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    fn push(&mut self, x: f64) {
        self.k += 1;
        let delta = x - self.mean;
        self.mean += delta / self.k as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn variance(&self) -> f64 {
        if self.k < 2 {
            0.0
        } else {
            self.m2 / (self.k - 1) as f64
        }
    }
}

fn condense_pulse_height(group: &[Event]) -> Event {
    let mut stats: HashMap<(u8, u8, u8), Welford> = HashMap::new();
    let mut order: Vec<(u8, u8, u8)> = Vec::new();
    let mut decoder_errors = 0;

    for event in group {
        decoder_errors += event.num_decoder_errors;
        for pixel in &event.pixels {
            let address = pixel.address();
            let welford = stats.entry(address).or_insert_with(|| {
                order.push(address);
                Welford::new()
            });
            welford.push(pixel.value as f64);
        }
    }

    let pixels = order
        .into_iter()
        .map(|address @ (roc_id, column, row)| {
            let welford = &stats[&address];
            let mut pixel = Pixel::new(roc_id, column, row, welford.mean.round() as i16);
            pixel.variance = welford.variance();
            pixel
        })
        .collect();

    Event {
        header: group.first().map(|e| e.header).unwrap_or(0),
        trailer: group.last().map(|e| e.trailer).unwrap_or(0),
        pixels,
        num_decoder_errors: decoder_errors,
    }
}
