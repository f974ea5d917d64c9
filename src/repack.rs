// Copyright (C) 2026 pxar contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

//! Repacker (component C8, spec.md §4.8): re-indexes a condensed event
//! stream by the DAC value(s) that were swept to produce it, or flattens it
//! into a single pixel map.

use crate::event::{Event, Pixel};
use crate::flags::{Flags, CHECK_ORDER, NOSORT, RISING_EDGE};
use crate::pixel::ROC_MAX_ROWS;
use std::collections::HashMap;

/// Flatten condensed groups (no DAC sweep) into one pixel list.
///
/// With [`CHECK_ORDER`], pixels are expected to arrive in column-major
/// raster order (row innermost, wrapping to the next column at
/// `row == ROC_MAX_ROWS`); a pixel that breaks the sequence has its value
/// forced to `-1` but is still emitted. Unless [`NOSORT`], the result is
/// finally sorted by `(roc_id, column, row)`.
pub fn repack_map(groups: &[Event], flags: Flags) -> Vec<Pixel> {
    let mut pixels: Vec<Pixel> = groups.iter().flat_map(|e| e.pixels.iter().copied()).collect();

    if flags.contains(CHECK_ORDER) {
        let mut expected = (0u8, 0u8);
        for pixel in pixels.iter_mut() {
            if (pixel.column, pixel.row) != expected {
                pixel.value = -1;
            }
            expected = next_raster_address(pixel.column, pixel.row);
        }
    }

    if !flags.contains(NOSORT) {
        pixels.sort_by_key(|p| p.address());
    }
    pixels
}

fn next_raster_address(column: u8, row: u8) -> (u8, u8) {
    if row + 1 >= ROC_MAX_ROWS {
        (column + 1, 0)
    } else {
        (column, row + 1)
    }
}

/// Inclusive `[min, max]` range stepped by `step`, as swept by the loop
/// expander (spec.md §4.8: `⌊(max−min)/step⌋+1` points).
///
/// `min > max` is a soft-warning auto-swap (spec.md §7/§8 scenario 5), not
/// an error: the caller's bounds are taken to be the two ends of a range
/// rather than an ordered pair.
fn step_values(min: u32, max: u32, step: u32) -> Vec<u32> {
    let (min, max) = if min > max {
        log::warn!("repacker: DAC range min {} > max {}, swapping bounds", min, max);
        (max, min)
    } else {
        (min, max)
    };
    let mut values = Vec::new();
    let mut x = min;
    while x <= max {
        values.push(x);
        match x.checked_add(step) {
            Some(next) => x = next,
            None => break,
        }
        if step == 0 {
            break;
        }
    }
    values
}

/// One swept-DAC point: the DAC value that produced it and its pixel list.
#[derive(Debug, Clone)]
pub struct DacPoint {
    pub dac_value: u32,
    pub pixels: Vec<Pixel>,
}

/// Re-index condensed groups produced by sweeping one register from
/// `dac_min` to `dac_max` in steps of `dac_step`. Groups are consumed in
/// natural (production) order; the DAC counter cycles back to `dac_min` on
/// each new sweep round, matching repeated sweeps concatenated by the loop
/// expander.
pub fn repack_dac_scan(groups: &[Event], dac_min: u32, dac_max: u32, dac_step: u32, flags: Flags) -> Vec<DacPoint> {
    let values = step_values(dac_min, dac_max, dac_step);
    if values.is_empty() {
        return Vec::new();
    }
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let mut pixels = group.pixels.clone();
            if !flags.contains(NOSORT) {
                pixels.sort_by_key(|p| p.address());
            }
            DacPoint {
                dac_value: values[i % values.len()],
                pixels,
            }
        })
        .collect()
}

/// One outer-DAC point of a 2-D sweep: its value and the inner DAC scan
/// nested under it.
#[derive(Debug, Clone)]
pub struct DacDacPoint {
    pub dac1_value: u32,
    pub inner: Vec<DacPoint>,
}

/// Re-index condensed groups from a nested sweep: `dac1` outer, `dac2`
/// inner (resetting each outer step). Expected input length is
/// `n1 * n2` condensed groups, in outer-slowest / inner-fastest order.
pub fn repack_dac_dac_scan(
    groups: &[Event],
    dac1_min: u32,
    dac1_max: u32,
    dac1_step: u32,
    dac2_min: u32,
    dac2_max: u32,
    dac2_step: u32,
    flags: Flags,
) -> Vec<DacDacPoint> {
    let outer_values = step_values(dac1_min, dac1_max, dac1_step);
    let inner_values = step_values(dac2_min, dac2_max, dac2_step);
    if outer_values.is_empty() || inner_values.is_empty() {
        return Vec::new();
    }
    let n2 = inner_values.len();

    groups
        .chunks(n2)
        .enumerate()
        .map(|(outer_index, chunk)| {
            let inner = chunk
                .iter()
                .enumerate()
                .map(|(i, group)| {
                    let mut pixels = group.pixels.clone();
                    if !flags.contains(NOSORT) {
                        pixels.sort_by_key(|p| p.address());
                    }
                    DacPoint {
                        dac_value: inner_values[i % inner_values.len()],
                        pixels,
                    }
                })
                .collect();
            DacDacPoint {
                dac1_value: outer_values[outer_index % outer_values.len()],
                inner,
            }
        })
        .collect()
}

/// One pixel's threshold-crossing DAC value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPoint {
    pub roc_id: u8,
    pub column: u8,
    pub row: u8,
    pub dac_value: u32,
}

struct ThresholdState {
    last_efficiency: i64,
    last_dac: u32,
    best_dac: u32,
    best_diff: i64,
}

/// Scan `points` (efficiency-mode DAC-scan output) and, per pixel, find the
/// DAC value whose measured efficiency comes closest to
/// `threshold = ceil(n_triggers * level_percent / 100)`.
///
/// Under [`RISING_EDGE`], points are read in natural (increasing-DAC)
/// order and a candidate only replaces the running best when efficiency
/// has just increased relative to the previous sample for that pixel (a
/// monotone approach from below); otherwise points are read in reverse
/// (decreasing-DAC) order with the symmetric "just decreased" gate, and the
/// DAC value recorded is the higher-DAC sample the transition departed
/// from. Either way, the very first sample seen for a pixel seeds its
/// state unconditionally, and later candidates only win when they bring
/// `|efficiency - threshold|` at least as close as the running best.
pub fn repack_threshold_map(points: &[DacPoint], n_triggers: u32, level_percent: f64, flags: Flags) -> Vec<ThresholdPoint> {
    let threshold = (n_triggers as f64 * level_percent / 100.0).ceil() as i64;
    let rising = flags.contains(RISING_EDGE);

    let mut states: HashMap<(u8, u8, u8), ThresholdState> = HashMap::new();
    let mut order: Vec<(u8, u8, u8)> = Vec::new();

    let mut forward: Vec<&DacPoint> = points.iter().collect();
    if !rising {
        forward.reverse();
    }

    for point in forward {
        for pixel in &point.pixels {
            let address = pixel.address();
            let efficiency = pixel.value as i64;
            let diff = (efficiency - threshold).abs();

            match states.get_mut(&address) {
                None => {
                    states.insert(
                        address,
                        ThresholdState {
                            last_efficiency: efficiency,
                            last_dac: point.dac_value,
                            best_dac: point.dac_value,
                            best_diff: diff,
                        },
                    );
                    order.push(address);
                }
                Some(state) => {
                    let moved = if rising {
                        efficiency > state.last_efficiency
                    } else {
                        efficiency < state.last_efficiency
                    };
                    if moved {
                        let (candidate_dac, candidate_diff) = if rising {
                            (point.dac_value, diff)
                        } else {
                            (
                                state.last_dac,
                                (state.last_efficiency - threshold).abs(),
                            )
                        };
                        if candidate_diff <= state.best_diff {
                            state.best_dac = candidate_dac;
                            state.best_diff = candidate_diff;
                        }
                    }
                    state.last_efficiency = efficiency;
                    state.last_dac = point.dac_value;
                }
            }
        }
    }

    let mut out: Vec<ThresholdPoint> = order
        .into_iter()
        .map(|(roc_id, column, row)| {
            let state = &states[&(roc_id, column, row)];
            ThresholdPoint {
                roc_id,
                column,
                row,
                dac_value: state.best_dac,
            }
        })
        .collect();

    if !flags.contains(NOSORT) {
        out.sort_by_key(|p| (p.roc_id, p.column, p.row));
    }
    out
}

/// Like [`repack_threshold_map`] but bucketed by the outer `dac2` value;
/// each bucket runs an independent closest-approach search over its own
/// inner DAC scan.
pub fn repack_threshold_dac_scan(
    points: &[DacDacPoint],
    n_triggers: u32,
    level_percent: f64,
    flags: Flags,
) -> Vec<(u32, Vec<ThresholdPoint>)> {
    points
        .iter()
        .map(|outer| {
            (
                outer.dac1_value,
                repack_threshold_map(&outer.inner, n_triggers, level_percent, flags),
            )
        })
        .collect()
}
