// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Post-processing of an averaged power spectrum.
//!
//! The stages always run in this order, each one optional:
//! 1. baseline (slope) removal;
//! 2. boxcar smoothing;
//! 3. noise-floor shift;
//! 4. background calibration against a reference spectrum.
//!
//! Problems that only affect one stage (e.g. an even smoothing width) skip
//! that stage and are reported as [`DataQualityWarning`]s.


use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::{
        CALIBRATION_SCALE_MAX, CALIBRATION_SCALE_MIN, DEFAULT_CALIBRATION_STEP,
        DEFAULT_NOISE_FLOOR_EDGE_FRACTION,
    },
    quality::DataQualityWarning,
};

/// Which bins are used to estimate the noise floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseFloor {
    /// The mean of every bin.
    Whole,

    /// The mean of `ceil(fraction * len)` bins at each end of the spectrum.
    /// Keeps a strong line in the middle of the band out of the estimate.
    Edges { fraction: f64 },
}

impl Default for NoiseFloor {
    fn default() -> Self {
        NoiseFloor::Edges {
            fraction: DEFAULT_NOISE_FLOOR_EDGE_FRACTION,
        }
    }
}

/// The user-facing names of the [`NoiseFloor`] modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseFloorMode {
    #[strum(serialize = "whole")]
    Whole,
    #[strum(serialize = "edges")]
    Edges,
    #[strum(serialize = "none")]
    None,
}

impl NoiseFloorMode {
    pub fn into_noise_floor(self, edge_fraction: f64) -> Option<NoiseFloor> {
        match self {
            NoiseFloorMode::Whole => Some(NoiseFloor::Whole),
            NoiseFloorMode::Edges => Some(NoiseFloor::Edges {
                fraction: edge_fraction,
            }),
            NoiseFloorMode::None => None,
        }
    }
}

/// A reference spectrum to remove the receiver's bandpass shape with.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub reference: Vec<f64>,

    /// The bin index that the spectral line is expected at.
    pub line_centre: usize,

    /// The number of bins around `line_centre` that are left out of the fit.
    pub line_width: usize,

    /// The resolution of the search for the reference's scale.
    pub step: f64,

    /// Use this scale instead of searching for one.
    pub fixed_scale: Option<f64>,
}

/// Which conditioning stages to run. The default removes the baseline and
/// shifts the edge noise floor to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditioner {
    pub baseline: bool,
    /// Smoothing kernel width; 1 disables smoothing.
    pub smoothing: usize,
    pub noise_floor: Option<NoiseFloor>,
    pub calibration: Option<Calibration>,
}

impl Default for Conditioner {
    fn default() -> Self {
        Self {
            baseline: true,
            smoothing: 1,
            noise_floor: Some(NoiseFloor::default()),
            calibration: None,
        }
    }
}

/// What conditioning did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionReport {
    /// The level subtracted by the noise-floor shift.
    pub noise_floor: Option<f64>,
    /// The scale applied to the calibration reference before subtracting it.
    pub calibration_scale: Option<f64>,
    pub warnings: Vec<DataQualityWarning>,
}

impl Conditioner {
    pub fn condition(&self, spectrum: &mut Vec<f64>) -> ConditionReport {
        let mut report = ConditionReport::default();

        if self.baseline {
            remove_baseline(spectrum);
        }

        if self.smoothing != 1 {
            match smooth(spectrum, self.smoothing) {
                Ok(smoothed) => *spectrum = smoothed,
                Err(w) => report.warnings.push(w),
            }
        }

        if let Some(mode) = self.noise_floor {
            report.noise_floor = Some(shift_noise_floor(spectrum, mode));
        }

        if let Some(cal) = &self.calibration {
            let scale = match cal.fixed_scale {
                Some(k) if cal.reference.len() == spectrum.len() => Ok(k),
                Some(_) => Err(DataQualityWarning::CalibrationLengthMismatch {
                    target: spectrum.len(),
                    reference: cal.reference.len(),
                }),
                None => fit_background_scale(
                    spectrum,
                    &cal.reference,
                    cal.line_centre,
                    cal.line_width,
                    cal.step,
                ),
            };
            match scale {
                Ok(k) => {
                    debug!("Subtracting calibration reference scaled by {k}");
                    spectrum
                        .iter_mut()
                        .zip(&cal.reference)
                        .for_each(|(t, r)| *t -= k * r);
                    report.calibration_scale = Some(k);
                }
                Err(w) => report.warnings.push(w),
            }
        }

        report
    }
}

/// Subtract the least-squares straight line (power against bin index).
pub fn remove_baseline(values: &mut [f64]) {
    let n = values.len();
    if n == 0 {
        return;
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / nf;
    let (sxy, sxx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
            let dx = i as f64 - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;
    trace!("Baseline fit: slope {slope}, intercept {intercept}");

    values
        .iter_mut()
        .enumerate()
        .for_each(|(i, v)| *v -= intercept + slope * i as f64);
}

/// Boxcar-smooth with an odd `width`. The ends are reflect-padded (the edge
/// value itself is not repeated) so the output is as long as the input.
pub fn smooth(values: &[f64], width: usize) -> Result<Vec<f64>, DataQualityWarning> {
    if width % 2 == 0 {
        return Err(DataQualityWarning::InvalidSmoothingWidth { width });
    }
    let n = values.len();
    if width == 1 {
        return Ok(values.to_vec());
    }
    let pad = (width - 1) / 2;
    if n == 0 || pad > n - 1 {
        return Err(DataQualityWarning::SmoothingTooWide { width, len: n });
    }

    let padded: Vec<f64> = (1..=pad)
        .rev()
        .map(|i| values[i])
        .chain(values.iter().copied())
        .chain((1..=pad).map(|i| values[n - 1 - i]))
        .collect();

    let weight = 1.0 / width as f64;
    Ok(padded
        .windows(width)
        .map(|w| w.iter().sum::<f64>() * weight)
        .collect())
}

/// The noise floor of a spectrum under the given mode.
pub fn noise_floor(values: &[f64], mode: NoiseFloor) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    match mode {
        NoiseFloor::Whole => mean(values.iter()),
        NoiseFloor::Edges { fraction } => {
            let k = ((fraction * n as f64).ceil() as usize).max(1);
            if 2 * k >= n {
                mean(values.iter())
            } else {
                mean(values[..k].iter().chain(&values[n - k..]))
            }
        }
    }
}

fn mean<'a, I: Iterator<Item = &'a f64>>(values: I) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    sum / count as f64
}

/// Subtract the noise floor, returning the level that was subtracted.
pub fn shift_noise_floor(values: &mut [f64], mode: NoiseFloor) -> f64 {
    let floor = noise_floor(values, mode);
    debug!("Noise floor ({mode:?}): {floor}");
    values.iter_mut().for_each(|v| *v -= floor);
    floor
}

/// Find the scale `k` in [-1, 5) at resolution `step` that brings the mean of
/// `target - k * reference` closest to zero. Only bins outside of the
/// `line_width`-wide window centred on `line_centre` are used. Ties are
/// resolved in favour of the smallest `|k|`.
pub fn fit_background_scale(
    target: &[f64],
    reference: &[f64],
    line_centre: usize,
    line_width: usize,
    step: f64,
) -> Result<f64, DataQualityWarning> {
    if target.len() != reference.len() {
        return Err(DataQualityWarning::CalibrationLengthMismatch {
            target: target.len(),
            reference: reference.len(),
        });
    }
    let n = target.len();
    let window_start = line_centre.saturating_sub(line_width / 2);
    let window_end = window_start.saturating_add(line_width).min(n);
    let outside = |i: &usize| *i < window_start || *i >= window_end;

    let count = (0..n).filter(outside).count();
    if count == 0 {
        return Err(DataQualityWarning::CalibrationWindowTooWide);
    }
    let (sum_t, sum_r) = (0..n)
        .filter(outside)
        .fold((0.0, 0.0), |(t, r), i| (t + target[i], r + reference[i]));
    let mean_t = sum_t / count as f64;
    let mean_r = sum_r / count as f64;

    let step = if step.is_finite() && step > 0.0 {
        step
    } else {
        debug!("Invalid calibration step {step}; using {DEFAULT_CALIBRATION_STEP}");
        DEFAULT_CALIBRATION_STEP
    };
    let num_steps = ((CALIBRATION_SCALE_MAX - CALIBRATION_SCALE_MIN) / step).ceil() as usize;

    let mut best_k = CALIBRATION_SCALE_MIN;
    let mut best_residual = f64::INFINITY;
    for i in 0..num_steps {
        let k = CALIBRATION_SCALE_MIN + i as f64 * step;
        if k >= CALIBRATION_SCALE_MAX {
            break;
        }
        let residual = (mean_t - k * mean_r).abs();
        if residual < best_residual || (residual == best_residual && k.abs() < best_k.abs()) {
            best_k = k;
            best_residual = residual;
        }
    }
    debug!("Calibration scale {best_k} (mean residual {best_residual})");

    Ok(best_k)
}
