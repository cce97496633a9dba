// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Power spectra from blocks of complex samples.
//!
//! Spectra are always estimated as linear power, `(|X_k| / bins)^2`, with the
//! zero-frequency bin moved to the centre (index `bins / 2`). Conversion to
//! decibels happens once per observation, after averaging and bad-bin
//! recovery (see [`PowerScale`]).


use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

/// Estimates power spectra of a fixed length. The FFT plan and working buffers
/// are re-used between blocks.
pub struct SpectralEstimator {
    bins: usize,
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl std::fmt::Debug for SpectralEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralEstimator")
            .field("bins", &self.bins)
            .finish()
    }
}

impl SpectralEstimator {
    pub fn new(bins: usize) -> Result<Self, EstimateError> {
        if bins == 0 {
            return Err(EstimateError::ZeroBins);
        }
        let fft = FftPlanner::new().plan_fft_forward(bins);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Ok(Self {
            bins,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); bins],
            scratch,
        })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// The centred power spectrum of `block`.
    pub fn estimate(&mut self, block: &[Complex<f32>]) -> Result<Vec<f64>, EstimateError> {
        let mut spectrum = vec![0.0; self.bins];
        self.accumulate(block, &mut spectrum)?;
        Ok(spectrum)
    }

    /// Add the centred power spectrum of `block` into `sum`.
    pub fn accumulate(
        &mut self,
        block: &[Complex<f32>],
        sum: &mut [f64],
    ) -> Result<(), EstimateError> {
        if block.len() != self.bins {
            return Err(EstimateError::LengthMismatch {
                expected: self.bins,
                got: block.len(),
            });
        }
        if sum.len() != self.bins {
            return Err(EstimateError::LengthMismatch {
                expected: self.bins,
                got: sum.len(),
            });
        }

        for (b, s) in self.buffer.iter_mut().zip(block) {
            *b = Complex::new(f64::from(s.re), f64::from(s.im));
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Shifting while summing: output index i holds FFT index
        // (i + bins - bins/2) % bins, i.e. numpy's fftshift.
        let norm = self.bins as f64;
        let half = self.bins / 2;
        for (i, s) in sum.iter_mut().enumerate() {
            let k = (i + self.bins - half) % self.bins;
            *s += (self.buffer[k].norm() / norm).powi(2);
        }
        Ok(())
    }
}

/// Convenience wrapper around [`SpectralEstimator`] for a single block.
pub fn estimate(block: &[Complex<f32>], bins: usize) -> Result<Vec<f64>, EstimateError> {
    SpectralEstimator::new(bins)?.estimate(block)
}

/// Move the zero-frequency component to the centre of the slice.
pub fn fft_shift<T>(values: &mut [T]) {
    let half = values.len() / 2;
    values.rotate_right(half);
}

/// How power values are expressed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PowerScale {
    /// `10 * log10(power)`.
    #[default]
    #[strum(serialize = "db")]
    #[serde(rename = "db")]
    Decibels,

    #[strum(serialize = "linear")]
    Linear,
}

impl PowerScale {
    /// Convert linear power values to this scale in place.
    pub fn apply(self, values: &mut [f64]) {
        match self {
            PowerScale::Decibels => values.iter_mut().for_each(|v| *v = 10.0 * v.log10()),
            PowerScale::Linear => (),
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            PowerScale::Decibels => "dB",
            PowerScale::Linear => "linear power",
        }
    }
}

#[derive(Error, Debug)]
pub enum EstimateError {
    #[error("A spectrum must have at least one bin")]
    ZeroBins,

    #[error("Expected a block of {expected} samples, but got {got}")]
    LengthMismatch { expected: usize, got: usize },
}
