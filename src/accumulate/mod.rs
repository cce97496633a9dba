// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Averaging many power spectra from a sample stream into one.


use std::ops::Range;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, trace};
use thiserror::Error;

use crate::{
    constants::DC_OFFSET_CROP_FRACTION,
    quality::DataQualityWarning,
    source::{SampleSource, SourceError, StreamGuard},
    spectrum::{EstimateError, SpectralEstimator},
};

/// The result of an acquisition: the mean power spectrum and its frequency
/// axis. Any bad bins have already been replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulated {
    /// \[Hz\]
    pub frequencies: Vec<f64>,
    /// Linear power.
    pub power: Vec<f64>,
    pub warnings: Vec<DataQualityWarning>,
}

impl Accumulated {
    /// Keep only the bins in `range`, from both the frequencies and the
    /// power.
    pub fn crop(&mut self, range: Range<usize>) {
        let end = range.end.min(self.power.len());
        let start = range.start.min(end);
        debug!("Keeping bins {start}..{end} of {}", self.power.len());
        self.frequencies.truncate(end);
        self.frequencies.drain(..start);
        self.power.truncate(end);
        self.power.drain(..start);
    }
}

/// The bins worth keeping after tuning below the target to dodge the DC
/// spike: the upper half of the band, less `ceil(0.1 * bins)` bins at either
/// end to avoid the spike and the filter roll-off.
pub fn dc_offset_crop(bins: usize) -> Range<usize> {
    let edge = (DC_OFFSET_CROP_FRACTION * bins as f64).ceil() as usize;
    let start = bins / 2 + edge;
    let end = bins.saturating_sub(edge).max(start);
    start..end
}

#[derive(Debug, Clone)]
pub struct Accumulator {
    bins: usize,
    fft_num: usize,
    /// Added to the source's centre frequency to get the centre of the
    /// frequency axis, e.g. the local oscillator of an up/downconverter.
    frequency_offset: f64,
    draw_progress_bar: bool,
}

impl Accumulator {
    pub fn new(bins: usize, fft_num: usize) -> Result<Self, AcquisitionError> {
        if bins == 0 {
            return Err(EstimateError::ZeroBins.into());
        }
        if fft_num == 0 {
            return Err(AcquisitionError::ZeroFftNum);
        }
        Ok(Self {
            bins,
            fft_num,
            frequency_offset: 0.0,
            draw_progress_bar: false,
        })
    }

    pub fn with_frequency_offset(mut self, offset_hz: f64) -> Self {
        self.frequency_offset = offset_hz;
        self
    }

    pub fn with_progress_bar(mut self, draw: bool) -> Self {
        self.draw_progress_bar = draw;
        self
    }

    /// Read `fft_num` blocks from the source, averaging their power spectra.
    /// The stream is stopped before this function returns, whether or not
    /// the acquisition succeeded. A failed read aborts the acquisition; no
    /// partial spectrum is returned.
    pub fn collect<S: SampleSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Accumulated, AcquisitionError> {
        let frequencies = frequency_axis(
            source.center_frequency() + self.frequency_offset,
            source.sample_rate(),
            self.bins,
        );
        let mut estimator = SpectralEstimator::new(self.bins)?;
        let mut sum = vec![0.0; self.bins];

        let progress = ProgressBar::with_draw_target(
            Some(self.fft_num as _),
            if self.draw_progress_bar {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:10}: [{wide_bar:.blue}] {pos}/{len} spectra ({elapsed_precise}<{eta_precise})")
                .unwrap()
                .progress_chars("=> "),
        )
        .with_position(0)
        .with_message("Acquiring");

        debug!(
            "Acquiring {} spectra of {} bins centred on {} Hz",
            self.fft_num,
            self.bins,
            source.center_frequency() + self.frequency_offset
        );
        let mut stream = StreamGuard::start(source).map_err(AcquisitionError::StartStream)?;
        for i_block in 0..self.fft_num {
            let block = stream
                .read_block(self.bins)
                .map_err(|err| AcquisitionError::Read {
                    block: i_block,
                    total: self.fft_num,
                    err,
                })?;
            estimator.accumulate(&block, &mut sum)?;
            progress.inc(1);
        }
        stream.finish().map_err(AcquisitionError::StopStream)?;
        progress.abandon_with_message("Acquired");

        let n = self.fft_num as f64;
        sum.iter_mut().for_each(|v| *v /= n);

        let mut warnings = vec![];
        if let Some(w) = recover_bad_bins(&frequencies, &mut sum) {
            warnings.push(w);
        }

        Ok(Accumulated {
            frequencies,
            power: sum,
            warnings,
        })
    }
}

/// `bins` evenly-spaced frequencies from `center - rate/2` to
/// `center + rate/2`, both inclusive.
pub fn frequency_axis(center: f64, sample_rate: f64, bins: usize) -> Vec<f64> {
    let start = center - sample_rate / 2.0;
    let stop = center + sample_rate / 2.0;
    match bins {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / (bins - 1) as f64;
            let mut axis: Vec<f64> = (0..bins).map(|i| start + i as f64 * step).collect();
            axis[bins - 1] = stop;
            axis
        }
    }
}

/// Replace bins that are non-finite or exactly zero by linearly interpolating
/// (over frequency) between the nearest good bins on either side. Bins
/// outside the good range take the value of the nearest good bin.
///
/// Returns a warning if anything was (or couldn't be) replaced.
pub fn recover_bad_bins(frequencies: &[f64], power: &mut [f64]) -> Option<DataQualityWarning> {
    let is_bad = |v: f64| !v.is_finite() || v == 0.0;
    let bad: Vec<usize> = power
        .iter()
        .enumerate()
        .filter(|(_, v)| is_bad(**v))
        .map(|(i, _)| i)
        .collect();
    if bad.is_empty() {
        return None;
    }
    let good: Vec<usize> = (0..power.len()).filter(|&i| !is_bad(power[i])).collect();
    if good.is_empty() {
        return Some(DataQualityWarning::NoValidBins {
            num_bins: power.len(),
        });
    }

    for &i in &bad {
        // `good` is sorted, and `i` isn't in it.
        let pos = good.partition_point(|&g| g < i);
        let value = match (pos.checked_sub(1).map(|p| good[p]), good.get(pos)) {
            (Some(lo), Some(&hi)) => {
                let (x0, x1) = (frequencies[lo], frequencies[hi]);
                let t = (frequencies[i] - x0) / (x1 - x0);
                power[lo] + t * (power[hi] - power[lo])
            }
            (Some(lo), None) => power[lo],
            (None, Some(&hi)) => power[hi],
            (None, None) => unreachable!("there is at least one good bin"),
        };
        trace!("Bin {i} ({} Hz) replaced with {value}", frequencies[i]);
        power[i] = value;
    }

    Some(DataQualityWarning::BadBinsReplaced { indices: bad })
}

/// Acquisition could not produce a spectrum.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("The number of spectra to average must be at least 1")]
    ZeroFftNum,

    #[error("Couldn't start the sample stream: {0}")]
    StartStream(SourceError),

    #[error("Acquisition failed on block {} of {total}: {err}", .block + 1)]
    Read {
        block: usize,
        total: usize,
        err: SourceError,
    },

    #[error("Couldn't stop the sample stream: {0}")]
    StopStream(SourceError),

    #[error(transparent)]
    Estimate(#[from] EstimateError),
}
