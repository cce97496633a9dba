// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters for the `radioline` pipelines.
//!
//! The code here is kind of "mirroring" the code within the `cli` module; the
//! idea is that `cli` is unparsed, user-facing code, whereas parameters have
//! been parsed and validated, and are ready to be used directly. Parameters
//! are constructed once and never modified by the pipelines that consume
//! them.

mod observe;
mod reduce;

pub use observe::{Observation, ObservationParams, ObserveError, SourceParams};
pub use reduce::{ReduceError, ReduceParams, Reduction};

use std::ops::Range;

use crate::{accumulate::dc_offset_crop, constants::DC_OFFSET_MIN_SAMPLE_RATE};

/// Where the SDR is tuned relative to the sky frequency of interest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// The sky frequency at the centre of the band of interest \[Hz\].
    pub center_frequency: f64,

    /// \[Hz\]
    pub sample_rate: f64,

    /// The local oscillator of an external up/downconverter \[Hz\]. Zero if
    /// the SDR sees the sky frequency directly.
    pub lo_frequency: f64,

    /// How far below the target the SDR is tuned to keep the DC spike out of
    /// the band of interest \[Hz\]. Zero if DC avoidance is off.
    pub dc_offset: f64,
}

impl Tuning {
    /// DC avoidance is only possible when `sample_rate` is at least
    /// [`DC_OFFSET_MIN_SAMPLE_RATE`]; otherwise it is quietly turned off (see
    /// [`Tuning::dc_offset_refused`]).
    pub fn new(center_frequency: f64, sample_rate: f64, lo_frequency: f64, avoid_dc: bool) -> Self {
        let dc_offset = if avoid_dc && sample_rate >= DC_OFFSET_MIN_SAMPLE_RATE {
            sample_rate / 4.0
        } else {
            0.0
        };
        Self {
            center_frequency,
            sample_rate,
            lo_frequency,
            dc_offset,
        }
    }

    /// Whether DC avoidance was asked for but the sample rate is too narrow
    /// for it.
    pub fn dc_offset_refused(avoid_dc: bool, sample_rate: f64) -> bool {
        avoid_dc && sample_rate < DC_OFFSET_MIN_SAMPLE_RATE
    }

    /// The frequency the SDR itself is tuned to \[Hz\].
    pub fn sdr_frequency(&self) -> f64 {
        self.center_frequency - self.lo_frequency - self.dc_offset
    }

    /// The bins to keep from a `bins`-long spectrum, if any are to be
    /// dropped.
    pub fn crop(&self, bins: usize) -> Option<Range<usize>> {
        if self.dc_offset == 0.0 {
            None
        } else {
            Some(dc_offset_crop(bins))
        }
    }

    /// The number of bins left after [`Tuning::crop`].
    pub fn kept_bins(&self, bins: usize) -> usize {
        self.crop(bins).map(|r| r.len()).unwrap_or(bins)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotParams {
    /// The (min, max) of the power axis; `None` fits the data.
    pub y_limits: Option<(f64, f64)>,
}
