// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Problems with the data that are worked around rather than treated as
//! errors. Processing stages hand these back to their caller alongside their
//! results.

use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataQualityWarning {
    #[error("Replaced {} bad bin(s) by interpolation at indices: {}", .indices.len(), .indices.iter().join(", "))]
    BadBinsReplaced { indices: Vec<usize> },

    #[error("All {num_bins} bins of the spectrum are bad; nothing could be interpolated")]
    NoValidBins { num_bins: usize },

    #[error("Smoothing width {width} is not a positive odd number; smoothing was skipped")]
    InvalidSmoothingWidth { width: usize },

    #[error("Smoothing width {width} is too large for a spectrum of {len} bins; smoothing was skipped")]
    SmoothingTooWide { width: usize, len: usize },

    #[error("The calibration reference has {reference} bins but the spectrum has {target}; calibration was skipped")]
    CalibrationLengthMismatch { target: usize, reference: usize },

    #[error("The calibration exclusion window covers the whole spectrum; calibration was skipped")]
    CalibrationWindowTooWide,
}
