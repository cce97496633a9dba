// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Spectral-line observations with a software-defined radio (SDR).

Complex baseband samples are read from a [`source::SampleSource`], turned into
power spectra and averaged by an [`accumulate::Accumulator`], conditioned
(baseline, smoothing, noise floor and background calibration) by a
[`condition::Conditioner`], and finally saved against radial velocity as an
[`observation::ObservationRecord`].
 */

pub mod accumulate;
mod cli;
pub mod condition;
pub mod constants;
pub mod geometry;
pub mod lines;
pub mod observation;
pub mod params;
pub mod plot;
pub mod quality;
pub mod source;
pub mod spectrum;
pub mod velocity;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

/// Should progress bars be drawn? Set by the command-line interface; library
/// callers opt in per [`accumulate::Accumulator`].
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

// Re-exports.
pub use cli::{Radioline, RadiolineError};
pub use observation::{ObservationMetadata, ObservationRecord, RecordLayout};
pub use params::{ObservationParams, ReduceParams};
