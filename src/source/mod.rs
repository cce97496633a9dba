// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sources of complex (I/Q) samples.
//!
//! The acquisition code only ever talks to a [`SampleSource`]; concrete
//! adapters exist for SoapySDR hardware (the "soapy" feature) and for files of
//! previously-recorded samples.

mod error;
mod file;
#[cfg(feature = "soapy")]
mod soapy;

pub use error::SourceError;
pub use file::IqFileSource;
#[cfg(feature = "soapy")]
pub use soapy::{list_drivers, SoapyConfig, SoapySource};

use log::{debug, warn};
use num_complex::Complex;

/// One block of samples, exactly as long as was asked for.
pub type SampleBlock = Vec<Complex<f32>>;

/// Something that streams complex samples at a known centre frequency and
/// sample rate.
///
/// Implementors must fail a read with [`SourceError::ShortRead`] rather than
/// returning fewer samples than requested.
pub trait SampleSource {
    /// The frequency the source is tuned to \[Hz\].
    fn center_frequency(&self) -> f64;

    /// The rate at which samples are produced \[Hz\].
    fn sample_rate(&self) -> f64;

    fn start_stream(&mut self) -> Result<(), SourceError>;

    /// Read exactly `bins` samples.
    fn read_block(&mut self, bins: usize) -> Result<SampleBlock, SourceError>;

    fn stop_stream(&mut self) -> Result<(), SourceError>;
}

/// A started stream. The stream is stopped when this guard is finished or
/// dropped, whichever happens first; this includes unwinding from a panic.
pub struct StreamGuard<'a, S: SampleSource + ?Sized> {
    source: &'a mut S,
    active: bool,
}

impl<'a, S: SampleSource + ?Sized> StreamGuard<'a, S> {
    pub fn start(source: &'a mut S) -> Result<Self, SourceError> {
        source.start_stream()?;
        debug!("Sample stream started");
        Ok(Self {
            source,
            active: true,
        })
    }

    pub fn read_block(&mut self, bins: usize) -> Result<SampleBlock, SourceError> {
        if !self.active {
            return Err(SourceError::StreamNotActive);
        }
        let block = self.source.read_block(bins)?;
        if block.len() != bins {
            return Err(SourceError::ShortRead {
                expected: bins,
                got: block.len(),
            });
        }
        Ok(block)
    }

    /// Stop the stream, reporting any error in doing so.
    pub fn finish(mut self) -> Result<(), SourceError> {
        self.active = false;
        let result = self.source.stop_stream();
        debug!("Sample stream stopped");
        result
    }
}

impl<S: SampleSource + ?Sized> Drop for StreamGuard<'_, S> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            match self.source.stop_stream() {
                Ok(()) => debug!("Sample stream stopped early"),
                Err(e) => warn!("Couldn't stop the sample stream: {e}"),
            }
        }
    }
}

/// List the names of the SDR drivers that can be opened.
#[cfg(not(feature = "soapy"))]
pub fn list_drivers() -> Result<Vec<String>, SourceError> {
    Err(SourceError::NoSoapyFeature)
}
