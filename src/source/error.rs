// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Expected {expected} samples from the sample stream, but only got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("Attempted to read from a sample stream that isn't running")]
    StreamNotActive,

    #[error("The sample rate must be a positive number of Hz; got {0}")]
    InvalidSampleRate(f64),

    #[error("The centre frequency {freq} Hz is outside of the tunable range of the device ({ranges})")]
    UnsupportedFrequency { freq: f64, ranges: String },

    #[error("Couldn't open I/Q file '{path}': {err}")]
    OpenIqFile {
        path: PathBuf,
        err: std::io::Error,
    },

    #[cfg(not(feature = "soapy"))]
    #[error("radioline was not compiled with the \"soapy\" feature; SDR hardware can't be used.\nCompile radioline with this feature, or supply an I/Q file instead")]
    NoSoapyFeature,

    #[cfg(feature = "soapy")]
    #[error("SoapySDR error: {0}")]
    Soapy(#[from] soapysdr::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
