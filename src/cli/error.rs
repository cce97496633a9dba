// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all radioline-related errors. This should be the *only*
//! error enum that is publicly visible from the command-line interface.

use thiserror::Error;

use super::{
    common::ConditioningArgsError, info::InfoArgsError, observe::ObserveArgsError,
    plot::PlotArgsError, reduce::ReduceArgsError,
};
use crate::{
    accumulate::AcquisitionError,
    observation::{ObservationReadError, ObservationWriteError},
    params::{ObserveError, ReduceError},
    plot::PlotError,
    source::SourceError,
};

/// The *only* publicly visible error from the radioline CLI. Each variant is
/// a category of problem; the message says what to look at.
#[derive(Error, Debug)]
pub enum RadiolineError {
    /// Bad or missing parameters, detected before any samples are read.
    #[error("{0}\n\nNothing was acquired. Use --dry-run to check arguments without touching the hardware.")]
    Configuration(String),

    /// The sample stream failed part of the way through an acquisition.
    #[error("{0}\n\nThe acquisition was abandoned and nothing was written.")]
    Acquisition(String),

    /// An observation record couldn't be read or written.
    #[error("{0}")]
    Persistence(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files are TOML or JSON versions of the command-line arguments; --save-toml writes one.")]
    ArgFile(String),

    /// An error related to plotting.
    #[error("{0}")]
    Plot(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

// Binary sub-command errors.

impl From<ObserveArgsError> for RadiolineError {
    fn from(e: ObserveArgsError) -> Self {
        match e {
            ObserveArgsError::Conditioning(e) => Self::from(e),
            _ => Self::Configuration(e.to_string()),
        }
    }
}

impl From<ReduceArgsError> for RadiolineError {
    fn from(e: ReduceArgsError) -> Self {
        match e {
            ReduceArgsError::Conditioning(e) => Self::from(e),
            ReduceArgsError::NoInput
            | ReduceArgsError::SameInputAndOutput(_)
            | ReduceArgsError::BadLayout(_)
            | ReduceArgsError::BadPowerScale(_)
            | ReduceArgsError::BadYLimits(_) => Self::Configuration(e.to_string()),
            #[cfg(not(feature = "plotting"))]
            ReduceArgsError::NoPlottingFeature => Self::Configuration(e.to_string()),
        }
    }
}

impl From<InfoArgsError> for RadiolineError {
    fn from(e: InfoArgsError) -> Self {
        match e {
            InfoArgsError::NoFiles => Self::Configuration(e.to_string()),
            InfoArgsError::Read(e) => Self::from(e),
        }
    }
}

impl From<PlotArgsError> for RadiolineError {
    fn from(e: PlotArgsError) -> Self {
        match e {
            PlotArgsError::NoFiles | PlotArgsError::BadPowerScale(_) | PlotArgsError::BadYLimits(_) => {
                Self::Configuration(e.to_string())
            }
            PlotArgsError::Read(e) => Self::from(e),
            PlotArgsError::Plot(e) => Self::from(e),
        }
    }
}

impl From<ConditioningArgsError> for RadiolineError {
    fn from(e: ConditioningArgsError) -> Self {
        let s = e.to_string();
        match e {
            ConditioningArgsError::UnknownNoiseFloorMode(_)
            | ConditioningArgsError::InvalidEdgeFraction(_)
            | ConditioningArgsError::InvalidCalibrationStep(_)
            | ConditioningArgsError::NonFiniteCalibrationScale(_) => Self::Configuration(s),
            ConditioningArgsError::CalibrationRead(_) => Self::Persistence(s),
        }
    }
}

// Library code errors.

impl From<ObserveError> for RadiolineError {
    fn from(e: ObserveError) -> Self {
        let s = e.to_string();
        match e {
            // Sources are only opened before acquisition starts.
            ObserveError::Source(_) | ObserveError::Velocity(_) => Self::Configuration(s),
            ObserveError::Acquisition(e) => Self::from(e),
            ObserveError::Write(e) => Self::from(e),
            ObserveError::Plot(e) => Self::from(e),
            ObserveError::Clock(_) => Self::Generic(s),
        }
    }
}

impl From<ReduceError> for RadiolineError {
    fn from(e: ReduceError) -> Self {
        match e {
            ReduceError::Read(e) => Self::from(e),
            ReduceError::Write(e) => Self::from(e),
            ReduceError::Plot(e) => Self::from(e),
        }
    }
}

impl From<SourceError> for RadiolineError {
    fn from(e: SourceError) -> Self {
        let s = e.to_string();
        match e {
            SourceError::ShortRead { .. } | SourceError::StreamNotActive | SourceError::IO(_) => {
                Self::Acquisition(s)
            }
            SourceError::InvalidSampleRate(_)
            | SourceError::UnsupportedFrequency { .. }
            | SourceError::OpenIqFile { .. } => Self::Configuration(s),
            #[cfg(not(feature = "soapy"))]
            SourceError::NoSoapyFeature => Self::Configuration(s),
            #[cfg(feature = "soapy")]
            SourceError::Soapy(_) => Self::Configuration(s),
        }
    }
}

impl From<AcquisitionError> for RadiolineError {
    fn from(e: AcquisitionError) -> Self {
        let s = e.to_string();
        match e {
            AcquisitionError::ZeroFftNum | AcquisitionError::Estimate(_) => {
                Self::Configuration(s)
            }
            AcquisitionError::StartStream(_)
            | AcquisitionError::Read { .. }
            | AcquisitionError::StopStream(_) => Self::Acquisition(s),
        }
    }
}

impl From<ObservationReadError> for RadiolineError {
    fn from(e: ObservationReadError) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<ObservationWriteError> for RadiolineError {
    fn from(e: ObservationWriteError) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<PlotError> for RadiolineError {
    fn from(e: PlotError) -> Self {
        Self::Plot(e.to_string())
    }
}

impl From<std::io::Error> for RadiolineError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
