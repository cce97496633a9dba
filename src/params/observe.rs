// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use hifitime::Epoch;
use log::{debug, info};
use thiserror::Error;

use super::{PlotParams, Tuning};
use crate::{
    accumulate::{AcquisitionError, Accumulated, Accumulator},
    condition::{ConditionReport, Conditioner},
    geometry::{MarluGeometry, Observatory, ObservatoryGeometry, Pointing},
    observation::{
        observation_file_name, ObservationMetadata, ObservationRecord, ObservationWriteError,
        RecordLayout,
    },
    plot::{plot_record, PlotError},
    quality::DataQualityWarning,
    source::{IqFileSource, SampleSource, SourceError},
    spectrum::PowerScale,
    velocity::{to_velocity, VelocityError},
    PROGRESS_BARS,
};

/// Where samples come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceParams {
    /// Previously recorded cf32 samples.
    IqFile(PathBuf),

    /// SDR hardware via SoapySDR. Only usable with the "soapy" feature.
    Soapy {
        driver: String,
        /// \[parts per million\]
        ppm: f64,
        channel: usize,
    },
}

impl SourceParams {
    /// Open the source, tuned to `center_freq`.
    pub fn open(
        &self,
        center_freq: f64,
        sample_rate: f64,
    ) -> Result<Box<dyn SampleSource>, SourceError> {
        match self {
            SourceParams::IqFile(path) => Ok(Box::new(IqFileSource::open(
                path,
                center_freq,
                sample_rate,
            )?)),

            #[cfg(feature = "soapy")]
            SourceParams::Soapy {
                driver,
                ppm,
                channel,
            } => {
                use crate::source::{SoapyConfig, SoapySource};

                Ok(Box::new(SoapySource::open(SoapyConfig {
                    driver: driver.clone(),
                    center_freq,
                    sample_rate,
                    ppm: *ppm,
                    channel: *channel,
                })?))
            }

            #[cfg(not(feature = "soapy"))]
            SourceParams::Soapy { .. } => Err(SourceError::NoSoapyFeature),
        }
    }
}

/// Everything needed to make one observation.
#[derive(Debug, Clone)]
pub struct ObservationParams {
    pub source: SourceParams,
    pub tuning: Tuning,

    /// The number of frequency bins (FFT length).
    pub bins: usize,

    /// The number of spectra averaged together.
    pub fft_num: usize,

    pub power_scale: PowerScale,
    pub conditioner: Conditioner,
    pub observatory: Observatory,
    pub pointing: Pointing,
    pub lsr_correct: bool,

    /// The name of the line being observed; used in file names and plots.
    pub spectral_line: String,

    /// \[Hz\]
    pub rest_frequency: f64,

    /// The time recorded against the observation. If `None`, the time the
    /// acquisition finished is used.
    pub time: Option<Epoch>,

    pub output_dir: PathBuf,
    pub layout: RecordLayout,

    /// Write the record to `output_dir`?
    pub write: bool,

    /// Plot the record into `output_dir`?
    pub plot: Option<PlotParams>,
}

/// The result of a successful observation.
#[derive(Debug, Clone)]
pub struct Observation {
    pub record: ObservationRecord,
    /// Where the record was written, if it was.
    pub path: Option<PathBuf>,
    /// Where the plot was written, if it was.
    pub plot: Option<PathBuf>,
    pub report: ConditionReport,
    /// Everything that was worked around, from acquisition and conditioning.
    pub warnings: Vec<DataQualityWarning>,
}

impl ObservationParams {
    pub fn run(&self) -> Result<Observation, ObserveError> {
        self.run_with_geometry(&MarluGeometry::default())
    }

    /// Acquire, condition, locate and persist one observation. If anything
    /// fails before the record is complete, nothing is written.
    pub fn run_with_geometry<G: ObservatoryGeometry + ?Sized>(
        &self,
        geometry: &G,
    ) -> Result<Observation, ObserveError> {
        let Tuning {
            center_frequency,
            sample_rate,
            lo_frequency,
            dc_offset,
        } = self.tuning;
        debug!(
            "Tuning the SDR to {} Hz (centre {center_frequency} Hz, LO {lo_frequency} Hz, DC offset {dc_offset} Hz)",
            self.tuning.sdr_frequency()
        );
        let mut source = self
            .source
            .open(self.tuning.sdr_frequency(), sample_rate)?;

        let mut acquired = Accumulator::new(self.bins, self.fft_num)?
            .with_frequency_offset(lo_frequency)
            .with_progress_bar(PROGRESS_BARS.load())
            .collect(source.as_mut())?;
        drop(source);
        let time = match self.time {
            Some(t) => t,
            None => Epoch::now().map_err(|e| ObserveError::Clock(e.to_string()))?,
        };
        if let Some(range) = self.tuning.crop(self.bins) {
            acquired.crop(range);
        }

        let Accumulated {
            frequencies,
            mut power,
            mut warnings,
        } = acquired;
        self.power_scale.apply(&mut power);
        let report = self.conditioner.condition(&mut power);
        warnings.extend(report.warnings.iter().cloned());

        let position = geometry.locate(&self.observatory, self.pointing, time, self.lsr_correct);
        debug!(
            "(RA, Dec) = ({:.4}°, {:.4}°), (l, b) = ({:.4}°, {:.4}°), LSR correction {:.4} km/s",
            position.equatorial.0,
            position.equatorial.1,
            position.galactic.0,
            position.galactic.1,
            position.lsr_correction
        );
        let velocities = to_velocity(&frequencies, self.rest_frequency, position.lsr_correction)?;

        let record = ObservationRecord::new(
            frequencies,
            velocities,
            power,
            ObservationMetadata {
                time,
                horizontal: Some(position.horizontal),
                equatorial: position.equatorial,
                galactic: position.galactic,
                lsr_correction: position.lsr_correction,
                rest_frequency: Some(self.rest_frequency),
                spectral_line: Some(self.spectral_line.clone()),
            },
        )?;

        let file_name = observation_file_name(&self.spectral_line, time, self.layout);
        let path = if self.write {
            self.create_output_dir()?;
            let path = self.output_dir.join(&file_name);
            record.write(&path, self.layout)?;
            info!("Wrote {}", path.display());
            Some(path)
        } else {
            None
        };

        let plot = match self.plot {
            Some(PlotParams { y_limits }) => {
                self.create_output_dir()?;
                let png = self.output_dir.join(file_name).with_extension("png");
                plot_record(&record, &png, y_limits, self.power_scale.unit())?;
                Some(png)
            }
            None => None,
        };

        Ok(Observation {
            record,
            path,
            plot,
            report,
            warnings,
        })
    }

    fn create_output_dir(&self) -> Result<(), ObservationWriteError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|err| ObservationWriteError::CreateDir {
            dir: self.output_dir.display().to_string(),
            err,
        })
    }
}

#[derive(Error, Debug)]
pub enum ObserveError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Velocity(#[from] VelocityError),

    #[error(transparent)]
    Write(#[from] ObservationWriteError),

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error("Couldn't read the system clock: {0}")]
    Clock(String),
}
