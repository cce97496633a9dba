// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;

use super::{InfoPrinter, Warn};
use crate::{
    condition::{Calibration, Conditioner, NoiseFloor, NoiseFloorMode},
    constants::{
        DEFAULT_CALIBRATION_LINE_WIDTH, DEFAULT_CALIBRATION_STEP,
        DEFAULT_NOISE_FLOOR_EDGE_FRACTION, DEFAULT_SMOOTHING,
    },
    observation::{ObservationReadError, ObservationRecord},
};

lazy_static::lazy_static! {
    static ref NOISE_FLOOR_HELP: String =
        format!("How the noise floor is estimated before it is subtracted from the spectrum. \"edges\" uses bins at both ends of the band, \"whole\" uses every bin and \"none\" leaves the spectrum alone. Supported modes: {}", NoiseFloorMode::iter().join(", "));

    static ref EDGE_FRACTION_HELP: String =
        format!("The fraction of bins at each end of the band used by the \"edges\" noise-floor mode. Default: {DEFAULT_NOISE_FLOOR_EDGE_FRACTION}");

    static ref CALIBRATION_LINE_WIDTH_HELP: String =
        format!("The number of bins around the line centre left out of the background fit. Default: {DEFAULT_CALIBRATION_LINE_WIDTH}");

    static ref CALIBRATION_STEP_HELP: String =
        format!("The resolution of the search for the background reference's scale. Default: {DEFAULT_CALIBRATION_STEP}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(in crate::cli) struct ConditioningArgs {
    /// The width of the boxcar used to smooth the spectrum [bins]. Must be
    /// odd; 1 (the default) disables smoothing.
    #[clap(long, help_heading = "CONDITIONING")]
    pub(in crate::cli) smoothing: Option<usize>,

    #[clap(long, help = NOISE_FLOOR_HELP.as_str(), help_heading = "CONDITIONING")]
    pub(in crate::cli) noise_floor: Option<String>,

    #[clap(long, help = EDGE_FRACTION_HELP.as_str(), help_heading = "CONDITIONING")]
    pub(in crate::cli) noise_floor_edge_fraction: Option<f64>,

    /// A saved observation of blank sky (or a terminated input) used to
    /// remove the shape of the receiver's bandpass. It is scaled and
    /// subtracted from the spectrum, after any noise-floor shift. It must have
    /// as many bins as the spectrum being conditioned.
    #[clap(long, help_heading = "CONDITIONING")]
    pub(in crate::cli) calibration: Option<PathBuf>,

    /// The bin that the spectral line is expected at; bins around it are left
    /// out of the background fit. Default: the middle bin.
    #[clap(long, help_heading = "CONDITIONING")]
    pub(in crate::cli) calibration_line_centre: Option<usize>,

    #[clap(long, help = CALIBRATION_LINE_WIDTH_HELP.as_str(), help_heading = "CONDITIONING")]
    pub(in crate::cli) calibration_line_width: Option<usize>,

    #[clap(long, help = CALIBRATION_STEP_HELP.as_str(), help_heading = "CONDITIONING")]
    pub(in crate::cli) calibration_step: Option<f64>,

    /// Scale the background reference by this much instead of searching for
    /// the best scale.
    #[clap(long, help_heading = "CONDITIONING")]
    pub(in crate::cli) calibration_scale: Option<f64>,
}

impl ConditioningArgs {
    pub(in crate::cli) fn merge(self, other: Self) -> Self {
        Self {
            smoothing: self.smoothing.or(other.smoothing),
            noise_floor: self.noise_floor.or(other.noise_floor),
            noise_floor_edge_fraction: self
                .noise_floor_edge_fraction
                .or(other.noise_floor_edge_fraction),
            calibration: self.calibration.or(other.calibration),
            calibration_line_centre: self
                .calibration_line_centre
                .or(other.calibration_line_centre),
            calibration_line_width: self.calibration_line_width.or(other.calibration_line_width),
            calibration_step: self.calibration_step.or(other.calibration_step),
            calibration_scale: self.calibration_scale.or(other.calibration_scale),
        }
    }

    /// `expected_bins` is how long the spectrum being conditioned will be, if
    /// it's known; a calibration reference of any other length is reported
    /// now, rather than after an acquisition.
    pub(in crate::cli) fn parse(
        self,
        baseline: bool,
        default_noise_floor: NoiseFloorMode,
        expected_bins: Option<usize>,
    ) -> Result<Conditioner, ConditioningArgsError> {
        let Self {
            smoothing,
            noise_floor,
            noise_floor_edge_fraction,
            calibration,
            calibration_line_centre,
            calibration_line_width,
            calibration_step,
            calibration_scale,
        } = self;

        let mut printer = InfoPrinter::new("Conditioning".into());
        let baseline_line = if baseline {
            "Removing the baseline slope"
        } else {
            "Not removing the baseline slope"
        };
        printer.push_line(baseline_line.into());

        let smoothing = smoothing.unwrap_or(DEFAULT_SMOOTHING);
        match smoothing {
            1 => (),
            w if w % 2 == 0 => format!(
                "Smoothing width {w} is not a positive odd number; the spectrum won't be smoothed"
            )
            .warn(),
            w => printer.push_line(format!("Smoothing over {w} bins").into()),
        }

        let mode = match noise_floor {
            Some(s) => NoiseFloorMode::from_str(&s.trim().to_lowercase())
                .map_err(|_| ConditioningArgsError::UnknownNoiseFloorMode(s))?,
            None => default_noise_floor,
        };
        let edge_fraction = noise_floor_edge_fraction.unwrap_or(DEFAULT_NOISE_FLOOR_EDGE_FRACTION);
        if !(edge_fraction > 0.0 && edge_fraction < 0.5) {
            return Err(ConditioningArgsError::InvalidEdgeFraction(edge_fraction));
        }
        let noise_floor = mode.into_noise_floor(edge_fraction);
        printer.push_line(
            match noise_floor {
                None => "Not shifting the noise floor".into(),
                Some(NoiseFloor::Whole) => "Shifting the noise floor (mean of all bins)".into(),
                Some(NoiseFloor::Edges { fraction }) => format!(
                    "Shifting the noise floor (mean of {}% of bins at each edge)",
                    fraction * 100.0
                )
                .into(),
            },
        );

        let calibration = match calibration {
            None => {
                if calibration_line_centre.is_some()
                    || calibration_line_width.is_some()
                    || calibration_step.is_some()
                    || calibration_scale.is_some()
                {
                    "Calibration options were given without a --calibration reference; ignoring them"
                        .warn();
                }
                None
            }

            Some(file) => {
                debug!("Reading calibration reference {}", file.display());
                let reference = ObservationRecord::read(&file)?.power;
                let step = calibration_step.unwrap_or(DEFAULT_CALIBRATION_STEP);
                if !(step.is_finite() && step > 0.0) {
                    return Err(ConditioningArgsError::InvalidCalibrationStep(step));
                }
                if let Some(k) = calibration_scale {
                    if !k.is_finite() {
                        return Err(ConditioningArgsError::NonFiniteCalibrationScale(k));
                    }
                }
                if let Some(bins) = expected_bins {
                    if bins != reference.len() {
                        format!(
                            "The calibration reference {} has {} bins, but the spectrum will have {bins}; calibration will be skipped",
                            file.display(),
                            reference.len()
                        )
                        .warn();
                    }
                }

                let line_centre =
                    calibration_line_centre.unwrap_or(expected_bins.unwrap_or(reference.len()) / 2);
                let line_width = calibration_line_width.unwrap_or(DEFAULT_CALIBRATION_LINE_WIDTH);
                printer.push_block(vec![
                    format!("Subtracting the background reference {}", file.display()).into(),
                    match calibration_scale {
                        Some(k) => format!("Scaled by {k}").into(),
                        None => format!(
                            "Scale fitted outside of bins {}..{} in steps of {step}",
                            line_centre.saturating_sub(line_width / 2),
                            line_centre.saturating_sub(line_width / 2) + line_width
                        )
                        .into(),
                    },
                ]);

                Some(Calibration {
                    reference,
                    line_centre,
                    line_width,
                    step,
                    fixed_scale: calibration_scale,
                })
            }
        };

        printer.display();

        Ok(Conditioner {
            baseline,
            smoothing,
            noise_floor,
            calibration,
        })
    }
}

#[derive(Error, Debug)]
pub(in crate::cli) enum ConditioningArgsError {
    #[error("Unknown noise-floor mode '{0}'; supported modes are: {modes}", modes = NoiseFloorMode::iter().join(", "))]
    UnknownNoiseFloorMode(String),

    #[error("The noise-floor edge fraction must be greater than 0 and less than 0.5; got {0}")]
    InvalidEdgeFraction(f64),

    #[error("The calibration step must be a positive number; got {0}")]
    InvalidCalibrationStep(f64),

    #[error("The calibration scale must be a finite number; got {0}")]
    NonFiniteCalibrationScale(f64),

    #[error("Couldn't read the calibration reference: {0}")]
    CalibrationRead(#[from] ObservationReadError),
}
