// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Plot saved observations.

use std::path::PathBuf;

use clap::Parser;
use log::info;
use thiserror::Error;

use super::common::{parse_power_scale, parse_y_limits, POWER_SCALES_COMMA_SEPARATED};
use crate::{
    observation::{ObservationReadError, ObservationRecord},
    plot::{plot_record, PlotError},
    RadiolineError,
};

lazy_static::lazy_static! {
    static ref POWER_SCALE_HELP: String =
        format!("How the saved power is expressed; only used to label the power axis. Supported scales: {}. Default: {}", *POWER_SCALES_COMMA_SEPARATED, crate::spectrum::PowerScale::default());
}

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct PlotArgs {
    /// The saved observations to plot. Each plot is written next to its
    /// observation with a ".png" extension.
    #[clap(name = "OBSERVATIONS", parse(from_os_str))]
    pub(super) files: Vec<PathBuf>,

    /// The bottom of the power axis. Given with --y-max; both 0 means "fit
    /// the data".
    #[clap(long, allow_hyphen_values = true)]
    pub(super) y_min: Option<f64>,

    /// The top of the power axis.
    #[clap(long, allow_hyphen_values = true)]
    pub(super) y_max: Option<f64>,

    #[clap(long, help = POWER_SCALE_HELP.as_str())]
    pub(super) power_scale: Option<String>,
}

impl PlotArgs {
    pub(super) fn run(self) -> Result<(), RadiolineError> {
        Ok(self.plot_all().map(|_| ())?)
    }

    fn plot_all(self) -> Result<Vec<PathBuf>, PlotArgsError> {
        if self.files.is_empty() {
            return Err(PlotArgsError::NoFiles);
        }
        let y_limits = parse_y_limits(self.y_min, self.y_max).map_err(PlotArgsError::BadYLimits)?;
        let power_scale = parse_power_scale(self.power_scale.as_deref())
            .map_err(PlotArgsError::BadPowerScale)?;

        let mut plots = Vec::with_capacity(self.files.len());
        for file in self.files {
            let record = ObservationRecord::read(&file)?;
            let png = file.with_extension("png");
            plot_record(&record, &png, y_limits, power_scale.unit())?;
            info!("Plotted {}", png.display());
            plots.push(png);
        }
        Ok(plots)
    }
}

#[derive(Error, Debug)]
pub(super) enum PlotArgsError {
    #[error("No observations were given to plot")]
    NoFiles,

    #[error("{0}")]
    BadPowerScale(String),

    #[error("{0}")]
    BadYLimits(String),

    #[error(transparent)]
    Read(#[from] ObservationReadError),

    #[error(transparent)]
    Plot(#[from] PlotError),
}
