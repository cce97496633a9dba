// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use log::{debug, info};
use thiserror::Error;

use super::PlotParams;
use crate::{
    condition::{ConditionReport, Conditioner},
    observation::{ObservationReadError, ObservationRecord, ObservationWriteError, RecordLayout},
    plot::{plot_record, PlotError},
    spectrum::PowerScale,
};

/// Re-condition a saved observation into a new record.
#[derive(Debug, Clone)]
pub struct ReduceParams {
    pub input: PathBuf,
    pub output: PathBuf,
    pub layout: RecordLayout,
    pub conditioner: Conditioner,

    /// How the saved power is expressed. Only used to label plots.
    pub power_scale: PowerScale,

    /// Plot next to `output`, with a ".png" extension?
    pub plot: Option<PlotParams>,
}

#[derive(Debug, Clone)]
pub struct Reduction {
    pub record: ObservationRecord,
    pub plot: Option<PathBuf>,
    pub report: ConditionReport,
}

impl ReduceParams {
    /// The metadata and both axes of the input are carried over unchanged;
    /// only the power values are re-conditioned.
    pub fn run(&self) -> Result<Reduction, ReduceError> {
        let mut record = ObservationRecord::read(&self.input)?;
        debug!(
            "Reducing {} ({} bins) into {}",
            self.input.display(),
            record.len(),
            self.output.display()
        );

        let report = self.conditioner.condition(&mut record.power);
        record.write(&self.output, self.layout)?;
        info!("Wrote {}", self.output.display());

        let plot = match self.plot {
            Some(PlotParams { y_limits }) => {
                let png = self.output.with_extension("png");
                plot_record(&record, &png, y_limits, self.power_scale.unit())?;
                Some(png)
            }
            None => None,
        };

        Ok(Reduction {
            record,
            plot,
            report,
        })
    }
}

#[derive(Error, Debug)]
pub enum ReduceError {
    #[error(transparent)]
    Read(#[from] ObservationReadError),

    #[error(transparent)]
    Write(#[from] ObservationWriteError),

    #[error(transparent)]
    Plot(#[from] PlotError),
}
