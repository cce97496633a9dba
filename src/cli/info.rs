// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Print what's in saved observations.

use std::{borrow::Cow, path::PathBuf};

use clap::Parser;
use log::debug;
use thiserror::Error;

use super::common::InfoPrinter;
use crate::{
    observation::{format_time, ObservationReadError, ObservationRecord},
    RadiolineError,
};

#[derive(Parser, Debug, Clone, Default)]
pub(super) struct InfoArgs {
    /// The saved observations to describe.
    #[clap(name = "OBSERVATIONS", parse(from_os_str))]
    pub(super) files: Vec<PathBuf>,
}

impl InfoArgs {
    pub(super) fn run(self) -> Result<(), RadiolineError> {
        if self.files.is_empty() {
            return Err(InfoArgsError::NoFiles.into());
        }

        for file in &self.files {
            debug!("Describing {}", file.display());
            let record = ObservationRecord::read(file).map_err(InfoArgsError::Read)?;
            let mut printer = InfoPrinter::new(file.display().to_string().into());
            for block in summarise(&record) {
                printer.push_block(block);
            }
            printer.display();
        }

        Ok(())
    }
}

/// The metadata and a summary of each axis, grouped into blocks.
fn summarise(record: &ObservationRecord) -> Vec<Vec<Cow<'static, str>>> {
    let m = &record.metadata;
    let mut metadata = vec![format!("Observed at {} UTC", format_time(m.time)).into()];
    match (&m.spectral_line, m.rest_frequency) {
        (Some(line), Some(rest)) => {
            metadata.push(format!("Line {line}, rest frequency {} MHz", rest / 1e6).into())
        }
        (Some(line), None) => metadata.push(format!("Line {line}").into()),
        (None, Some(rest)) => {
            metadata.push(format!("Rest frequency {} MHz", rest / 1e6).into())
        }
        (None, None) => (),
    }
    if let Some((az, alt)) = m.horizontal {
        metadata.push(format!("Az {az:.3}°, alt {alt:.3}°").into());
    }
    metadata.push(format!("RA {:.3}°, Dec {:.3}°", m.equatorial.0, m.equatorial.1).into());
    metadata.push(format!("l {:.3}°, b {:.3}°", m.galactic.0, m.galactic.1).into());
    metadata.push(format!("LSR correction {:.3} km/s", m.lsr_correction).into());

    let mut arrays = vec![format!("{} bins", record.len()).into()];
    if let Some((min, max)) = extent(&record.frequencies) {
        arrays.push(format!("Frequencies {} to {} MHz", min / 1e6, max / 1e6).into());
    }
    if let Some((min, max)) = extent(&record.velocities) {
        arrays.push(format!("Velocities {min:.2} to {max:.2} km/s").into());
    }
    let finite: Vec<f64> = record
        .power
        .iter()
        .copied()
        .filter(|p| p.is_finite())
        .collect();
    if let Some((min, max)) = extent(&finite) {
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;
        arrays.push(format!("Power {min:.4} to {max:.4}, mean {mean:.4}").into());
    }
    if finite.len() != record.len() {
        arrays.push(format!("{} non-finite power values", record.len() - finite.len()).into());
    }

    vec![metadata, arrays]
}

fn extent(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    })
}

#[derive(Error, Debug)]
pub(super) enum InfoArgsError {
    #[error("No observations were given to describe")]
    NoFiles,

    #[error(transparent)]
    Read(ObservationReadError),
}
