// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading or writing observation records.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObservationWriteError {
    #[error("Refusing to write an observation with {frequencies} frequencies, {velocities} velocities and {power} power values; these must all be the same")]
    LengthMismatch {
        frequencies: usize,
        velocities: usize,
        power: usize,
    },

    #[error("Couldn't create the output directory '{dir}': {err}")]
    CreateDir { dir: String, err: std::io::Error },

    #[error("Couldn't write '{file}': {err}")]
    Write { file: String, err: std::io::Error },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ObservationReadError {
    #[error("Couldn't read '{file}': {err}")]
    Read { file: String, err: std::io::Error },

    #[error("'{file}' doesn't contain a table of spectrum values")]
    NoTable { file: String },

    #[error("'{file}' has no {column} column")]
    MissingColumn { file: String, column: &'static str },

    #[error("Couldn't parse '{value}' as a number in the '{column}' column on data row {row} of '{file}'")]
    BadValue {
        file: String,
        column: &'static str,
        row: usize,
        value: String,
    },

    #[error("'{file}' has {frequencies} frequencies, {velocities} velocities and {power} power values; these must all be the same")]
    LengthMismatch {
        file: String,
        frequencies: usize,
        velocities: usize,
        power: usize,
    },

    #[error("Couldn't parse '{value}' as the {key} of the observation in '{file}'")]
    BadMetadata {
        file: String,
        key: &'static str,
        value: String,
    },

    #[error("Couldn't find the {key} of the observation in '{file}' or in an accompanying info file")]
    MissingMetadata { file: String, key: &'static str },

    #[error("Couldn't parse '{file}' as an observation: {err}")]
    Csv { file: String, err: csv::Error },

    #[error("Couldn't parse '{file}' as an observation: {err}")]
    Json {
        file: String,
        err: serde_json::Error,
    },
}
