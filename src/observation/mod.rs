// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Observation records: a conditioned spectrum, its frequency and velocity
//! axes, and where and when it was observed.
//!
//! Records are written as a CSV table with a `key: value` header block (the
//! default), as a CSV table with a sibling `<stem>_info.txt` file, or as
//! JSON. Reading also accepts the table and key layouts written by older
//! versions of the acquisition software.

mod error;
mod json;
mod text;
#[cfg(test)]
mod tests;

pub use error::{ObservationReadError, ObservationWriteError};

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{Datelike, NaiveDateTime, Timelike};
use hifitime::Epoch;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

lazy_static::lazy_static! {
    pub static ref RECORD_LAYOUTS_COMMA_SEPARATED: String = RecordLayout::iter().join(", ");
}

/// How an [`ObservationRecord`] is laid out on disk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum RecordLayout {
    /// `key: value` metadata lines followed by a CSV table.
    #[default]
    #[strum(serialize = "header")]
    #[serde(rename = "header")]
    HeaderBlock,

    /// A plain CSV table, with metadata in `<stem>_info.txt` next to it.
    #[strum(serialize = "sibling")]
    #[serde(rename = "sibling")]
    SiblingInfo,

    #[strum(serialize = "json")]
    #[serde(rename = "json")]
    Json,
}

impl RecordLayout {
    pub fn extension(self) -> &'static str {
        match self {
            RecordLayout::HeaderBlock | RecordLayout::SiblingInfo => "csv",
            RecordLayout::Json => "json",
        }
    }
}

/// When and where an observation was pointed. Angles are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationMetadata {
    /// When the acquisition finished.
    pub time: Epoch,
    /// (azimuth, altitude). Not all historical files record this.
    pub horizontal: Option<(f64, f64)>,
    /// (right ascension, declination), J2000.
    pub equatorial: (f64, f64),
    /// (longitude, latitude)
    pub galactic: (f64, f64),
    /// The correction already subtracted from the velocities \[km/s\].
    pub lsr_correction: f64,
    /// \[Hz\]
    pub rest_frequency: Option<f64>,
    pub spectral_line: Option<String>,
}

/// A conditioned spectrum ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    /// \[Hz\]
    pub frequencies: Vec<f64>,
    /// \[km/s\]
    pub velocities: Vec<f64>,
    pub power: Vec<f64>,
    pub metadata: ObservationMetadata,
}

impl ObservationRecord {
    pub fn new(
        frequencies: Vec<f64>,
        velocities: Vec<f64>,
        power: Vec<f64>,
        metadata: ObservationMetadata,
    ) -> Result<Self, ObservationWriteError> {
        let record = Self {
            frequencies,
            velocities,
            power,
            metadata,
        };
        record.check_lengths()?;
        Ok(record)
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    fn check_lengths(&self) -> Result<(), ObservationWriteError> {
        let (frequencies, velocities, power) = (
            self.frequencies.len(),
            self.velocities.len(),
            self.power.len(),
        );
        if frequencies != power || velocities != power {
            return Err(ObservationWriteError::LengthMismatch {
                frequencies,
                velocities,
                power,
            });
        }
        Ok(())
    }

    /// Write the record to `path` in the given layout. Nothing is written if
    /// the arrays have different lengths. Files are written in full to a
    /// temporary file next to their destination before being moved into
    /// place.
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        layout: RecordLayout,
    ) -> Result<(), ObservationWriteError> {
        let path = path.as_ref();
        self.check_lengths()?;
        debug!("Writing {} bins to {} ({layout})", self.len(), path.display());

        match layout {
            RecordLayout::HeaderBlock => write_atomically(path, |w| {
                text::write_header(w, &self.metadata)?;
                text::write_table(w, self)
            }),
            RecordLayout::SiblingInfo => {
                write_atomically(path, |w| text::write_table(w, self))?;
                // A table without its metadata can't be used; take it back
                // out if the info file can't be written.
                let table = scopeguard::guard(path, |table| {
                    let _ = std::fs::remove_file(table);
                });
                write_atomically(&info_path(path), |w| {
                    text::write_header(w, &self.metadata)
                })?;
                scopeguard::ScopeGuard::into_inner(table);
                Ok(())
            }
            RecordLayout::Json => write_atomically(path, |w| json::write(w, self)),
        }
    }

    /// Read a record back. Files ending in ".json" are read as JSON; anything
    /// else as a CSV table. Metadata missing from a CSV file is looked for in
    /// `<stem>_info.txt`, then `observation_info.txt`, in the same directory.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ObservationReadError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let record = if is_json {
            json::read(path)?
        } else {
            text::read(path)?
        };
        debug!("Read {} bins from {}", record.len(), path.display());
        Ok(record)
    }
}

/// Where a [`RecordLayout::SiblingInfo`] record's metadata lives.
pub fn info_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_info.txt"))
}

/// `<stem>_edited.<ext>` next to `path`.
pub fn edited_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => path.with_file_name(format!("{stem}_edited.{}", ext.to_string_lossy())),
        None => path.with_file_name(format!("{stem}_edited")),
    }
}

/// `<LINE>_<YYYY-MM-DD>_<HH-MM-SS>.<ext>`
pub fn observation_file_name(line: &str, time: Epoch, layout: RecordLayout) -> String {
    let (y, mo, d, h, mi, s, _) = time.to_gregorian_utc();
    format!(
        "{}_{y:04}-{mo:02}-{d:02}_{h:02}-{mi:02}-{s:02}.{}",
        line.to_uppercase(),
        layout.extension()
    )
}

/// Write `path` via a temporary file in the same directory. The temporary
/// file is removed if anything goes wrong.
fn write_atomically<F>(path: &Path, write: F) -> Result<(), ObservationWriteError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ObservationWriteError>,
{
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let file = File::create(&tmp).map_err(|err| ObservationWriteError::Write {
        file: path.display().to_string(),
        err,
    })?;
    let tmp = scopeguard::guard(tmp, |tmp| {
        // Best effort; the original error is more interesting.
        let _ = std::fs::remove_file(tmp);
    });

    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush()?;
    drop(writer);

    std::fs::rename(&*tmp, path).map_err(|err| ObservationWriteError::Write {
        file: path.display().to_string(),
        err,
    })?;
    scopeguard::ScopeGuard::into_inner(tmp);
    Ok(())
}

/// UTC, to the microsecond, e.g. "2023-07-24T18:58:28.000000".
pub fn format_time(time: Epoch) -> String {
    let (y, mo, d, h, mi, s, ns) = time.to_gregorian_utc();
    format!(
        "{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}.{:06}",
        ns / 1000
    )
}

/// Parse a UTC time as written by [`format_time`], or as written by older
/// software ("2023-07-24 18:58:28.123456", optionally followed by "UTC").
pub fn parse_time(s: &str) -> Option<Epoch> {
    let s = s.trim();
    let s = s
        .strip_suffix("UTC")
        .or_else(|| s.strip_suffix('Z'))
        .unwrap_or(s)
        .trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d_%H-%M-%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| {
            Epoch::from_gregorian_utc(
                dt.year(),
                dt.month() as u8,
                dt.day() as u8,
                dt.hour() as u8,
                dt.minute() as u8,
                dt.second() as u8,
                dt.nanosecond(),
            )
        })
}
