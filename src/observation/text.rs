// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! CSV tables, `key: value` header blocks and info files.

use std::{io::Write, path::Path};

use hifitime::Epoch;
use itertools::izip;
use log::{debug, trace};

use super::{
    format_time, info_path, parse_time, ObservationMetadata, ObservationReadError,
    ObservationRecord, ObservationWriteError,
};

const TIME_KEY: &str = "Observation time (UTC)";
const HORIZONTAL_KEY: &str = "Horizontal coordinates (az,alt)";
const EQUATORIAL_KEY: &str = "Equatorial coordinates (ra,dec)";
const GALACTIC_KEY: &str = "Galactic coordinates (l,b)";
const LSR_KEY: &str = "LSR correction applied (km/s)";
const REST_FREQUENCY_KEY: &str = "Rest frequency (Hz)";
const SPECTRAL_LINE_KEY: &str = "Spectral line";

const FREQUENCY_COLUMN: &str = "Frequency";
const VELOCITY_COLUMN: &str = "Radial velocity";
const DATA_COLUMN: &str = "Data";

/// Column names that have been used for each array, in any case.
const FREQUENCY_COLUMNS: &[&str] = &[
    FREQUENCY_COLUMN,
    "Observer frequency",
    "Observer frame frequencies",
    "Frequencies",
];
const VELOCITY_COLUMNS: &[&str] = &[VELOCITY_COLUMN, "Velocities"];
const DATA_COLUMNS: &[&str] = &[DATA_COLUMN];

/// The name of the file that older software wrote every observation's
/// metadata to.
const SHARED_INFO_FILE: &str = "observation_info.txt";

pub(super) fn write_header<W: Write>(
    w: &mut W,
    metadata: &ObservationMetadata,
) -> Result<(), ObservationWriteError> {
    writeln!(w, "{TIME_KEY}: {}", format_time(metadata.time))?;
    if let Some((az, alt)) = metadata.horizontal {
        writeln!(w, "{HORIZONTAL_KEY}: {az}, {alt}")?;
    }
    let (ra, dec) = metadata.equatorial;
    writeln!(w, "{EQUATORIAL_KEY}: {ra}, {dec}")?;
    let (l, b) = metadata.galactic;
    writeln!(w, "{GALACTIC_KEY}: {l}, {b}")?;
    writeln!(w, "{LSR_KEY}: {}", metadata.lsr_correction)?;
    if let Some(f) = metadata.rest_frequency {
        writeln!(w, "{REST_FREQUENCY_KEY}: {f}")?;
    }
    if let Some(line) = &metadata.spectral_line {
        writeln!(w, "{SPECTRAL_LINE_KEY}: {line}")?;
    }
    Ok(())
}

pub(super) fn write_table<W: Write>(
    w: &mut W,
    record: &ObservationRecord,
) -> Result<(), ObservationWriteError> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record([FREQUENCY_COLUMN, VELOCITY_COLUMN, DATA_COLUMN])?;
    for (f, v, p) in izip!(&record.frequencies, &record.velocities, &record.power) {
        // `Display` for floats round trips exactly.
        writer.write_record([f.to_string(), v.to_string(), p.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

pub(super) fn read(path: &Path) -> Result<ObservationRecord, ObservationReadError> {
    let file = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|err| ObservationReadError::Read {
        file: file.clone(),
        err,
    })?;

    // Metadata lines all have a colon in them; the first line without one is
    // the table's header.
    let mut metadata = PartialMetadata::default();
    let mut table_start = None;
    let mut offset = 0;
    for line in contents.split_inclusive('\n') {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            match trimmed.split_once(':') {
                Some((key, value)) => metadata.parse_pair(key, value, &file)?,
                None => {
                    table_start = Some(offset);
                    break;
                }
            }
        }
        offset += line.len();
    }
    let table_start = table_start.ok_or_else(|| ObservationReadError::NoTable {
        file: file.clone(),
    })?;
    let table = read_table(&contents[table_start..], &file)?;
    metadata.fill_from(table.metadata);

    if !metadata.is_complete() {
        for info in [info_path(path), path.with_file_name(SHARED_INFO_FILE)] {
            if metadata.is_complete() {
                break;
            }
            if info.is_file() {
                debug!("Reading observation metadata from {}", info.display());
                metadata.fill_from(read_info(&info)?);
            }
        }
    }

    Ok(ObservationRecord {
        frequencies: table.frequencies,
        velocities: table.velocities,
        power: table.power,
        metadata: metadata.finish(&file)?,
    })
}

/// Read a file of nothing but `key: value` lines.
fn read_info(path: &Path) -> Result<PartialMetadata, ObservationReadError> {
    let file = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|err| ObservationReadError::Read {
        file: file.clone(),
        err,
    })?;
    let mut metadata = PartialMetadata::default();
    for (key, value) in contents.lines().filter_map(|l| l.split_once(':')) {
        metadata.parse_pair(key, value, &file)?;
    }
    Ok(metadata)
}

struct Table {
    frequencies: Vec<f64>,
    velocities: Vec<f64>,
    power: Vec<f64>,
    /// Some older tables carry the metadata in extra, mostly-empty columns.
    metadata: PartialMetadata,
}

fn read_table(table: &str, file: &str) -> Result<Table, ObservationReadError> {
    let csv_err = |err| ObservationReadError::Csv {
        file: file.to_string(),
        err,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(table.as_bytes());
    let headers = reader.headers().map_err(csv_err)?.clone();
    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let required = |names: &[&str], column: &'static str| {
        find(names).ok_or_else(|| ObservationReadError::MissingColumn {
            file: file.to_string(),
            column,
        })
    };
    let frequency_col = required(FREQUENCY_COLUMNS, "frequency")?;
    let velocity_col = required(VELOCITY_COLUMNS, "velocity")?;
    let data_col = required(DATA_COLUMNS, "data")?;
    trace!("Table columns: {:?}", headers);

    let mut extra = MetadataColumns {
        equatorial: (find(&["Eq_coords"]), vec![]),
        galactic: (find(&["Gal_coords"]), vec![]),
        horizontal: (find(&["Hor_coords"]), vec![]),
        time: (find(&["Observation_time"]), vec![]),
        lsr: (find(&["LSR_correction"]), vec![]),
        rest_frequency: (find(&["Rest_frequency"]), vec![]),
        spectral_line: (find(&["Spectral_line"]), vec![]),
    };

    let mut frequencies = vec![];
    let mut velocities = vec![];
    let mut power = vec![];
    for (i_row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let parse = |col: usize, column: &'static str| {
            let value = record.get(col).unwrap_or("");
            value
                .parse::<f64>()
                .map_err(|_| ObservationReadError::BadValue {
                    file: file.to_string(),
                    column,
                    row: i_row + 1,
                    value: value.to_string(),
                })
        };
        frequencies.push(parse(frequency_col, "frequency")?);
        velocities.push(parse(velocity_col, "velocity")?);
        power.push(parse(data_col, "data")?);
        extra.collect(&record);
    }

    Ok(Table {
        frequencies,
        velocities,
        power,
        metadata: extra.parse(file)?,
    })
}

/// The (column index, non-empty values) of each metadata column.
struct MetadataColumns {
    equatorial: (Option<usize>, Vec<String>),
    galactic: (Option<usize>, Vec<String>),
    horizontal: (Option<usize>, Vec<String>),
    time: (Option<usize>, Vec<String>),
    lsr: (Option<usize>, Vec<String>),
    rest_frequency: (Option<usize>, Vec<String>),
    spectral_line: (Option<usize>, Vec<String>),
}

impl MetadataColumns {
    fn collect(&mut self, record: &csv::StringRecord) {
        for (col, values) in [
            &mut self.equatorial,
            &mut self.galactic,
            &mut self.horizontal,
            &mut self.time,
            &mut self.lsr,
            &mut self.rest_frequency,
            &mut self.spectral_line,
        ] {
            if let Some(value) = col.and_then(|c| record.get(c)).filter(|v| !v.is_empty()) {
                values.push(value.to_string());
            }
        }
    }

    fn parse(self, file: &str) -> Result<PartialMetadata, ObservationReadError> {
        let float = |key: &'static str, value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| ObservationReadError::BadMetadata {
                    file: file.to_string(),
                    key,
                    value: value.to_string(),
                })
        };
        // Coordinate pairs are stored down the first two rows of a column.
        let pair = |key: &'static str,
                    values: &[String]|
         -> Result<Option<(f64, f64)>, ObservationReadError> {
            match values {
                [a, b, ..] => Ok(Some((float(key, a)?, float(key, b)?))),
                _ => Ok(None),
            }
        };

        let mut metadata = PartialMetadata {
            equatorial: pair("equatorial coordinates", &self.equatorial.1)?,
            galactic: pair("galactic coordinates", &self.galactic.1)?,
            horizontal: pair("horizontal coordinates", &self.horizontal.1)?,
            spectral_line: self.spectral_line.1.into_iter().next(),
            ..Default::default()
        };
        if let Some(value) = self.time.1.first() {
            metadata.time = Some(parse_time(value).ok_or_else(|| {
                ObservationReadError::BadMetadata {
                    file: file.to_string(),
                    key: "observation time",
                    value: value.clone(),
                }
            })?);
        }
        if let Some(value) = self.lsr.1.first() {
            // These columns hold the velocity that was added, which is the
            // negative of the correction.
            metadata.lsr_correction = Some(-float("LSR correction", value)?);
        }
        if let Some(value) = self.rest_frequency.1.first() {
            metadata.rest_frequency = Some(float("rest frequency", value)?);
        }
        Ok(metadata)
    }
}

/// Metadata gathered from possibly several places.
#[derive(Debug, Default)]
struct PartialMetadata {
    time: Option<Epoch>,
    horizontal: Option<(f64, f64)>,
    equatorial: Option<(f64, f64)>,
    galactic: Option<(f64, f64)>,
    lsr_correction: Option<f64>,
    rest_frequency: Option<f64>,
    spectral_line: Option<String>,
}

impl PartialMetadata {
    /// Interpret one `key: value` line. Keys are matched on their start, so
    /// units and coordinate labels can vary.
    fn parse_pair(&mut self, key: &str, value: &str, file: &str) -> Result<(), ObservationReadError> {
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        let bad = |key: &'static str| ObservationReadError::BadMetadata {
            file: file.to_string(),
            key,
            value: value.to_string(),
        };
        let float = |key: &'static str| value.parse::<f64>().map_err(|_| bad(key));
        let pair = |key: &'static str| {
            let mut it = value.split(',').map(|v| v.trim().parse::<f64>());
            match (it.next(), it.next(), it.next()) {
                (Some(Ok(a)), Some(Ok(b)), None) => Ok((a, b)),
                _ => Err(bad(key)),
            }
        };

        if key.starts_with("observation time") {
            self.time = Some(parse_time(value).ok_or_else(|| bad("observation time"))?);
        } else if key.starts_with("horizontal") || key.starts_with("local coordinates") {
            self.horizontal = Some(pair("horizontal coordinates")?);
        } else if key.starts_with("equatorial") {
            self.equatorial = Some(pair("equatorial coordinates")?);
        } else if key.starts_with("galactic") {
            self.galactic = Some(pair("galactic coordinates")?);
        } else if key.starts_with("lsr correction") {
            self.lsr_correction = Some(float("LSR correction")?);
        } else if key.starts_with("rest frequency") {
            self.rest_frequency = Some(float("rest frequency")?);
        } else if key.starts_with("spectral line") {
            self.spectral_line = Some(value.to_string());
        } else {
            trace!("Ignoring unknown metadata key '{key}' in {file}");
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.time.is_some() && self.equatorial.is_some() && self.galactic.is_some()
    }

    /// Take any fields from `other` that aren't already set.
    fn fill_from(&mut self, other: PartialMetadata) {
        self.time = self.time.or(other.time);
        self.horizontal = self.horizontal.or(other.horizontal);
        self.equatorial = self.equatorial.or(other.equatorial);
        self.galactic = self.galactic.or(other.galactic);
        self.lsr_correction = self.lsr_correction.or(other.lsr_correction);
        self.rest_frequency = self.rest_frequency.or(other.rest_frequency);
        self.spectral_line = self.spectral_line.take().or(other.spectral_line);
    }

    fn finish(self, file: &str) -> Result<ObservationMetadata, ObservationReadError> {
        let missing = |key: &'static str| ObservationReadError::MissingMetadata {
            file: file.to_string(),
            key,
        };
        Ok(ObservationMetadata {
            time: self.time.ok_or_else(|| missing("observation time"))?,
            horizontal: self.horizontal,
            equatorial: self
                .equatorial
                .ok_or_else(|| missing("equatorial coordinates"))?,
            galactic: self.galactic.ok_or_else(|| missing("galactic coordinates"))?,
            lsr_correction: self.lsr_correction.unwrap_or_else(|| {
                debug!("No LSR correction recorded in {file}; assuming none was applied");
                0.0
            }),
            rest_frequency: self.rest_frequency,
            spectral_line: self.spectral_line,
        })
    }
}
