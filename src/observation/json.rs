// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Observations as a single JSON object.

use std::{fs::File, io::BufReader, io::Write, path::Path};

use serde::{Deserialize, Serialize};

use super::{
    format_time, parse_time, ObservationMetadata, ObservationReadError, ObservationRecord,
    ObservationWriteError,
};

#[derive(Serialize, Deserialize)]
struct JsonObservation {
    #[serde(rename = "Observation_time")]
    time: String,

    #[serde(rename = "Hor_coords", default, skip_serializing_if = "Option::is_none")]
    horizontal: Option<[f64; 2]>,

    #[serde(rename = "Eq_coords")]
    equatorial: [f64; 2],

    #[serde(rename = "Gal_coords")]
    galactic: [f64; 2],

    /// The velocity added to every value, i.e. the negative of the LSR
    /// correction.
    #[serde(rename = "LSR_correction", default)]
    lsr_velocity: f64,

    #[serde(rename = "Rest_frequency", default, skip_serializing_if = "Option::is_none")]
    rest_frequency: Option<f64>,

    #[serde(rename = "Spectral_line", default, skip_serializing_if = "Option::is_none")]
    spectral_line: Option<String>,

    #[serde(rename = "Data", with = "floats")]
    power: Vec<f64>,

    #[serde(rename = "Velocities", with = "floats")]
    velocities: Vec<f64>,

    #[serde(rename = "Frequencies", with = "floats")]
    frequencies: Vec<f64>,
}

/// JSON has no representation for non-finite numbers. They are written as
/// strings ("inf", "-inf", "NaN"), and `null` is read back as NaN.
mod floats {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum JsonFloat {
        Number(f64),
        Text(String),
        Null,
    }

    pub(super) fn serialize<S: Serializer>(values: &[f64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(|&v| {
            if v.is_finite() {
                JsonFloat::Number(v)
            } else {
                JsonFloat::Text(v.to_string())
            }
        }))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        Vec::<JsonFloat>::deserialize(d)?
            .into_iter()
            .map(|v| match v {
                JsonFloat::Number(v) => Ok(v),
                JsonFloat::Null => Ok(f64::NAN),
                JsonFloat::Text(s) => s
                    .trim()
                    .parse()
                    .map_err(|_| D::Error::custom(format!("'{s}' is not a number"))),
            })
            .collect()
    }
}

pub(super) fn write<W: Write>(
    w: &mut W,
    record: &ObservationRecord,
) -> Result<(), ObservationWriteError> {
    let m = &record.metadata;
    let json = JsonObservation {
        time: format_time(m.time),
        horizontal: m.horizontal.map(|(az, alt)| [az, alt]),
        equatorial: [m.equatorial.0, m.equatorial.1],
        galactic: [m.galactic.0, m.galactic.1],
        lsr_velocity: -m.lsr_correction,
        rest_frequency: m.rest_frequency,
        spectral_line: m.spectral_line.clone(),
        power: record.power.clone(),
        velocities: record.velocities.clone(),
        frequencies: record.frequencies.clone(),
    };
    serde_json::to_writer_pretty(&mut *w, &json)?;
    writeln!(w)?;
    Ok(())
}

pub(super) fn read(path: &Path) -> Result<ObservationRecord, ObservationReadError> {
    let file = path.display().to_string();
    let handle = File::open(path).map_err(|err| ObservationReadError::Read {
        file: file.clone(),
        err,
    })?;
    let json: JsonObservation = serde_json::from_reader(BufReader::new(handle)).map_err(|err| {
        ObservationReadError::Json {
            file: file.clone(),
            err,
        }
    })?;

    if json.frequencies.len() != json.power.len() || json.velocities.len() != json.power.len() {
        return Err(ObservationReadError::LengthMismatch {
            file,
            frequencies: json.frequencies.len(),
            velocities: json.velocities.len(),
            power: json.power.len(),
        });
    }
    let time = parse_time(&json.time).ok_or_else(|| ObservationReadError::BadMetadata {
        file: file.clone(),
        key: "observation time",
        value: json.time.clone(),
    })?;

    Ok(ObservationRecord {
        frequencies: json.frequencies,
        velocities: json.velocities,
        power: json.power,
        metadata: ObservationMetadata {
            time,
            horizontal: json.horizontal.map(|[az, alt]| (az, alt)),
            equatorial: (json.equatorial[0], json.equatorial[1]),
            galactic: (json.galactic[0], json.galactic[1]),
            lsr_correction: -json.lsr_velocity,
            rest_frequency: json.rest_frequency,
            spectral_line: json.spectral_line,
        },
    })
}
