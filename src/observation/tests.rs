// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::TempDir;

use super::*;

fn metadata() -> ObservationMetadata {
    ObservationMetadata {
        time: Epoch::from_gregorian_utc(2023, 7, 24, 18, 58, 28, 123_456_000),
        horizontal: Some((180.0, 45.5)),
        equatorial: (266.404_988, -28.936_178),
        galactic: (359.944_3, -0.046_1),
        lsr_correction: -12.345_678_9,
        rest_frequency: Some(1_420_405_752.0),
        spectral_line: Some("H1_1420".to_string()),
    }
}

fn record() -> ObservationRecord {
    let frequencies: Vec<f64> = (0..16).map(|i| 1_419_405_752.0 + i as f64 * 1e5).collect();
    let velocities: Vec<f64> = frequencies
        .iter()
        .map(|f| -299_792.458 * (f - 1_420_405_752.0) / 1_420_405_752.0 + 12.345_678_9)
        .collect();
    let power: Vec<f64> = (0..16).map(|i| (i as f64 * 0.37).sin() * 3.1e-3).collect();
    ObservationRecord::new(frequencies, velocities, power, metadata()).unwrap()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_header_block_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obs.csv");
    let record = record();
    record.write(&path, RecordLayout::HeaderBlock).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("Observation time (UTC): 2023-07-24T18:58:28.123456\n"));
    assert!(contents.contains("\nFrequency,Radial velocity,Data\n"));

    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read, record);
    // No temporary files are left behind.
    assert_eq!(files_in(dir.path()), vec!["obs.csv"]);
}

#[test]
fn test_sibling_info_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obs.csv");
    let record = record();
    record.write(&path, RecordLayout::SiblingInfo).unwrap();

    assert_eq!(files_in(dir.path()), vec!["obs.csv", "obs_info.txt"]);
    let table = std::fs::read_to_string(&path).unwrap();
    assert!(table.starts_with("Frequency,Radial velocity,Data\n"));

    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read, record);
}

#[test]
fn test_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obs.json");
    let record = record();
    record.write(&path, RecordLayout::Json).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    // The stored value is the velocity that was added.
    assert_abs_diff_eq!(value["LSR_correction"].as_f64().unwrap(), 12.345_678_9);
    assert_eq!(value["Spectral_line"], "H1_1420");

    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read, record);
}

#[test]
fn test_json_non_finite_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obs.json");
    let mut record = record();
    // What a spectrum of dead bins looks like in dB.
    record.power[3] = f64::NEG_INFINITY;
    record.power[4] = f64::INFINITY;
    record.write(&path, RecordLayout::Json).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\"-inf\""), "{contents}");
    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read, record);

    record.power[5] = f64::NAN;
    record.write(&path, RecordLayout::Json).unwrap();
    let read = ObservationRecord::read(&path).unwrap();
    assert!(read.power[5].is_nan());
    assert_eq!(read.power[3], f64::NEG_INFINITY);

    // Other software writes null.
    let mut value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    value["Data"][0] = serde_json::Value::Null;
    std::fs::write(&path, value.to_string()).unwrap();
    let read = ObservationRecord::read(&path).unwrap();
    assert!(read.power[0].is_nan());
    assert_eq!(read.power[1], record.power[1]);

    value["Data"][0] = serde_json::Value::from("lots");
    std::fs::write(&path, value.to_string()).unwrap();
    assert!(matches!(
        ObservationRecord::read(&path),
        Err(ObservationReadError::Json { .. })
    ));
}

#[test]
fn test_sibling_info_failure_leaves_no_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obs.csv");
    // A directory is in the way of the info file.
    std::fs::create_dir(dir.path().join("obs_info.txt")).unwrap();

    let result = record().write(&path, RecordLayout::SiblingInfo);
    assert!(matches!(result, Err(ObservationWriteError::Write { .. })));
    assert!(!path.exists());
    assert_eq!(files_in(dir.path()), vec!["obs_info.txt"]);
}

#[test]
fn test_mismatched_lengths_are_rejected() {
    let result = ObservationRecord::new(vec![1.0, 2.0], vec![1.0], vec![1.0, 2.0], metadata());
    assert!(matches!(
        result,
        Err(ObservationWriteError::LengthMismatch {
            frequencies: 2,
            velocities: 1,
            power: 2
        })
    ));

    // Fields are public, so writing checks again, before touching the disk.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obs.csv");
    let mut record = record();
    record.power.pop();
    for layout in RecordLayout::iter() {
        let result = record.write(&path, layout);
        assert!(matches!(
            result,
            Err(ObservationWriteError::LengthMismatch { .. })
        ));
    }
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn test_unwritable_path_leaves_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does_not_exist").join("obs.csv");
    let result = record().write(&path, RecordLayout::HeaderBlock);
    assert!(matches!(result, Err(ObservationWriteError::Write { .. })));
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn test_read_historical_header_block() {
    // Metadata keys without units, and the columns in a different order.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.txt");
    std::fs::write(
        &path,
        indoc! {"
            Observation time: 2022-11-05 21:03:11.500000
            Local coordinates: 180.0,60.0
            Equatorial coordinates: 83.63,22.01
            Galactic coordinates: 184.56,-5.78
            LSR correction: 3.25
            Data,Observer frequency,Radial velocity
            -0.5,1420000000.0,85.7
            0.25,1420100000.0,64.6
            1.5,1420200000.0,43.5
        "},
    )
    .unwrap();

    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read.frequencies, vec![1420000000.0, 1420100000.0, 1420200000.0]);
    assert_eq!(read.velocities, vec![85.7, 64.6, 43.5]);
    assert_eq!(read.power, vec![-0.5, 0.25, 1.5]);
    let m = read.metadata;
    assert_eq!(
        m.time,
        Epoch::from_gregorian_utc(2022, 11, 5, 21, 3, 11, 500_000_000)
    );
    assert_eq!(m.horizontal, Some((180.0, 60.0)));
    assert_eq!(m.equatorial, (83.63, 22.01));
    assert_eq!(m.galactic, (184.56, -5.78));
    assert_eq!(m.lsr_correction, 3.25);
    assert_eq!(m.rest_frequency, None);
    assert_eq!(m.spectral_line, None);
}

#[test]
fn test_read_historical_shared_info_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spectrum.csv");
    std::fs::write(
        &path,
        indoc! {"
            Frequency,Radial velocity,Data
            1420000000.0,85.7,-0.5
            1420100000.0,64.6,0.25
        "},
    )
    .unwrap();
    std::fs::write(
        dir.path().join("observation_info.txt"),
        indoc! {"
            Observation time (UTC): 2022-11-05 21:03:11.5
            Horizontal coordinates (az,alt): 180.0, 60.0
            Equatorial coordinates (az,alt): 83.63, 22.01
            Galactic coordinates (az,alt): 184.56, -5.78
            LSR correction applied (km/s): -7.5
        "},
    )
    .unwrap();

    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read.len(), 2);
    assert_eq!(read.metadata.equatorial, (83.63, 22.01));
    assert_eq!(read.metadata.galactic, (184.56, -5.78));
    assert_eq!(read.metadata.lsr_correction, -7.5);
}

#[test]
fn test_own_info_file_is_preferred() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("obs.csv");
    record().write(&path, RecordLayout::SiblingInfo).unwrap();
    std::fs::write(
        dir.path().join("observation_info.txt"),
        indoc! {"
            Observation time (UTC): 2000-01-01 00:00:00
            Equatorial coordinates (ra,dec): 1, 2
            Galactic coordinates (l,b): 3, 4
        "},
    )
    .unwrap();

    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read.metadata, metadata());
}

#[test]
fn test_read_historical_metadata_columns() {
    // Metadata in extra columns, filled only in the first row or two. The
    // spectral line name has a comma in it and so is quoted.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("H1_1420_2021-03-02.csv");
    std::fs::write(
        &path,
        indoc! {r#"
            Data,Velocities,Frequencies,Eq_coords,Gal_coords,Spectral_line,Observation_time,LSR_correction
            0.1,20.0,1420310000.0,83.63,184.56,"Hydrogen, 1420MHz",2021-03-02 10:00:00.250000,-4.5
            0.2,10.0,1420360000.0,22.01,-5.78,,,
            0.3,0.0,1420405752.0,,,,,
        "#},
    )
    .unwrap();

    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read.power, vec![0.1, 0.2, 0.3]);
    assert_eq!(read.velocities, vec![20.0, 10.0, 0.0]);
    assert_eq!(read.frequencies[2], 1420405752.0);
    let m = read.metadata;
    assert_eq!(m.equatorial, (83.63, 22.01));
    assert_eq!(m.galactic, (184.56, -5.78));
    assert_eq!(m.spectral_line.as_deref(), Some("Hydrogen, 1420MHz"));
    assert_eq!(
        m.time,
        Epoch::from_gregorian_utc(2021, 3, 2, 10, 0, 0, 250_000_000)
    );
    assert_eq!(m.lsr_correction, 4.5);
    assert_eq!(m.horizontal, None);
}

#[test]
fn test_read_historical_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old.json");
    std::fs::write(
        &path,
        indoc! {r#"
            {
                "Eq_coords": [83.63, 22.01],
                "Gal_coords": [184.56, -5.78],
                "Spectral_line": "Hydrogen, 1420MHz",
                "Observation_time": "2021-03-02 10:00:00.250000",
                "LSR_correction": -4.5,
                "Data": [0.1, 0.2],
                "Velocities": [20.0, 10.0],
                "Frequencies": [1420310000.0, 1420360000.0]
            }
        "#},
    )
    .unwrap();

    let read = ObservationRecord::read(&path).unwrap();
    assert_eq!(read.power, vec![0.1, 0.2]);
    assert_eq!(read.metadata.lsr_correction, 4.5);
    assert_eq!(read.metadata.horizontal, None);
    assert_eq!(read.metadata.rest_frequency, None);
}

#[test]
fn test_read_json_with_mismatched_lengths() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"Eq_coords": [0, 0], "Gal_coords": [0, 0], "Observation_time": "2021-03-02 10:00:00",
            "Data": [0.1, 0.2], "Velocities": [20.0], "Frequencies": [1.0, 2.0]}"#,
    )
    .unwrap();
    assert!(matches!(
        ObservationRecord::read(&path),
        Err(ObservationReadError::LengthMismatch { velocities: 1, .. })
    ));
}

#[test]
fn test_read_missing_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bare.csv");
    std::fs::write(&path, "Frequency,Radial velocity,Data\n1.0,2.0,3.0\n").unwrap();
    assert!(matches!(
        ObservationRecord::read(&path),
        Err(ObservationReadError::MissingMetadata {
            key: "observation time",
            ..
        })
    ));
}

#[test]
fn test_read_bad_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(
        &path,
        indoc! {"
            Observation time (UTC): 2021-03-02T10:00:00
            Equatorial coordinates (ra,dec): 1, 2
            Galactic coordinates (l,b): 3, 4
            Frequency,Radial velocity,Data
            1.0,2.0,3.0
            1.5,2.5,oops
        "},
    )
    .unwrap();
    match ObservationRecord::read(&path) {
        Err(ObservationReadError::BadValue {
            column, row, value, ..
        }) => {
            assert_eq!(column, "data");
            assert_eq!(row, 2);
            assert_eq!(value, "oops");
        }
        other => panic!("Unexpected result: {other:?}"),
    }

    std::fs::write(
        &path,
        indoc! {"
            Observation time (UTC): yesterday
            Frequency,Radial velocity,Data
        "},
    )
    .unwrap();
    assert!(matches!(
        ObservationRecord::read(&path),
        Err(ObservationReadError::BadMetadata {
            key: "observation time",
            ..
        })
    ));

    std::fs::write(&path, "Frequency,Data\n1.0,2.0\n").unwrap();
    assert!(matches!(
        ObservationRecord::read(&path),
        Err(ObservationReadError::MissingColumn {
            column: "velocity",
            ..
        })
    ));

    std::fs::write(&path, "Observation time (UTC): 2021-03-02T10:00:00\n").unwrap();
    assert!(matches!(
        ObservationRecord::read(&path),
        Err(ObservationReadError::NoTable { .. })
    ));
}

#[test]
fn test_file_names() {
    let time = Epoch::from_gregorian_utc(2023, 7, 4, 8, 5, 9, 999_000_000);
    assert_eq!(
        observation_file_name("H1_1420", time, RecordLayout::HeaderBlock),
        "H1_1420_2023-07-04_08-05-09.csv"
    );
    assert_eq!(
        observation_file_name("oh_1667", time, RecordLayout::Json),
        "OH_1667_2023-07-04_08-05-09.json"
    );
    assert_eq!(
        edited_path(Path::new("/data/obs.csv")),
        PathBuf::from("/data/obs_edited.csv")
    );
    assert_eq!(edited_path(Path::new("obs")), PathBuf::from("obs_edited"));
    assert_eq!(
        info_path(Path::new("/data/obs.csv")),
        PathBuf::from("/data/obs_info.txt")
    );
}

#[test]
fn test_parse_time_formats() {
    let expected = Epoch::from_gregorian_utc(2023, 7, 24, 18, 58, 28, 0);
    for s in [
        "2023-07-24T18:58:28",
        "2023-07-24T18:58:28.000000",
        "2023-07-24 18:58:28",
        "2023-07-24 18:58:28 UTC",
        "2023-07-24T18:58:28Z",
        "2023-07-24_18-58-28",
    ] {
        assert_eq!(parse_time(s), Some(expected), "{s}");
    }
    assert_eq!(parse_time(&format_time(expected)), Some(expected));
    assert_eq!(parse_time("24/07/2023"), None);
}

#[test]
fn test_layout_names() {
    assert_eq!("header".parse(), Ok(RecordLayout::HeaderBlock));
    assert_eq!("sibling".parse(), Ok(RecordLayout::SiblingInfo));
    assert_eq!("json".parse(), Ok(RecordLayout::Json));
    assert_eq!(RecordLayout::default(), RecordLayout::HeaderBlock);
    assert_eq!(RecordLayout::SiblingInfo.extension(), "csv");
}
