// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use radioline::ObservationRecord;
use tempfile::TempDir;

use crate::{
    get_cmd_output, observe_args, radioline, set_arg, write_tone_iq_file, BINS, FFT_NUM,
    FILE_STEM,
};

#[test]
fn test_observe_iq_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let iq_file = write_tone_iq_file(tmp_dir.path(), 20);
    let output_dir = tmp_dir.path().join("observations");

    let cmd = radioline().args(observe_args(&iq_file, &output_dir)).ok();
    assert!(cmd.is_ok(), "observe failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Observation complete"), "{stdout}");

    let path = output_dir.join(format!("{FILE_STEM}.csv"));
    let record = ObservationRecord::read(&path).unwrap();
    assert_eq!(record.len(), BINS);
    assert!(record.frequencies[0] < record.frequencies[BINS - 1]);
    assert!(record.velocities[0] > record.velocities[BINS - 1]);
    assert_eq!(record.metadata.spectral_line.as_deref(), Some("H1_1420"));
    assert_eq!(record.metadata.horizontal, Some((180.0, 60.0)));
    assert!(record.metadata.lsr_correction.abs() < 50.0);

    let i_peak = record
        .power
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .unwrap()
        .0;
    assert_eq!(i_peak, BINS / 2 + 20);
}

#[test]
fn test_dry_run_writes_nothing() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let iq_file = write_tone_iq_file(tmp_dir.path(), 20);
    let output_dir = tmp_dir.path().join("observations");

    let cmd = radioline()
        .args(observe_args(&iq_file, &output_dir))
        .arg("--dry-run")
        .ok();
    assert!(cmd.is_ok(), "observe failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(!output_dir.exists());
}

#[test]
fn test_saved_arguments_reproduce_the_observation() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let iq_file = write_tone_iq_file(tmp_dir.path(), -35);
    let output_dir = tmp_dir.path().join("observations");
    let toml = tmp_dir.path().join("observe.toml");

    let cmd = radioline()
        .args(observe_args(&iq_file, &output_dir))
        .args(["--smoothing", "3", "--layout", "json", "--dry-run"])
        .arg("--save-toml")
        .arg(&toml)
        .ok();
    assert!(cmd.is_ok(), "observe failed: {}", cmd.err().unwrap());
    assert!(toml.exists());
    let saved = std::fs::read_to_string(&toml).unwrap();
    assert!(saved.contains("smoothing = 3"), "{saved}");

    let cmd = radioline()
        .args(["observe", "--no-progress-bars"])
        .arg(&toml)
        .ok();
    assert!(cmd.is_ok(), "observe failed: {}", cmd.err().unwrap());
    let record = ObservationRecord::read(output_dir.join(format!("{FILE_STEM}.json"))).unwrap();
    assert_eq!(record.len(), BINS);
}

#[test]
fn test_bad_arguments_are_reported() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let iq_file = write_tone_iq_file(tmp_dir.path(), 20);

    let cmd = radioline()
        .args(["observe", "--iq-file"])
        .arg(&iq_file)
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error:"), "{stderr}");
    assert!(stderr.contains("No pointing"), "{stderr}");

    let output_dir = tmp_dir.path().join("observations");
    let mut args = observe_args(&iq_file, &output_dir);
    set_arg(&mut args, "--bins", "100");
    let cmd = radioline().args(args).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("power of two"), "{stderr}");
    assert!(!output_dir.exists());
}

#[test]
fn test_running_out_of_samples_writes_nothing() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let iq_file = write_tone_iq_file(tmp_dir.path(), 20);
    let output_dir = tmp_dir.path().join("observations");

    let mut args = observe_args(&iq_file, &output_dir);
    set_arg(&mut args, "--fft-num", &(2 * FFT_NUM).to_string());
    let cmd = radioline().args(args).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("nothing was written"), "{stderr}");
    assert!(!output_dir.exists());
}
