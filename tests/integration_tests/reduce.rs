// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use radioline::ObservationRecord;
use tempfile::TempDir;

use crate::{get_cmd_output, observe_args, radioline, write_tone_iq_file, BINS, FILE_STEM};

fn observe(dir: &Path) -> PathBuf {
    let iq_file = write_tone_iq_file(dir, 20);
    let output_dir = dir.join("observations");
    let cmd = radioline().args(observe_args(&iq_file, &output_dir)).ok();
    assert!(cmd.is_ok(), "observe failed: {}", cmd.err().unwrap());
    output_dir.join(format!("{FILE_STEM}.csv"))
}

#[test]
fn test_reduce_writes_an_edited_record() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let observation = observe(tmp_dir.path());
    let original = ObservationRecord::read(&observation).unwrap();

    let cmd = radioline()
        .arg("reduce")
        .arg("--input")
        .arg(&observation)
        .args(["--smoothing", "9"])
        .ok();
    assert!(cmd.is_ok(), "reduce failed: {}", cmd.err().unwrap());

    let edited = observation.with_file_name(format!("{FILE_STEM}_edited.csv"));
    let reduced = ObservationRecord::read(&edited).unwrap();
    assert_eq!(reduced.len(), BINS);
    assert_eq!(reduced.velocities, original.velocities);
    assert_eq!(reduced.metadata, original.metadata);
    // Smoothing spreads the tone out.
    let peak = |r: &ObservationRecord| r.power.iter().copied().fold(f64::MIN, f64::max);
    assert!(peak(&reduced) < peak(&original));
}

#[test]
fn test_reduce_refuses_to_overwrite_its_input() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let observation = observe(tmp_dir.path());
    let before = std::fs::read_to_string(&observation).unwrap();

    let cmd = radioline()
        .arg("reduce")
        .arg("-i")
        .arg(&observation)
        .arg("-o")
        .arg(&observation)
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("would overwrite"), "{stderr}");
    assert_eq!(std::fs::read_to_string(&observation).unwrap(), before);
}

#[test]
fn test_info() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let observation = observe(tmp_dir.path());

    let cmd = radioline().arg("info").arg(&observation).ok();
    assert!(cmd.is_ok(), "info failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Line H1_1420"), "{stdout}");
    assert!(stdout.contains(&format!("{BINS} bins")), "{stdout}");

    let cmd = radioline()
        .arg("info")
        .arg(tmp_dir.path().join("missing.txt"))
        .ok();
    assert!(cmd.is_err());
}

#[test]
#[cfg(feature = "plotting")]
fn test_plot() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let observation = observe(tmp_dir.path());

    let cmd = radioline().arg("plot").arg(&observation).ok();
    assert!(cmd.is_ok(), "plot failed: {}", cmd.err().unwrap());
    assert!(observation.with_extension("png").exists());
}
