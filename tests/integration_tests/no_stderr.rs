// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{get_cmd_output, observe_args, radioline, write_tone_iq_file, FILE_STEM};

#[test]
fn test_observe_and_reduce_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let iq_file = write_tone_iq_file(tmp_dir.path(), 5);
    let output_dir = tmp_dir.path().join("observations");

    let cmd = radioline().args(observe_args(&iq_file, &output_dir)).ok();
    assert!(cmd.is_ok(), "observe failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");

    let cmd = radioline()
        .arg("reduce")
        .arg("-i")
        .arg(output_dir.join(format!("{FILE_STEM}.csv")))
        .args(["--noise-floor", "whole"])
        .ok();
    assert!(cmd.is_ok(), "reduce failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}

#[test]
fn test_help_no_stderr() {
    for sub_command in ["observe", "reduce", "info", "plot", "list-drivers"] {
        let cmd = radioline().args([sub_command, "--help"]).ok();
        assert!(cmd.is_ok(), "{sub_command} --help failed");
        let (stdout, stderr) = get_cmd_output(cmd);
        assert!(!stdout.is_empty());
        assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    }
}
