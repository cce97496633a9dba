// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod no_stderr;
mod observe;
mod reduce;

use std::{
    f64::consts::TAU,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use byteorder::{LittleEndian, WriteBytesExt};

const BINS: usize = 256;
const FFT_NUM: usize = 16;
const TIME: &str = "2023-07-24T18:58:28";
const FILE_STEM: &str = "H1_1420_2023-07-24_18-58-28";

fn radioline() -> Command {
    Command::cargo_bin("radioline").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Write enough cf32 samples for one observation: a tone `tone_bin` bins
/// above the centre of the band, plus a little deterministic noise.
fn write_tone_iq_file(dir: &Path, tone_bin: isize) -> PathBuf {
    let path = dir.join("tone.cf32");
    let mut f = BufWriter::new(File::create(&path).unwrap());
    let mut state: u64 = 42;
    let mut noise = || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((state >> 40) as f64 / (1u64 << 24) as f64 - 0.5) * 0.02
    };
    for n in 0..BINS * FFT_NUM {
        let phase = TAU * tone_bin as f64 * n as f64 / BINS as f64;
        f.write_f32::<LittleEndian>((phase.cos() + noise()) as f32)
            .unwrap();
        f.write_f32::<LittleEndian>((phase.sin() + noise()) as f32)
            .unwrap();
    }
    f.flush().unwrap();
    path
}

/// Replace the value of `flag` in `args`, or add the flag if it isn't there.
fn set_arg(args: &mut Vec<String>, flag: &str, value: &str) {
    match args.iter().position(|a| a == flag) {
        Some(i) => args[i + 1] = value.to_string(),
        None => args.extend([flag.to_string(), value.to_string()]),
    }
}

/// The arguments of a small observation of `iq_file` into `output_dir`.
fn observe_args(iq_file: &Path, output_dir: &Path) -> Vec<String> {
    #[rustfmt::skip]
    let args = [
        "observe",
        "--iq-file", &iq_file.display().to_string(),
        "--sample-rate", "2.4e6",
        "--bins", &BINS.to_string(),
        "--fft-num", &FFT_NUM.to_string(),
        "--latitude", "-31.0",
        "--longitude", "116.5",
        "--az", "180",
        "--alt", "60",
        "--time", TIME,
        "--output-dir", &output_dir.display().to_string(),
        "--no-progress-bars",
    ]
    .map(|s| s.to_string())
    .to_vec();
    args
}
