// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use approx::assert_abs_diff_eq;
use clap::Parser;
use hifitime::Epoch;
use serial_test::serial;
use tempfile::TempDir;

use super::{ObserveArgs, ObserveArgsError};
use crate::{
    geometry::{GeometryError, Pointing},
    lines::SpectralLine,
    observation::{observation_file_name, ObservationRecord, RecordLayout},
    params::SourceParams,
    spectrum::PowerScale,
    tests::write_tone_iq_file,
};

const BINS: usize = 256;

fn base_args(iq_file: &Path, output_dir: &Path) -> Vec<String> {
    #[rustfmt::skip]
    let args = vec![
        "observe",
        "--iq-file", &iq_file.display().to_string(),
        "--az", "180",
        "--alt", "45",
        "--bins", "256",
        "--fft-num", "4",
        "--sample-rate", "2.4e6",
        "--output-dir", &output_dir.display().to_string(),
        "--time", "2023-07-24T18:58:28",
    ]
    .into_iter()
    .map(|s| s.to_string())
    .collect();
    args
}

/// The base arguments with `extra` flags added. A flag that's already there
/// has its value replaced, as clap won't take an option twice.
fn parse_with(extra: &[&str]) -> Result<crate::params::ObservationParams, ObserveArgsError> {
    let mut args = base_args(Path::new("tone.cf32"), Path::new("observations"));
    let mut extra = extra.iter().peekable();
    while let Some(&flag) = extra.next() {
        let value = extra.next_if(|v| !v.starts_with("--"));
        match (args.iter().position(|a| a == flag), value) {
            (Some(i), Some(&v)) => args[i + 1] = v.to_string(),
            (_, value) => {
                args.push(flag.to_string());
                args.extend(value.map(|v| v.to_string()));
            }
        }
    }
    ObserveArgs::parse_from(args).parse()
}

#[test]
#[serial]
fn test_dry_run_returns_early() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let iq_file = tmp_dir.path().join("tone.cf32");
    let output_dir = tmp_dir.path().join("observations");
    write_tone_iq_file(&iq_file, BINS, BINS * 4, 20);

    let args = ObserveArgs::parse_from(base_args(&iq_file, &output_dir));
    assert!(args.clone().run(true).is_ok());
    assert!(!output_dir.exists());

    let result = args.run(false);
    assert!(result.is_ok(), "{}", result.unwrap_err());
    let time = Epoch::from_gregorian_utc_hms(2023, 7, 24, 18, 58, 28);
    let path = output_dir.join(observation_file_name(
        "H1_1420",
        time,
        RecordLayout::HeaderBlock,
    ));
    assert!(path.exists());
    let record = ObservationRecord::read(&path).unwrap();
    assert_eq!(record.len(), BINS);
    assert_eq!(record.metadata.spectral_line.as_deref(), Some("H1_1420"));
    assert_eq!(record.metadata.horizontal, Some((180.0, 45.0)));
}

#[test]
#[serial]
fn test_defaults() {
    let params = parse_with(&[]).unwrap();
    let rest = SpectralLine::Hi1420.rest_frequency();
    assert!(matches!(params.source, SourceParams::IqFile(_)));
    assert_abs_diff_eq!(params.rest_frequency, rest);
    assert_abs_diff_eq!(params.tuning.center_frequency, rest);
    assert_abs_diff_eq!(params.tuning.sdr_frequency(), rest);
    assert_eq!(params.spectral_line, "H1_1420");
    assert_eq!(params.power_scale, PowerScale::Decibels);
    assert_eq!(params.layout, RecordLayout::HeaderBlock);
    assert!(params.lsr_correct);
    assert!(params.write);
    assert!(params.plot.is_none());
    assert!(params.conditioner.baseline);
    assert_eq!(
        params.pointing,
        Pointing::Horizontal {
            az: 180.0,
            alt: 45.0
        }
    );
}

#[test]
#[serial]
fn test_rest_frequency_resolution() {
    let oh = SpectralLine::Oh1667.rest_frequency();
    let params = parse_with(&["--line", "oh_1667"]).unwrap();
    assert_abs_diff_eq!(params.rest_frequency, oh);
    assert_eq!(params.spectral_line, "OH_1667");

    // An explicit rest frequency beats the line's.
    let params = parse_with(&["--rest-freq", "1421e6"]).unwrap();
    assert_abs_diff_eq!(params.rest_frequency, 1421e6);
    assert_abs_diff_eq!(params.tuning.center_frequency, 1421e6);
    assert_eq!(params.spectral_line, "1421MHz");

    // 0 means the centre frequency.
    let params = parse_with(&["--rest-freq", "0", "--center-freq", "1419e6"]).unwrap();
    assert_abs_diff_eq!(params.rest_frequency, 1419e6);
    assert_eq!(params.spectral_line, "H1_1420");

    assert!(matches!(
        parse_with(&["--rest-freq=-5"]),
        Err(ObserveArgsError::InvalidRestFrequency(_))
    ));
    assert!(matches!(
        parse_with(&["--line", "CO_115"]),
        Err(ObserveArgsError::BadLine(_))
    ));
}

#[test]
#[serial]
fn test_lo_and_dc_offset_tuning() {
    let params = parse_with(&[
        "--center-freq",
        "1420e6",
        "--lo-freq",
        "1300e6",
        "--sample-rate",
        "3.2e6",
        "--dc-offset",
    ])
    .unwrap();
    assert_abs_diff_eq!(params.tuning.dc_offset, 0.8e6);
    assert_abs_diff_eq!(params.tuning.sdr_frequency(), 119.2e6);

    // The LO can't be above the sky frequency.
    assert!(matches!(
        parse_with(&["--lo-freq", "2000e6"]),
        Err(ObserveArgsError::InvalidSdrFrequency(_))
    ));
}

#[test]
#[serial]
fn test_bad_acquisition_settings() {
    assert!(matches!(
        parse_with(&["--bins", "1000"]),
        Err(ObserveArgsError::BinsNotPowerOfTwo(1000))
    ));
    assert!(matches!(
        parse_with(&["--fft-num", "0"]),
        Err(ObserveArgsError::ZeroFftNum)
    ));
    assert!(matches!(
        parse_with(&["--sample-rate", "0"]),
        Err(ObserveArgsError::InvalidSampleRate(_))
    ));
    assert!(matches!(
        parse_with(&["--power-scale", "furlongs"]),
        Err(ObserveArgsError::BadPowerScale(_))
    ));
    assert!(matches!(
        parse_with(&["--layout", "fits"]),
        Err(ObserveArgsError::BadLayout(_))
    ));
    assert!(matches!(
        parse_with(&["--y-min", "5"]),
        Err(ObserveArgsError::BadYLimits(_))
    ));
    assert!(matches!(
        parse_with(&["--noise-floor", "median"]),
        Err(ObserveArgsError::Conditioning(_))
    ));
    assert!(matches!(
        parse_with(&["--time", "yesterday"]),
        Err(ObserveArgsError::BadTime(_))
    ));
}

#[test]
#[serial]
fn test_sources() {
    let result = ObserveArgs::parse_from(["observe", "--az", "0", "--alt", "90"]).parse();
    assert!(matches!(result, Err(ObserveArgsError::NoSource)));

    let result = parse_with(&["--driver", "rtlsdr"]);
    assert!(matches!(result, Err(ObserveArgsError::BothSources)));

    let params = ObserveArgs::parse_from([
        "observe", "--driver", "rtlsdr", "--ppm", "1.5", "--az", "0", "--alt", "90",
    ])
    .parse()
    .unwrap();
    match params.source {
        SourceParams::Soapy {
            driver,
            ppm,
            channel,
        } => {
            assert_eq!(driver, "rtlsdr");
            assert_abs_diff_eq!(ppm, 1.5);
            assert_eq!(channel, 0);
        }
        SourceParams::IqFile(_) => panic!("expected an SDR source"),
    }
}

#[test]
#[serial]
fn test_pointing() {
    let params = ObserveArgs::parse_from([
        "observe",
        "--iq-file",
        "tone.cf32",
        "--ra",
        "83.6",
        "--dec",
        "22.0",
        "--latitude",
        "-31.0",
        "--longitude",
        "116.5",
    ])
    .parse()
    .unwrap();
    assert_eq!(
        params.pointing,
        Pointing::Equatorial {
            ra: 83.6,
            dec: 22.0
        }
    );
    assert_abs_diff_eq!(params.observatory.latitude, -31.0);

    let result = ObserveArgs::parse_from(["observe", "--iq-file", "tone.cf32"]).parse();
    assert!(matches!(result, Err(ObserveArgsError::NoPointing)));

    let result =
        ObserveArgs::parse_from(["observe", "--iq-file", "tone.cf32", "--az", "10"]).parse();
    assert!(matches!(result, Err(ObserveArgsError::IncompletePointing)));

    let result = parse_with(&["--ra", "10", "--dec", "10"]);
    assert!(matches!(result, Err(ObserveArgsError::MixedPointing)));

    let result = parse_with(&["--alt", "95"]);
    assert!(matches!(
        result,
        Err(ObserveArgsError::Geometry(GeometryError::OutOfRange { .. }))
    ));

    let result = parse_with(&["--latitude", "-100"]);
    assert!(matches!(result, Err(ObserveArgsError::Geometry(_))));
}

#[test]
#[serial]
fn test_arg_file_is_merged() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let arg_file = tmp_dir.path().join("observe.toml");
    std::fs::write(
        &arg_file,
        "iq_file = \"tone.cf32\"\naz = 90.0\nalt = 30.0\nbins = 512\nno_lsr_correction = true\n\n[conditioning]\nsmoothing = 5\n",
    )
    .unwrap();

    let args = ObserveArgs::parse_from([
        "observe",
        &arg_file.display().to_string(),
        "--bins",
        "128",
    ])
    .merge()
    .unwrap();
    let params = args.parse().unwrap();
    // The command line wins.
    assert_eq!(params.bins, 128);
    assert_eq!(
        params.pointing,
        Pointing::Horizontal {
            az: 90.0,
            alt: 30.0
        }
    );
    assert!(!params.lsr_correct);
    assert_eq!(params.conditioner.smoothing, 5);
}

#[cfg(not(feature = "plotting"))]
#[test]
#[serial]
fn test_plot_needs_plotting_feature() {
    assert!(matches!(
        parse_with(&["--plot"]),
        Err(ObserveArgsError::NoPlottingFeature)
    ));
}
