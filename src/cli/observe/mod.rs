// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Make one spectral-line observation.

#[cfg(test)]
mod tests;

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{
    display_warnings, parse_layout, parse_power_scale, parse_y_limits, ConditioningArgs,
    ConditioningArgsError, InfoPrinter, Warn, ARG_FILE_HELP, LAYOUT_HELP,
    POWER_SCALES_COMMA_SEPARATED,
};
use crate::{
    condition::NoiseFloorMode,
    constants::{
        DEFAULT_BINS, DEFAULT_FFT_NUM, DEFAULT_OUTPUT_DIR, DEFAULT_SAMPLE_RATE,
        DC_OFFSET_MIN_SAMPLE_RATE,
    },
    geometry::{GeometryError, Observatory, Pointing},
    lines::{SpectralLine, SPECTRAL_LINES_COMMA_SEPARATED},
    observation::{parse_time, RecordLayout},
    params::{ObservationParams, PlotParams, SourceParams, Tuning},
    RadiolineError,
};

lazy_static::lazy_static! {
    static ref LINE_HELP: String =
        format!("The spectral line to observe. Its rest frequency is used unless --rest-freq is given. Known lines: {}. Default: {}", *SPECTRAL_LINES_COMMA_SEPARATED, SpectralLine::default());

    static ref SAMPLE_RATE_HELP: String =
        format!("The SDR sample rate [Hz]. This is also the observed bandwidth. Default: {DEFAULT_SAMPLE_RATE}");

    static ref DC_OFFSET_HELP: String =
        format!("Tune the SDR a quarter of the sample rate below the target and keep only the part of the band clear of the DC spike. Needs a sample rate of at least {DC_OFFSET_MIN_SAMPLE_RATE} Hz");

    static ref BINS_HELP: String =
        format!("The number of frequency bins (FFT length). Must be a power of two. Default: {DEFAULT_BINS}");

    static ref FFT_NUM_HELP: String =
        format!("The number of spectra averaged together. Default: {DEFAULT_FFT_NUM}");

    static ref POWER_SCALE_HELP: String =
        format!("How power is expressed. Supported scales: {}. Default: {}", *POWER_SCALES_COMMA_SEPARATED, crate::spectrum::PowerScale::default());

    static ref OUTPUT_DIR_HELP: String =
        format!("The directory observations are written into. It is created if it doesn't exist. Default: {DEFAULT_OUTPUT_DIR}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ObserveArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The SoapySDR driver of the SDR to use, e.g. "rtlsdr". Requires the
    /// "soapy" feature. `radioline list-drivers` shows what's available.
    #[clap(short, long, help_heading = "SAMPLE SOURCE")]
    pub(super) driver: Option<String>,

    /// Replay previously-recorded samples (interleaved little-endian 32-bit
    /// float I/Q, "cf32") instead of using an SDR. The file must have been
    /// recorded at the frequency the SDR would be tuned to.
    #[clap(long, help_heading = "SAMPLE SOURCE")]
    pub(super) iq_file: Option<PathBuf>,

    /// The SDR's frequency correction [parts per million]. Only applied if the
    /// device supports it. Default: 0
    #[clap(long, help_heading = "SAMPLE SOURCE")]
    pub(super) ppm: Option<f64>,

    /// The SDR's receive channel. Default: 0
    #[clap(long, help_heading = "SAMPLE SOURCE")]
    pub(super) channel: Option<usize>,

    #[clap(short, long, help = LINE_HELP.as_str(), help_heading = "TUNING")]
    pub(super) line: Option<String>,

    /// The rest frequency that velocities are relative to [Hz]. Overrides the
    /// line's rest frequency. 0 means "use the centre frequency".
    #[clap(long, help_heading = "TUNING")]
    pub(super) rest_freq: Option<f64>,

    /// The sky frequency at the centre of the band [Hz]. Default: the rest
    /// frequency.
    #[clap(short, long, help_heading = "TUNING")]
    pub(super) center_freq: Option<f64>,

    #[clap(short, long, help = SAMPLE_RATE_HELP.as_str(), help_heading = "TUNING")]
    pub(super) sample_rate: Option<f64>,

    /// The local oscillator frequency of an external up/downconverter [Hz].
    /// The SDR is tuned this far below the sky frequency. Default: 0
    #[clap(long, help_heading = "TUNING")]
    pub(super) lo_freq: Option<f64>,

    #[clap(long, help = DC_OFFSET_HELP.as_str(), help_heading = "TUNING")]
    #[serde(default)]
    pub(super) dc_offset: bool,

    #[clap(short, long, help = BINS_HELP.as_str(), help_heading = "ACQUISITION")]
    pub(super) bins: Option<usize>,

    #[clap(short, long, help = FFT_NUM_HELP.as_str(), help_heading = "ACQUISITION")]
    pub(super) fft_num: Option<usize>,

    #[clap(long, help = POWER_SCALE_HELP.as_str(), help_heading = "ACQUISITION")]
    pub(super) power_scale: Option<String>,

    /// Don't remove the slope of the spectrum's baseline.
    #[clap(long, help_heading = "CONDITIONING")]
    #[serde(default)]
    pub(super) no_baseline: bool,

    #[clap(flatten)]
    #[serde(rename = "conditioning")]
    #[serde(default)]
    pub(super) conditioning_args: ConditioningArgs,

    /// The observatory's latitude [degrees]. Default: 0
    #[clap(long, allow_hyphen_values = true, help_heading = "GEOMETRY")]
    pub(super) latitude: Option<f64>,

    /// The observatory's longitude, east positive [degrees]. Default: 0
    #[clap(long, allow_hyphen_values = true, help_heading = "GEOMETRY")]
    pub(super) longitude: Option<f64>,

    /// The observatory's height above the ellipsoid [metres]. Default: 0
    #[clap(long, allow_hyphen_values = true, help_heading = "GEOMETRY")]
    pub(super) elevation: Option<f64>,

    /// The azimuth the antenna points at [degrees]. Must be given with
    /// --alt.
    #[clap(long, allow_hyphen_values = true, help_heading = "GEOMETRY")]
    pub(super) az: Option<f64>,

    /// The altitude the antenna points at [degrees]. Must be given with --az.
    #[clap(long, allow_hyphen_values = true, help_heading = "GEOMETRY")]
    pub(super) alt: Option<f64>,

    /// The J2000 right ascension the antenna points at [degrees]. Must be
    /// given with --dec, instead of --az and --alt.
    #[clap(long, allow_hyphen_values = true, help_heading = "GEOMETRY")]
    pub(super) ra: Option<f64>,

    /// The J2000 declination the antenna points at [degrees]. Must be given
    /// with --ra.
    #[clap(long, allow_hyphen_values = true, help_heading = "GEOMETRY")]
    pub(super) dec: Option<f64>,

    /// Don't correct velocities to the local standard of rest.
    #[clap(long, help_heading = "GEOMETRY")]
    #[serde(default)]
    pub(super) no_lsr_correction: bool,

    /// Record this UTC time against the observation instead of the time the
    /// acquisition finished, e.g. "2023-07-24T18:58:28". Useful when replaying
    /// recorded samples.
    #[clap(long, help_heading = "GEOMETRY")]
    pub(super) time: Option<String>,

    #[clap(short, long, help = OUTPUT_DIR_HELP.as_str(), help_heading = "OUTPUT")]
    pub(super) output_dir: Option<PathBuf>,

    #[clap(long, help = LAYOUT_HELP.as_str(), help_heading = "OUTPUT")]
    pub(super) layout: Option<String>,

    /// Don't write the observation to disk.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) no_write: bool,

    /// Also plot power against radial velocity into the output directory.
    /// Requires the "plotting" feature.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) plot: bool,

    /// The bottom of the plot's power axis. Given with --y-max; both 0 means
    /// "fit the data".
    #[clap(long, allow_hyphen_values = true, help_heading = "OUTPUT")]
    pub(super) y_min: Option<f64>,

    /// The top of the plot's power axis.
    #[clap(long, allow_hyphen_values = true, help_heading = "OUTPUT")]
    pub(super) y_max: Option<f64>,
}

impl ObserveArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<ObserveArgs, RadiolineError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let ObserveArgs {
                args_file: _,
                driver,
                iq_file,
                ppm,
                channel,
                line,
                rest_freq,
                center_freq,
                sample_rate,
                lo_freq,
                dc_offset,
                bins,
                fft_num,
                power_scale,
                no_baseline,
                conditioning_args,
                latitude,
                longitude,
                elevation,
                az,
                alt,
                ra,
                dec,
                no_lsr_correction,
                time,
                output_dir,
                layout,
                no_write,
                plot,
                y_min,
                y_max,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(ObserveArgs {
                args_file: None,
                driver: cli_args.driver.or(driver),
                iq_file: cli_args.iq_file.or(iq_file),
                ppm: cli_args.ppm.or(ppm),
                channel: cli_args.channel.or(channel),
                line: cli_args.line.or(line),
                rest_freq: cli_args.rest_freq.or(rest_freq),
                center_freq: cli_args.center_freq.or(center_freq),
                sample_rate: cli_args.sample_rate.or(sample_rate),
                lo_freq: cli_args.lo_freq.or(lo_freq),
                dc_offset: cli_args.dc_offset || dc_offset,
                bins: cli_args.bins.or(bins),
                fft_num: cli_args.fft_num.or(fft_num),
                power_scale: cli_args.power_scale.or(power_scale),
                no_baseline: cli_args.no_baseline || no_baseline,
                conditioning_args: cli_args.conditioning_args.merge(conditioning_args),
                latitude: cli_args.latitude.or(latitude),
                longitude: cli_args.longitude.or(longitude),
                elevation: cli_args.elevation.or(elevation),
                az: cli_args.az.or(az),
                alt: cli_args.alt.or(alt),
                ra: cli_args.ra.or(ra),
                dec: cli_args.dec.or(dec),
                no_lsr_correction: cli_args.no_lsr_correction || no_lsr_correction,
                time: cli_args.time.or(time),
                output_dir: cli_args.output_dir.or(output_dir),
                layout: cli_args.layout.or(layout),
                no_write: cli_args.no_write || no_write,
                plot: cli_args.plot || plot,
                y_min: cli_args.y_min.or(y_min),
                y_max: cli_args.y_max.or(y_max),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ObservationParams, ObserveArgsError> {
        let Self {
            args_file: _,
            driver,
            iq_file,
            ppm,
            channel,
            line,
            rest_freq,
            center_freq,
            sample_rate,
            lo_freq,
            dc_offset,
            bins,
            fft_num,
            power_scale,
            no_baseline,
            conditioning_args,
            latitude,
            longitude,
            elevation,
            az,
            alt,
            ra,
            dec,
            no_lsr_correction,
            time,
            output_dir,
            layout,
            no_write,
            plot,
            y_min,
            y_max,
        } = self;

        let mut printer = InfoPrinter::new("Observation".into());

        // Where do the samples come from?
        let source = match (driver, iq_file) {
            (None, None) => return Err(ObserveArgsError::NoSource),
            (Some(_), Some(_)) => return Err(ObserveArgsError::BothSources),
            (Some(driver), None) => {
                let ppm = ppm.unwrap_or(0.0);
                if !ppm.is_finite() {
                    return Err(ObserveArgsError::InvalidPpm(ppm));
                }
                printer.push_line(format!("Sampling SoapySDR driver '{driver}'").into());
                SourceParams::Soapy {
                    driver,
                    ppm,
                    channel: channel.unwrap_or(0),
                }
            }
            (None, Some(file)) => {
                if ppm.is_some() || channel.is_some() {
                    "--ppm and --channel don't apply to I/Q files; ignoring them".warn();
                }
                printer.push_line(format!("Replaying I/Q file {}", file.display()).into());
                SourceParams::IqFile(file)
            }
        };

        // Which line, and where to tune.
        let spectral_line = match line.as_deref() {
            Some(l) => SpectralLine::from_str(l).map_err(ObserveArgsError::BadLine)?,
            None => SpectralLine::default(),
        };
        if let Some(f) = center_freq {
            if !(f.is_finite() && f > 0.0) {
                return Err(ObserveArgsError::InvalidCenterFrequency(f));
            }
        }
        let rest_frequency = match rest_freq {
            Some(f) if f == 0.0 => center_freq.unwrap_or_else(|| spectral_line.rest_frequency()),
            Some(f) if f.is_finite() && f > 0.0 => f,
            Some(f) => return Err(ObserveArgsError::InvalidRestFrequency(f)),
            None => spectral_line.rest_frequency(),
        };
        let center_frequency = center_freq.unwrap_or(rest_frequency);
        // A custom rest frequency without a named line gets a name of its
        // own.
        let line_name = match (&line, rest_freq) {
            (None, Some(f)) if f != 0.0 => format!("{:.0}MHz", f / 1e6),
            _ => spectral_line.to_string(),
        };

        let sample_rate = sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ObserveArgsError::InvalidSampleRate(sample_rate));
        }
        let lo_frequency = lo_freq.unwrap_or(0.0);
        if !lo_frequency.is_finite() {
            return Err(ObserveArgsError::InvalidLoFrequency(lo_frequency));
        }
        if Tuning::dc_offset_refused(dc_offset, sample_rate) {
            format!(
                "The sample rate ({sample_rate} Hz) is too low to avoid the DC spike (at least {DC_OFFSET_MIN_SAMPLE_RATE} Hz is needed); tuning to the centre frequency instead"
            )
            .warn();
        }
        let tuning = Tuning::new(center_frequency, sample_rate, lo_frequency, dc_offset);
        if tuning.sdr_frequency() <= 0.0 {
            return Err(ObserveArgsError::InvalidSdrFrequency(
                tuning.sdr_frequency(),
            ));
        }

        let bins = bins.unwrap_or(DEFAULT_BINS);
        if !bins.is_power_of_two() {
            return Err(ObserveArgsError::BinsNotPowerOfTwo(bins));
        }
        let fft_num = fft_num.unwrap_or(DEFAULT_FFT_NUM);
        if fft_num == 0 {
            return Err(ObserveArgsError::ZeroFftNum);
        }
        let power_scale =
            parse_power_scale(power_scale.as_deref()).map_err(ObserveArgsError::BadPowerScale)?;

        let mut block = vec![
            format!(
                "Line {line_name}, rest frequency {} MHz",
                rest_frequency / 1e6
            )
            .into(),
            format!(
                "Centre frequency {} MHz, bandwidth {} MHz",
                center_frequency / 1e6,
                sample_rate / 1e6
            )
            .into(),
            format!("SDR tuned to {} MHz", tuning.sdr_frequency() / 1e6).into(),
        ];
        if tuning.lo_frequency != 0.0 {
            block.push(format!("Frontend LO {} MHz", tuning.lo_frequency / 1e6).into());
        }
        if tuning.dc_offset != 0.0 {
            block.push(
                format!(
                    "Avoiding the DC spike; keeping {} of {bins} bins",
                    tuning.kept_bins(bins)
                )
                .into(),
            );
        }
        printer.push_block(block);
        printer.push_line(
            format!(
                "Averaging {fft_num} spectra of {bins} bins ({} kHz resolution), power in {}",
                sample_rate / bins as f64 / 1e3,
                power_scale.unit()
            )
            .into(),
        );

        // Where's the antenna?
        let observatory = Observatory {
            latitude: latitude.unwrap_or(0.0),
            longitude: longitude.unwrap_or(0.0),
            elevation: elevation.unwrap_or(0.0),
        };
        observatory.validate()?;
        let pointing = match (az, alt, ra, dec) {
            (Some(az), Some(alt), None, None) => Pointing::Horizontal { az, alt },
            (None, None, Some(ra), Some(dec)) => Pointing::Equatorial { ra, dec },
            (None, None, None, None) => return Err(ObserveArgsError::NoPointing),
            (_, _, None, None) | (None, None, _, _) => {
                return Err(ObserveArgsError::IncompletePointing)
            }
            _ => return Err(ObserveArgsError::MixedPointing),
        };
        pointing.validate()?;
        let lsr_correct = !no_lsr_correction;
        let time = match time {
            Some(t) => Some(parse_time(&t).ok_or(ObserveArgsError::BadTime(t))?),
            None => None,
        };
        printer.push_block(vec![
            format!(
                "Observatory at latitude {}°, longitude {}°, elevation {} m",
                observatory.latitude, observatory.longitude, observatory.elevation
            )
            .into(),
            match pointing {
                Pointing::Horizontal { az, alt } => format!("Pointed at az {az}°, alt {alt}°"),
                Pointing::Equatorial { ra, dec } => format!("Pointed at RA {ra}°, Dec {dec}°"),
            }
            .into(),
            if lsr_correct {
                "Correcting velocities to the LSR"
            } else {
                "Not correcting velocities to the LSR"
            }
            .into(),
        ]);

        // What happens to the result?
        let output_dir = output_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let layout = match layout {
            Some(l) => parse_layout(&l).map_err(ObserveArgsError::BadLayout)?,
            None => RecordLayout::default(),
        };
        let y_limits = parse_y_limits(y_min, y_max).map_err(ObserveArgsError::BadYLimits)?;
        #[cfg(not(feature = "plotting"))]
        if plot {
            return Err(ObserveArgsError::NoPlottingFeature);
        }
        let write = !no_write;
        if !write && !plot {
            "Neither writing nor plotting the observation; it will only be summarised".warn();
        }
        let mut block = vec![];
        if write {
            block.push(
                format!(
                    "Writing to {} ({layout} layout)",
                    output_dir.display()
                )
                .into(),
            );
        }
        if plot {
            block.push(format!("Plotting into {}", output_dir.display()).into());
        }
        printer.push_block(block);
        printer.display();

        let conditioner = conditioning_args.parse(
            !no_baseline,
            NoiseFloorMode::Edges,
            Some(tuning.kept_bins(bins)),
        )?;

        display_warnings();

        Ok(ObservationParams {
            source,
            tuning,
            bins,
            fft_num,
            power_scale,
            conditioner,
            observatory,
            pointing,
            lsr_correct,
            spectral_line: line_name,
            rest_frequency,
            time,
            output_dir,
            layout,
            write,
            plot: if plot {
                Some(PlotParams { y_limits })
            } else {
                None
            },
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), RadiolineError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let obs = params.run()?;
        for w in &obs.warnings {
            w.warn();
        }
        display_warnings();

        let record = &obs.record;
        let mut printer = InfoPrinter::new("Observation complete".into());
        if let Some((i_peak, peak)) = record
            .power
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        {
            printer.push_line(
                format!(
                    "Peak of {peak:.3} {} at {:.2} km/s ({} bins)",
                    params.power_scale.unit(),
                    record.velocities[i_peak],
                    record.len()
                )
                .into(),
            );
        }
        let m = &record.metadata;
        printer.push_block(vec![
            format!("RA {:.3}°, Dec {:.3}°", m.equatorial.0, m.equatorial.1).into(),
            format!("l {:.3}°, b {:.3}°", m.galactic.0, m.galactic.1).into(),
            format!("LSR correction {:.3} km/s", m.lsr_correction).into(),
        ]);
        let mut block = vec![];
        if let Some(floor) = obs.report.noise_floor {
            block.push(format!("Noise floor {floor:.4} removed").into());
        }
        if let Some(k) = obs.report.calibration_scale {
            block.push(format!("Background reference scaled by {k}").into());
        }
        printer.push_block(block);
        let mut block = vec![];
        if let Some(path) = &obs.path {
            block.push(format!("Wrote {}", path.display()).into());
        }
        if let Some(path) = &obs.plot {
            block.push(format!("Plotted {}", path.display()).into());
        }
        printer.push_block(block);
        printer.display();

        Ok(())
    }
}

#[derive(Error, Debug)]
pub(super) enum ObserveArgsError {
    #[error("No sample source was given; use --driver for an SDR or --iq-file for recorded samples")]
    NoSource,

    #[error("Only one of --driver and --iq-file may be given")]
    BothSources,

    #[error("The PPM correction must be a finite number; got {0}")]
    InvalidPpm(f64),

    #[error("{0}")]
    BadLine(String),

    #[error("The rest frequency must be a positive number of Hz (or 0 to use the centre frequency); got {0}")]
    InvalidRestFrequency(f64),

    #[error("The centre frequency must be a positive number of Hz; got {0}")]
    InvalidCenterFrequency(f64),

    #[error("The sample rate must be a positive number of Hz; got {0}")]
    InvalidSampleRate(f64),

    #[error("The LO frequency must be a finite number of Hz; got {0}")]
    InvalidLoFrequency(f64),

    #[error("The SDR would have to be tuned to {0} Hz; check the centre and LO frequencies")]
    InvalidSdrFrequency(f64),

    #[error("The number of bins must be a power of two; got {0}")]
    BinsNotPowerOfTwo(usize),

    #[error("The number of spectra to average must be at least 1")]
    ZeroFftNum,

    #[error("{0}")]
    BadPowerScale(String),

    #[error("No pointing was given; use --az and --alt, or --ra and --dec")]
    NoPointing,

    #[error("The pointing is incomplete; --az needs --alt, and --ra needs --dec")]
    IncompletePointing,

    #[error("Give either --az and --alt, or --ra and --dec, not a mixture")]
    MixedPointing,

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("Couldn't parse '{0}' as a UTC time; expected e.g. 2023-07-24T18:58:28")]
    BadTime(String),

    #[error("{0}")]
    BadLayout(String),

    #[error("{0}")]
    BadYLimits(String),

    #[cfg(not(feature = "plotting"))]
    #[error("radioline was not compiled with the \"plotting\" feature; --plot can't be used")]
    NoPlottingFeature,

    #[error(transparent)]
    Conditioning(#[from] ConditioningArgsError),
}
