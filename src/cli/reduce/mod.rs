// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Re-condition a saved observation.


use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{
    display_warnings, parse_layout, parse_power_scale, parse_y_limits, ConditioningArgs,
    ConditioningArgsError, InfoPrinter, Warn, ARG_FILE_HELP, POWER_SCALES_COMMA_SEPARATED,
};
use crate::{
    condition::NoiseFloorMode,
    observation::{edited_path, ObservationRecord, RecordLayout},
    params::{PlotParams, ReduceParams},
    RadiolineError,
};

lazy_static::lazy_static! {
    static ref POWER_SCALE_HELP: String =
        format!("How the saved power is expressed; only used to label plots. Supported scales: {}. Default: {}", *POWER_SCALES_COMMA_SEPARATED, crate::spectrum::PowerScale::default());
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ReduceArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The saved observation to reduce.
    #[clap(short, long, help_heading = "INPUT AND OUTPUT")]
    pub(super) input: Option<PathBuf>,

    /// Where the reduced observation is written. Default: the input's name
    /// with "_edited" appended.
    #[clap(short, long, help_heading = "INPUT AND OUTPUT")]
    pub(super) output: Option<PathBuf>,

    /// How the reduced observation is laid out on disk. Default: "json" for
    /// ".json" inputs, otherwise "header".
    #[clap(long, help_heading = "INPUT AND OUTPUT")]
    pub(super) layout: Option<String>,

    /// Remove the slope of the spectrum's baseline.
    #[clap(long, help_heading = "CONDITIONING")]
    #[serde(default)]
    pub(super) baseline: bool,

    #[clap(flatten)]
    #[serde(rename = "conditioning")]
    #[serde(default)]
    pub(super) conditioning_args: ConditioningArgs,

    /// Also plot the reduced observation next to the output. Requires the
    /// "plotting" feature.
    #[clap(long, help_heading = "PLOTTING")]
    #[serde(default)]
    pub(super) plot: bool,

    #[clap(long, help = POWER_SCALE_HELP.as_str(), help_heading = "PLOTTING")]
    pub(super) power_scale: Option<String>,

    /// The bottom of the plot's power axis. Given with --y-max; both 0 means
    /// "fit the data".
    #[clap(long, allow_hyphen_values = true, help_heading = "PLOTTING")]
    pub(super) y_min: Option<f64>,

    /// The top of the plot's power axis.
    #[clap(long, allow_hyphen_values = true, help_heading = "PLOTTING")]
    pub(super) y_max: Option<f64>,
}

impl ReduceArgs {
    pub(super) fn merge(self) -> Result<ReduceArgs, RadiolineError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let ReduceArgs {
                args_file: _,
                input,
                output,
                layout,
                baseline,
                conditioning_args,
                plot,
                power_scale,
                y_min,
                y_max,
            } = unpack_arg_file!(arg_file);

            Ok(ReduceArgs {
                args_file: None,
                input: cli_args.input.or(input),
                output: cli_args.output.or(output),
                layout: cli_args.layout.or(layout),
                baseline: cli_args.baseline || baseline,
                conditioning_args: cli_args.conditioning_args.merge(conditioning_args),
                plot: cli_args.plot || plot,
                power_scale: cli_args.power_scale.or(power_scale),
                y_min: cli_args.y_min.or(y_min),
                y_max: cli_args.y_max.or(y_max),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ReduceParams, ReduceArgsError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            input,
            output,
            layout,
            baseline,
            conditioning_args,
            plot,
            power_scale,
            y_min,
            y_max,
        } = self;

        let input = input.ok_or(ReduceArgsError::NoInput)?;
        let output = output.unwrap_or_else(|| edited_path(&input));
        if output == input {
            return Err(ReduceArgsError::SameInputAndOutput(input));
        }
        let layout = match layout {
            Some(l) => parse_layout(&l).map_err(ReduceArgsError::BadLayout)?,
            None => match input.extension().and_then(|e| e.to_str()) {
                Some(e) if e.eq_ignore_ascii_case("json") => RecordLayout::Json,
                _ => RecordLayout::HeaderBlock,
            },
        };
        let power_scale =
            parse_power_scale(power_scale.as_deref()).map_err(ReduceArgsError::BadPowerScale)?;
        let y_limits = parse_y_limits(y_min, y_max).map_err(ReduceArgsError::BadYLimits)?;
        #[cfg(not(feature = "plotting"))]
        if plot {
            return Err(ReduceArgsError::NoPlottingFeature);
        }
        if !plot && y_limits.is_some() {
            "--y-min and --y-max only apply with --plot; ignoring them".warn();
        }

        let mut printer = InfoPrinter::new("Reduction".into());
        printer.push_block(vec![
            format!("Reading {}", input.display()).into(),
            format!("Writing {} ({layout} layout)", output.display()).into(),
        ]);
        if plot {
            printer.push_line(
                format!("Plotting {}", output.with_extension("png").display()).into(),
            );
        }
        printer.display();

        // A calibration reference can be checked against the input's length
        // now, if the input is readable; otherwise the run reports it.
        let expected_bins = ObservationRecord::read(&input).ok().map(|r| r.len());
        let conditioner = conditioning_args.parse(baseline, NoiseFloorMode::None, expected_bins)?;

        display_warnings();

        Ok(ReduceParams {
            input,
            output,
            layout,
            conditioner,
            power_scale,
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

        let reduction = params.run()?;
        for w in &reduction.report.warnings {
            w.warn();
        }
        display_warnings();

        let mut printer = InfoPrinter::new("Reduction complete".into());
        printer.push_line(format!("{} bins", reduction.record.len()).into());
        let mut block = vec![];
        if let Some(floor) = reduction.report.noise_floor {
            block.push(format!("Noise floor {floor:.4} removed").into());
        }
        if let Some(k) = reduction.report.calibration_scale {
            block.push(format!("Background reference scaled by {k}").into());
        }
        printer.push_block(block);
        if let Some(png) = &reduction.plot {
            printer.push_line(format!("Plotted {}", png.display()).into());
        }
        printer.display();

        Ok(())
    }
}

#[derive(Error, Debug)]
pub(super) enum ReduceArgsError {
    #[error("No input observation was given; use --input")]
    NoInput,

    #[error("The output would overwrite the input ({}); choose a different --output", .0.display())]
    SameInputAndOutput(PathBuf),

    #[error("{0}")]
    BadLayout(String),

    #[error("{0}")]
    BadPowerScale(String),

    #[error("{0}")]
    BadYLimits(String),

    #[cfg(not(feature = "plotting"))]
    #[error("radioline was not compiled with the \"plotting\" feature; --plot can't be used")]
    NoPlottingFeature,

    #[error(transparent)]
    Conditioning(#[from] ConditioningArgsError),
}
