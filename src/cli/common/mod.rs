// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Common arguments for command-line interfaces. e.g. the `observe` and
//! `reduce` subcommands both condition a spectrum, so the same conditioning
//! arguments are shared between them.

mod conditioning;
mod printers;

pub(super) use conditioning::{ConditioningArgs, ConditioningArgsError};
#[cfg(test)]
pub(crate) use printers::num_pending_warnings;
pub(crate) use printers::{display_warnings, InfoPrinter, Warn};

use std::str::FromStr;

use itertools::Itertools;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    observation::{RecordLayout, RECORD_LAYOUTS_COMMA_SEPARATED},
    spectrum::PowerScale,
};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    pub(super) static ref POWER_SCALES_COMMA_SEPARATED: String = PowerScale::iter().join(", ");

    pub(super) static ref LAYOUT_HELP: String =
        format!("How records are laid out on disk. Supported layouts: {}", *RECORD_LAYOUTS_COMMA_SEPARATED);
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(RadiolineError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(RadiolineError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(RadiolineError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

/// Parse a power scale name, case-insensitively.
pub(super) fn parse_power_scale(s: Option<&str>) -> Result<PowerScale, String> {
    match s {
        None => Ok(PowerScale::default()),
        Some(s) => PowerScale::from_str(&s.trim().to_lowercase()).map_err(|_| {
            format!(
                "Unknown power scale '{s}'; supported scales are: {}",
                *POWER_SCALES_COMMA_SEPARATED
            )
        }),
    }
}

/// Parse a record layout name, case-insensitively.
pub(super) fn parse_layout(s: &str) -> Result<RecordLayout, String> {
    RecordLayout::from_str(&s.trim().to_lowercase()).map_err(|_| {
        format!(
            "Unknown record layout '{s}'; supported layouts are: {}",
            *RECORD_LAYOUTS_COMMA_SEPARATED
        )
    })
}

/// Turn the user's y-axis limits into plot limits. Nothing, or both limits
/// being 0, means "fit the data".
pub(super) fn parse_y_limits(
    y_min: Option<f64>,
    y_max: Option<f64>,
) -> Result<Option<(f64, f64)>, String> {
    match (y_min, y_max) {
        (None, None) => Ok(None),
        (Some(min), Some(max)) if min == 0.0 && max == 0.0 => Ok(None),
        (Some(min), Some(max)) if min.is_finite() && max.is_finite() && min < max => {
            Ok(Some((min, max)))
        }
        (Some(min), Some(max)) => Err(format!(
            "The y-axis minimum ({min}) must be less than the maximum ({max})"
        )),
        (Some(_), None) | (None, Some(_)) => {
            Err("Both --y-min and --y-max must be given to set the y-axis limits".to_string())
        }
    }
}
