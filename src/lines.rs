// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Well-known spectral lines.

use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, Serialize, Deserialize,
)]
pub enum SpectralLine {
    /// The 21 cm hyperfine transition of neutral hydrogen.
    #[default]
    #[strum(serialize = "H1_1420")]
    #[serde(rename = "H1_1420")]
    Hi1420,

    #[strum(serialize = "OH_1612")]
    #[serde(rename = "OH_1612")]
    Oh1612,

    #[strum(serialize = "OH_1665")]
    #[serde(rename = "OH_1665")]
    Oh1665,

    #[strum(serialize = "OH_1667")]
    #[serde(rename = "OH_1667")]
    Oh1667,

    #[strum(serialize = "OH_1720")]
    #[serde(rename = "OH_1720")]
    Oh1720,
}

lazy_static::lazy_static! {
    pub static ref SPECTRAL_LINES_COMMA_SEPARATED: String = SpectralLine::iter().join(", ");
}

impl SpectralLine {
    /// \[Hz\]
    pub fn rest_frequency(self) -> f64 {
        match self {
            SpectralLine::Hi1420 => 1_420_405_752.0,
            SpectralLine::Oh1612 => 1_612_231_000.0,
            SpectralLine::Oh1665 => 1_665_402_000.0,
            SpectralLine::Oh1667 => 1_667_359_000.0,
            SpectralLine::Oh1720 => 1_720_530_000.0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SpectralLine::Hi1420 => "Hydrogen, 1420MHz",
            SpectralLine::Oh1612 => "Hydroxyl, 1612MHz",
            SpectralLine::Oh1665 => "Hydroxyl, 1665MHz",
            SpectralLine::Oh1667 => "Hydroxyl, 1667MHz",
            SpectralLine::Oh1720 => "Hydroxyl, 1720MHz",
        }
    }
}

/// Names are matched case-insensitively; the description is also accepted.
impl FromStr for SpectralLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SpectralLine::iter()
            .find(|l| l.to_string().eq_ignore_ascii_case(s) || l.description() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown spectral line '{s}'; known lines are: {}",
                    *SPECTRAL_LINES_COMMA_SEPARATED
                )
            })
    }
}
