// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mapping between observed frequency and radial velocity.
//!
//! The radio convention is used: `v = -c (f - f0) / f0`, so a source moving
//! away from the observer (f < f0) has a positive velocity. The LSR
//! correction is then subtracted from every velocity.


use thiserror::Error;

use crate::constants::SPEED_OF_LIGHT_KM_S;

/// Radial velocities \[km/s\] of the given frequencies \[Hz\].
pub fn to_velocity(
    freqs: &[f64],
    rest_freq: f64,
    lsr_correction: f64,
) -> Result<Vec<f64>, VelocityError> {
    check_rest_freq(rest_freq)?;
    Ok(freqs
        .iter()
        .map(|&f| -SPEED_OF_LIGHT_KM_S * (f - rest_freq) / rest_freq - lsr_correction)
        .collect())
}

/// The inverse of [`to_velocity`].
pub fn to_frequency(
    velocities: &[f64],
    rest_freq: f64,
    lsr_correction: f64,
) -> Result<Vec<f64>, VelocityError> {
    check_rest_freq(rest_freq)?;
    Ok(velocities
        .iter()
        .map(|&v| rest_freq * (1.0 - (v + lsr_correction) / SPEED_OF_LIGHT_KM_S))
        .collect())
}

fn check_rest_freq(rest_freq: f64) -> Result<(), VelocityError> {
    if rest_freq == 0.0 {
        return Err(VelocityError::ZeroRestFrequency);
    }
    if !rest_freq.is_finite() {
        return Err(VelocityError::NonFiniteRestFrequency(rest_freq));
    }
    Ok(())
}

#[derive(Error, Debug, PartialEq)]
pub enum VelocityError {
    #[error("The rest frequency must not be zero")]
    ZeroRestFrequency,

    #[error("The rest frequency must be a finite number; got {0}")]
    NonFiniteRestFrequency(f64),
}
