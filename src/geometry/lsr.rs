// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Velocity of the observer relative to the kinematic local standard of rest.
//!
//! Three motions are summed: the Earth's orbit around the Sun (from a
//! low-precision solar ephemeris, good to ~0.05 km/s), the rotation of the
//! Earth, and the Sun's motion towards the standard solar apex. This is
//! plenty for 21 cm work with channels a few hundred m/s wide.

use hifitime::Epoch;
use marlu::RADec;

use super::{unit_vector, Observatory};
use crate::constants::*;

/// MJD of the J2000 epoch.
const MJD_J2000: f64 = 51544.5;

/// The LSR correction \[km/s\] for a J2000 direction at `time`. `lmst` is the
/// local mean sidereal time \[radians\].
///
/// The value is the negated projection of the observer's LSR velocity onto
/// the line of sight, so `v_lsr = v_topocentric - correction`.
pub fn lsr_correction(radec: RADec, observatory: &Observatory, time: Epoch, lmst: f64) -> f64 {
    let los = unit_vector(radec);
    let velocity = add(
        add(earth_orbital_velocity(time), earth_rotation_velocity(observatory, lmst)),
        solar_motion(),
    );
    -dot(velocity, los)
}

/// Heliocentric velocity of the Earth in J2000 equatorial coordinates
/// \[km/s\].
fn earth_orbital_velocity(time: Epoch) -> [f64; 3] {
    let days = time.to_mjd_utc_days() - MJD_J2000;
    let mean_long = (280.460 + 0.985_647_4 * days).to_radians();
    let mean_anomaly = (357.528 + 0.985_600_3 * days).to_radians();
    // Apparent ecliptic longitude of the Sun.
    let sun_long = mean_long
        + 1.915_f64.to_radians() * mean_anomaly.sin()
        + 0.020_f64.to_radians() * (2.0 * mean_anomaly).sin();
    let perihelion = EARTH_PERIHELION_LONG_DEG.to_radians();
    let e = EARTH_ORBIT_ECCENTRICITY;

    // The Earth sits opposite the Sun; its true longitude is `sun_long + π`.
    let vx = EARTH_ORBITAL_SPEED_KM_S * (sun_long.sin() - e * perihelion.sin());
    let vy = -EARTH_ORBITAL_SPEED_KM_S * (sun_long.cos() - e * perihelion.cos());

    let (sin_obl, cos_obl) = OBLIQUITY_J2000_DEG.to_radians().sin_cos();
    [vx, vy * cos_obl, vy * sin_obl]
}

/// Velocity of the observer due to the Earth's rotation \[km/s\].
fn earth_rotation_velocity(observatory: &Observatory, lmst: f64) -> [f64; 3] {
    let radius = EARTH_EQUATORIAL_RADIUS_KM + observatory.elevation / 1000.0;
    let speed = EARTH_ROTATION_RATE * radius * observatory.latitude.to_radians().cos();
    let (sin_lst, cos_lst) = lmst.sin_cos();
    [-speed * sin_lst, speed * cos_lst, 0.0]
}

/// Velocity of the Sun relative to the LSR \[km/s\].
fn solar_motion() -> [f64; 3] {
    let apex = unit_vector(RADec::from_degrees(SOLAR_APEX_RA_DEG, SOLAR_APEX_DEC_DEG));
    apex.map(|x| x * SOLAR_MOTION_KM_S)
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
