// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Where the antenna is pointing, in the frames that matter for a spectral
//! line observation.
//!
//! All angles handed in and out of this module are in degrees. Equatorial
//! coordinates are J2000.

mod lsr;

pub use lsr::lsr_correction;

use hifitime::{Duration, Epoch};
use log::trace;
use marlu::{
    precession::{get_lmst, precess_time},
    AzEl, RADec,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{EQUATORIAL_TO_GALACTIC, TAU};

/// The position of the antenna on the Earth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observatory {
    /// \[degrees\]
    pub latitude: f64,
    /// \[degrees\], east positive.
    pub longitude: f64,
    /// Height above the ellipsoid \[metres\].
    pub elevation: f64,
}

impl Observatory {
    pub fn validate(&self) -> Result<(), GeometryError> {
        check_angle("observatory latitude", self.latitude, -90.0..=90.0)?;
        check_angle("observatory longitude", self.longitude, -360.0..=360.0)?;
        if !self.elevation.is_finite() {
            return Err(GeometryError::NonFinite {
                what: "observatory elevation",
            });
        }
        Ok(())
    }
}

/// Where the antenna is pointed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Pointing {
    Horizontal { az: f64, alt: f64 },
    Equatorial { ra: f64, dec: f64 },
}

impl Pointing {
    pub fn validate(&self) -> Result<(), GeometryError> {
        match *self {
            Pointing::Horizontal { az, alt } => {
                check_angle("azimuth", az, -360.0..=360.0)?;
                check_angle("altitude", alt, -90.0..=90.0)
            }
            Pointing::Equatorial { ra, dec } => {
                check_angle("right ascension", ra, -360.0..=360.0)?;
                check_angle("declination", dec, -90.0..=90.0)
            }
        }
    }
}

fn check_angle(
    what: &'static str,
    value: f64,
    range: std::ops::RangeInclusive<f64>,
) -> Result<(), GeometryError> {
    if !value.is_finite() {
        return Err(GeometryError::NonFinite { what });
    }
    if !range.contains(&value) {
        return Err(GeometryError::OutOfRange {
            what,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(())
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("The {what} must be a finite number")]
    NonFinite { what: &'static str },

    #[error("The {what} ({value}°) must be between {min}° and {max}°")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Coordinates of a pointing at the time of an observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPosition {
    /// (azimuth, altitude)
    pub horizontal: (f64, f64),
    /// (right ascension, declination), J2000.
    pub equatorial: (f64, f64),
    /// (longitude, latitude)
    pub galactic: (f64, f64),
    /// Subtract this from topocentric radial velocities \[km/s\] to get LSR
    /// velocities. Zero if LSR correction wasn't asked for.
    pub lsr_correction: f64,
}

/// Turns an observer, pointing and time into sky coordinates and an LSR
/// correction.
pub trait ObservatoryGeometry {
    fn locate(
        &self,
        observatory: &Observatory,
        pointing: Pointing,
        time: Epoch,
        lsr_correct: bool,
    ) -> SkyPosition;
}

/// [`ObservatoryGeometry`] backed by `marlu`'s precession routines.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarluGeometry {
    /// UT1 - UTC.
    pub dut1: Duration,
}

impl MarluGeometry {
    /// The local sidereal time and the observatory latitude, both precessed
    /// back to J2000 \[radians\]. In this frame, horizontal and J2000
    /// equatorial coordinates are related by a simple rotation.
    fn j2000_frame(&self, observatory: &Observatory, time: Epoch) -> (f64, f64) {
        let longitude = observatory.longitude.to_radians();
        let latitude = observatory.latitude.to_radians();
        let lmst = get_lmst(longitude, time, self.dut1);
        let zenith = RADec::from_radians(lmst, latitude);
        let info = precess_time(longitude, latitude, zenith, time, self.dut1);
        trace!(
            "LMST {}°, J2000 LMST {}°",
            info.lmst.to_degrees(),
            info.lmst_j2000.to_degrees()
        );
        (info.lmst_j2000, info.array_latitude_j2000)
    }
}

impl ObservatoryGeometry for MarluGeometry {
    fn locate(
        &self,
        observatory: &Observatory,
        pointing: Pointing,
        time: Epoch,
        lsr_correct: bool,
    ) -> SkyPosition {
        let (lmst_j2000, latitude_j2000) = self.j2000_frame(observatory, time);
        let (azel, radec) = match pointing {
            Pointing::Horizontal { az, alt } => {
                let azel = AzEl::from_radians(az.to_radians(), alt.to_radians());
                let radec = azel.to_hadec(latitude_j2000).to_radec(lmst_j2000);
                (azel, radec)
            }
            Pointing::Equatorial { ra, dec } => {
                let radec = RADec::from_degrees(ra, dec);
                let azel = radec.to_hadec(lmst_j2000).to_azel(latitude_j2000);
                (azel, radec)
            }
        };

        let lsr = if lsr_correct {
            let lmst = get_lmst(observatory.longitude.to_radians(), time, self.dut1);
            lsr_correction(radec, observatory, time, lmst)
        } else {
            0.0
        };

        SkyPosition {
            horizontal: (
                azel.az.rem_euclid(TAU).to_degrees(),
                azel.el.to_degrees(),
            ),
            equatorial: (radec.ra.rem_euclid(TAU).to_degrees(), radec.dec.to_degrees()),
            galactic: galactic(radec),
            lsr_correction: lsr,
        }
    }
}

/// Unit vector of a direction on the celestial sphere.
pub(crate) fn unit_vector(radec: RADec) -> [f64; 3] {
    let (sin_ra, cos_ra) = radec.ra.sin_cos();
    let (sin_dec, cos_dec) = radec.dec.sin_cos();
    [cos_dec * cos_ra, cos_dec * sin_ra, sin_dec]
}

/// Galactic (longitude, latitude) \[degrees\] of a J2000 direction.
pub fn galactic(radec: RADec) -> (f64, f64) {
    let v = unit_vector(radec);
    let g: Vec<f64> = EQUATORIAL_TO_GALACTIC
        .iter()
        .map(|row| row.iter().zip(v).map(|(m, x)| m * x).sum())
        .collect();
    let l = g[1].atan2(g[0]).rem_euclid(TAU);
    let b = g[2].clamp(-1.0, 1.0).asin();
    (l.to_degrees(), b.to_degrees())
}
