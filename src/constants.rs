// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. `radioline` should do as many
calculations as possible in double precision; only samples coming off the
radio are single precision.
 */

pub use std::f64::consts::{PI, TAU};

/// Speed of light in a vacuum \[km/s\]. Velocities are reported in km/s, so
/// this is the value used by the frequency-velocity mapping.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// The default SDR sample rate \[Hz\]. This is wide enough to allow tuning
/// away from the DC spike.
pub const DEFAULT_SAMPLE_RATE: f64 = 3.2e6;

/// The default number of frequency bins (FFT length).
pub const DEFAULT_BINS: usize = 1024;

/// The default number of spectra averaged together per observation.
pub const DEFAULT_FFT_NUM: usize = 1000;

/// The default smoothing kernel width. A width of 1 leaves the spectrum
/// untouched.
pub const DEFAULT_SMOOTHING: usize = 1;

/// The default directory that observations are written into.
pub const DEFAULT_OUTPUT_DIR: &str = "observations";

/// The fraction of bins at *each* edge of the spectrum used to estimate the
/// noise floor when the "edges" noise-floor mode is in use.
pub const DEFAULT_NOISE_FLOOR_EDGE_FRACTION: f64 = 0.05;

/// The lower (inclusive) bound of the background-calibration scale search.
pub const CALIBRATION_SCALE_MIN: f64 = -1.0;

/// The upper (exclusive) bound of the background-calibration scale search.
pub const CALIBRATION_SCALE_MAX: f64 = 5.0;

/// The default step of the background-calibration scale search.
pub const DEFAULT_CALIBRATION_STEP: f64 = 0.001;

/// The default width of the window around the spectral line that is excluded
/// from the background-calibration fit \[bins\].
pub const DEFAULT_CALIBRATION_LINE_WIDTH: usize = 200;

/// Sample rates at or above this value \[Hz\] are wide enough to tune away
/// from the DC spike.
pub const DC_OFFSET_MIN_SAMPLE_RATE: f64 = 3.2e6;

/// The fraction of the band cropped from each end of the kept half when
/// avoiding the DC spike.
pub const DC_OFFSET_CROP_FRACTION: f64 = 0.1;

/// How long to wait for a block of samples from hardware before giving up
/// \[microseconds\].
pub const READ_TIMEOUT_US: i64 = 5_000_000;

// LSR correction.

/// Mean orbital speed of the Earth \[km/s\].
pub const EARTH_ORBITAL_SPEED_KM_S: f64 = 29.785;

/// Eccentricity of the Earth's orbit.
pub const EARTH_ORBIT_ECCENTRICITY: f64 = 0.016_709;

/// Longitude of perihelion of the Earth's orbit \[degrees\].
pub const EARTH_PERIHELION_LONG_DEG: f64 = 102.937_35;

/// Obliquity of the ecliptic at J2000 \[degrees\].
pub const OBLIQUITY_J2000_DEG: f64 = 23.439_291;

/// Angular rotation rate of the Earth \[rad/s\].
pub const EARTH_ROTATION_RATE: f64 = 7.292_115_9e-5;

/// Equatorial radius of the Earth \[km\].
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;

/// Speed of the Sun relative to the kinematic local standard of rest \[km/s\].
pub const SOLAR_MOTION_KM_S: f64 = 20.0;

/// J2000 right ascension of the standard solar apex \[degrees\] (18h03m50.29s).
pub const SOLAR_APEX_RA_DEG: f64 = 270.959_54;

/// J2000 declination of the standard solar apex \[degrees\] (+30°00'16.8").
pub const SOLAR_APEX_DEC_DEG: f64 = 30.004_667;

/// Rotation matrix from J2000 equatorial to galactic coordinates.
pub const EQUATORIAL_TO_GALACTIC: [[f64; 3]; 3] = [
    [-0.054_875_560_416_215_4, -0.873_437_090_234_885, -0.483_835_015_548_713_2],
    [0.494_109_427_875_583_7, -0.444_829_629_960_011_2, 0.746_982_244_497_218_9],
    [-0.867_666_149_019_004_7, -0.198_076_373_431_201_5, 0.455_983_776_175_066_9],
];
