// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests.

use std::{fs::File, io::BufWriter, io::Write, path::Path};

use byteorder::{LittleEndian, WriteBytesExt};

use hifitime::Epoch;

use crate::{
    constants::TAU,
    observation::{ObservationMetadata, ObservationRecord, RecordLayout},
};

/// A tiny deterministic noise generator, so that test spectra have no empty
/// bins but are the same on every run.
pub(crate) struct Lcg(u64);

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Uniform in [-1, 1).
    pub(crate) fn next(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    }
}

/// Write `num_samples` cf32 samples of a unit tone that falls exactly in FFT
/// bin `tone_bin` of a `bins`-long FFT, with a little noise on top.
pub(crate) fn write_tone_iq_file(path: &Path, bins: usize, num_samples: usize, tone_bin: isize) {
    let mut lcg = Lcg::new(42);
    let mut f = BufWriter::new(File::create(path).unwrap());
    for n in 0..num_samples {
        let phase = TAU * tone_bin as f64 * n as f64 / bins as f64;
        let (sin, cos) = phase.sin_cos();
        f.write_f32::<LittleEndian>(cos as f32 + 0.01 * lcg.next())
            .unwrap();
        f.write_f32::<LittleEndian>(sin as f32 + 0.01 * lcg.next())
            .unwrap();
    }
    f.flush().unwrap();
}

/// A `num_bins` record around 1420 MHz with a Gaussian line on a tilted
/// baseline, written to `path`.
pub(crate) fn write_test_record(
    path: &Path,
    num_bins: usize,
    layout: RecordLayout,
) -> ObservationRecord {
    let mut lcg = Lcg::new(7);
    let frequencies: Vec<f64> = (0..num_bins)
        .map(|i| 1419e6 + 2e6 * i as f64 / num_bins as f64)
        .collect();
    let velocities: Vec<f64> = (0..num_bins)
        .map(|i| 200.0 - 400.0 * i as f64 / num_bins as f64)
        .collect();
    let power: Vec<f64> = (0..num_bins)
        .map(|i| {
            let x = (i as f64 - num_bins as f64 / 2.0) / (num_bins as f64 / 20.0);
            10.0 + 0.002 * i as f64 + 3.0 * (-x * x).exp() + 0.05 * lcg.next() as f64
        })
        .collect();
    let record = ObservationRecord::new(
        frequencies,
        velocities,
        power,
        ObservationMetadata {
            time: Epoch::from_gregorian_utc_hms(2023, 7, 24, 18, 58, 28),
            horizontal: Some((180.0, 45.0)),
            equatorial: (266.25, -29.5),
            galactic: (359.75, 0.25),
            lsr_correction: 12.5,
            rest_frequency: Some(1_420_405_752.0),
            spectral_line: Some("H1_1420".to_string()),
        },
    )
    .unwrap();
    record.write(path, layout).unwrap();
    record
}
