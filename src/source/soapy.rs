// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SoapySDR hardware (requires the "soapy" feature).

use itertools::Itertools;
use log::{debug, info};
use num_complex::Complex;
use soapysdr::{Device, Direction, RxStream};

use super::{SampleBlock, SampleSource, SourceError};
use crate::constants::READ_TIMEOUT_US;

/// The name of the tunable element that applies a PPM correction.
const PPM_ELEMENT: &str = "CORR";

#[derive(Debug, Clone, PartialEq)]
pub struct SoapyConfig {
    /// The SoapySDR driver name, e.g. "rtlsdr".
    pub driver: String,
    /// The frequency to tune to \[Hz\].
    pub center_freq: f64,
    /// \[Hz\]
    pub sample_rate: f64,
    /// Frequency correction \[parts per million\].
    pub ppm: f64,
    pub channel: usize,
}

pub struct SoapySource {
    device: Device,
    stream: Option<RxStream<Complex<f32>>>,
    config: SoapyConfig,
}

impl SoapySource {
    pub fn open(config: SoapyConfig) -> Result<Self, SourceError> {
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(SourceError::InvalidSampleRate(config.sample_rate));
        }
        let ch = config.channel;
        let device = Device::new(format!("driver={}", config.driver).as_str())?;
        debug!("Opened SoapySDR driver '{}'", config.driver);

        let freq_ranges = device.frequency_range(Direction::Rx, ch)?;
        if !freq_ranges
            .iter()
            .any(|r| r.minimum <= config.center_freq && config.center_freq <= r.maximum)
        {
            return Err(SourceError::UnsupportedFrequency {
                freq: config.center_freq,
                ranges: freq_ranges
                    .iter()
                    .map(|r| format!("{}-{} Hz", r.minimum, r.maximum))
                    .join(", "),
            });
        }

        device.set_gain_mode(Direction::Rx, ch, true)?;
        device.set_sample_rate(Direction::Rx, ch, config.sample_rate)?;

        // Use the narrowest analogue bandwidth that still covers the sample
        // rate, if the device advertises any.
        let bandwidth = device
            .bandwidth_range(Direction::Rx, ch)?
            .into_iter()
            .filter(|r| r.maximum >= config.sample_rate)
            .map(|r| r.minimum.max(config.sample_rate))
            .fold(None, |acc: Option<f64>, bw| {
                Some(acc.map_or(bw, |a| a.min(bw)))
            });
        if let Some(bw) = bandwidth {
            debug!("Setting bandwidth to {bw} Hz");
            device.set_bandwidth(Direction::Rx, ch, bw)?;
        }

        device.set_frequency(Direction::Rx, ch, config.center_freq, ())?;

        if config.ppm != 0.0 {
            let elements = device.list_frequencies(Direction::Rx, ch)?;
            if elements.iter().any(|e| e == PPM_ELEMENT) {
                device.set_component_frequency(Direction::Rx, ch, PPM_ELEMENT, config.ppm, ())?;
            } else {
                info!(
                    "Driver '{}' has no PPM correction element; not applying {} ppm",
                    config.driver, config.ppm
                );
            }
        }

        Ok(Self {
            device,
            stream: None,
            config,
        })
    }
}

impl SampleSource for SoapySource {
    fn center_frequency(&self) -> f64 {
        self.config.center_freq
    }

    fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    fn start_stream(&mut self) -> Result<(), SourceError> {
        let mut stream = self.device.rx_stream::<Complex<f32>>(&[self.config.channel])?;
        stream.activate(None)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn read_block(&mut self, bins: usize) -> Result<SampleBlock, SourceError> {
        let stream = self.stream.as_mut().ok_or(SourceError::StreamNotActive)?;
        let mut block = vec![Complex::new(0.0, 0.0); bins];
        let mut filled = 0;
        while filled < bins {
            let n = stream.read(&mut [&mut block[filled..]], READ_TIMEOUT_US)?;
            if n == 0 {
                return Err(SourceError::ShortRead {
                    expected: bins,
                    got: filled,
                });
            }
            filled += n;
        }
        Ok(block)
    }

    fn stop_stream(&mut self) -> Result<(), SourceError> {
        if let Some(mut stream) = self.stream.take() {
            stream.deactivate(None)?;
        }
        Ok(())
    }
}

/// The drivers of all attached devices. The "audio" driver is never a radio
/// and is left out.
pub fn list_drivers() -> Result<Vec<String>, SourceError> {
    let drivers = soapysdr::enumerate("")?
        .iter()
        .filter_map(|args| args.get("driver").map(|d| d.to_string()))
        .filter(|d| d != "audio")
        .unique()
        .collect();
    Ok(drivers)
}
