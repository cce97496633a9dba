// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Replay recorded samples.

use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read},
    path::Path,
};

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use num_complex::Complex;

use super::{SampleBlock, SampleSource, SourceError};

/// The number of bytes in one interleaved complex 32-bit float sample.
const BYTES_PER_SAMPLE: usize = 8;

/// Samples stored as interleaved little-endian `f32` I/Q pairs ("cf32"), as
/// written by e.g. `rtl_sdr` piped through a converter, or GNU Radio's file
/// sink.
pub struct IqFileSource<R: Read> {
    reader: R,
    center_freq: f64,
    sample_rate: f64,
    streaming: bool,
    bytes: Vec<u8>,
    floats: Vec<f32>,
}

impl IqFileSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(
        path: P,
        center_freq: f64,
        sample_rate: f64,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        debug!("Opening I/Q file {}", path.display());
        let file = File::open(path).map_err(|err| SourceError::OpenIqFile {
            path: path.to_path_buf(),
            err,
        })?;
        Self::from_reader(BufReader::new(file), center_freq, sample_rate)
    }
}

impl<R: Read> IqFileSource<R> {
    pub fn from_reader(reader: R, center_freq: f64, sample_rate: f64) -> Result<Self, SourceError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(SourceError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            reader,
            center_freq,
            sample_rate,
            streaming: false,
            bytes: vec![],
            floats: vec![],
        })
    }

    /// Fill `self.bytes` as far as possible, returning how many bytes were
    /// read. Fewer bytes than requested means the file has run out.
    fn fill(&mut self) -> Result<usize, SourceError> {
        let mut filled = 0;
        while filled < self.bytes.len() {
            match self.reader.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> SampleSource for IqFileSource<R> {
    fn center_frequency(&self) -> f64 {
        self.center_freq
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn start_stream(&mut self) -> Result<(), SourceError> {
        self.streaming = true;
        Ok(())
    }

    fn read_block(&mut self, bins: usize) -> Result<SampleBlock, SourceError> {
        if !self.streaming {
            return Err(SourceError::StreamNotActive);
        }

        self.bytes.resize(bins * BYTES_PER_SAMPLE, 0);
        self.floats.resize(bins * 2, 0.0);
        let filled = self.fill()?;
        if filled < self.bytes.len() {
            return Err(SourceError::ShortRead {
                expected: bins,
                got: filled / BYTES_PER_SAMPLE,
            });
        }
        trace!("Read {bins} samples from I/Q file");

        LittleEndian::read_f32_into(&self.bytes, &mut self.floats);
        Ok(self
            .floats
            .chunks_exact(2)
            .map(|iq| Complex::new(iq[0], iq[1]))
            .collect())
    }

    fn stop_stream(&mut self) -> Result<(), SourceError> {
        self.streaming = false;
        Ok(())
    }
}
