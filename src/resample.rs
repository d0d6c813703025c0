// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Linear resampling of irregularly timed tracks onto a uniform millisecond grid.
//!
//! Query times before the first sample or after the last sample clamp to the
//! nearest endpoint value.

/// A single timestamped value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// The time of the sample in milliseconds.
    pub time: i64,
    /// The sampled value.
    pub value: f64,
}

impl Sample {
    pub fn new(time: i64, value: f64) -> Sample {
        Sample { time, value }
    }
}

/// Errors that can occur while building or resampling a track.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResampleError {
    #[error("track has no samples")]
    EmptyTrack,

    #[error("sample {index} at {time}ms comes before the previous sample at {previous}ms")]
    Unsorted { index: usize, previous: i64, time: i64 },

    #[error("start {start}ms is after end {end}ms")]
    InvalidBounds { start: i64, end: i64 },

    #[error("sampling period must be positive")]
    InvalidPeriod,
}

/// An ordered sequence of samples with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    samples: Vec<Sample>,
}

impl Track {
    /// Creates a track from samples in ascending time order. Samples that share a
    /// timestamp with the sample before them replace it, so the later one wins.
    pub fn new(samples: Vec<Sample>) -> Result<Track, ResampleError> {
        if samples.is_empty() {
            return Err(ResampleError::EmptyTrack);
        }

        let mut deduped: Vec<Sample> = Vec::with_capacity(samples.len());
        for (index, sample) in samples.into_iter().enumerate() {
            if let Some(last) = deduped.last_mut() {
                if sample.time == last.time {
                    *last = sample;
                    continue;
                }
                if sample.time < last.time {
                    return Err(ResampleError::Unsorted {
                        index,
                        previous: last.time,
                        time: sample.time,
                    });
                }
            }
            deduped.push(sample);
        }

        Ok(Track { samples: deduped })
    }

    /// Returns the samples in the track.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Returns the linearly interpolated value at the given time.
    pub fn value_at(&self, time: i64) -> f64 {
        // Index of the first sample strictly after the query time.
        let next = self.samples.partition_point(|s| s.time <= time);
        if next == 0 {
            return self.samples[0].value;
        }
        if next == self.samples.len() {
            return self.samples[next - 1].value;
        }
        interpolate(&self.samples[next - 1], &self.samples[next], time)
    }

    /// Resamples the track at `start, start + period, ...` up to and including the
    /// last grid point that does not exceed `end`.
    pub fn resample(&self, start: i64, end: i64, period: u32) -> Result<Vec<f64>, ResampleError> {
        let mut cursor = 0;
        let samples = &self.samples;
        Ok(grid_times(start, end, period)?
            .map(|time| {
                while cursor + 1 < samples.len() && samples[cursor + 1].time <= time {
                    cursor += 1;
                }
                let current = &samples[cursor];
                if time <= current.time || cursor + 1 == samples.len() {
                    current.value
                } else {
                    interpolate(current, &samples[cursor + 1], time)
                }
            })
            .collect())
    }
}

/// Builds a track from the given samples and resamples it.
pub fn resample(
    samples: &[Sample],
    start: i64,
    end: i64,
    period: u32,
) -> Result<Vec<f64>, ResampleError> {
    Track::new(samples.to_vec())?.resample(start, end, period)
}

/// Returns the uniform grid of times covering `[start, end]`.
pub fn grid_times(
    start: i64,
    end: i64,
    period: u32,
) -> Result<impl Iterator<Item = i64>, ResampleError> {
    if period == 0 {
        return Err(ResampleError::InvalidPeriod);
    }
    if start > end {
        return Err(ResampleError::InvalidBounds { start, end });
    }
    let period = i64::from(period);
    let count = (end - start) / period + 1;
    Ok((0..count).map(move |step| start + step * period))
}

fn interpolate(before: &Sample, after: &Sample, time: i64) -> f64 {
    let fraction = (time - before.time) as f64 / (after.time - before.time) as f64;
    before.value + (after.value - before.value) * fraction
}
