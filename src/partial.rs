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
use std::time::Duration;

use crate::encoder::{self, EncoderParams, Window};
use crate::midi::NoteEvent;
use crate::pitch::{self, PitchError};
use crate::resample::{ResampleError, Sample, Track};
use crate::spear::PartialRecord;

/// Errors that can occur while building or encoding a partial.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartialError {
    #[error("resampling failed: {0}")]
    Resample(#[from] ResampleError),

    #[error("pitch conversion failed: {0}")]
    Pitch(#[from] PitchError),
}

/// A partial resampled onto a uniform grid. Each partial owns its own tracks and
/// dense sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    /// The index of the partial in the analysis.
    index: usize,
    /// Start time in milliseconds.
    start: i64,
    /// End time in milliseconds.
    end: i64,
    /// The grid spacing in milliseconds.
    sampling_period: u32,
    /// The sparse frequency track the dense frequencies were derived from.
    frequency_track: Track,
    /// The sparse amplitude track the dense amplitudes were derived from.
    amplitude_track: Track,
    /// Frequencies at `start + i * sampling_period`.
    frequencies: Vec<f64>,
    /// Amplitudes at `start + i * sampling_period`.
    amplitudes: Vec<f64>,
}

impl Partial {
    /// Creates a partial from its tracks and resamples both onto `[start, end]`.
    pub fn new(
        index: usize,
        start: i64,
        end: i64,
        frequency_track: Track,
        amplitude_track: Track,
        sampling_period: u32,
    ) -> Result<Partial, PartialError> {
        let frequencies = frequency_track.resample(start, end, sampling_period)?;
        let amplitudes = amplitude_track.resample(start, end, sampling_period)?;
        Ok(Partial {
            index,
            start,
            end,
            sampling_period,
            frequency_track,
            amplitude_track,
            frequencies,
            amplitudes,
        })
    }

    /// Creates a partial from a parsed SPEAR record.
    pub fn from_record(
        record: &PartialRecord,
        sampling_period: u32,
    ) -> Result<Partial, PartialError> {
        let frequency_track = Track::new(
            record
                .points
                .iter()
                .map(|point| Sample::new(point.time, point.frequency))
                .collect(),
        )?;
        let amplitude_track = Track::new(
            record
                .points
                .iter()
                .map(|point| Sample::new(point.time, point.amplitude))
                .collect(),
        )?;
        Partial::new(
            record.index,
            record.start,
            record.end,
            frequency_track,
            amplitude_track,
            sampling_period,
        )
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn sampling_period(&self) -> u32 {
        self.sampling_period
    }

    pub fn frequency_track(&self) -> &Track {
        &self.frequency_track
    }

    pub fn amplitude_track(&self) -> &Track {
        &self.amplitude_track
    }

    /// The dense frequency sequence.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// The dense amplitude sequence.
    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    /// Returns the time of the given dense sample in milliseconds.
    pub fn time_at(&self, index: usize) -> i64 {
        self.start + index as i64 * i64::from(self.sampling_period)
    }

    /// Returns the duration between the start and end of the partial.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.end.saturating_sub(self.start).max(0) as u64)
    }

    /// Returns the lowest and highest frequency of the dense sequence.
    pub fn frequency_range(&self) -> Option<(f64, f64)> {
        pitch::min_max(&self.frequencies)
    }

    /// Returns the loudest amplitude of the dense sequence.
    pub fn peak_amplitude(&self) -> Option<f64> {
        pitch::min_max(&self.amplitudes).map(|(_, max)| max)
    }

    /// Splits the dense frequency sequence into windows.
    pub fn segment(&self, params: &EncoderParams) -> Result<Vec<Window>, PartialError> {
        Ok(encoder::segment(&self.frequencies, params)?)
    }

    /// Encodes the partial into note events.
    pub fn encode(&self, params: &EncoderParams) -> Result<Vec<NoteEvent>, PartialError> {
        Ok(encoder::encode(&self.frequencies, params)?)
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;
    use std::time::Duration;

    use crate::encoder::EncoderParams;
    use crate::midi::{self, NoteEvent};
    use crate::pitch::PitchError;
    use crate::resample::{ResampleError, Sample, Track};
    use crate::spear::{PartialRecord, Point};

    use super::{Partial, PartialError};

    fn record(index: usize, start: i64, end: i64, points: &[(i64, f64, f64)]) -> PartialRecord {
        PartialRecord {
            index,
            start,
            end,
            points: points
                .iter()
                .map(|(time, frequency, amplitude)| Point {
                    time: *time,
                    frequency: *frequency,
                    amplitude: *amplitude,
                })
                .collect(),
        }
    }

    #[test]
    fn from_record() -> Result<(), Box<dyn Error>> {
        let partial = Partial::from_record(
            &record(3, 100, 104, &[(100, 440.0, 0.0), (104, 480.0, 0.4)]),
            1,
        )?;

        assert_eq!(3, partial.index());
        assert_eq!(5, partial.frequencies().len());
        assert_eq!(5, partial.amplitudes().len());
        assert_eq!(vec![440.0, 450.0, 460.0, 470.0, 480.0], partial.frequencies());
        assert_eq!(Some((440.0, 480.0)), partial.frequency_range());
        assert_eq!(Some(0.4), partial.peak_amplitude());
        assert_eq!(104, partial.time_at(4));
        assert_eq!(Duration::from_millis(4), partial.duration());
        assert_eq!(2, partial.frequency_track().samples().len());
        Ok(())
    }

    #[test]
    fn coarser_sampling_period() -> Result<(), Box<dyn Error>> {
        let partial = Partial::from_record(
            &record(0, 0, 10, &[(0, 100.0, 1.0), (10, 200.0, 1.0)]),
            4,
        )?;
        assert_eq!(vec![100.0, 140.0, 180.0], partial.frequencies());
        assert_eq!(8, partial.time_at(2));
        Ok(())
    }

    #[test]
    fn encodes() -> Result<(), Box<dyn Error>> {
        let partial = Partial::from_record(
            &record(0, 0, 2, &[(0, 440.0, 0.5), (1, 445.0, 0.5), (2, 450.0, 0.5)]),
            1,
        )?;
        let events = partial.encode(&EncoderParams::default())?;
        assert_eq!(NoteEvent::note_on(0, 73), events[0]);
        assert_eq!(NoteEvent::note_off(1, 73), events[4]);
        midi::validate_sequence(&events)?;
        assert_eq!(1, partial.segment(&EncoderParams::default())?.len());
        Ok(())
    }

    #[test]
    fn partials_do_not_share_storage() -> Result<(), Box<dyn Error>> {
        let a = Partial::from_record(&record(0, 0, 1, &[(0, 440.0, 0.1)]), 1)?;
        let b = Partial::from_record(&record(1, 0, 3, &[(0, 220.0, 0.2)]), 1)?;
        assert_eq!(vec![440.0, 440.0], a.frequencies());
        assert_eq!(vec![220.0; 4], b.frequencies());
        assert_ne!(a.frequency_track(), b.frequency_track());
        Ok(())
    }

    #[test]
    fn errors() {
        assert!(matches!(
            Partial::from_record(&record(0, 0, 10, &[]), 1),
            Err(PartialError::Resample(ResampleError::EmptyTrack))
        ));
        assert!(matches!(
            Partial::from_record(&record(0, 0, 10, &[(5, 1.0, 1.0), (2, 1.0, 1.0)]), 1),
            Err(PartialError::Resample(ResampleError::Unsorted { .. }))
        ));
        assert!(matches!(
            Partial::from_record(&record(0, 10, 0, &[(5, 1.0, 1.0)]), 1),
            Err(PartialError::Resample(ResampleError::InvalidBounds { .. }))
        ));

        let silent = Partial::new(
            0,
            0,
            2,
            Track::new(vec![Sample::new(0, 0.0)]).unwrap(),
            Track::new(vec![Sample::new(0, 0.0)]).unwrap(),
            1,
        )
        .unwrap();
        assert!(matches!(
            silent.encode(&EncoderParams::default()),
            Err(PartialError::Pitch(PitchError::Domain { .. }))
        ));
    }
}
