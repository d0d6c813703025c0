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
//! Standard MIDI File output for note event sequences.
use std::fs;
use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::midi::{NoteEvent, SequenceError};

/// Ticks per quarter note in the written file.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Microseconds per quarter note so that one tick lasts one millisecond.
pub const TEMPO: u32 = TICKS_PER_QUARTER as u32 * 1000;

// Registered parameter controllers used to announce the pitch-bend range.
const RPN_MSB: u8 = 101;
const RPN_LSB: u8 = 100;
const DATA_ENTRY_MSB: u8 = 6;
const DATA_ENTRY_LSB: u8 = 38;
const RPN_NULL: u8 = 127;

/// Output options for the MIDI file.
#[derive(Debug, Clone, PartialEq)]
pub struct SmfOptions {
    /// The MIDI channel, 1 through 16.
    pub channel: u8,
    /// The velocity of every note on and note off.
    pub velocity: u8,
    /// The pitch-bend range announced to the receiver, in semitones.
    pub pb_range: u8,
    /// Whether to announce the pitch-bend range with an RPN sequence before the notes.
    pub announce_bend_range: bool,
    /// An optional track name meta event.
    pub track_name: Option<String>,
}

impl Default for SmfOptions {
    fn default() -> Self {
        SmfOptions {
            channel: 1,
            velocity: 64,
            pb_range: crate::encoder::DEFAULT_PB_RANGE,
            announce_bend_range: true,
            track_name: None,
        }
    }
}

/// Errors that can occur while writing a MIDI file.
#[derive(Debug, thiserror::Error)]
pub enum SmfError {
    #[error("channel {0} is invalid, expected 1 through 16")]
    InvalidChannel(u8),

    #[error("velocity {0} is invalid, expected 0 through 127")]
    InvalidVelocity(u8),

    #[error("pitch-bend range {0} does not fit in a data entry byte")]
    InvalidBendRange(u8),

    #[error("delta of {0} ticks is too large for a MIDI file")]
    DeltaOverflow(u32),

    #[error("invalid event: {0}")]
    Sequence(#[from] SequenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds a single track MIDI file from the events.
pub fn to_smf<'a>(events: &[NoteEvent], options: &'a SmfOptions) -> Result<Smf<'a>, SmfError> {
    let channel = parse_channel(options.channel)?;
    let velocity =
        u7::try_from(options.velocity).ok_or(SmfError::InvalidVelocity(options.velocity))?;

    let mut track: Track<'a> = Vec::with_capacity(events.len() + 8);
    if let Some(name) = &options.track_name {
        track.push(meta(MetaMessage::TrackName(name.as_bytes())));
    }
    track.push(meta(MetaMessage::Tempo(u24::new(TEMPO))));

    if options.announce_bend_range {
        let range = u7::try_from(options.pb_range)
            .ok_or(SmfError::InvalidBendRange(options.pb_range))?;
        for (controller, value) in [
            (RPN_MSB, 0),
            (RPN_LSB, 0),
            (DATA_ENTRY_MSB, range.as_int()),
            (DATA_ENTRY_LSB, 0),
            (RPN_MSB, RPN_NULL),
            (RPN_LSB, RPN_NULL),
        ] {
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::Controller {
                        controller: u7::from_int_lossy(controller),
                        value: u7::from_int_lossy(value),
                    },
                },
            });
        }
    }

    for event in events {
        track.push(TrackEvent {
            delta: u28::try_from(event.delta).ok_or(SmfError::DeltaOverflow(event.delta))?,
            kind: TrackEventKind::Midi {
                channel,
                message: event.to_midi_message(velocity)?,
            },
        });
    }
    track.push(meta(MetaMessage::EndOfTrack));

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));
    smf.tracks.push(track);
    Ok(smf)
}

/// Serializes the events as a MIDI file in memory.
pub fn to_smf_bytes(events: &[NoteEvent], options: &SmfOptions) -> Result<Vec<u8>, SmfError> {
    let smf = to_smf(events, options)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Writes the events to the given path as a MIDI file.
pub fn write_smf(
    events: &[NoteEvent],
    options: &SmfOptions,
    path: &Path,
) -> Result<(), SmfError> {
    fs::write(path, to_smf_bytes(events, options)?)?;
    Ok(())
}

fn meta(message: MetaMessage<'_>) -> TrackEvent<'_> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(message),
    }
}

/// Parses a channel. Input is expected to be [1, 16].
fn parse_channel(channel: u8) -> Result<u4, SmfError> {
    channel
        .checked_sub(1)
        .and_then(u4::try_from)
        .ok_or(SmfError::InvalidChannel(channel))
}
