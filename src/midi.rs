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
use std::fmt;

use midly::num::{u14, u7};

use crate::pitch::{BEND_MAX, BEND_MIN};

pub mod smf;

/// The raw 14-bit value of a centered pitch wheel.
const BEND_CENTER: i32 = 8192;

/// The kind of a note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn { note: u8 },
    /// A signed pitch-bend value in [-8192, 8191], where 0 is the centered wheel.
    Bend { value: i16 },
    NoteOff { note: u8 },
}

/// A note event along with the number of ticks since the previous event in the
/// same sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub delta: u32,
    pub kind: EventKind,
}

impl NoteEvent {
    pub fn note_on(delta: u32, note: u8) -> NoteEvent {
        NoteEvent {
            delta,
            kind: EventKind::NoteOn { note },
        }
    }

    pub fn bend(delta: u32, value: i16) -> NoteEvent {
        NoteEvent {
            delta,
            kind: EventKind::Bend { value },
        }
    }

    pub fn note_off(delta: u32, note: u8) -> NoteEvent {
        NoteEvent {
            delta,
            kind: EventKind::NoteOff { note },
        }
    }

    /// Converts the event into a MIDI message. Note messages use the given velocity.
    pub fn to_midi_message(&self, velocity: u7) -> Result<midly::MidiMessage, SequenceError> {
        Ok(match self.kind {
            EventKind::NoteOn { note } => midly::MidiMessage::NoteOn {
                key: parse_note(note)?,
                vel: velocity,
            },
            EventKind::NoteOff { note } => midly::MidiMessage::NoteOff {
                key: parse_note(note)?,
                vel: velocity,
            },
            EventKind::Bend { value } => midly::MidiMessage::PitchBend {
                bend: midly::PitchBend(parse_bend(value)?),
            },
        })
    }
}

impl fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::NoteOn { note } => write!(f, "+{} note_on {}", self.delta, note),
            EventKind::Bend { value } => write!(f, "+{} bend {}", self.delta, value),
            EventKind::NoteOff { note } => write!(f, "+{} note_off {}", self.delta, note),
        }
    }
}

/// Violations of the monophonic event sequence rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("event {index}: note {note} started while note {sounding} is still sounding")]
    OverlappingNote { index: usize, note: u8, sounding: u8 },

    #[error("event {index}: note off for {note} does not match a sounding note")]
    UnmatchedNoteOff { index: usize, note: u8 },

    #[error("event {index}: bend outside of a sounding note")]
    BendOutsideNote { index: usize },

    #[error("note {note} is never released")]
    UnterminatedNote { note: u8 },

    #[error("note {0} is outside of the MIDI note range")]
    NoteOutOfRange(u8),

    #[error("bend {0} is outside of the 14-bit pitch-bend range")]
    BendOutOfRange(i16),
}

/// Checks that the sequence is monophonic: every note on is released by a matching
/// note off before the next note on, bends only occur while a note is sounding, and
/// every value fits its MIDI field.
pub fn validate_sequence(events: &[NoteEvent]) -> Result<(), SequenceError> {
    let mut sounding: Option<u8> = None;
    for (index, event) in events.iter().enumerate() {
        match event.kind {
            EventKind::NoteOn { note } => {
                parse_note(note)?;
                if let Some(sounding) = sounding {
                    return Err(SequenceError::OverlappingNote {
                        index,
                        note,
                        sounding,
                    });
                }
                sounding = Some(note);
            }
            EventKind::NoteOff { note } => {
                if sounding != Some(note) {
                    return Err(SequenceError::UnmatchedNoteOff { index, note });
                }
                sounding = None;
            }
            EventKind::Bend { value } => {
                parse_bend(value)?;
                if sounding.is_none() {
                    return Err(SequenceError::BendOutsideNote { index });
                }
            }
        }
    }

    match sounding {
        Some(note) => Err(SequenceError::UnterminatedNote { note }),
        None => Ok(()),
    }
}

/// Returns the total number of ticks spanned by the sequence.
pub fn total_ticks(events: &[NoteEvent]) -> u64 {
    events.iter().map(|event| u64::from(event.delta)).sum()
}

/// Returns the number of notes in the sequence.
pub fn note_count(events: &[NoteEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event.kind, EventKind::NoteOn { .. }))
        .count()
}

fn parse_note(note: u8) -> Result<u7, SequenceError> {
    u7::try_from(note).ok_or(SequenceError::NoteOutOfRange(note))
}

// Shifts a signed bend into the raw unsigned wheel position.
fn parse_bend(value: i16) -> Result<u14, SequenceError> {
    let value32 = i32::from(value);
    if !(BEND_MIN..=BEND_MAX).contains(&value32) {
        return Err(SequenceError::BendOutOfRange(value));
    }
    u14::try_from((value32 + BEND_CENTER) as u16).ok_or(SequenceError::BendOutOfRange(value))
}
