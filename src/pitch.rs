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
//! Conversions between frequencies, semitones, MIDI note numbers and 14-bit
//! pitch-bend values.

/// The MIDI note number that sounds at the root frequency (A4).
pub const ROOT_NOTE: u8 = 69;

/// The highest note number addressable by a MIDI note message.
pub const MAX_NOTE: i32 = 127;

/// Lowest signed 14-bit pitch-bend value.
pub const BEND_MIN: i32 = -8192;

/// Highest signed 14-bit pitch-bend value. Bends at the edges of the bend range
/// reach this magnitude in either direction.
pub const BEND_MAX: i32 = 8191;

/// Errors produced by the pitch conversions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PitchError {
    #[error("frequency must be positive, got {hz}Hz against base {base_hz}Hz")]
    Domain { hz: f64, base_hz: f64 },

    #[error("cannot compute the pitch span of an empty window")]
    Empty,
}

/// Returns the distance in (fractional) semitones from `base_hz` to `hz`.
pub fn frequency_to_semitone(hz: f64, base_hz: f64) -> Result<f64, PitchError> {
    // NaN fails both comparisons, so reject anything that is not strictly positive.
    if !(hz > 0.0 && base_hz > 0.0) {
        return Err(PitchError::Domain { hz, base_hz });
    }
    Ok((hz / base_hz).log2() * 12.0)
}

/// Returns the number of whole semitones covered by the given frequencies,
/// rounding the highest pitch up and the lowest pitch down.
pub fn pitch_span(values: &[f64], root_frequency: f64) -> Result<i32, PitchError> {
    let (min, max) = min_max(values).ok_or(PitchError::Empty)?;
    let top = frequency_to_semitone(max, root_frequency)?.ceil();
    let bottom = frequency_to_semitone(min, root_frequency)?.floor();
    Ok((top - bottom) as i32)
}

/// Returns the anchor note for a window whose lowest frequency is `min_hz`, placing
/// that frequency at the bottom of the bend range. The result is not bounded to the
/// MIDI note range.
pub fn anchor_note(min_hz: f64, root_frequency: f64, pb_range: u8) -> Result<i32, PitchError> {
    let semitone = frequency_to_semitone(min_hz, root_frequency)?;
    Ok((semitone + f64::from(ROOT_NOTE) + f64::from(pb_range)).floor() as i32)
}

/// Maps `hz` onto a bend value relative to `anchor_note`. The lower edge of the bend
/// range maps to -8191 and the upper edge to +8191. Frequencies outside of the bend
/// range produce values outside of that interval.
pub fn frequency_to_bend(
    hz: f64,
    anchor_note: i32,
    root_frequency: f64,
    pb_range: u8,
) -> Result<i32, PitchError> {
    let note = frequency_to_semitone(hz, root_frequency)? + f64::from(ROOT_NOTE);
    let low = f64::from(anchor_note) - f64::from(pb_range);
    let high = f64::from(anchor_note) + f64::from(pb_range);
    let position = (note - low) / (high - low);
    Ok((position * f64::from(2 * BEND_MAX) - f64::from(BEND_MAX)).floor() as i32)
}

/// Returns the frequency of the given note number, tuned so that note 69 sounds at
/// `root_frequency`.
pub fn note_to_frequency(note: u8, root_frequency: f64) -> f64 {
    root_frequency * 2f64.powf((f64::from(note) - f64::from(ROOT_NOTE)) / 12.0)
}

/// Returns the minimum and maximum of the values, or None if there are none.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(min, max), &v| (min.min(v), max.max(v))),
    )
}
