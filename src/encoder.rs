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
//! Splits a dense frequency sequence into windows that each fit under the pitch-bend
//! range of a single note, and renders those windows as note and bend events.
//!
//! Windows are split recursively at their midpoint until they fit. The left half of
//! a split is `[lo, mid)` and the right half is `[mid, hi)`, so every sample lands in
//! exactly one window.
use std::ops::Range;

use tracing::{debug, trace};

use crate::midi::NoteEvent;
use crate::pitch::{self, PitchError, BEND_MAX, BEND_MIN, MAX_NOTE};


pub const DEFAULT_ROOT_FREQUENCY: f64 = 440.0;
pub const DEFAULT_PB_RANGE: u8 = 4;
pub const DEFAULT_TICKS_PER_SAMPLE: u32 = 1;
pub const DEFAULT_MIN_WINDOW_SAMPLES: usize = 1;

/// Parameters for the segment encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderParams {
    /// The frequency of note 69, in Hz.
    pub root_frequency: f64,
    /// The pitch-bend range of the receiving synth, in semitones either side of the note.
    pub pb_range: u8,
    /// The number of ticks between consecutive samples.
    pub ticks_per_sample: u32,
    /// Windows with fewer samples than this are dropped instead of emitted.
    pub min_window_samples: usize,
}

impl Default for EncoderParams {
    fn default() -> Self {
        EncoderParams {
            root_frequency: DEFAULT_ROOT_FREQUENCY,
            pb_range: DEFAULT_PB_RANGE,
            ticks_per_sample: DEFAULT_TICKS_PER_SAMPLE,
            min_window_samples: DEFAULT_MIN_WINDOW_SAMPLES,
        }
    }
}

/// What became of a window once it stopped being split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutcome {
    /// The window is played as a single note with one bend per sample.
    Note { note: u8, bends: Vec<i16> },
    /// The window fits under one note, but that note is outside of the MIDI range.
    OutOfRange { note: i32 },
    /// The window has fewer samples than the configured minimum.
    BelowMinimum,
    /// The window does not fit under one note and is too small to split.
    Unsplittable,
}

/// A contiguous range of sample indices and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub range: Range<usize>,
    pub outcome: WindowOutcome,
}

impl Window {
    /// Returns true if the window produces events.
    pub fn is_note(&self) -> bool {
        matches!(self.outcome, WindowOutcome::Note { .. })
    }
}

/// Partitions the values into windows, left to right. The windows cover every index
/// of `values` exactly once.
pub fn segment(values: &[f64], params: &EncoderParams) -> Result<Vec<Window>, PitchError> {
    segment_range(values, 0..values.len(), params)
}

/// Encodes the values into a monophonic note event sequence.
pub fn encode(values: &[f64], params: &EncoderParams) -> Result<Vec<NoteEvent>, PitchError> {
    Ok(render(&segment(values, params)?, params.ticks_per_sample))
}

/// Renders windows as events. Each sample occupies `ticks_per_sample` ticks: the note
/// starts with the first bend, and the note off follows the last bend by one sample.
/// The time of windows that produce no note is carried into the next note on.
pub fn render(windows: &[Window], ticks_per_sample: u32) -> Vec<NoteEvent> {
    let mut renderer = Renderer::new(ticks_per_sample);
    renderer.push(windows);
    renderer.finish()
}

/// Renders several window sequences into one event stream. Rests left by windows
/// that produce no note carry over from one `push` to the next, so a dropped
/// stretch at the end of one sequence still delays the first note of the next.
#[derive(Debug)]
pub struct Renderer {
    ticks_per_sample: u32,
    rest: u32,
    events: Vec<NoteEvent>,
}

impl Renderer {
    pub fn new(ticks_per_sample: u32) -> Renderer {
        Renderer {
            ticks_per_sample,
            rest: 0,
            events: Vec::new(),
        }
    }

    /// Appends the events for the given windows.
    pub fn push(&mut self, windows: &[Window]) {
        for window in windows {
            match &window.outcome {
                WindowOutcome::Note { note, bends } => {
                    self.events.push(NoteEvent::note_on(self.rest, *note));
                    self.rest = 0;
                    for (i, bend) in bends.iter().enumerate() {
                        let delta = if i == 0 { 0 } else { self.ticks_per_sample };
                        self.events.push(NoteEvent::bend(delta, *bend));
                    }
                    self.events
                        .push(NoteEvent::note_off(self.ticks_per_sample, *note));
                }
                _ => {
                    let samples = u32::try_from(window.range.len()).unwrap_or(u32::MAX);
                    self.rest = self
                        .rest
                        .saturating_add(samples.saturating_mul(self.ticks_per_sample));
                }
            }
        }
    }

    /// Ticks of silence not yet attached to a note on.
    pub fn rest(&self) -> u32 {
        self.rest
    }

    pub fn finish(self) -> Vec<NoteEvent> {
        self.events
    }
}

fn segment_range(
    values: &[f64],
    range: Range<usize>,
    params: &EncoderParams,
) -> Result<Vec<Window>, PitchError> {
    let window = &values[range.clone()];
    if window.is_empty() {
        return Ok(Vec::new());
    }
    if window.len() < params.min_window_samples {
        debug!(
            start = range.start,
            end = range.end,
            min = params.min_window_samples,
            "Dropping window below the minimum size."
        );
        return Ok(vec![Window {
            range,
            outcome: WindowOutcome::BelowMinimum,
        }]);
    }

    let span = pitch::pitch_span(window, params.root_frequency)?;
    if span < 2 * i32::from(params.pb_range) {
        let outcome = bounded_window(window, params)?;
        if let WindowOutcome::OutOfRange { note } = outcome {
            debug!(
                start = range.start,
                end = range.end,
                note,
                "Dropping window outside of the MIDI note range."
            );
        }
        return Ok(vec![Window { range, outcome }]);
    }

    if window.len() < 2 {
        debug!(
            start = range.start,
            span,
            "Dropping window that cannot be split further."
        );
        return Ok(vec![Window {
            range,
            outcome: WindowOutcome::Unsplittable,
        }]);
    }

    let mid = range.start + window.len() / 2;
    trace!(start = range.start, mid, end = range.end, span, "Splitting window.");
    let mut windows = segment_range(values, range.start..mid, params)?;
    windows.extend(segment_range(values, mid..range.end, params)?);
    Ok(windows)
}

fn bounded_window(window: &[f64], params: &EncoderParams) -> Result<WindowOutcome, PitchError> {
    let (min, _) = pitch::min_max(window).ok_or(PitchError::Empty)?;
    let note = pitch::anchor_note(min, params.root_frequency, params.pb_range)?;
    if !(0..=MAX_NOTE).contains(&note) {
        return Ok(WindowOutcome::OutOfRange { note });
    }

    let bends = window
        .iter()
        .map(|hz| {
            pitch::frequency_to_bend(*hz, note, params.root_frequency, params.pb_range)
                // Rounding at the window's lowest pitch can land one step below the range.
                .map(|bend| bend.clamp(BEND_MIN, BEND_MAX) as i16)
        })
        .collect::<Result<Vec<i16>, PitchError>>()?;

    Ok(WindowOutcome::Note {
        note: note as u8,
        bends,
    })
}
