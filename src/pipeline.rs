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
//! Converts every partial of an analysis and concatenates the resulting events.
//!
//! Partials are independent, so they are built and encoded in parallel. A partial that
//! fails is logged and left out of the output while the rest are still converted.
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, debug_span, error, info};

use crate::config::Settings;
use crate::encoder::{Renderer, Window, WindowOutcome};
use crate::midi::{self, NoteEvent, SequenceError};
use crate::partial::{Partial, PartialError};
use crate::spear::{PartialRecord, SpearFile};

/// Errors that stop a whole conversion.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unable to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("converted events are malformed: {0}")]
    Sequence(#[from] SequenceError),
}

/// A partial that could not be converted.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialFailure {
    pub index: usize,
    pub error: PartialError,
}

/// Totals for a conversion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    /// Partials that produced output, including those whose windows were all dropped.
    pub converted: usize,
    /// Partials that failed and were skipped.
    pub failed: Vec<PartialFailure>,
    /// Notes emitted.
    pub notes: usize,
    /// Windows dropped because their note was outside of the MIDI range.
    pub out_of_range_windows: usize,
    /// Windows dropped because they were too small.
    pub small_windows: usize,
    /// Total length of the output in ticks.
    pub ticks: u64,
}

/// The concatenated events of all converted partials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    pub events: Vec<NoteEvent>,
    pub report: ConversionReport,
}

/// A one line description of a partial and how it would be encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSummary {
    pub index: usize,
    pub points: usize,
    pub start: i64,
    pub end: i64,
    pub frequency_range: Option<(f64, f64)>,
    /// The windows of the partial, or the reason it cannot be encoded.
    pub windows: Result<Vec<Window>, PartialError>,
}

impl PartialSummary {
    /// Returns the number of notes the partial encodes to.
    pub fn notes(&self) -> usize {
        self.windows
            .as_ref()
            .map(|windows| windows.iter().filter(|w| w.is_note()).count())
            .unwrap_or(0)
    }
}

/// Converts every partial in the file, in file order. Time taken by windows that
/// produce no note, including whole partials, delays the next note that is emitted.
pub fn convert(file: &SpearFile, settings: &Settings) -> Result<Conversion, PipelineError> {
    let encoded = run_parallel(settings, || {
        file.partials
            .par_iter()
            .map(|record| segment_record(record, settings))
            .collect::<Vec<_>>()
    })?;

    let mut conversion = Conversion::default();
    let mut renderer = Renderer::new(settings.encoder().ticks_per_sample);
    for (record, result) in file.partials.iter().zip(encoded) {
        let windows = match result {
            Ok(windows) => windows,
            Err(e) => {
                error!(partial = record.index, err = %e, "Skipping partial.");
                conversion.report.failed.push(PartialFailure {
                    index: record.index,
                    error: e,
                });
                continue;
            }
        };

        for window in windows.iter() {
            match window.outcome {
                WindowOutcome::Note { .. } => conversion.report.notes += 1,
                WindowOutcome::OutOfRange { .. } => conversion.report.out_of_range_windows += 1,
                WindowOutcome::BelowMinimum | WindowOutcome::Unsplittable => {
                    conversion.report.small_windows += 1
                }
            }
        }
        conversion.report.converted += 1;
        renderer.push(&windows);
    }
    if renderer.rest() > 0 {
        debug!(ticks = renderer.rest(), "Trailing windows produced no notes.");
    }

    conversion.events = renderer.finish();
    midi::validate_sequence(&conversion.events)?;
    conversion.report.ticks = midi::total_ticks(&conversion.events);

    info!(
        converted = conversion.report.converted,
        failed = conversion.report.failed.len(),
        notes = conversion.report.notes,
        dropped = conversion.report.out_of_range_windows + conversion.report.small_windows,
        "Converted partials."
    );
    Ok(conversion)
}

/// Summarizes every partial in the file, in file order.
pub fn inspect(
    file: &SpearFile,
    settings: &Settings,
) -> Result<Vec<PartialSummary>, PipelineError> {
    run_parallel(settings, || {
        file.partials
            .par_iter()
            .map(|record| {
                let partial = Partial::from_record(record, settings.sampling_period());
                PartialSummary {
                    index: record.index,
                    points: record.points.len(),
                    start: record.start,
                    end: record.end,
                    frequency_range: partial
                        .as_ref()
                        .ok()
                        .and_then(|partial| partial.frequency_range()),
                    windows: partial.and_then(|partial| partial.segment(&settings.encoder())),
                }
            })
            .collect()
    })
}

fn segment_record(
    record: &PartialRecord,
    settings: &Settings,
) -> Result<Vec<Window>, PartialError> {
    let span = debug_span!("partial", index = record.index);
    let _enter = span.enter();

    let partial = Partial::from_record(record, settings.sampling_period())?;
    let windows = partial.segment(&settings.encoder())?;
    debug!(
        samples = partial.frequencies().len(),
        windows = windows.len(),
        "Segmented partial."
    );
    Ok(windows)
}

// Runs the job on a dedicated pool sized from the settings.
fn run_parallel<T, F>(settings: &Settings, job: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(settings.threads())
        .thread_name(|i| format!("spearmidi-encode-{i}"))
        .build()?;
    Ok(pool.install(job))
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use crate::config::{Overrides, Settings};
    use crate::midi::{self, NoteEvent};
    use crate::partial::PartialError;
    use crate::pitch::PitchError;
    use crate::resample::ResampleError;
    use crate::spear::{self, PartialRecord, Point, SpearFile};

    use super::{convert, inspect};

    fn notes_on(events: &[NoteEvent]) -> Vec<NoteEvent> {
        events
            .iter()
            .filter(|event| matches!(event.kind, midi::EventKind::NoteOn { .. }))
            .copied()
            .collect()
    }

    fn record(index: usize, frequencies: &[f64]) -> PartialRecord {
        PartialRecord {
            index,
            start: 0,
            end: frequencies.len() as i64 - 1,
            points: frequencies
                .iter()
                .enumerate()
                .map(|(i, frequency)| Point {
                    time: i as i64,
                    frequency: *frequency,
                    amplitude: 0.5,
                })
                .collect(),
        }
    }

    fn settings() -> Settings {
        Settings::default().with_overrides(&Overrides {
            threads: Some(2),
            ..Default::default()
        })
    }

    #[test]
    fn concatenates_in_file_order() -> Result<(), Box<dyn Error>> {
        let file = SpearFile {
            partials: vec![
                record(0, &[440.0, 445.0, 450.0]),
                record(1, &[220.0, 221.0]),
                record(2, &[880.0]),
            ],
        };
        let conversion = convert(&file, &settings())?;

        assert_eq!(
            vec![
                NoteEvent::note_on(0, 73),
                NoteEvent::note_on(0, 61),
                NoteEvent::note_on(0, 85)
            ],
            notes_on(&conversion.events)
        );
        assert_eq!(3, conversion.report.converted);
        assert_eq!(3, conversion.report.notes);
        assert_eq!(6, conversion.report.ticks);
        assert!(conversion.report.failed.is_empty());
        Ok(())
    }

    #[test]
    fn skips_failing_partials() -> Result<(), Box<dyn Error>> {
        let mut unsorted = record(1, &[440.0, 440.0]);
        unsorted.points.reverse();
        let file = SpearFile {
            partials: vec![
                record(0, &[440.0, 0.0, 450.0]),
                unsorted,
                record(2, &[440.0, 445.0]),
                record(3, &[5.0, 5.0]),
            ],
        };
        let conversion = convert(&file, &settings())?;

        assert_eq!(2, conversion.report.converted);
        assert_eq!(2, conversion.report.failed.len());
        assert_eq!(0, conversion.report.failed[0].index);
        assert!(matches!(
            conversion.report.failed[0].error,
            PartialError::Pitch(PitchError::Domain { .. })
        ));
        assert_eq!(1, conversion.report.failed[1].index);
        assert!(matches!(
            conversion.report.failed[1].error,
            PartialError::Resample(ResampleError::Unsorted { .. })
        ));
        assert_eq!(1, conversion.report.notes);
        assert_eq!(1, conversion.report.out_of_range_windows);
        midi::validate_sequence(&conversion.events)?;
        Ok(())
    }

    #[test]
    fn empty_file() -> Result<(), Box<dyn Error>> {
        let conversion = convert(&SpearFile::default(), &settings())?;
        assert!(conversion.events.is_empty());
        assert_eq!(0, conversion.report.converted);
        Ok(())
    }

    #[test]
    fn from_text() -> Result<(), Box<dyn Error>> {
        let file = spear::parse(
            "par-text-partials-format
point-type time frequency amplitude
partials-count 2
partials-data
0 3 0.000 0.010
0.000 220.0 0.1 0.005 440.0 0.2 0.010 880.0 0.1
1 2 0.010 0.012
0.010 1000.0 0.1 0.012 1010.0 0.1
",
        )?;
        let conversion = convert(&file, &settings())?;
        midi::validate_sequence(&conversion.events)?;
        assert_eq!(2, conversion.report.converted);
        assert!(conversion.report.notes > 2);
        assert_eq!(11 + 3, conversion.report.ticks);
        Ok(())
    }

    #[test]
    fn dropped_partial_delays_next_note() -> Result<(), Box<dyn Error>> {
        let file = SpearFile {
            partials: vec![
                record(0, &[440.0; 100]),
                record(1, &[5.0; 500]),
                record(2, &[440.0; 100]),
            ],
        };
        let conversion = convert(&file, &settings())?;

        assert_eq!(
            vec![NoteEvent::note_on(0, 73), NoteEvent::note_on(500, 73)],
            notes_on(&conversion.events)
        );
        assert_eq!(3, conversion.report.converted);
        assert_eq!(1, conversion.report.out_of_range_windows);
        assert_eq!(700, conversion.report.ticks);
        Ok(())
    }

    #[test]
    fn ticks_match_analysis_time() -> Result<(), Box<dyn Error>> {
        let partial = PartialRecord {
            index: 0,
            start: 0,
            end: 1000,
            points: vec![
                Point {
                    time: 0,
                    frequency: 440.0,
                    amplitude: 0.5,
                },
                Point {
                    time: 1000,
                    frequency: 440.0,
                    amplitude: 0.5,
                },
            ],
        };
        let file = SpearFile {
            partials: vec![partial],
        };

        for period in [1, 5, 20] {
            let settings = settings().with_overrides(&Overrides {
                sampling_period: Some(period),
                ..Default::default()
            });
            let conversion = convert(&file, &settings)?;
            // The last point holds for one period past the end of the partial.
            assert_eq!(1000 + u64::from(period), conversion.report.ticks);
            assert_eq!(1, conversion.report.notes);
        }
        Ok(())
    }

    #[test]
    fn inspects() -> Result<(), Box<dyn Error>> {
        let file = SpearFile {
            partials: vec![record(0, &[440.0, 445.0, 450.0]), record(1, &[440.0, 0.0])],
        };
        let summaries = inspect(&file, &settings())?;

        assert_eq!(2, summaries.len());
        assert_eq!(3, summaries[0].points);
        assert_eq!(Some((440.0, 450.0)), summaries[0].frequency_range);
        assert_eq!(1, summaries[0].notes());
        assert!(summaries[1].windows.is_err());
        assert_eq!(0, summaries[1].notes());
        Ok(())
    }
}
