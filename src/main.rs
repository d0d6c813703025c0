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
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{crate_version, Args, Parser, Subcommand};
use spearmidi::config::{Overrides, Settings};
use spearmidi::midi::smf;
use spearmidi::{pipeline, spear, util};
use tracing::info;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Converts SPEAR partials into MIDI notes with pitch-bend automation."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SettingsArgs {
    /// The path to a settings file (YAML, TOML or JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// The frequency of MIDI note 69 in Hz.
    #[arg(short, long)]
    root_frequency: Option<f64>,
    /// The pitch-bend range of the receiving synth in semitones.
    #[arg(short, long)]
    pb_range: Option<u8>,
    /// Milliseconds between resampled points.
    #[arg(short, long)]
    sampling_period: Option<u32>,
    /// The MIDI channel to write to (1-16).
    #[arg(long)]
    channel: Option<u8>,
    /// The number of worker threads. Defaults to one per CPU.
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

impl SettingsArgs {
    /// Loads the settings file and applies the command line overrides.
    fn settings(&self) -> Result<Settings, Box<dyn Error>> {
        let settings = Settings::load(self.config.as_deref())?.with_overrides(&Overrides {
            root_frequency: self.root_frequency,
            pb_range: self.pb_range,
            sampling_period: self.sampling_period,
            channel: self.channel,
            threads: self.threads,
        });
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Converts a SPEAR text export into a MIDI file.
    Convert {
        /// The SPEAR partials file (par-text-partials-format).
        input: PathBuf,
        /// The MIDI file to write.
        output: PathBuf,
        /// Prints every event as it is written.
        #[arg(long)]
        print_events: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Lists the partials in a SPEAR text export and how they would be encoded.
    Inspect {
        /// The SPEAR partials file (par-text-partials-format).
        input: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            print_events,
            settings,
        } => {
            let settings = settings.settings()?;
            let file = spear::read_file(&input)?;
            info!(
                file = util::file_stem_display(&input),
                partials = file.partials.len(),
                threads = settings.threads(),
                "Read partials."
            );

            let conversion = pipeline::convert(&file, &settings)?;
            if print_events {
                for event in conversion.events.iter() {
                    println!("{}", event);
                }
            }

            let track_name = util::file_stem_display(&input).to_string();
            smf::write_smf(
                &conversion.events,
                &settings.smf_options(Some(track_name)),
                &output,
            )?;

            let report = &conversion.report;
            println!(
                "Wrote {} note(s) from {} partial(s) to {} ({}).",
                report.notes,
                report.converted,
                output.display(),
                util::duration_seconds_millis(Duration::from_millis(report.ticks)),
            );
            if report.out_of_range_windows + report.small_windows > 0 {
                println!(
                    "Dropped {} window(s) outside of the MIDI note range and {} too small to encode.",
                    report.out_of_range_windows, report.small_windows
                );
            }
            if !report.failed.is_empty() {
                println!("Skipped {} partial(s):", report.failed.len());
                for failure in report.failed.iter() {
                    println!("- {}: {}", failure.index, failure.error);
                }
            }
        }
        Commands::Inspect { input, settings } => {
            let settings = settings.settings()?;
            let file = spear::read_file(&input)?;

            if file.partials.is_empty() {
                println!("No partials found in {}.", input.display());
                return Ok(());
            }

            let summaries = pipeline::inspect(&file, &settings)?;
            println!("Partials (count: {}):", summaries.len());
            for summary in summaries.iter() {
                let millis = summary.end.saturating_sub(summary.start).max(0) as u64;
                let duration = Duration::from_millis(millis);
                let range = match summary.frequency_range {
                    Some((min, max)) => format!("{:.1}Hz-{:.1}Hz", min, max),
                    None => "no frequencies".to_string(),
                };
                match &summary.windows {
                    Ok(_) => println!(
                        "- {}: {} point(s), {}ms-{}ms ({}), {}, {} note(s)",
                        summary.index,
                        summary.points,
                        summary.start,
                        summary.end,
                        util::duration_seconds_millis(duration),
                        range,
                        summary.notes(),
                    ),
                    Err(e) => println!("- {}: cannot be encoded: {}", summary.index, e),
                }
            }
        }
    }

    Ok(())
}
