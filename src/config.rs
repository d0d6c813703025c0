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
//! Conversion settings. Values are layered: built-in defaults, then an optional
//! settings file, then `SPEARMIDI_*` environment variables, then command line
//! overrides.
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::encoder::{self, EncoderParams};
use crate::midi::smf::SmfOptions;

pub use self::error::ConfigError;

mod error;

const ENV_PREFIX: &str = "SPEARMIDI";
const MAX_PB_RANGE: u8 = 24;

/// Settings for a conversion run.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// The frequency of note 69, in Hz.
    root_frequency: f64,

    /// The pitch-bend range of the receiving synth in semitones.
    pb_range: u8,

    /// Milliseconds between resampled points. One tick is one millisecond in the
    /// written file, so each point lasts this many ticks.
    sampling_period: u32,

    /// Windows with fewer points than this are dropped.
    min_window_samples: usize,

    /// MIDI channel, 1 through 16.
    channel: u8,

    /// Velocity used for all notes.
    velocity: u8,

    /// Whether to write the pitch-bend range RPN at the start of the file.
    announce_bend_range: bool,

    /// Worker threads for encoding partials. Zero uses one per CPU.
    threads: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            root_frequency: encoder::DEFAULT_ROOT_FREQUENCY,
            pb_range: encoder::DEFAULT_PB_RANGE,
            sampling_period: 1,
            min_window_samples: encoder::DEFAULT_MIN_WINDOW_SAMPLES,
            channel: 1,
            velocity: 64,
            announce_bend_range: true,
            threads: 0,
        }
    }
}

/// Command line overrides. Unset fields keep the loaded value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root_frequency: Option<f64>,
    pub pb_range: Option<u8>,
    pub sampling_period: Option<u32>,
    pub channel: Option<u8>,
    pub threads: Option<usize>,
}

impl Settings {
    /// Loads settings from the optional file and the environment. The result is not
    /// validated until [`Settings::validate`] is called.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parses settings from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Settings, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?)
    }

    /// Applies command line overrides.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Settings {
        if let Some(root_frequency) = overrides.root_frequency {
            self.root_frequency = root_frequency;
        }
        if let Some(pb_range) = overrides.pb_range {
            self.pb_range = pb_range;
        }
        if let Some(sampling_period) = overrides.sampling_period {
            self.sampling_period = sampling_period;
        }
        if let Some(channel) = overrides.channel {
            self.channel = channel;
        }
        if let Some(threads) = overrides.threads {
            self.threads = threads;
        }
        self
    }

    /// Checks that every setting is within its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.root_frequency.is_finite() && self.root_frequency > 0.0) {
            return Err(invalid(
                "root_frequency",
                format!("{} is not a positive frequency", self.root_frequency),
            ));
        }
        if !(1..=MAX_PB_RANGE).contains(&self.pb_range) {
            return Err(invalid(
                "pb_range",
                format!("{} is not between 1 and {}", self.pb_range, MAX_PB_RANGE),
            ));
        }
        if self.sampling_period == 0 {
            return Err(invalid("sampling_period", "must be positive".to_string()));
        }
        if self.min_window_samples == 0 {
            return Err(invalid("min_window_samples", "must be positive".to_string()));
        }
        if !(1..=16).contains(&self.channel) {
            return Err(invalid(
                "channel",
                format!("{} is not between 1 and 16", self.channel),
            ));
        }
        if !(1..=127).contains(&self.velocity) {
            return Err(invalid(
                "velocity",
                format!("{} is not between 1 and 127", self.velocity),
            ));
        }
        Ok(())
    }

    pub fn root_frequency(&self) -> f64 {
        self.root_frequency
    }

    pub fn pb_range(&self) -> u8 {
        self.pb_range
    }

    pub fn sampling_period(&self) -> u32 {
        self.sampling_period
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Returns the number of worker threads to encode with.
    pub fn threads(&self) -> usize {
        match self.threads {
            0 => num_cpus::get(),
            threads => threads,
        }
    }

    /// Returns the parameters for the segment encoder. Samples are laid out at
    /// one tick per millisecond of analysis time.
    pub fn encoder(&self) -> EncoderParams {
        EncoderParams {
            root_frequency: self.root_frequency,
            pb_range: self.pb_range,
            ticks_per_sample: self.sampling_period,
            min_window_samples: self.min_window_samples,
        }
    }

    /// Returns the options for writing a MIDI file.
    pub fn smf_options(&self, track_name: Option<String>) -> SmfOptions {
        SmfOptions {
            channel: self.channel,
            velocity: self.velocity,
            pb_range: self.pb_range,
            announce_bend_range: self.announce_bend_range,
            track_name,
        }
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { name, reason }
}
