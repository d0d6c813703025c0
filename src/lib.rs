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
//! Converts SPEAR partial analyses into monophonic MIDI note sequences whose pitch is
//! carried by pitch-bend automation.
//!
//! Each partial is resampled onto a uniform millisecond grid ([`resample`]), split into
//! windows narrow enough to fit under the pitch-bend range of a single note
//! ([`encoder`]), and rendered as note on, pitch bend and note off events ([`midi`]).
pub mod config;
pub mod encoder;
pub mod midi;
pub mod partial;
pub mod pipeline;
pub mod pitch;
pub mod resample;
pub mod spear;
pub mod util;
