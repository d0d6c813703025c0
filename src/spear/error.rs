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

/// Typed error for SPEAR text parsing so callers can tell I/O failures apart from
/// malformed files.
#[derive(Debug, thiserror::Error)]
pub enum SpearError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected \"{expected}\", found \"{found}\"")]
    UnexpectedLine {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("unsupported point type \"{0}\", expected \"time frequency amplitude\"")]
    UnsupportedPointType(String),

    #[error("missing \"partials-data\" marker")]
    MissingData,

    #[error("line {line}: \"{token}\" is not a number")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: partial header needs 4 fields, found {found}")]
    MalformedPartialHeader { line: usize, found: usize },

    #[error("line {line}: partial {index} has no data line")]
    MissingDataLine { line: usize, index: usize },

    #[error("line {line}: {found} values do not form (time, frequency, amplitude) triples")]
    IncompleteTriple { line: usize, found: usize },

    #[error("line {line}: partial {index} declares {declared} points but has {found}")]
    PointCountMismatch {
        line: usize,
        index: usize,
        declared: usize,
        found: usize,
    },
}
