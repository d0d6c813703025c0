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
//! Reader for the SPEAR "par-text-partials-format" export.
//!
//! ```text
//! par-text-partials-format
//! point-type time frequency amplitude
//! partials-count 2
//! partials-data
//! 0 3 0.100000 0.120000
//! 0.100000 440.0 0.1 0.110000 445.0 0.2 0.120000 450.0 0.1
//! ...
//! ```
//!
//! Times are given in seconds and are converted to whole milliseconds. Decimal commas
//! are accepted in place of decimal points.
use std::fs;
use std::path::Path;

use tracing::warn;

pub use self::error::SpearError;

mod error;

const MAGIC: &str = "par-text-partials-format";
const POINT_TYPE: &str = "point-type";
const SUPPORTED_POINT_TYPE: &str = "time frequency amplitude";
const PARTIALS_COUNT: &str = "partials-count";
const PARTIALS_DATA: &str = "partials-data";

/// A single analysis point of a partial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Time in milliseconds.
    pub time: i64,
    /// Frequency in Hz.
    pub frequency: f64,
    /// Linear amplitude.
    pub amplitude: f64,
}

/// One partial as it appears in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRecord {
    pub index: usize,
    /// Start time in milliseconds.
    pub start: i64,
    /// End time in milliseconds.
    pub end: i64,
    pub points: Vec<Point>,
}

/// The partials of a SPEAR export, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpearFile {
    pub partials: Vec<PartialRecord>,
}

/// Reads and parses the given file.
pub fn read_file(path: &Path) -> Result<SpearFile, SpearError> {
    parse(&fs::read_to_string(path)?)
}

/// Parses SPEAR partials from text.
pub fn parse(text: &str) -> Result<SpearFile, SpearError> {
    // 1-based line numbers, blank lines skipped.
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        Some((_, MAGIC)) => {}
        Some((line, found)) => {
            return Err(SpearError::UnexpectedLine {
                line,
                expected: MAGIC,
                found: found.to_string(),
            })
        }
        None => return Err(SpearError::MissingData),
    }

    let mut declared_count: Option<usize> = None;
    loop {
        let (line, content) = lines.next().ok_or(SpearError::MissingData)?;
        if content == PARTIALS_DATA {
            break;
        }
        let (key, value) = content.split_once(char::is_whitespace).unwrap_or((content, ""));
        match key {
            POINT_TYPE => {
                let point_type = value.split_whitespace().collect::<Vec<&str>>().join(" ");
                if point_type != SUPPORTED_POINT_TYPE {
                    return Err(SpearError::UnsupportedPointType(point_type));
                }
            }
            PARTIALS_COUNT => declared_count = Some(parse_number(value.trim(), line)?),
            _ => warn!(line, content, "Ignoring unknown header line."),
        }
    }

    let mut partials = Vec::new();
    while let Some((line, header)) = lines.next() {
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(SpearError::MalformedPartialHeader {
                line,
                found: fields.len(),
            });
        }
        let index: usize = parse_number(fields[0], line)?;
        let declared: usize = parse_number(fields[1], line)?;
        let start = to_millis(parse_number(fields[2], line)?).trunc() as i64;
        let end = to_millis(parse_number(fields[3], line)?).trunc() as i64;

        let (data_line, data) = lines
            .next()
            .ok_or(SpearError::MissingDataLine { line, index })?;
        let points = parse_points(data, data_line)?;
        if points.len() != declared {
            return Err(SpearError::PointCountMismatch {
                line: data_line,
                index,
                declared,
                found: points.len(),
            });
        }

        partials.push(PartialRecord {
            index,
            start,
            end,
            points,
        });
    }

    if let Some(declared) = declared_count {
        if declared != partials.len() {
            warn!(
                declared,
                found = partials.len(),
                "Partial count in header does not match the partials in the file."
            );
        }
    }

    Ok(SpearFile { partials })
}

fn parse_points(data: &str, line: usize) -> Result<Vec<Point>, SpearError> {
    let values = data
        .split_whitespace()
        .map(|token| parse_number::<f64>(token, line))
        .collect::<Result<Vec<f64>, SpearError>>()?;
    if values.len() % 3 != 0 {
        return Err(SpearError::IncompleteTriple {
            line,
            found: values.len(),
        });
    }

    Ok(values
        .chunks_exact(3)
        .map(|triple| Point {
            time: to_millis(triple[0]).floor() as i64,
            frequency: triple[1],
            amplitude: triple[2],
        })
        .collect())
}

fn parse_number<T: std::str::FromStr>(token: &str, line: usize) -> Result<T, SpearError> {
    token
        .replace(',', ".")
        .parse()
        .map_err(|_| SpearError::InvalidNumber {
            line,
            token: token.to_string(),
        })
}

fn to_millis(seconds: f64) -> f64 {
    seconds * 1000.0
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;

    const TWO_PARTIALS: &str = "par-text-partials-format
point-type time frequency amplitude
partials-count 2
partials-data
0 3 0.100000 0.120000
0.100000 440.000000 0.100000 0.110000 445.000000 0.200000 0.120000 450.000000 0.100000
1 2 0.050000 0.0625
0.050000 880.5 0.01 0.0625 870.25 0.02
";

    #[test]
    fn parses_partials() -> Result<(), Box<dyn Error>> {
        let file = parse(TWO_PARTIALS)?;
        assert_eq!(2, file.partials.len());

        let first = &file.partials[0];
        assert_eq!(0, first.index);
        assert_eq!(100, first.start);
        assert_eq!(120, first.end);
        assert_eq!(
            vec![
                Point {
                    time: 100,
                    frequency: 440.0,
                    amplitude: 0.1
                },
                Point {
                    time: 110,
                    frequency: 445.0,
                    amplitude: 0.2
                },
                Point {
                    time: 120,
                    frequency: 450.0,
                    amplitude: 0.1
                },
            ],
            first.points
        );

        let second = &file.partials[1];
        assert_eq!(1, second.index);
        assert_eq!(50, second.start);
        assert_eq!(62, second.end);
        assert_eq!(62, second.points[1].time);
        assert_eq!(870.25, second.points[1].frequency);
        Ok(())
    }

    #[test]
    fn decimal_commas() -> Result<(), Box<dyn Error>> {
        let file = parse(
            "par-text-partials-format\npoint-type time frequency amplitude\n\
             partials-count 1\npartials-data\n7 1 0,5 0,5\n0,5 261,5 0,25\n",
        )?;
        let partial = &file.partials[0];
        assert_eq!(7, partial.index);
        assert_eq!(500, partial.start);
        assert_eq!(261.5, partial.points[0].frequency);
        assert_eq!(0.25, partial.points[0].amplitude);
        Ok(())
    }

    #[test]
    fn tolerates_blank_lines_and_count_mismatch() -> Result<(), Box<dyn Error>> {
        let text = TWO_PARTIALS.replace("partials-count 2", "partials-count 5");
        let file = parse(&format!("\n{}\n\n", text.replace("0.120000\n", "0.120000\n\n")))?;
        assert_eq!(2, file.partials.len());
        Ok(())
    }

    #[test]
    fn no_partials() -> Result<(), Box<dyn Error>> {
        let file = parse("par-text-partials-format\npartials-count 0\npartials-data\n")?;
        assert!(file.partials.is_empty());
        Ok(())
    }

    #[test]
    fn wrong_magic() {
        assert!(matches!(
            parse("something-else\npartials-data\n"),
            Err(SpearError::UnexpectedLine { line: 1, .. })
        ));
        assert!(matches!(parse(""), Err(SpearError::MissingData)));
    }

    #[test]
    fn missing_data_marker() {
        assert!(matches!(
            parse("par-text-partials-format\npartials-count 1\n"),
            Err(SpearError::MissingData)
        ));
    }

    #[test]
    fn unsupported_point_type() {
        assert!(matches!(
            parse("par-text-partials-format\npoint-type time frequency\npartials-data\n"),
            Err(SpearError::UnsupportedPointType(_))
        ));
    }

    #[test]
    fn malformed_data() {
        let header = "par-text-partials-format\npartials-data\n";
        assert!(matches!(
            parse(&format!("{}0 1 0.1\n0.1 440 0.1\n", header)),
            Err(SpearError::MalformedPartialHeader { line: 3, found: 3 })
        ));
        assert!(matches!(
            parse(&format!("{}0 1 0.1 0.2\n0.1 abc 0.1\n", header)),
            Err(SpearError::InvalidNumber { line: 4, .. })
        ));
        assert!(matches!(
            parse(&format!("{}0 1 0.1 0.2\n0.1 440\n", header)),
            Err(SpearError::IncompleteTriple { line: 4, found: 2 })
        ));
        assert!(matches!(
            parse(&format!("{}0 2 0.1 0.2\n0.1 440 0.1\n", header)),
            Err(SpearError::PointCountMismatch {
                index: 0,
                declared: 2,
                found: 1,
                ..
            })
        ));
        assert!(matches!(
            parse(&format!("{}4 1 0.1 0.2\n", header)),
            Err(SpearError::MissingDataLine { line: 3, index: 4 })
        ));
    }

    #[test]
    fn reads_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("partials.txt");
        fs::write(&path, TWO_PARTIALS)?;
        assert_eq!(parse(TWO_PARTIALS)?, read_file(&path)?);
        assert!(matches!(
            read_file(&dir.path().join("missing.txt")),
            Err(SpearError::Io(_))
        ));
        Ok(())
    }
}
