use super::error::{FormatError, ParseErrorKind};
use super::traits::RecordFile;
use crate::core::layout::parse_real;
use crate::core::models::request::{CalculationRequest, DerivativeLevel};
use nalgebra::Point3;
use std::io::{BufRead, Write};
use std::str::FromStr;
use tracing::debug;

fn parse_int<T: FromStr>(token: &str, line: usize, field: &'static str) -> Result<T, FormatError> {
    token.parse().map_err(|_| FormatError::Parse {
        line,
        kind: ParseErrorKind::InvalidInt {
            field,
            value: token.into(),
        },
    })
}

fn parse_coordinate(token: &str, line: usize, field: &'static str) -> Result<f64, FormatError> {
    parse_real(token).ok_or_else(|| FormatError::Parse {
        line,
        kind: ParseErrorKind::InvalidFloat {
            field,
            value: token.into(),
        },
    })
}

/// The request file (`.EIn`) written by the driver.
///
/// ```text
/// <atoms> <derivative> <charge> <spin>
/// <type> <x> <y> <z> [ignored columns...]
/// ```
///
/// Anything after the last atom line is ignored.
pub struct RequestFile;

impl RecordFile for RequestFile {
    type Record = CalculationRequest;
    type Shape = ();
    type Error = FormatError;

    fn read_from(reader: &mut impl BufRead, _shape: &()) -> Result<CalculationRequest, FormatError> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(FormatError::MissingRecord("header line".into())),
        };
        let tokens: Vec<&str> = header.split_whitespace().collect();
        if tokens.len() != 4 {
            return Err(FormatError::Parse {
                line: 1,
                kind: ParseErrorKind::FieldCount {
                    expected: 4,
                    found: tokens.len(),
                },
            });
        }

        let number_of_atoms: i64 = parse_int(tokens[0], 1, "number of atoms")?;
        let derivative: i64 = parse_int(tokens[1], 1, "derivative order")?;
        let charge: i32 = parse_int(tokens[2], 1, "charge")?;
        let spin: i32 = parse_int(tokens[3], 1, "spin")?;

        let derivative = DerivativeLevel::try_from(derivative)?;
        if number_of_atoms < 1 {
            return Err(FormatError::Parse {
                line: 1,
                kind: ParseErrorKind::InvalidAtomCount(number_of_atoms),
            });
        }
        let number_of_atoms = number_of_atoms as usize;

        // The header is untrusted: grow with the lines actually present.
        let mut atom_types = Vec::new();
        let mut coordinates = Vec::new();
        for index in 0..number_of_atoms {
            let line_num = index + 2;
            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    return Err(FormatError::Truncated {
                        expected: number_of_atoms,
                        found: index,
                    });
                }
            };

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 4 {
                return Err(FormatError::Parse {
                    line: line_num,
                    kind: ParseErrorKind::FieldCount {
                        expected: 4,
                        found: tokens.len(),
                    },
                });
            }
            atom_types.push(parse_int(tokens[0], line_num, "atom type")?);
            coordinates.push(Point3::new(
                parse_coordinate(tokens[1], line_num, "x coordinate")?,
                parse_coordinate(tokens[2], line_num, "y coordinate")?,
                parse_coordinate(tokens[3], line_num, "z coordinate")?,
            ));
        }

        debug!(
            "Read request: {} atom(s), derivative {}, charge {}, spin {}",
            number_of_atoms, derivative, charge, spin
        );

        Ok(CalculationRequest {
            number_of_atoms,
            derivative,
            charge,
            spin,
            atom_types,
            coordinates,
        })
    }

    /// Writes the request in the driver's own layout: `4I10` for the header,
    /// `I10,4F20.12` for each atom (the last column, the MM charge, is zero).
    fn write_to(record: &CalculationRequest, writer: &mut impl Write) -> Result<(), FormatError> {
        if record.atom_types.len() != record.number_of_atoms {
            return Err(FormatError::Shape {
                section: "atom types",
                expected: record.number_of_atoms,
                found: record.atom_types.len(),
            });
        }
        if record.coordinates.len() != record.number_of_atoms {
            return Err(FormatError::Shape {
                section: "coordinates",
                expected: record.number_of_atoms,
                found: record.coordinates.len(),
            });
        }

        writeln!(
            writer,
            "{:>10}{:>10}{:>10}{:>10}",
            record.number_of_atoms,
            record.derivative.order(),
            record.charge,
            record.spin
        )?;
        for (atom_type, position) in record.atom_types.iter().zip(&record.coordinates) {
            writeln!(
                writer,
                "{:>10}{:>20.12}{:>20.12}{:>20.12}{:>20.12}",
                atom_type, position.x, position.y, position.z, 0.0
            )?;
        }
        Ok(())
    }
}
