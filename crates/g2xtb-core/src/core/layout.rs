use std::io::{self, Write};
use thiserror::Error;

/// Width of one field in the response records (`D20.12`).
pub const FIELD_WIDTH: usize = 20;
/// Digits written after the decimal point of a `D20.12` mantissa.
pub const DIGITS: usize = 12;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LayoutError {
    #[error("Buffer holds {found} values, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Invalid real value in field {field} (value: '{value}')")]
    InvalidField { field: usize, value: String },
}

/// Cartesian data for a set of atoms, as handed to [`to_column_major`].
#[derive(Debug, Clone, Copy)]
pub enum Geometry<'a> {
    /// One `[x, y, z]` row per atom.
    Rows(&'a [[f64; 3]]),
    /// Rows already flattened in row-major order (`x1 y1 z1 x2 ...`).
    Flat(&'a [f64]),
}

/// Packs an N×3 row-major geometry into the column-major buffer expected by
/// the native library: all X values, then all Y values, then all Z values.
pub fn to_column_major(geometry: Geometry<'_>, atoms: usize) -> Result<Vec<f64>, LayoutError> {
    let mut packed = vec![0.0; 3 * atoms];
    match geometry {
        Geometry::Rows(rows) => {
            if rows.len() != atoms {
                return Err(LayoutError::LengthMismatch {
                    expected: atoms,
                    found: rows.len(),
                });
            }
            for (atom, row) in rows.iter().enumerate() {
                for (axis, &value) in row.iter().enumerate() {
                    packed[axis * atoms + atom] = value;
                }
            }
        }
        Geometry::Flat(values) => {
            if values.len() != 3 * atoms {
                return Err(LayoutError::LengthMismatch {
                    expected: 3 * atoms,
                    found: values.len(),
                });
            }
            for (index, &value) in values.iter().enumerate() {
                packed[(index % 3) * atoms + index / 3] = value;
            }
        }
    }
    Ok(packed)
}

/// Inverse of [`to_column_major`].
pub fn from_column_major(buffer: &[f64], atoms: usize) -> Result<Vec<[f64; 3]>, LayoutError> {
    if buffer.len() != 3 * atoms {
        return Err(LayoutError::LengthMismatch {
            expected: 3 * atoms,
            found: buffer.len(),
        });
    }
    Ok((0..atoms)
        .map(|atom| {
            [
                buffer[atom],
                buffer[atoms + atom],
                buffer[2 * atoms + atom],
            ]
        })
        .collect())
}

/// Reads a Fortran `(3, N)` array, where the three components of each atom
/// are contiguous, as N rows.
pub fn rows_from_packed(buffer: &[f64], atoms: usize) -> Result<Vec<[f64; 3]>, LayoutError> {
    if buffer.len() != 3 * atoms {
        return Err(LayoutError::LengthMismatch {
            expected: 3 * atoms,
            found: buffer.len(),
        });
    }
    Ok(buffer
        .chunks_exact(3)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect())
}

/// Formats `value` as a Fortran `Dw.d` edit descriptor would.
///
/// The mantissa is normalized to `0.d1d2...` with `digits` digits, followed by
/// `D±ee`. Exponents needing three digits drop the letter (`0.1+100`), and a
/// field that cannot fit in `width` is filled with asterisks.
pub fn format_d(value: f64, width: usize, digits: usize) -> String {
    let field = if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        match fortran_parts(value, digits.max(1)) {
            Some((mantissa, exponent)) => {
                let sign = if value < 0.0 { "-" } else { "" };
                let exponent_sign = if exponent < 0 { '-' } else { '+' };
                let magnitude = exponent.unsigned_abs();
                let exponent = if magnitude <= 99 {
                    format!("D{}{:02}", exponent_sign, magnitude)
                } else if magnitude <= 999 {
                    format!("{}{:03}", exponent_sign, magnitude)
                } else {
                    return "*".repeat(width);
                };
                let full = format!("{}0.{}{}", sign, mantissa, exponent);
                if full.len() <= width {
                    full
                } else {
                    // The optional leading zero goes first when space is short.
                    format!("{}.{}{}", sign, mantissa, exponent)
                }
            }
            None => return "*".repeat(width),
        }
    };

    if field.len() > width {
        "*".repeat(width)
    } else {
        format!("{:>width$}", field, width = width)
    }
}

fn fortran_parts(value: f64, digits: usize) -> Option<(String, i32)> {
    if value == 0.0 {
        return Some(("0".repeat(digits), 0));
    }
    let scientific = format!("{:.*e}", digits - 1, value.abs());
    let (mantissa, exponent) = scientific.split_once('e')?;
    let exponent: i32 = exponent.parse().ok()?;
    let mantissa: String = mantissa.chars().filter(|c| *c != '.').collect();
    Some((mantissa, exponent + 1))
}

/// Writes one fixed-width record of `D20.12` fields, terminated by a newline.
pub fn write_record(writer: &mut impl Write, values: &[f64]) -> io::Result<()> {
    for &value in values {
        write!(writer, "{}", format_d(value, FIELD_WIDTH, DIGITS))?;
    }
    writeln!(writer)
}

/// Parses a real number written either in free format or with a Fortran
/// exponent (`1.5D+02`, `0.15+003`).
pub fn parse_real(token: &str) -> Option<f64> {
    let normalized: String = token
        .trim()
        .chars()
        .map(|c| match c {
            'D' | 'd' => 'e',
            other => other,
        })
        .collect();
    if let Ok(value) = normalized.parse() {
        return Some(value);
    }

    let (split, _) = normalized
        .char_indices()
        .skip(1)
        .filter(|(_, c)| *c == '+' || *c == '-')
        .last()?;
    let (mantissa, exponent) = normalized.split_at(split);
    if mantissa.ends_with(['e', 'E']) {
        return None;
    }
    format!("{}e{}", mantissa, exponent).parse().ok()
}

/// Splits a fixed-width record into its real-valued fields.
pub fn split_record(line: &str, width: usize) -> Result<Vec<f64>, LayoutError> {
    let line = line.trim_end();
    let width = width.max(1);
    let mut values = Vec::with_capacity(line.len() / width + 1);
    let mut start = 0;
    while start < line.len() {
        let end = (start + width).min(line.len());
        let field = line.get(start..end).unwrap_or("");
        let value = parse_real(field).ok_or_else(|| LayoutError::InvalidField {
            field: values.len() + 1,
            value: field.trim().to_string(),
        })?;
        values.push(value);
        start = end;
    }
    Ok(values)
}
