use super::error::FormatError;
use super::traits::RecordFile;
use crate::core::layout::{self, FIELD_WIDTH};
use crate::core::models::request::DerivativeLevel;
use nalgebra::Vector3;
use std::io::{BufRead, Write};

/// The record written back to the driver (`.EOu`).
///
/// Optional sections are shape-checked when attached, so writing never fails
/// for anything but I/O. Absent sections are written as zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalResponse {
    derivative: DerivativeLevel,
    energy: f64,
    number_of_atoms: usize,
    dipole: Option<Vector3<f64>>,
    gradient: Option<Vec<Vector3<f64>>>,
    polarizability: Option<[[f64; 3]; 2]>,
    dipole_derivatives: Option<Vec<[f64; 3]>>,
}

impl ExternalResponse {
    pub fn new(derivative: DerivativeLevel, energy: f64, number_of_atoms: usize) -> Self {
        Self {
            derivative,
            energy,
            number_of_atoms,
            dipole: None,
            gradient: None,
            polarizability: None,
            dipole_derivatives: None,
        }
    }

    pub fn with_dipole(mut self, dipole: Vector3<f64>) -> Self {
        self.dipole = Some(dipole);
        self
    }

    pub fn with_gradient(mut self, gradient: Vec<Vector3<f64>>) -> Result<Self, FormatError> {
        if gradient.len() != self.number_of_atoms {
            return Err(FormatError::Shape {
                section: "gradient",
                expected: self.number_of_atoms,
                found: gradient.len(),
            });
        }
        self.gradient = Some(gradient);
        Ok(self)
    }

    /// Lower triangle of the polarizability tensor (xx, yx, yy / zx, zy, zz).
    pub fn with_polarizability(mut self, polarizability: [[f64; 3]; 2]) -> Self {
        self.polarizability = Some(polarizability);
        self
    }

    pub fn with_dipole_derivatives(mut self, rows: Vec<[f64; 3]>) -> Result<Self, FormatError> {
        if rows.len() != 3 * self.number_of_atoms {
            return Err(FormatError::Shape {
                section: "dipole derivatives",
                expected: 3 * self.number_of_atoms,
                found: rows.len(),
            });
        }
        self.dipole_derivatives = Some(rows);
        Ok(self)
    }

    pub fn derivative(&self) -> DerivativeLevel {
        self.derivative
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn number_of_atoms(&self) -> usize {
        self.number_of_atoms
    }

    pub fn dipole(&self) -> Vector3<f64> {
        self.dipole.unwrap_or_else(Vector3::zeros)
    }

    pub fn gradient(&self) -> Option<&[Vector3<f64>]> {
        self.gradient.as_deref()
    }

    pub fn polarizability(&self) -> [[f64; 3]; 2] {
        self.polarizability.unwrap_or([[0.0; 3]; 2])
    }

    pub fn dipole_derivatives(&self) -> Option<&[[f64; 3]]> {
        self.dipole_derivatives.as_deref()
    }

    /// Number of lines the record occupies once written.
    pub fn line_count(&self) -> usize {
        let gradient_lines = if self.derivative.requests_gradient() {
            self.number_of_atoms
        } else {
            0
        };
        1 + gradient_lines + 2 + 3 * self.number_of_atoms
    }
}

/// Layout of a response file, which the file itself does not describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseShape {
    pub derivative: DerivativeLevel,
    pub number_of_atoms: usize,
}

pub struct ResponseFile;

impl ResponseFile {
    fn next_record(
        lines: &mut impl Iterator<Item = std::io::Result<String>>,
        line_num: &mut usize,
        fields: usize,
        section: &str,
    ) -> Result<Vec<f64>, FormatError> {
        *line_num += 1;
        let line = match lines.next() {
            Some(line) => line?,
            None => {
                return Err(FormatError::MissingRecord(format!(
                    "{} (line {})",
                    section, line_num
                )));
            }
        };
        let values =
            layout::split_record(&line, FIELD_WIDTH).map_err(|source| FormatError::Record {
                line: *line_num,
                source,
            })?;
        if values.len() != fields {
            return Err(FormatError::Record {
                line: *line_num,
                source: layout::LayoutError::LengthMismatch {
                    expected: fields,
                    found: values.len(),
                },
            });
        }
        Ok(values)
    }
}

impl RecordFile for ResponseFile {
    type Record = ExternalResponse;
    type Shape = ResponseShape;
    type Error = FormatError;

    fn read_from(
        reader: &mut impl BufRead,
        shape: &ResponseShape,
    ) -> Result<ExternalResponse, FormatError> {
        let mut lines = reader.lines();
        let mut line_num = 0;
        let atoms = shape.number_of_atoms;

        let head = Self::next_record(&mut lines, &mut line_num, 4, "energy and dipole")?;
        let mut response = ExternalResponse::new(shape.derivative, head[0], atoms)
            .with_dipole(Vector3::new(head[1], head[2], head[3]));

        if shape.derivative.requests_gradient() {
            let mut gradient = Vec::with_capacity(atoms);
            for _ in 0..atoms {
                let row = Self::next_record(&mut lines, &mut line_num, 3, "gradient")?;
                gradient.push(Vector3::new(row[0], row[1], row[2]));
            }
            response = response.with_gradient(gradient)?;
        }

        let mut polarizability = [[0.0; 3]; 2];
        for row in polarizability.iter_mut() {
            let values = Self::next_record(&mut lines, &mut line_num, 3, "polarizability")?;
            row.copy_from_slice(&values);
        }
        response = response.with_polarizability(polarizability);

        let mut derivatives = Vec::with_capacity(3 * atoms);
        for _ in 0..3 * atoms {
            let values = Self::next_record(&mut lines, &mut line_num, 3, "dipole derivatives")?;
            derivatives.push([values[0], values[1], values[2]]);
        }
        response.with_dipole_derivatives(derivatives)
    }

    fn write_to(record: &ExternalResponse, writer: &mut impl Write) -> Result<(), FormatError> {
        let dipole = record.dipole();
        layout::write_record(writer, &[record.energy, dipole.x, dipole.y, dipole.z])?;

        if record.derivative.requests_gradient() {
            for atom in 0..record.number_of_atoms {
                let g = record
                    .gradient
                    .as_ref()
                    .map_or_else(Vector3::zeros, |gradient| gradient[atom]);
                layout::write_record(writer, &[g.x, g.y, g.z])?;
            }
        }

        for row in &record.polarizability() {
            layout::write_record(writer, row)?;
        }

        for index in 0..3 * record.number_of_atoms {
            let row = record
                .dipole_derivatives
                .as_ref()
                .map_or([0.0; 3], |rows| rows[index]);
            layout::write_record(writer, &row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    fn written(response: &ExternalResponse) -> String {
        let mut buffer = Vec::new();
        ResponseFile::write_to(response, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn energy_only_response_has_one_plus_two_plus_three_n_lines() {
        for atoms in 1..5 {
            let response = ExternalResponse::new(DerivativeLevel::Energy, -5.07, atoms);
            let text = written(&response);
            assert_eq!(text.lines().count(), 1 + 2 + 3 * atoms);
            assert_eq!(response.line_count(), 1 + 2 + 3 * atoms);
        }
    }

    #[test]
    fn gradient_response_adds_one_line_per_atom() {
        for atoms in 1..5 {
            let response = ExternalResponse::new(DerivativeLevel::Gradient, -5.07, atoms);
            let text = written(&response);
            assert_eq!(text.lines().count(), 1 + atoms + 2 + 3 * atoms);
            assert_eq!(response.line_count(), 1 + atoms + 2 + 3 * atoms);
        }
    }

    #[test]
    fn first_line_has_four_fields_and_others_three() {
        let response = ExternalResponse::new(DerivativeLevel::Gradient, -1.0, 2)
            .with_dipole(Vector3::new(0.1, 0.2, 0.3));
        let text = written(&response);
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap().len(), 4 * FIELD_WIDTH);
        assert!(lines.all(|line| line.len() == 3 * FIELD_WIDTH));
    }

    #[test]
    fn head_line_carries_energy_and_dipole() {
        let response = ExternalResponse::new(DerivativeLevel::Energy, -5.07, 1)
            .with_dipole(Vector3::new(0.0, 0.0, 1.5));
        let text = written(&response);
        assert_eq!(
            text.lines().next().unwrap(),
            " -0.507000000000D+01  0.000000000000D+00  0.000000000000D+00  0.150000000000D+01"
        );
    }

    #[test]
    fn absent_sections_are_zero_filled() {
        let response = ExternalResponse::new(DerivativeLevel::Gradient, 0.5, 2);
        let text = written(&response);
        let zero_row = "  0.000000000000D+00".repeat(3);
        assert!(text.lines().skip(1).all(|line| line == zero_row));
    }

    #[test]
    fn gradient_rows_follow_atom_order() {
        let response = ExternalResponse::new(DerivativeLevel::Gradient, 0.0, 2)
            .with_gradient(vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, -2.0)])
            .unwrap();
        let text = written(&response);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            layout::split_record(lines[1], FIELD_WIDTH).unwrap(),
            vec![1.0, 0.0, 0.0]
        );
        assert_eq!(
            layout::split_record(lines[2], FIELD_WIDTH).unwrap(),
            vec![0.0, 0.0, -2.0]
        );
    }

    #[test]
    fn gradient_is_not_written_when_only_energy_was_requested() {
        let response = ExternalResponse::new(DerivativeLevel::Energy, 0.0, 1)
            .with_gradient(vec![Vector3::new(9.0, 9.0, 9.0)])
            .unwrap();
        let text = written(&response);
        assert!(!text.contains("0.900000000000D+01"));
    }

    #[test]
    fn sections_with_wrong_shape_are_rejected() {
        let base = ExternalResponse::new(DerivativeLevel::Gradient, 0.0, 2);
        assert!(matches!(
            base.clone().with_gradient(vec![Vector3::zeros()]),
            Err(FormatError::Shape {
                section: "gradient",
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            base.with_dipole_derivatives(vec![[0.0; 3]; 5]),
            Err(FormatError::Shape {
                section: "dipole derivatives",
                expected: 6,
                found: 5
            })
        ));
    }

    #[test]
    fn written_response_reads_back() {
        let response = ExternalResponse::new(DerivativeLevel::Gradient, -11.3912, 2)
            .with_dipole(Vector3::new(0.0, 0.25, -0.5))
            .with_gradient(vec![Vector3::new(1e-3, -2e-3, 0.0), Vector3::new(-1e-3, 2e-3, 0.0)])
            .unwrap()
            .with_polarizability([[1.0, 0.0, 2.0], [0.0, 0.0, 3.0]]);
        let text = written(&response);

        let shape = ResponseShape {
            derivative: DerivativeLevel::Gradient,
            number_of_atoms: 2,
        };
        let back = ResponseFile::read_from(&mut Cursor::new(text), &shape).unwrap();

        assert!((back.energy() - response.energy()).abs() < 1e-10);
        assert!((back.dipole() - response.dipole()).norm() < 1e-12);
        for (a, b) in back.gradient().unwrap().iter().zip(response.gradient().unwrap()) {
            assert!((a - b).norm() < 1e-14);
        }
        assert_eq!(back.polarizability(), response.polarizability());
        assert_eq!(back.dipole_derivatives().unwrap().len(), 6);
    }

    #[test]
    fn reading_short_response_reports_missing_section() {
        let text = format!("{}\n", "  0.000000000000D+00".repeat(4));
        let shape = ResponseShape {
            derivative: DerivativeLevel::Energy,
            number_of_atoms: 1,
        };
        let result = ResponseFile::read_from(&mut Cursor::new(text), &shape);
        assert!(matches!(result, Err(FormatError::MissingRecord(msg)) if msg.contains("polarizability")));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_failure_surfaces_as_io_error() {
        let response = ExternalResponse::new(DerivativeLevel::Energy, 0.0, 1);
        let result = ResponseFile::write_to(&response, &mut FailingWriter);
        assert!(matches!(result, Err(FormatError::Io(_))));
    }

    #[test]
    fn write_to_path_creates_the_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.EOu");
        let response = ExternalResponse::new(DerivativeLevel::Energy, -1.0, 3);

        ResponseFile::write_to_path(&response, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1 + 2 + 9);
    }
}
