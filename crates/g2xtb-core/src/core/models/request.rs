use nalgebra::Point3;
use std::fmt;
use thiserror::Error;

/// Derivative order requested by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DerivativeLevel {
    /// Energy only.
    Energy = 0,
    /// Energy and nuclear gradient.
    Gradient = 1,
}

impl DerivativeLevel {
    pub fn order(self) -> u8 {
        self as u8
    }

    pub fn requests_gradient(self) -> bool {
        self >= DerivativeLevel::Gradient
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("unsupported derivative level {0} (maximum is 1)")]
pub struct UnsupportedDerivativeError(pub i64);

impl TryFrom<i64> for DerivativeLevel {
    type Error = UnsupportedDerivativeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Energy),
            1 => Ok(Self::Gradient),
            other => Err(UnsupportedDerivativeError(other)),
        }
    }
}

impl fmt::Display for DerivativeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.order())
    }
}

/// A single-point calculation request, as described by the driver's input file.
///
/// Coordinates are in Bohr. `atom_types` holds atomic numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub number_of_atoms: usize,
    pub derivative: DerivativeLevel,
    pub charge: i32,
    /// Spin multiplicity; carried through but not used by the GFN2 call.
    pub spin: i32,
    pub atom_types: Vec<i64>,
    pub coordinates: Vec<Point3<f64>>,
}

impl CalculationRequest {
    /// Whether the per-atom sequences agree with `number_of_atoms`.
    pub fn is_consistent(&self) -> bool {
        self.atom_types.len() == self.number_of_atoms
            && self.coordinates.len() == self.number_of_atoms
    }

    pub fn coordinate_rows(&self) -> Vec<[f64; 3]> {
        self.coordinates.iter().map(|p| [p.x, p.y, p.z]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivative_level_accepts_only_zero_and_one() {
        assert_eq!(DerivativeLevel::try_from(0), Ok(DerivativeLevel::Energy));
        assert_eq!(DerivativeLevel::try_from(1), Ok(DerivativeLevel::Gradient));
        assert_eq!(
            DerivativeLevel::try_from(2),
            Err(UnsupportedDerivativeError(2))
        );
        assert!(DerivativeLevel::try_from(-1).is_err());
    }

    #[test]
    fn only_gradient_level_requests_gradient() {
        assert!(!DerivativeLevel::Energy.requests_gradient());
        assert!(DerivativeLevel::Gradient.requests_gradient());
        assert_eq!(DerivativeLevel::Gradient.to_string(), "1");
    }

    #[test]
    fn consistency_requires_matching_lengths() {
        let mut request = CalculationRequest {
            number_of_atoms: 2,
            derivative: DerivativeLevel::Energy,
            charge: 0,
            spin: 1,
            atom_types: vec![1, 1],
            coordinates: vec![Point3::origin(), Point3::new(0.0, 0.0, 1.4)],
        };
        assert!(request.is_consistent());
        assert_eq!(request.coordinate_rows()[1], [0.0, 0.0, 1.4]);

        request.atom_types.pop();
        assert!(!request.is_consistent());
    }
}
