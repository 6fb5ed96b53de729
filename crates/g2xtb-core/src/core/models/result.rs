use nalgebra::{DMatrix, Vector3};

/// Everything recovered from a successful native calculation.
///
/// Matrices keep the native shapes: `atomic_dipoles` is 3×N,
/// `atomic_quadrupoles` is 6×N and `bond_orders` is N×N. The gradient is
/// already in the driver's sign convention (dE/dx).
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    pub status: i32,
    pub report: String,
    pub energy: f64,
    pub charges: Vec<f64>,
    pub dipole: Vector3<f64>,
    pub atomic_dipoles: DMatrix<f64>,
    pub atomic_quadrupoles: DMatrix<f64>,
    pub bond_orders: DMatrix<f64>,
    pub gradient: Vec<Vector3<f64>>,
}

impl CalculationResult {
    pub fn number_of_atoms(&self) -> usize {
        self.charges.len()
    }

    /// Largest absolute gradient component, used as a quick summary in logs.
    pub fn max_gradient_component(&self) -> f64 {
        self.gradient
            .iter()
            .flat_map(|g| g.iter())
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}
