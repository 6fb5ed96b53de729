use super::error::EngineError;
use super::native::{NativeCalculator, NativeInputs, NativeOutputs, XtbLibrary};
use super::options::{CalculationOptions, SccOptions};
use super::scratch::ScratchFile;
use crate::core::layout::{Geometry, rows_from_packed, to_column_major};
use crate::core::models::request::CalculationRequest;
use crate::core::models::result::CalculationResult;
use nalgebra::{DMatrix, Vector3};
use std::ffi::{CString, OsStr, c_int};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Runs GFN2 calculations through a [`NativeCalculator`].
///
/// Each call is an independent request/response cycle with its own scratch
/// file; the client holds no state between calls beyond the bound library.
#[derive(Debug)]
pub struct ForeignCalculationClient<N: NativeCalculator = XtbLibrary> {
    native: N,
    scratch_dir: Option<PathBuf>,
}

impl ForeignCalculationClient<XtbLibrary> {
    /// Loads the xtb library at `path` and binds `symbol` as the entry point.
    pub fn load<P: AsRef<OsStr>>(path: P, symbol: &str) -> Result<Self, EngineError> {
        Ok(Self::new(XtbLibrary::load(path, symbol)?))
    }
}

impl<N: NativeCalculator> ForeignCalculationClient<N> {
    pub fn new(native: N) -> Self {
        Self {
            native,
            scratch_dir: None,
        }
    }

    /// Places scratch files in `dir` instead of the system temporary directory.
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    #[instrument(skip_all, name = "compute", fields(atoms = request.number_of_atoms, charge = request.charge))]
    pub fn compute(
        &self,
        request: &CalculationRequest,
        options: &CalculationOptions,
    ) -> Result<CalculationResult, EngineError> {
        if !request.is_consistent() {
            return Err(EngineError::Validation(format!(
                "request declares {} atom(s) but carries {} atom type(s) and {} coordinate(s)",
                request.number_of_atoms,
                request.atom_types.len(),
                request.coordinates.len()
            )));
        }

        let rows = request.coordinate_rows();
        self.compute_geometry(
            &request.atom_types,
            Geometry::Rows(&rows),
            f64::from(request.charge),
            options,
        )
    }

    /// Runs one calculation on raw geometry data.
    ///
    /// The number of atoms is taken from `atom_types`; `geometry` must describe
    /// the same number of atoms.
    #[instrument(skip_all, name = "compute_geometry", fields(atoms = atom_types.len()))]
    pub fn compute_geometry(
        &self,
        atom_types: &[i64],
        geometry: Geometry<'_>,
        charge: f64,
        options: &CalculationOptions,
    ) -> Result<CalculationResult, EngineError> {
        let atoms = atom_types.len();
        if atoms == 0 {
            return Err(EngineError::Validation("no atoms to compute".to_string()));
        }
        let natoms = c_int::try_from(atoms).map_err(|_| {
            EngineError::Validation(format!("{atoms} atoms exceed the native atom count range"))
        })?;
        let types = atom_types
            .iter()
            .map(|&t| {
                c_int::try_from(t).map_err(|_| {
                    EngineError::Validation(format!("atom type {t} is out of the native range"))
                })
            })
            .collect::<Result<Vec<c_int>, _>>()?;
        let coordinates = to_column_major(geometry, atoms)
            .map_err(|e| EngineError::Validation(format!("invalid geometry: {e}")))?;

        let scc = SccOptions::from(options);
        let mut outputs = NativeOutputs::zeroed(atoms);

        let scratch = match &self.scratch_dir {
            Some(dir) => ScratchFile::create_in(dir)?,
            None => ScratchFile::create()?,
        };
        let output_path = CString::new(scratch.path().as_os_str().as_encoded_bytes())
            .map_err(|_| {
                EngineError::Validation(format!(
                    "scratch path {:?} contains a NUL byte",
                    scratch.path()
                ))
            })?;

        debug!(
            "Calling native GFN2 for {} atom(s), solvent '{}', report to {:?}",
            atoms,
            scc.solvent_name(),
            scratch.path()
        );
        let inputs = NativeInputs {
            natoms,
            atom_types: &types,
            charge,
            coordinates: &coordinates,
            options: &scc,
            output_path: &output_path,
        };
        let status = self.native.calculate(&inputs, &mut outputs);

        if status != 0 {
            let report = scratch.drain().unwrap_or_else(|e| {
                warn!("Could not read the native report after failure: {}", e);
                String::new()
            });
            warn!("Native calculation failed with status {}", status);
            return Err(EngineError::Computation { status, report });
        }

        let report = scratch.drain()?;
        let gradient = rows_from_packed(&outputs.gradient, atoms)
            .map_err(|e| EngineError::Validation(format!("native gradient: {e}")))?
            .into_iter()
            .map(|[x, y, z]| Vector3::new(-x, -y, -z))
            .collect();

        let result = CalculationResult {
            status,
            report,
            energy: outputs.energy,
            charges: outputs.charges,
            dipole: Vector3::from(outputs.dipole),
            atomic_dipoles: DMatrix::from_column_slice(3, atoms, &outputs.atomic_dipoles),
            atomic_quadrupoles: DMatrix::from_column_slice(6, atoms, &outputs.atomic_quadrupoles),
            bond_orders: DMatrix::from_column_slice(atoms, atoms, &outputs.bond_orders),
            gradient,
        };
        info!(
            "GFN2 energy {:.10} Eh, max |gradient| {:.3e}",
            result.energy,
            result.max_gradient_component()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::request::DerivativeLevel;
    use crate::engine::native::testing::{FakeXtb, raw_gradient};
    use nalgebra::Point3;

    fn water() -> CalculationRequest {
        CalculationRequest {
            number_of_atoms: 3,
            derivative: DerivativeLevel::Gradient,
            charge: 0,
            spin: 1,
            atom_types: vec![8, 1, 1],
            coordinates: vec![
                Point3::new(0.0, 0.0, 0.221),
                Point3::new(0.0, 1.430, -0.885),
                Point3::new(0.0, -1.430, -0.885),
            ],
        }
    }

    fn client(fake: FakeXtb, dir: &Path) -> ForeignCalculationClient<FakeXtb> {
        ForeignCalculationClient::new(fake).with_scratch_dir(dir)
    }

    fn options() -> CalculationOptions {
        CalculationOptions::builder().build().unwrap()
    }

    #[test]
    fn mismatched_request_never_reaches_native_call() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::succeeding(-5.0, ""), dir.path());
        let mut request = water();
        request.coordinates.pop();

        let result = client.compute(&request, &options());

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(client.native().calls.get(), 0);
    }

    #[test]
    fn flat_geometry_with_wrong_length_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::succeeding(-5.0, ""), dir.path());

        let result = client.compute_geometry(
            &[1, 1],
            Geometry::Flat(&[0.0, 0.0, 0.0, 0.0, 0.0]),
            0.0,
            &options(),
        );

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(client.native().calls.get(), 0);
    }

    #[test]
    fn atom_type_outside_native_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::succeeding(-5.0, ""), dir.path());

        let result = client.compute_geometry(
            &[i64::from(c_int::MAX) + 1],
            Geometry::Rows(&[[0.0, 0.0, 0.0]]),
            0.0,
            &options(),
        );

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(client.native().calls.get(), 0);
    }

    #[test]
    fn successful_compute_negates_native_gradient() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::succeeding(-5.070544443, "normal termination\n"), dir.path());

        let result = client.compute(&water(), &options()).unwrap();

        assert_eq!(result.status, 0);
        assert_eq!(result.energy, -5.070544443);
        assert_eq!(result.report, "normal termination\n");
        assert_eq!(result.gradient.len(), 3);
        for (atom, g) in result.gradient.iter().enumerate() {
            for axis in 0..3 {
                assert_eq!(g[axis], -raw_gradient(3 * atom + axis));
            }
        }
    }

    #[test]
    fn coordinates_are_passed_column_major_with_charge_and_options() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::succeeding(-1.0, ""), dir.path());
        let mut request = water();
        request.charge = -1;
        let options = CalculationOptions::builder()
            .accuracy(0.5)
            .solvent("water")
            .build()
            .unwrap();

        client.compute(&request, &options).unwrap();

        let fake = client.native();
        assert_eq!(*fake.last_types.borrow(), vec![8, 1, 1]);
        assert_eq!(
            *fake.last_coordinates.borrow(),
            vec![0.0, 0.0, 0.0, 0.0, 1.430, -1.430, 0.221, -0.885, -0.885]
        );
        assert_eq!(fake.last_charge.get(), -1.0);
        let scc = fake.last_options.get().unwrap();
        assert_eq!(scc.acc, 0.5);
        assert_eq!(scc.solvent_name(), "water");
        assert!(scc.grad);
    }

    #[test]
    fn result_matrices_keep_native_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::succeeding(-1.0, ""), dir.path());

        let result = client.compute(&water(), &options()).unwrap();

        assert_eq!(result.charges.len(), 3);
        assert_eq!(result.dipole, Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(result.atomic_dipoles.shape(), (3, 3));
        assert_eq!(result.atomic_quadrupoles.shape(), (6, 3));
        assert_eq!(result.bond_orders.shape(), (3, 3));
        // Buffers are column-major: element (row, col) sits at col * rows + row.
        assert_eq!(result.atomic_dipoles[(1, 2)], 7.0);
        assert_eq!(result.atomic_quadrupoles[(5, 1)], -11.0);
        assert_eq!(result.bond_orders[(0, 0)], 0.0);
        assert_eq!(result.bond_orders[(0, 1)], 1.0);
    }

    #[test]
    fn failed_status_reports_status_and_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::failing(1, ""), dir.path());

        let error = client.compute(&water(), &options()).unwrap_err();

        assert!(error.to_string().contains("status is 1"));
        match &error {
            EngineError::Computation { status, report } => {
                assert_eq!(*status, 1);
                assert!(report.is_empty());
            }
            other => panic!("expected computation error, got {other:?}"),
        }
        let path = client.native().last_path.borrow().clone().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn failed_status_carries_native_report() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::failing(3, "SCC did not converge\n"), dir.path());

        let error = client.compute(&water(), &options()).unwrap_err();

        assert_eq!(error.report(), Some("SCC did not converge\n"));
    }

    #[test]
    fn scratch_file_is_removed_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::succeeding(-1.0, "report\n"), dir.path());

        client.compute(&water(), &options()).unwrap();

        let path = client.native().last_path.borrow().clone().unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_scratch_directory_is_a_scratch_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(FakeXtb::succeeding(-1.0, ""), &dir.path().join("missing"));

        let result = client.compute(&water(), &options());

        assert!(matches!(result, Err(EngineError::Scratch(_))));
        assert_eq!(client.native().calls.get(), 0);
    }
}
