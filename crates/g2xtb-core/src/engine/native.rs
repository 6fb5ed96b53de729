use super::error::EngineError;
use super::options::SccOptions;
use libloading::Library;
use std::ffi::{CStr, OsStr, c_char, c_double, c_int};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY: &str = "libxtb.dylib";
#[cfg(target_os = "windows")]
pub const DEFAULT_LIBRARY: &str = "xtb.dll";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const DEFAULT_LIBRARY: &str = "libxtb.so";

pub const DEFAULT_SYMBOL: &str = "GFN2_calculation";

/// Signature of the GFN2 entry point exported by the xtb library.
///
/// Every argument is passed by address. Coordinates are column-major
/// (all X, then all Y, then all Z); `grad` and `dipm` are Fortran `(3, N)`
/// arrays, `qp` is `(6, N)` and `wbo` is `(N, N)`.
pub type Gfn2Calculation = unsafe extern "C" fn(
    natoms: *const c_int,
    attyp: *const c_int,
    charge: *const c_double,
    coord: *const c_double,
    opt: *const SccOptions,
    output: *const c_char,
    energy: *mut c_double,
    grad: *mut c_double,
    dipole: *mut c_double,
    q: *mut c_double,
    dipm: *mut c_double,
    qp: *mut c_double,
    wbo: *mut c_double,
) -> c_int;

/// Inputs of one native call, already in native widths and layouts.
#[derive(Debug)]
pub struct NativeInputs<'a> {
    pub natoms: c_int,
    pub atom_types: &'a [c_int],
    pub charge: c_double,
    pub coordinates: &'a [c_double],
    pub options: &'a SccOptions,
    pub output_path: &'a CStr,
}

/// Output buffers of one native call, sized for `natoms` and zero-initialized.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeOutputs {
    pub energy: c_double,
    pub gradient: Vec<c_double>,
    pub dipole: [c_double; 3],
    pub charges: Vec<c_double>,
    pub atomic_dipoles: Vec<c_double>,
    pub atomic_quadrupoles: Vec<c_double>,
    pub bond_orders: Vec<c_double>,
}

impl NativeOutputs {
    pub fn zeroed(atoms: usize) -> Self {
        Self {
            energy: 0.0,
            gradient: vec![0.0; 3 * atoms],
            dipole: [0.0; 3],
            charges: vec![0.0; atoms],
            atomic_dipoles: vec![0.0; 3 * atoms],
            atomic_quadrupoles: vec![0.0; 6 * atoms],
            bond_orders: vec![0.0; atoms * atoms],
        }
    }
}

/// Something that can run a GFN2 calculation.
///
/// Implementors must only write within the provided output buffers and
/// return the native status code (0 on success).
pub trait NativeCalculator {
    fn calculate(&self, inputs: &NativeInputs<'_>, outputs: &mut NativeOutputs) -> c_int;
}

/// A loaded xtb library with its resolved entry point.
///
/// The library stays loaded for as long as this handle lives; dropping it
/// unloads the library.
pub struct XtbLibrary {
    entry: Gfn2Calculation,
    path: PathBuf,
    _library: Library,
}

impl XtbLibrary {
    pub fn load<P: AsRef<OsStr>>(path: P, symbol: &str) -> Result<Self, EngineError> {
        let path = PathBuf::from(path.as_ref());
        debug!("Attempting to load xtb from: {:?}", &path);

        // SAFETY: loading runs the library's initializers; the xtb library has
        // no initialization side effects beyond its own state.
        let library = unsafe { Library::new(&path) }.map_err(|source| EngineError::Link {
            target: format!("library '{}'", path.display()),
            source,
        })?;

        // SAFETY: the symbol is declared with the signature of `Gfn2Calculation`
        // in the library's C header; a mismatch here is undefined behavior.
        let entry = unsafe { library.get::<Gfn2Calculation>(symbol.as_bytes()) }
            .map(|symbol| *symbol)
            .map_err(|source| EngineError::Link {
                target: format!("symbol '{}' from '{}'", symbol, path.display()),
                source,
            })?;

        info!("Loaded xtb entry point '{}' from {}", symbol, path.display());
        Ok(Self {
            entry,
            path,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for XtbLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XtbLibrary").field("path", &self.path).finish()
    }
}

impl NativeCalculator for XtbLibrary {
    fn calculate(&self, inputs: &NativeInputs<'_>, outputs: &mut NativeOutputs) -> c_int {
        let atoms = inputs.atom_types.len();
        debug_assert_eq!(inputs.natoms as usize, atoms);
        debug_assert_eq!(inputs.coordinates.len(), 3 * atoms);
        debug_assert_eq!(outputs.bond_orders.len(), atoms * atoms);

        // SAFETY: every buffer is sized for `natoms` atoms by the client, the
        // pointers stay valid for the duration of the call and the library
        // keeps no reference to them afterwards.
        unsafe {
            (self.entry)(
                &inputs.natoms,
                inputs.atom_types.as_ptr(),
                &inputs.charge,
                inputs.coordinates.as_ptr(),
                inputs.options,
                inputs.output_path.as_ptr(),
                &mut outputs.energy,
                outputs.gradient.as_mut_ptr(),
                outputs.dipole.as_mut_ptr(),
                outputs.charges.as_mut_ptr(),
                outputs.atomic_dipoles.as_mut_ptr(),
                outputs.atomic_quadrupoles.as_mut_ptr(),
                outputs.bond_orders.as_mut_ptr(),
            )
        }
    }
}
