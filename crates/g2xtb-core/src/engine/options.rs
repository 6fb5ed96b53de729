use phf::{Set, phf_set};
use std::ffi::{c_char, c_double, c_int};
use thiserror::Error;

/// Size of the solvent buffer in the native options record, terminator included.
pub const SOLVENT_BUFFER_LEN: usize = 20;
/// Longest solvent name that fits in the native record.
pub const MAX_SOLVENT_NAME_LEN: usize = SOLVENT_BUFFER_LEN - 1;
/// Solvent name understood by the library as "gas phase".
pub const NO_SOLVENT: &str = "none";

#[rustfmt::skip]
static KNOWN_SOLVENTS: Set<&'static str> = phf_set! {
    "acetone", "acetonitrile", "benzene", "ch2cl2", "chcl3", "cs2",
    "dmf", "dmso", "ether", "h2o", "water", "methanol", "n-hexane",
    "thf", "toluene",
};

/// Names accepted for the implicit (GBSA) solvent, sorted.
pub fn known_solvents() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = KNOWN_SOLVENTS.iter().copied().collect();
    names.sort_unstable();
    names
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum OptionsError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
    #[error("Solvent name '{0}' is longer than {max} characters", max = MAX_SOLVENT_NAME_LEN)]
    SolventNameTooLong(String),
    #[error("Unknown solvent '{0}' (run `g2xtb solvents` for the accepted names)")]
    UnknownSolvent(String),
}

/// Normalizes a solvent name; `"none"` (any case) maps to `None`.
///
/// Names longer than [`MAX_SOLVENT_NAME_LEN`] are rejected rather than truncated.
pub fn validate_solvent(name: &str) -> Result<Option<String>, OptionsError> {
    let normalized = name.trim().to_ascii_lowercase();
    if normalized.chars().count() > MAX_SOLVENT_NAME_LEN {
        return Err(OptionsError::SolventNameTooLong(name.to_string()));
    }
    if normalized == NO_SOLVENT {
        return Ok(None);
    }
    if !KNOWN_SOLVENTS.contains(normalized.as_str()) {
        return Err(OptionsError::UnknownSolvent(name.to_string()));
    }
    Ok(Some(normalized))
}

/// Validated settings for one GFN2 calculation.
///
/// Only [`CalculationOptionsBuilder::build`] creates non-default values, so
/// every instance satisfies the documented ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOptions {
    print_level: i32,
    parallel: i32,
    accuracy: f64,
    electronic_temperature: f64,
    compute_gradient: bool,
    restart: bool,
    max_iterations: i32,
    solvent: Option<String>,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            print_level: 2,
            parallel: 0,
            accuracy: 1.0,
            electronic_temperature: 300.0,
            compute_gradient: true,
            restart: false,
            max_iterations: 250,
            solvent: None,
        }
    }
}

impl CalculationOptions {
    pub fn builder() -> CalculationOptionsBuilder {
        CalculationOptionsBuilder::new()
    }

    pub fn print_level(&self) -> i32 {
        self.print_level
    }
    pub fn parallel(&self) -> i32 {
        self.parallel
    }
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }
    /// Electronic temperature in Kelvin.
    pub fn electronic_temperature(&self) -> f64 {
        self.electronic_temperature
    }
    pub fn compute_gradient(&self) -> bool {
        self.compute_gradient
    }
    pub fn restart(&self) -> bool {
        self.restart
    }
    pub fn max_iterations(&self) -> i32 {
        self.max_iterations
    }
    pub fn solvent(&self) -> Option<&str> {
        self.solvent.as_deref()
    }
}

#[derive(Default, Debug, Clone)]
pub struct CalculationOptionsBuilder {
    print_level: Option<i32>,
    parallel: Option<i32>,
    accuracy: Option<f64>,
    electronic_temperature: Option<f64>,
    compute_gradient: Option<bool>,
    restart: Option<bool>,
    max_iterations: Option<i32>,
    solvent: Option<String>,
}

impl CalculationOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_level(mut self, level: i32) -> Self {
        self.print_level = Some(level);
        self
    }
    /// Thread-count hint forwarded to the library; 0 lets it decide.
    pub fn parallel(mut self, threads: i32) -> Self {
        self.parallel = Some(threads);
        self
    }
    pub fn accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
    pub fn electronic_temperature(mut self, kelvin: f64) -> Self {
        self.electronic_temperature = Some(kelvin);
        self
    }
    pub fn compute_gradient(mut self, enabled: bool) -> Self {
        self.compute_gradient = Some(enabled);
        self
    }
    pub fn restart(mut self, enabled: bool) -> Self {
        self.restart = Some(enabled);
        self
    }
    pub fn max_iterations(mut self, iterations: i32) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn solvent(mut self, name: impl Into<String>) -> Self {
        self.solvent = Some(name.into());
        self
    }

    pub fn build(self) -> Result<CalculationOptions, OptionsError> {
        let defaults = CalculationOptions::default();

        let print_level = self.print_level.unwrap_or(defaults.print_level);
        if print_level < 0 {
            return Err(invalid("print_level", "must not be negative"));
        }
        let parallel = self.parallel.unwrap_or(defaults.parallel);
        if parallel < 0 {
            return Err(invalid("parallel", "must not be negative"));
        }
        let accuracy = self.accuracy.unwrap_or(defaults.accuracy);
        if !(accuracy.is_finite() && accuracy > 0.0) {
            return Err(invalid("accuracy", "must be a positive number"));
        }
        let electronic_temperature = self
            .electronic_temperature
            .unwrap_or(defaults.electronic_temperature);
        if !(electronic_temperature.is_finite() && electronic_temperature > 0.0) {
            return Err(invalid(
                "electronic_temperature",
                "must be a positive temperature in Kelvin",
            ));
        }
        let max_iterations = self.max_iterations.unwrap_or(defaults.max_iterations);
        if max_iterations <= 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        let solvent = match self.solvent {
            Some(name) => validate_solvent(&name)?,
            None => None,
        };

        Ok(CalculationOptions {
            print_level,
            parallel,
            accuracy,
            electronic_temperature,
            compute_gradient: self.compute_gradient.unwrap_or(defaults.compute_gradient),
            restart: self.restart.unwrap_or(defaults.restart),
            max_iterations,
            solvent,
        })
    }
}

fn invalid(name: &'static str, reason: &str) -> OptionsError {
    OptionsError::InvalidValue {
        name,
        reason: reason.to_string(),
    }
}

/// The options record read by `GFN2_calculation`.
///
/// Field order and widths are part of the native ABI and must match the
/// library's `bind(C)` type exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SccOptions {
    pub prlevel: c_int,
    pub parallel: c_int,
    pub acc: c_double,
    pub etemp: c_double,
    pub grad: bool,
    pub restart: bool,
    pub maxiter: c_int,
    pub solvent: [c_char; SOLVENT_BUFFER_LEN],
}

impl SccOptions {
    /// The solvent buffer up to its NUL terminator.
    pub fn solvent_name(&self) -> String {
        self.solvent
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8 as char)
            .collect()
    }
}

impl From<&CalculationOptions> for SccOptions {
    fn from(options: &CalculationOptions) -> Self {
        let mut solvent = [0 as c_char; SOLVENT_BUFFER_LEN];
        let name = options.solvent().unwrap_or(NO_SOLVENT);
        // Validated names are ASCII and at most MAX_SOLVENT_NAME_LEN long.
        for (slot, byte) in solvent
            .iter_mut()
            .zip(name.bytes().take(MAX_SOLVENT_NAME_LEN))
        {
            *slot = byte as c_char;
        }

        Self {
            prlevel: options.print_level,
            parallel: options.parallel,
            acc: options.accuracy,
            etemp: options.electronic_temperature,
            grad: options.compute_gradient,
            restart: options.restart,
            maxiter: options.max_iterations,
            solvent,
        }
    }
}
