use crate::core::io::error::FormatError;
use crate::core::io::request::RequestFile;
use crate::core::io::response::{ExternalResponse, ResponseFile};
use crate::core::io::traits::RecordFile;
use crate::core::models::request::CalculationRequest;
use crate::core::models::result::CalculationResult;
use crate::engine::client::ForeignCalculationClient;
use crate::engine::error::EngineError;
use crate::engine::native::NativeCalculator;
use crate::engine::options::CalculationOptions;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, instrument};

const BANNER: &str = "running g2xtb external interface";
const GEOMETRY_RULE: &str = "---------------------------------------";
const FORCE_RULE: &str = "----------------------------------------";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("error while loading the request: {0}")]
    Request(#[source] FormatError),
    #[error("error while computing through xtb: {0}")]
    Engine(#[from] EngineError),
    #[error("error while writing the response: {0}")]
    Response(#[source] FormatError),
    #[error("error while writing the message log: {0}")]
    Message(#[from] io::Error),
}

/// Runs one external-program cycle: read the request at `request_path`,
/// compute it, and write the response to `response_path`.
///
/// Progress and the native report go to `message`, the driver's message
/// file. Any error is also written there before it is returned.
#[instrument(skip_all, name = "external_workflow", fields(request = %request_path.display()))]
pub fn run<N: NativeCalculator>(
    client: &ForeignCalculationClient<N>,
    options: &CalculationOptions,
    request_path: &Path,
    response_path: &Path,
    message: &mut impl Write,
) -> Result<CalculationResult, WorkflowError> {
    writeln!(message, "{BANNER}")?;

    match run_cycle(client, options, request_path, response_path, message) {
        Ok(result) => {
            message.flush()?;
            Ok(result)
        }
        Err(e) => {
            error!("{}", e);
            if let WorkflowError::Engine(engine) = &e {
                if let Some(report) = engine.report().filter(|r| !r.is_empty()) {
                    let _ = write!(message, "{report}");
                }
            }
            let _ = writeln!(message, "{e}");
            let _ = message.flush();
            Err(e)
        }
    }
}

fn run_cycle<N: NativeCalculator>(
    client: &ForeignCalculationClient<N>,
    options: &CalculationOptions,
    request_path: &Path,
    response_path: &Path,
    message: &mut impl Write,
) -> Result<CalculationResult, WorkflowError> {
    let request = RequestFile::read_from_path(request_path, &()).map_err(WorkflowError::Request)?;
    info!(
        "Loaded request with {} atom(s), derivative {}",
        request.number_of_atoms, request.derivative
    );

    let verbose = options.print_level() > 0;
    if verbose {
        write_geometry(message, &request)?;
    }

    let result = client.compute(&request, options)?;

    writeln!(message, "{}", result.report)?;
    if verbose && request.derivative.requests_gradient() {
        write_gradient(message, &result)?;
    }

    let response = build_response(&request, &result).map_err(WorkflowError::Response)?;
    ResponseFile::write_to_path(&response, response_path).map_err(WorkflowError::Response)?;
    info!("Wrote response to {}", response_path.display());

    Ok(result)
}

/// Builds the record returned to the driver: energy, dipole and, when the
/// driver asked for it, the gradient.
pub fn build_response(
    request: &CalculationRequest,
    result: &CalculationResult,
) -> Result<ExternalResponse, FormatError> {
    let response = ExternalResponse::new(request.derivative, result.energy, request.number_of_atoms)
        .with_dipole(result.dipole);
    if request.derivative.requests_gradient() {
        response.with_gradient(result.gradient.clone())
    } else {
        Ok(response)
    }
}

// Positive values get a leading space so that columns line up with negatives.
fn signed(value: f64) -> String {
    if value.is_sign_negative() {
        format!("{value:.8}")
    } else {
        format!(" {value:.8}")
    }
}

fn write_geometry(message: &mut impl Write, request: &CalculationRequest) -> io::Result<()> {
    writeln!(message)?;
    writeln!(message, "Input geometry (charge={})", request.charge)?;
    writeln!(message, "{GEOMETRY_RULE}")?;
    writeln!(message, "               Coordinates (Bohr)")?;
    writeln!(message, "Z         X           Y           Z")?;
    writeln!(message, "{GEOMETRY_RULE}")?;
    for (atom_type, position) in request.atom_types.iter().zip(&request.coordinates) {
        writeln!(
            message,
            "{:<3} {} {} {}",
            atom_type,
            signed(position.x),
            signed(position.y),
            signed(position.z)
        )?;
    }
    writeln!(message, "{GEOMETRY_RULE}")?;
    writeln!(message)
}

fn write_gradient(message: &mut impl Write, result: &CalculationResult) -> io::Result<()> {
    writeln!(message)?;
    writeln!(message, "Output gradient")?;
    writeln!(message, "{FORCE_RULE}")?;
    writeln!(message, "             Forces (Hartree/Bohr)")?;
    writeln!(message, "           X           Y           Z")?;
    writeln!(message, "{FORCE_RULE}")?;
    for (index, g) in result.gradient.iter().enumerate() {
        writeln!(
            message,
            "{:<4} {} {} {}",
            index,
            signed(g.x),
            signed(g.y),
            signed(g.z)
        )?;
    }
    writeln!(message, "{FORCE_RULE}")?;
    writeln!(message)
}
