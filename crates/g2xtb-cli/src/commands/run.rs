use crate::cli::RunArgs;
use crate::config::PartialConfig;
use crate::config::models::AppConfig;
use crate::error::Result;
use g2xtb::engine::client::ForeignCalculationClient;
use g2xtb::workflows;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, info};

pub fn run(args: RunArgs) -> Result<()> {
    debug!(
        "Gaussian layer '{}', unused files: {:?}, {:?}",
        args.layer, &args.fchk, &args.matrix_elements
    );

    let mut message = BufWriter::new(File::create(&args.message)?);

    let (client, config) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            let _ = writeln!(message, "error while preparing the calculation: {}", e);
            let _ = message.flush();
            return Err(e);
        }
    };

    info!("Invoking the external-program workflow...");
    let result = workflows::external::run(
        &client,
        &config.options,
        &args.input,
        &args.output,
        &mut message,
    )?;

    info!(
        "Workflow finished: energy {:.10} Eh written to {:?}",
        result.energy, &args.output
    );
    Ok(())
}

fn prepare(args: &RunArgs) -> Result<(ForeignCalculationClient, AppConfig)> {
    let partial_config = PartialConfig::load(args.library.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(args)?;

    info!("Loading xtb from {:?}", &config.library.path);
    let mut client = ForeignCalculationClient::load(&config.library.path, &config.library.symbol)?;
    if let Some(dir) = &config.library.scratch_dir {
        client = client.with_scratch_dir(dir);
    }
    Ok((client, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::error::CliError;
    use clap::Parser;
    use std::fs;
    use std::path::Path;

    fn run_args(dir: &Path, extra: &[&str]) -> RunArgs {
        let path = |name: &str| dir.join(name).to_str().unwrap().to_string();
        let mut argv: Vec<String> = vec!["g2xtb".into(), "run".into()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        argv.push("R".into());
        for name in ["input.EIn", "output.EOu", "message.txt", "x.fchk", "matel.dat"] {
            argv.push(path(name));
        }
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            other => panic!("Expected 'run' subcommand, got {:?}", other),
        }
    }

    #[test]
    fn missing_library_is_reported_in_message_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("input.EIn"), "1 0 0 1\n1 0.0 0.0 0.0\n").unwrap();
        let library = dir.path().join("libxtb-missing.so");
        let args = run_args(dir.path(), &["-L", library.to_str().unwrap()]);

        let result = run(args);

        assert!(matches!(result, Err(CliError::Engine(_))));
        let message = fs::read_to_string(dir.path().join("message.txt")).unwrap();
        assert!(message.starts_with("error while preparing the calculation:"));
        assert!(message.contains("libxtb-missing.so"));
        assert!(!dir.path().join("output.EOu").exists());
    }

    #[test]
    fn invalid_options_are_reported_in_message_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = run_args(dir.path(), &["-s", "seawater"]);

        let result = run(args);

        assert!(matches!(result, Err(CliError::Options(_))));
        let message = fs::read_to_string(dir.path().join("message.txt")).unwrap();
        assert!(message.contains("Unknown solvent 'seawater'"));
    }

    #[test]
    fn unwritable_message_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = run_args(dir.path(), &[]);
        args.message = dir.path().join("missing").join("message.txt");

        assert!(matches!(run(args), Err(CliError::Io(_))));
    }
}
