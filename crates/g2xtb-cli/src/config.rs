pub mod defaults;
pub mod models;

use crate::cli::{LibraryArgs, RunArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use defaults::DefaultsConfig;
use g2xtb::engine::options::CalculationOptions;
use models::{AppConfig, LibrarySettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialCalculationConfig {
    print_level: Option<i32>,
    parallel: Option<i32>,
    accuracy: Option<f64>,
    electronic_temperature: Option<f64>,
    max_iterations: Option<i32>,
    restart: Option<bool>,
    solvent: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialLibraryConfig {
    path: Option<PathBuf>,
    symbol: Option<String>,
    scratch_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    calculation: Option<PartialCalculationConfig>,
    library: Option<PartialLibraryConfig>,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads the configuration file if one was given, otherwise starts empty.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_with_cli(mut self, args: &RunArgs) -> Result<AppConfig> {
        self.apply_set_values(&args.set_values)?;

        let defaults = DefaultsConfig::default();
        let calc = self.calculation.take().unwrap_or_default();

        let mut builder = CalculationOptions::builder()
            .print_level(
                args.print_level
                    .or(calc.print_level)
                    .unwrap_or(defaults.print_level),
            )
            .parallel(args.parallel.or(calc.parallel).unwrap_or(defaults.parallel))
            .accuracy(args.accuracy.or(calc.accuracy).unwrap_or(defaults.accuracy))
            .electronic_temperature(
                args.temperature
                    .or(calc.electronic_temperature)
                    .unwrap_or(defaults.electronic_temperature),
            )
            .max_iterations(
                args.max_iterations
                    .or(calc.max_iterations)
                    .unwrap_or(defaults.max_iterations),
            )
            .restart(args.restart.choice().or(calc.restart).unwrap_or(false));

        if let Some(solvent) = args.solvent.clone().or(calc.solvent) {
            builder = builder.solvent(solvent);
        }
        let options = builder.build()?;

        let mut library = self.merge_library(&args.library)?;
        if let Some(dir) = &args.scratch_dir {
            library.scratch_dir = Some(dir.clone());
        }
        if let Some(dir) = &library.scratch_dir {
            if !dir.is_dir() {
                return Err(CliError::Config(format!(
                    "Scratch directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(AppConfig { options, library })
    }

    /// Resolves the library settings alone, for commands that never compute.
    pub fn merge_library(&mut self, args: &LibraryArgs) -> Result<LibrarySettings> {
        let defaults = DefaultsConfig::default();
        let lib = self.library.take().unwrap_or_default();

        let symbol = args
            .symbol
            .clone()
            .or(lib.symbol)
            .unwrap_or(defaults.symbol);
        if symbol.trim().is_empty() {
            return Err(CliError::Config(
                "`library.symbol` cannot be empty.".to_string(),
            ));
        }

        Ok(LibrarySettings {
            path: args
                .library
                .clone()
                .or(lib.path)
                .unwrap_or_else(|| PathBuf::from(defaults.library)),
            symbol,
            scratch_dir: lib.scratch_dir,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        if set_values.is_empty() {
            return Ok(());
        }
        for kv_pair in set_values {
            let (key, value_str) =
                parser::parse_key_value(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;
            let config_err = |e: parser::ParseError| CliError::Config(e.to_string());

            match key {
                "calculation.print-level" => {
                    self.calculation_mut().print_level =
                        Some(parser::parse_value(key, value_str, "integer").map_err(config_err)?);
                }
                "calculation.parallel" => {
                    self.calculation_mut().parallel =
                        Some(parser::parse_value(key, value_str, "integer").map_err(config_err)?);
                }
                "calculation.accuracy" => {
                    self.calculation_mut().accuracy =
                        Some(parser::parse_value(key, value_str, "float").map_err(config_err)?);
                }
                "calculation.electronic-temperature" => {
                    self.calculation_mut().electronic_temperature =
                        Some(parser::parse_value(key, value_str, "float").map_err(config_err)?);
                }
                "calculation.max-iterations" => {
                    self.calculation_mut().max_iterations =
                        Some(parser::parse_value(key, value_str, "integer").map_err(config_err)?);
                }
                "calculation.restart" => {
                    self.calculation_mut().restart =
                        Some(parser::parse_value(key, value_str, "boolean").map_err(config_err)?);
                }
                "calculation.solvent" => {
                    self.calculation_mut().solvent = Some(value_str.to_string());
                }
                "library.path" => {
                    self.library_mut().path = Some(PathBuf::from(value_str));
                }
                "library.symbol" => {
                    self.library_mut().symbol = Some(value_str.to_string());
                }
                "library.scratch-dir" => {
                    self.library_mut().scratch_dir = Some(PathBuf::from(value_str));
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn calculation_mut(&mut self) -> &mut PartialCalculationConfig {
        self.calculation.get_or_insert_with(Default::default)
    }

    fn library_mut(&mut self) -> &mut PartialLibraryConfig {
        self.library.get_or_insert_with(Default::default)
    }
}
