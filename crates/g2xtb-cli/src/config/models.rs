use g2xtb::engine::options::CalculationOptions;
use std::path::PathBuf;

/// Where to find the native library and where it may write.
#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySettings {
    pub path: PathBuf,
    pub symbol: String,
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub options: CalculationOptions,
    pub library: LibrarySettings,
}
