use crate::cli::CheckArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use g2xtb::engine::native::XtbLibrary;
use tracing::info;

pub fn run(args: CheckArgs) -> Result<()> {
    let mut partial_config = PartialConfig::load(args.library.config.as_deref())?;
    let settings = partial_config.merge_library(&args.library)?;

    info!("Checking xtb library at {:?}", &settings.path);
    let library = XtbLibrary::load(&settings.path, &settings.symbol)?;

    println!(
        "✓ Resolved '{}' from {}",
        settings.symbol,
        library.path().display()
    );
    Ok(())
}
