use super::{upload_file, write_structure};
use crate::cli::ConvertArgs;
use crate::config::build_config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use cdxml2gnr::engine::progress::ProgressReporter;
use cdxml2gnr::workflows::session::Session;
use tracing::info;

pub fn run(args: ConvertArgs) -> Result<()> {
    let config = build_config(&args.pipeline, args.no_hydrogens)?;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut session = Session::new(config).with_reporter(reporter);

    upload_file(&mut session, &args.input)?;
    info!("Converting fragment {}", args.index);
    let structure = session
        .select(Some(args.index))?
        .ok_or_else(|| CliError::Argument(format!("fragment {} produced no structure", args.index)))?;

    write_structure(structure, &args.input, &args.output)?;
    println!(
        "✓ Fragment {} ({}) written to: {}",
        args.index,
        structure.formula(),
        args.output.display()
    );
    Ok(())
}
