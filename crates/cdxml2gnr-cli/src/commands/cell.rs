use super::{upload_file, write_structure};
use crate::cli::CellArgs;
use crate::config::build_config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use cdxml2gnr::engine::progress::ProgressReporter;
use cdxml2gnr::workflows::session::Session;
use tracing::info;

pub fn run(args: CellArgs) -> Result<()> {
    let [id1, id2] = args.atoms[..] else {
        return Err(CliError::Argument(format!(
            "--atoms expects exactly two indices, got {}",
            args.atoms.len()
        )));
    };
    let config = build_config(&args.pipeline, false)?;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut session = Session::new(config).with_reporter(reporter);

    upload_file(&mut session, &args.input)?;
    session.select(Some(args.index))?;
    info!("Cutting periodic cell of fragment {} between atoms {} and {}", args.index, id1, id2);
    let structure = session.build_periodic_cell(id1, id2)?;

    write_structure(structure, &args.input, &args.output)?;
    println!(
        "✓ Periodic cell {} ({} atoms) written to: {}",
        structure.formula(),
        structure.len(),
        args.output.display()
    );
    Ok(())
}
