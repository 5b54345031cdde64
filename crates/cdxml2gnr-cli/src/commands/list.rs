use super::upload_file;
use crate::cli::ListArgs;
use crate::error::Result;
use cdxml2gnr::workflows::session::Session;

pub fn run(args: ListArgs) -> Result<()> {
    for label in list_fragments(&args)? {
        println!("{}", label);
    }
    Ok(())
}

fn list_fragments(args: &ListArgs) -> Result<Vec<String>> {
    let mut session = Session::default();
    upload_file(&mut session, &args.input)?;
    Ok(session.options())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::TWO_FRAGMENTS;
    use crate::error::CliError;
    use cdxml2gnr::engine::error::EngineError;

    #[test]
    fn lists_every_fragment_with_its_formula() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ribbons.cdxml");
        std::fs::write(&input, TWO_FRAGMENTS).unwrap();
        let labels = list_fragments(&ListArgs { input }).unwrap();
        assert_eq!(labels, vec!["0: C6H6", "1: C5H8"]);
    }

    #[test]
    fn rejects_non_cdxml_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ribbons.mol");
        std::fs::write(&input, TWO_FRAGMENTS).unwrap();
        assert!(matches!(
            list_fragments(&ListArgs { input }),
            Err(CliError::Core(EngineError::UnsupportedFormat { .. }))
        ));
    }

    #[test]
    fn missing_input_is_a_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.cdxml");
        assert!(matches!(
            list_fragments(&ListArgs { input }),
            Err(CliError::FileParsing { .. })
        ));
    }
}
