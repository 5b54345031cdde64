pub mod cell;
pub mod convert;
pub mod list;

use crate::error::{CliError, Result};
use cdxml2gnr::core::io::traits::StructureFile;
use cdxml2gnr::core::io::xyz::{XyzFile, XyzMetadata};
use cdxml2gnr::core::models::structure::Structure;
use cdxml2gnr::workflows::session::{Session, UploadedFile};
use std::path::Path;
use tracing::info;

/// Reads a sketch from disk and uploads it into `session`.
fn upload_file(session: &mut Session<'_>, input: &Path) -> Result<()> {
    info!("Loading sketch from {:?}", input);
    let content = std::fs::read(input).map_err(|e| CliError::FileParsing {
        path: input.to_path_buf(),
        source: e.into(),
    })?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    session.upload(&[UploadedFile::new(name, content)])?;
    Ok(())
}

fn write_structure(structure: &Structure, source: &Path, output: &Path) -> Result<()> {
    let mut metadata = XyzMetadata::default();
    if let Some(name) = source.file_name() {
        metadata
            .extra
            .insert("source".to_string(), name.to_string_lossy().into_owned());
    }
    XyzFile::write_to_path(structure, &metadata, output).map_err(|e| CliError::FileParsing {
        path: output.to_path_buf(),
        source: e.into(),
    })?;
    info!(
        "Wrote {} ({} atoms) to {:?}",
        structure.formula(),
        structure.len(),
        output
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const TWO_FRAGMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<CDXML><page id="1">
<fragment id="10">
<n id="1" p="100 100"/><n id="2" p="112.47 107.2"/><n id="3" p="112.47 121.6"/>
<n id="4" p="100 128.8"/><n id="5" p="87.53 121.6"/><n id="6" p="87.53 107.2"/>
<b B="1" E="2" Order="2"/><b B="2" E="3"/><b B="3" E="4" Order="2"/>
<b B="4" E="5"/><b B="5" E="6" Order="2"/><b B="6" E="1"/>
</fragment>
<fragment id="20">
<n id="21" p="0 0"/><n id="22" p="12.47 7.2"/><n id="23" p="24.94 0"/>
<n id="24" p="37.41 7.2"/><n id="25" p="49.88 0"/>
<b B="21" E="22" Order="2"/><b B="22" E="23"/><b B="23" E="24" Order="2"/><b B="24" E="25"/>
</fragment>
</page></CDXML>"#;
}
