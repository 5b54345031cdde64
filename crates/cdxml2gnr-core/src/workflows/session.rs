use super::convert;
use crate::core::io::cdxml::{SketchDocument, has_cdxml_extension, parse_fragment};
use crate::core::models::molecule::Molecule;
use crate::core::models::structure::Structure;
use crate::engine::config::PipelineConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use tracing::{info, instrument, warn};

/// A file handed over by an upload control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// One parsed fragment of the current upload.
#[derive(Debug, Clone)]
pub struct FragmentEntry {
    pub index: usize,
    pub formula: String,
    pub molecule: Molecule,
}

impl FragmentEntry {
    /// Selection label in the form `"index: formula"`, e.g. `"0: C6H6"`.
    pub fn label(&self) -> String {
        format!("{}: {}", self.index, self.formula)
    }
}

/// Receives the active structure every time it changes, `None` when cleared.
pub type StructureObserver = Box<dyn Fn(Option<&Structure>) + Send + Sync>;

/// The upload / select / periodic-cell flow of an interactive front end.
///
/// A session owns everything derived from the current upload: the parsed
/// molecules, the selected index and the active structure. A new upload always
/// clears all of it, whether or not the upload succeeds. Every change of the
/// active structure is published to the observer, with `None` published before
/// any new structure is derived.
pub struct Session<'a> {
    config: PipelineConfig,
    reporter: ProgressReporter<'a>,
    observer: Option<StructureObserver>,
    upload: Option<SketchDocument>,
    molecules: Vec<FragmentEntry>,
    selection: Option<usize>,
    structure: Option<Structure>,
}

impl Default for Session<'_> {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl<'a> Session<'a> {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            reporter: ProgressReporter::new(),
            observer: None,
            upload: None,
            molecules: Vec::new(),
            selection: None,
            structure: None,
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter<'a>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_observer(mut self, observer: StructureObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loads a new sketch document and parses every fragment in it.
    ///
    /// The first file with a `.cdxml` extension is used; any other files are
    /// ignored. Parsing is all-or-nothing: if one fragment fails, no molecule of
    /// this upload is kept.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnsupportedFormat`] if no file has the `.cdxml` extension.
    /// - [`EngineError::NoFragmentsFound`] if the document contains no fragment.
    /// - [`EngineError::ParseFailure`] naming the first fragment that failed to parse.
    #[instrument(skip_all, name = "session_upload", fields(files = files.len()))]
    pub fn upload(&mut self, files: &[UploadedFile]) -> Result<&[FragmentEntry], EngineError> {
        self.clear();

        let Some(file) = files.iter().find(|f| has_cdxml_extension(&f.name)) else {
            return Err(EngineError::UnsupportedFormat {
                file_names: files.iter().map(|f| f.name.clone()).collect(),
            });
        };
        for skipped in files.iter().filter(|f| !std::ptr::eq(*f, file)) {
            warn!(file = %skipped.name, "Ignoring additional uploaded file.");
        }

        let document = SketchDocument::from_bytes(&file.name, &file.content);
        let fragments = document.fragments();
        if fragments.is_empty() {
            return Err(EngineError::NoFragmentsFound);
        }

        let molecules = fragments
            .iter()
            .enumerate()
            .map(|(index, fragment)| {
                let molecule = parse_fragment(fragment)
                    .map_err(|source| EngineError::ParseFailure { index, source })?;
                Ok(FragmentEntry {
                    index,
                    formula: molecule.formula(),
                    molecule,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        info!(
            file = %document.name,
            fragments = molecules.len(),
            "Sketch document loaded."
        );
        self.upload = Some(document);
        self.molecules = molecules;
        Ok(&self.molecules)
    }

    /// Selection labels for the current molecule list.
    pub fn options(&self) -> Vec<String> {
        self.molecules.iter().map(FragmentEntry::label).collect()
    }

    pub fn molecules(&self) -> &[FragmentEntry] {
        &self.molecules
    }

    /// Selects a molecule and derives its scaled structure.
    ///
    /// `None` clears the active structure. On success the retained upload buffer
    /// is released, since every molecule has already been parsed from it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSelection`] for an index outside the molecule
    /// list, or the conversion error. In both cases no structure is active
    /// afterwards, and later selections are unaffected.
    #[instrument(skip_all, name = "session_select", fields(selection = ?selection))]
    pub fn select(&mut self, selection: Option<usize>) -> Result<Option<&Structure>, EngineError> {
        self.selection = None;
        self.structure = None;
        self.publish();

        let Some(index) = selection else {
            return Ok(None);
        };
        let entry = self
            .molecules
            .get(index)
            .ok_or(EngineError::InvalidSelection {
                index,
                available: self.molecules.len(),
            })?;
        let structure = convert::fragment_to_structure(&entry.molecule, &self.config, &self.reporter)?;

        self.selection = Some(index);
        self.structure = Some(structure);
        self.upload = None;
        self.publish();
        Ok(self.structure.as_ref())
    }

    /// Re-cuts the selected molecule into a periodic cell between two of its atoms.
    ///
    /// Atom indices count the molecule's atoms in document order, without
    /// hydrogens added on selection. The cell replaces the active structure.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoSelection`] if no molecule is selected, otherwise the
    /// errors of [`convert::periodic_structure`]. On error the active structure is kept.
    #[instrument(skip_all, name = "session_periodic_cell", fields(id1, id2))]
    pub fn build_periodic_cell(&mut self, id1: usize, id2: usize) -> Result<&Structure, EngineError> {
        let entry = self
            .selection
            .and_then(|index| self.molecules.get(index))
            .ok_or(EngineError::NoSelection)?;
        let cell =
            convert::periodic_structure(&entry.molecule, id1, id2, &self.config, &self.reporter)?;

        let structure = &*self.structure.insert(cell.structure);
        if let Some(observer) = &self.observer {
            observer(Some(structure));
        }
        Ok(structure)
    }

    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    pub fn selection(&self) -> Option<usize> {
        self.selection
    }

    /// Whether the raw upload is still held in memory.
    pub fn has_pending_upload(&self) -> bool {
        self.upload.is_some()
    }

    fn clear(&mut self) {
        self.upload = None;
        self.molecules.clear();
        self.selection = None;
        self.structure = None;
        self.publish();
    }

    fn publish(&self) {
        if let Some(observer) = &self.observer {
            observer(self.structure.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::cdxml::tests::{BENZENE_FRAGMENT, two_fragment_document};
    use crate::core::models::element::Element;
    use std::sync::{Arc, Mutex};

    const ZIGZAG_FRAGMENT: &str = r#"<fragment id="1">
<n id="2" p="0 0"/>
<n id="3" p="12.47 7.2"/>
<n id="4" p="24.94 0"/>
<n id="5" p="37.41 7.2"/>
<n id="6" p="49.88 0"/>
<b B="2" E="3" Order="2"/>
<b B="3" E="4"/>
<b B="4" E="5" Order="2"/>
<b B="5" E="6"/>
</fragment>"#;

    fn upload_of(name: &str, content: &str) -> Vec<UploadedFile> {
        vec![UploadedFile::new(name, content.as_bytes())]
    }

    fn recording_session() -> (Session<'static>, Arc<Mutex<Vec<Option<usize>>>>) {
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        let session = Session::default().with_observer(Box::new(move |structure| {
            sink.lock().unwrap().push(structure.map(Structure::len));
        }));
        (session, published)
    }

    #[test]
    fn upload_lists_fragments_with_formulas() {
        let mut session = Session::default();
        let entries = session
            .upload(&upload_of("ribbons.cdxml", &two_fragment_document()))
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(session.options(), vec!["0: C6H6", "1: C2H4"]);
        assert!(session.has_pending_upload());
        assert!(session.structure().is_none());
    }

    #[test]
    fn selecting_benzene_publishes_c6h6_structure() {
        let (mut session, published) = recording_session();
        session
            .upload(&upload_of("ribbons.cdxml", &two_fragment_document()))
            .unwrap();

        let structure = session.select(Some(0)).unwrap().unwrap();
        assert_eq!(structure.count(Element::CARBON), 6);
        assert_eq!(structure.count(Element::HYDROGEN), 6);
        assert_eq!(structure.cell().unwrap().vectors().len(), 3);
        assert_eq!(session.selection(), Some(0));
        assert!(!session.has_pending_upload());

        assert!(session.select(None).unwrap().is_none());
        assert!(session.structure().is_none());

        assert_eq!(
            *published.lock().unwrap(),
            vec![None, None, Some(12), None]
        );
    }

    #[test]
    fn invalid_selection_leaves_no_structure_and_is_recoverable() {
        let mut session = Session::default();
        session
            .upload(&upload_of("ribbons.cdxml", &two_fragment_document()))
            .unwrap();
        session.select(Some(0)).unwrap();

        assert!(matches!(
            session.select(Some(5)),
            Err(EngineError::InvalidSelection {
                index: 5,
                available: 2
            })
        ));
        assert!(session.structure().is_none());
        assert_eq!(session.selection(), None);

        let ethylene = session.select(Some(1)).unwrap().unwrap();
        assert_eq!(ethylene.formula(), "C2H4");
    }

    #[test]
    fn reselecting_gives_identical_structure() {
        let mut session = Session::default();
        session
            .upload(&upload_of("ribbons.cdxml", &two_fragment_document()))
            .unwrap();
        let first = session.select(Some(0)).unwrap().cloned();
        let second = session.select(Some(0)).unwrap().cloned();
        assert_eq!(first, second);
    }

    #[test]
    fn upload_errors_clear_previous_state() {
        let mut session = Session::default();
        session
            .upload(&upload_of("ribbons.cdxml", &two_fragment_document()))
            .unwrap();
        session.select(Some(0)).unwrap();

        assert!(matches!(
            session.upload(&upload_of("notes.txt", "<fragment/>")),
            Err(EngineError::UnsupportedFormat { .. })
        ));
        assert!(session.molecules().is_empty());
        assert!(session.structure().is_none());
        assert!(session.options().is_empty());

        assert!(matches!(
            session.upload(&upload_of("empty.cdxml", "<CDXML><page/></CDXML>")),
            Err(EngineError::NoFragmentsFound)
        ));

        let broken = format!("{BENZENE_FRAGMENT}<fragment><n id=\"1\"/>/fragment>");
        assert!(matches!(
            session.upload(&upload_of("broken.cdxml", &broken)),
            Err(EngineError::ParseFailure { index: 1, .. })
        ));
        assert!(session.molecules().is_empty());
        assert!(!session.has_pending_upload());
    }

    #[test]
    fn first_cdxml_file_wins() {
        let mut session = Session::default();
        let files = vec![
            UploadedFile::new("readme.txt", "not a sketch"),
            UploadedFile::new("ethylene.CDXML", two_fragment_document()),
            UploadedFile::new("other.cdxml", BENZENE_FRAGMENT),
        ];
        session.upload(&files).unwrap();
        assert_eq!(session.options().len(), 2);
    }

    #[test]
    fn periodic_cell_requires_a_selection() {
        let mut session = Session::default();
        session
            .upload(&upload_of("chain.cdxml", ZIGZAG_FRAGMENT))
            .unwrap();
        assert!(matches!(
            session.build_periodic_cell(0, 2),
            Err(EngineError::NoSelection)
        ));
    }

    #[test]
    fn periodic_cell_replaces_active_structure() {
        let (mut session, published) = recording_session();
        session
            .upload(&upload_of("chain.cdxml", ZIGZAG_FRAGMENT))
            .unwrap();
        session.select(Some(0)).unwrap();

        let cell = session.build_periodic_cell(0, 2).unwrap();
        assert_eq!(cell.formula(), "C2H2");
        let repeat = 24.94 * 1.4313333333 / 14.4;
        let a = cell.cell().unwrap().lengths().x;
        assert!((a - repeat).abs() < 1e-3, "repeat length {a}");

        assert_eq!(published.lock().unwrap().last(), Some(&Some(4)));

        assert!(matches!(
            session.build_periodic_cell(0, 17),
            Err(EngineError::AtomIndexOutOfRange { index: 17, .. })
        ));
        assert_eq!(session.structure().map(Structure::len), Some(4));
    }
}
