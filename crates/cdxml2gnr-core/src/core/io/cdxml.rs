//! ChemDraw CDXML sketches.
//!
//! A CDXML document may hold several independent drawings. Each one is a
//! `<fragment>` element containing `<n>` (node) and `<b>` (bond) children.
//! Extraction is deliberately textual: [`extract_fragments`] pulls fragment
//! substrings out with a non-greedy pattern, and [`parse_fragment`] then turns a
//! single reconstructed fragment into a [`Molecule`].

use crate::core::models::atom::SketchAtom;
use crate::core::models::element::{Element, ElementError};
use crate::core::models::ids::AtomId;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use quick_xml::Reader;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

pub const CDXML_EXTENSION: &str = "cdxml";

const DEFAULT_ELEMENT: u32 = 6;
const EXTERNAL_CONNECTION_POINT: &str = "ExternalConnectionPoint";

static FRAGMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<fragment(.*?)/fragment").expect("fragment pattern is a valid regex")
});

#[derive(Debug, Error)]
pub enum CdxmlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
    #[error("Malformed attribute: {0}")]
    Attribute(#[from] AttrError),
    #[error("Document is not a <fragment> element")]
    NotAFragment,
    #[error("Fragment ends before all elements are closed")]
    UnexpectedEof,
    #[error("Invalid value '{value}' for attribute '{name}'")]
    InvalidAttribute { name: &'static str, value: String },
    #[error("Node {id:?}: {source}")]
    Element {
        id: Option<u32>,
        #[source]
        source: ElementError,
    },
    #[error("Node {id:?} has neither 'p' nor 'xyz' coordinates")]
    MissingCoordinates { id: Option<u32> },
    #[error("Duplicate node id {0}")]
    DuplicateNodeId(u32),
    #[error("Bond references unknown node id {0}")]
    UnknownBondAtom(u32),
    #[error("Bond is missing its '{0}' attribute")]
    IncompleteBond(&'static str),
    #[error("Fragment contains no atoms")]
    Empty,
}

/// An uploaded or on-disk CDXML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchDocument {
    pub name: String,
    pub content: String,
}

impl SketchDocument {
    /// Wraps raw document bytes. Invalid UTF-8 sequences are replaced rather than
    /// rejected; they cannot occur inside the fragment markup itself.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            content: String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Reads a CDXML document from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, CdxmlError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_bytes(&name, &bytes))
    }

    pub fn fragments(&self) -> Vec<String> {
        extract_fragments(&self.content)
    }
}

/// Returns `true` if `file_name` carries the CDXML extension (case-insensitive).
pub fn has_cdxml_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CDXML_EXTENSION))
}

/// Extracts every `<fragment ... /fragment>` section of a document, in document order.
///
/// Matching is textual and non-greedy, so this never fails: a malformed document,
/// or one without fragments, simply yields an empty vector. Each returned string is
/// a standalone fragment document ready for [`parse_fragment`].
pub fn extract_fragments(document: &str) -> Vec<String> {
    FRAGMENT_PATTERN
        .captures_iter(document)
        .map(|caps| format!("<fragment{}/fragment>", &caps[1]))
        .collect()
}

#[derive(Debug, Default)]
struct RawNode {
    id: Option<u32>,
    element: Option<u32>,
    p: Option<String>,
    xyz: Option<String>,
    num_hydrogens: Option<u8>,
    charge: i32,
    node_type: Option<String>,
}

#[derive(Debug)]
struct RawBond {
    begin: u32,
    end: u32,
    order: BondOrder,
}

/// Parses one standalone `<fragment>` document into a [`Molecule`].
///
/// Only `<n>` and `<b>` elements that are direct children of the fragment are read;
/// anything nested inside a node (labels, abbreviation sub-fragments) is skipped.
/// External connection points are dropped together with their bonds. Atoms without
/// an explicit `NumHydrogens` get implicit hydrogens from their default valence.
///
/// # Errors
///
/// Returns a [`CdxmlError`] for malformed XML, unknown elements, unparsable
/// coordinates, dangling bonds, duplicate node ids, or a fragment without atoms.
pub fn parse_fragment(fragment: &str) -> Result<Molecule, CdxmlError> {
    let mut reader = Reader::from_str(fragment);
    reader.trim_text(true);

    let mut nodes: Vec<RawNode> = Vec::new();
    let mut bonds: Vec<RawBond> = Vec::new();
    let mut depth = 0usize;
    let mut skip_until: Option<usize> = None;
    let mut saw_root = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(CdxmlError::Xml {
                    position: reader.buffer_position(),
                    source,
                });
            }
        };
        match event {
            Event::Start(ref e) => {
                if depth == 0 {
                    if e.name().as_ref() != b"fragment" {
                        return Err(CdxmlError::NotAFragment);
                    }
                    saw_root = true;
                } else if depth == 1 && skip_until.is_none() {
                    match e.name().as_ref() {
                        b"n" => nodes.push(read_node(e)?),
                        b"b" => bonds.push(read_bond(e)?),
                        _ => {}
                    }
                    skip_until = Some(depth);
                }
                depth += 1;
            }
            Event::Empty(ref e) => {
                if depth == 0 {
                    return Err(if e.name().as_ref() == b"fragment" {
                        CdxmlError::Empty
                    } else {
                        CdxmlError::NotAFragment
                    });
                }
                if depth == 1 && skip_until.is_none() {
                    match e.name().as_ref() {
                        b"n" => nodes.push(read_node(e)?),
                        b"b" => bonds.push(read_bond(e)?),
                        _ => {}
                    }
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if skip_until == Some(depth) {
                    skip_until = None;
                }
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => {
                if !saw_root {
                    return Err(CdxmlError::NotAFragment);
                }
                return Err(CdxmlError::UnexpectedEof);
            }
            _ => {}
        }
    }

    build_molecule(nodes, bonds)
}

fn build_molecule(nodes: Vec<RawNode>, bonds: Vec<RawBond>) -> Result<Molecule, CdxmlError> {
    let mut molecule = Molecule::new();
    let mut id_map: HashMap<u32, AtomId> = HashMap::new();
    let mut skipped: HashSet<u32> = HashSet::new();
    let mut explicit_h: HashSet<AtomId> = HashSet::new();

    for node in nodes {
        if node.node_type.as_deref() == Some(EXTERNAL_CONNECTION_POINT) {
            if let Some(id) = node.id {
                skipped.insert(id);
            }
            continue;
        }
        let element = Element::from_atomic_number(node.element.unwrap_or(DEFAULT_ELEMENT))
            .map_err(|source| CdxmlError::Element {
                id: node.id,
                source,
            })?;
        let position = node_position(&node)?;

        let mut atom = SketchAtom::new(element, position);
        atom.charge = node.charge;
        atom.source_id = node.id;
        if let Some(h) = node.num_hydrogens {
            atom.implicit_hydrogens = h;
        }
        let atom_id = molecule.add_atom(atom);
        if node.num_hydrogens.is_some() {
            explicit_h.insert(atom_id);
        }
        if let Some(id) = node.id {
            if id_map.insert(id, atom_id).is_some() {
                return Err(CdxmlError::DuplicateNodeId(id));
            }
        }
    }

    if molecule.is_empty() {
        return Err(CdxmlError::Empty);
    }

    for bond in bonds {
        if skipped.contains(&bond.begin) || skipped.contains(&bond.end) {
            continue;
        }
        let resolve = |id: u32| id_map.get(&id).copied().ok_or(CdxmlError::UnknownBondAtom(id));
        let (a, b) = (resolve(bond.begin)?, resolve(bond.end)?);
        molecule.add_bond(a, b, bond.order);
    }

    let derived: Vec<(AtomId, u8)> = molecule
        .atoms_iter()
        .filter(|(id, _)| !explicit_h.contains(id))
        .map(|(id, atom)| (id, implicit_hydrogen_count(&molecule, id, atom)))
        .collect();
    for (id, count) in derived {
        if let Some(atom) = molecule.atom_mut(id) {
            atom.implicit_hydrogens = count;
        }
    }

    debug!(
        atoms = molecule.atom_count(),
        bonds = molecule.bonds().len(),
        formula = %molecule.formula(),
        "Parsed CDXML fragment"
    );
    Ok(molecule)
}

fn implicit_hydrogen_count(molecule: &Molecule, id: AtomId, atom: &SketchAtom) -> u8 {
    if atom.element.is_hydrogen() {
        return 0;
    }
    let Some(valence) = atom.element.charged_valence(atom.charge) else {
        return 0;
    };
    let used = molecule.bond_order_sum(id).floor() as i64;
    (i64::from(valence) - used).clamp(0, i64::from(u8::MAX)) as u8
}

fn node_position(node: &RawNode) -> Result<Point3<f64>, CdxmlError> {
    if let Some(xyz) = &node.xyz {
        let coords = parse_coordinates("xyz", xyz, 3)?;
        return Ok(Point3::new(coords[0], coords[1], coords[2]));
    }
    if let Some(p) = &node.p {
        let coords = parse_coordinates("p", p, 2)?;
        return Ok(Point3::new(coords[0], coords[1], 0.0));
    }
    Err(CdxmlError::MissingCoordinates { id: node.id })
}

fn parse_coordinates(name: &'static str, value: &str, expected: usize) -> Result<Vec<f64>, CdxmlError> {
    let invalid = || CdxmlError::InvalidAttribute {
        name,
        value: value.to_string(),
    };
    let coords = value
        .split_whitespace()
        .map(|token| token.parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    if coords.len() != expected || coords.iter().any(|c| !c.is_finite()) {
        return Err(invalid());
    }
    Ok(coords)
}

fn parse_attribute<T: FromStr>(name: &'static str, value: &str) -> Result<T, CdxmlError> {
    value.trim().parse().map_err(|_| CdxmlError::InvalidAttribute {
        name,
        value: value.to_string(),
    })
}

fn read_node(e: &BytesStart) -> Result<RawNode, CdxmlError> {
    let mut node = RawNode::default();
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value().map_err(|source| CdxmlError::Xml {
            position: 0,
            source,
        })?;
        match attr.key.as_ref() {
            b"id" => node.id = Some(parse_attribute("id", &value)?),
            b"Element" => node.element = Some(parse_attribute("Element", &value)?),
            b"p" => node.p = Some(value.into_owned()),
            b"xyz" => node.xyz = Some(value.into_owned()),
            b"NumHydrogens" => node.num_hydrogens = Some(parse_attribute("NumHydrogens", &value)?),
            b"Charge" => node.charge = parse_attribute("Charge", &value)?,
            b"NodeType" => node.node_type = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(node)
}

fn read_bond(e: &BytesStart) -> Result<RawBond, CdxmlError> {
    let mut begin = None;
    let mut end = None;
    let mut order = BondOrder::Single;
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value().map_err(|source| CdxmlError::Xml {
            position: 0,
            source,
        })?;
        match attr.key.as_ref() {
            b"B" => begin = Some(parse_attribute("B", &value)?),
            b"E" => end = Some(parse_attribute("E", &value)?),
            b"Order" => order = parse_attribute("Order", &value)?,
            _ => {}
        }
    }
    Ok(RawBond {
        begin: begin.ok_or(CdxmlError::IncompleteBond("B"))?,
        end: end.ok_or(CdxmlError::IncompleteBond("E"))?,
        order,
    })
}
