use crate::core::io::traits::StructureFile;
use crate::core::models::element::Element;
use crate::core::models::structure::{Cell, Structure};
use nalgebra::{Point3, Vector3};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::sync::LazyLock;
use thiserror::Error;

const PROPERTIES: &str = "species:S:1:pos:R:3";

static KEY_VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)=(?:"([^"]*)"|(\S+))"#).expect("key-value pattern is a valid regex")
});

/// Comment-line entries other than the lattice, periodicity and column layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XyzMetadata {
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
}

#[derive(Debug, Error, PartialEq)]
pub enum XyzParseErrorKind {
    #[error("Expected an atom count, found '{0}'")]
    InvalidAtomCount(String),
    #[error("File ends after {found} of {expected} atoms")]
    MissingAtoms { expected: usize, found: usize },
    #[error("Invalid number '{0}'")]
    InvalidFloat(String),
    #[error("Atom line needs a symbol and three coordinates")]
    ShortAtomLine,
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("Lattice needs nine numbers, found {0}")]
    InvalidLattice(usize),
    #[error("Invalid periodicity flags '{0}'")]
    InvalidPbc(String),
    #[error("Unsupported column layout '{0}'")]
    UnsupportedProperties(String),
}

/// Extended XYZ files, as written by ASE and read by most structure viewers.
///
/// The comment line carries `Lattice="ax ay az bx by bz cx cy cz"`,
/// `Properties=species:S:1:pos:R:3` and `pbc="T T T"`. Only the species and
/// position columns are supported.
pub struct XyzFile;

impl StructureFile for XyzFile {
    type Metadata = XyzMetadata;
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Structure, Self::Metadata), Self::Error> {
        let mut lines = reader.lines();
        let parse_err = |line: usize, kind| XyzError::Parse { line, kind };

        let count_line = lines.next().transpose()?.unwrap_or_default();
        let count: usize = count_line
            .trim()
            .parse()
            .map_err(|_| parse_err(1, XyzParseErrorKind::InvalidAtomCount(count_line.trim().to_string())))?;

        let comment = lines.next().transpose()?.unwrap_or_default();
        let mut metadata = XyzMetadata::default();
        let mut cell = None;
        let mut pbc = [false; 3];

        for (key, value) in parse_comment(&comment) {
            match key.as_str() {
                "Lattice" => cell = Some(parse_lattice(&value).map_err(|kind| parse_err(2, kind))?),
                "pbc" => pbc = parse_pbc(&value).map_err(|kind| parse_err(2, kind))?,
                "Properties" => {
                    if value != PROPERTIES {
                        return Err(parse_err(2, XyzParseErrorKind::UnsupportedProperties(value)));
                    }
                }
                _ => {
                    metadata.extra.insert(key, value);
                }
            }
        }

        let mut structure = Structure::new();
        for i in 0..count {
            let line_num = i + 3;
            let Some(line) = lines.next().transpose()? else {
                return Err(parse_err(
                    line_num,
                    XyzParseErrorKind::MissingAtoms {
                        expected: count,
                        found: i,
                    },
                ));
            };
            let (element, position) = parse_atom_line(&line).map_err(|kind| parse_err(line_num, kind))?;
            structure.push(element, position);
        }

        if let Some(cell) = cell {
            structure.set_cell(cell);
        }
        structure.set_pbc(pbc);
        Ok((structure, metadata))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", structure.len())?;

        let mut comment = Vec::new();
        if let Some(cell) = structure.cell() {
            let numbers: Vec<String> = cell
                .vectors()
                .iter()
                .flat_map(|v| v.iter().copied().collect::<Vec<_>>())
                .map(|x| format!("{x:.8}"))
                .collect();
            comment.push(format!("Lattice=\"{}\"", numbers.join(" ")));
        }
        comment.push(format!("Properties={PROPERTIES}"));
        for (key, value) in &metadata.extra {
            if value.contains(char::is_whitespace) {
                comment.push(format!("{key}=\"{value}\""));
            } else {
                comment.push(format!("{key}={value}"));
            }
        }
        let flags: Vec<&str> = structure
            .pbc()
            .iter()
            .map(|&p| if p { "T" } else { "F" })
            .collect();
        comment.push(format!("pbc=\"{}\"", flags.join(" ")));
        writeln!(writer, "{}", comment.join(" "))?;

        for atom in structure.atoms() {
            let p = atom.position;
            writeln!(
                writer,
                "{:<2} {:>16.8} {:>16.8} {:>16.8}",
                atom.symbol(),
                p.x,
                p.y,
                p.z
            )?;
        }
        Ok(())
    }

    fn write_structure_to(structure: &Structure, writer: &mut impl Write) -> Result<(), Self::Error> {
        Self::write_to(structure, &XyzMetadata::default(), writer)
    }
}

fn parse_comment(comment: &str) -> Vec<(String, String)> {
    KEY_VALUE_PATTERN
        .captures_iter(comment)
        .map(|caps| {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            (caps[1].to_string(), value.to_string())
        })
        .collect()
}

fn parse_float(token: &str) -> Result<f64, XyzParseErrorKind> {
    token
        .parse()
        .map_err(|_| XyzParseErrorKind::InvalidFloat(token.to_string()))
}

fn parse_lattice(value: &str) -> Result<Cell, XyzParseErrorKind> {
    let numbers = value
        .split_whitespace()
        .map(parse_float)
        .collect::<Result<Vec<_>, _>>()?;
    if numbers.len() != 9 {
        return Err(XyzParseErrorKind::InvalidLattice(numbers.len()));
    }
    let v = |i: usize| Vector3::new(numbers[3 * i], numbers[3 * i + 1], numbers[3 * i + 2]);
    Ok(Cell::from_vectors(v(0), v(1), v(2)))
}

fn parse_pbc(value: &str) -> Result<[bool; 3], XyzParseErrorKind> {
    let flags = value
        .split_whitespace()
        .map(|flag| match flag {
            "T" | "True" | "true" | "1" => Ok(true),
            "F" | "False" | "false" | "0" => Ok(false),
            _ => Err(XyzParseErrorKind::InvalidPbc(value.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    match flags.as_slice() {
        [single] => Ok([*single; 3]),
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(XyzParseErrorKind::InvalidPbc(value.to_string())),
    }
}

fn parse_atom_line(line: &str) -> Result<(Element, Point3<f64>), XyzParseErrorKind> {
    let mut fields = line.split_whitespace();
    let (Some(symbol), Some(x), Some(y), Some(z)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(XyzParseErrorKind::ShortAtomLine);
    };
    let element: Element = symbol
        .parse()
        .map_err(|_| XyzParseErrorKind::UnknownElement(symbol.to_string()))?;
    Ok((
        element,
        Point3::new(parse_float(x)?, parse_float(y)?, parse_float(z)?),
    ))
}
