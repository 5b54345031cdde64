use super::element::Element;
use nalgebra::Point3;

/// An atom of a parsed sketch fragment.
///
/// Coordinates are kept in the units of the source document (points for CDXML).
/// Two-dimensional sketches carry `z = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchAtom {
    /// The element of the atom.
    pub element: Element,
    /// Sketch coordinates in document units.
    pub position: Point3<f64>,
    /// Formal charge in elementary charge units.
    pub charge: i32,
    /// Number of hydrogens attached to this atom but not drawn as separate nodes.
    pub implicit_hydrogens: u8,
    /// The node identifier of the atom in the source document, if any.
    pub source_id: Option<u32>,
}

impl SketchAtom {
    pub fn new(element: Element, position: Point3<f64>) -> Self {
        Self {
            element,
            position,
            charge: 0,
            implicit_hydrogens: 0,
            source_id: None,
        }
    }
}

/// An atom of a three-dimensional structure: an element at a Cartesian position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    pub element: Element,
    /// Cartesian position in Angstroms (or sketch units before scaling).
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(element: Element, position: Point3<f64>) -> Self {
        Self { element, position }
    }

    pub fn symbol(&self) -> &'static str {
        self.element.symbol()
    }
}
