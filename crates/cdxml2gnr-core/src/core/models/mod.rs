//! # Core Models Module
//!
//! Data structures used to represent chemistry throughout cdxml2gnr.
//!
//! ## Key Components
//!
//! - [`element`] - Periodic table lookups (symbols, covalent radii, default valences)
//! - [`ids`] - Slot-map keys for atoms of a sketch molecule
//! - [`atom`] - Sketch atoms and structure atoms
//! - [`topology`] - Bonds and bond orders of a sketch molecule
//! - [`molecule`] - A parsed 2D sketch fragment with implicit hydrogens
//! - [`structure`] - A 3D atomic structure with an optional periodic cell
//!
//! ## Usage
//!
//! ```ignore
//! use cdxml2gnr::core::models::{element::Element, structure::Structure};
//! use nalgebra::Point3;
//!
//! let mut structure = Structure::new();
//! structure.push(Element::CARBON, Point3::new(0.0, 0.0, 0.0));
//! structure.push(Element::HYDROGEN, Point3::new(1.09, 0.0, 0.0));
//! assert_eq!(structure.formula(), "CH");
//! ```

pub mod atom;
pub mod element;
pub mod ids;
pub mod molecule;
pub mod structure;
pub mod topology;
