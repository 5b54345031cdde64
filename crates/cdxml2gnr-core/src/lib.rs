//! # cdxml2gnr Core Library
//!
//! Converts ChemDraw CDXML sketches into three-dimensional atomic structures,
//! estimates a physically plausible lattice scale for them, and optionally
//! re-cuts a structure into a periodic cell suitable for graphene nanoribbon
//! (GNR) modeling.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Molecule`, `Structure`),
//!   element tables, geometry helpers, and file I/O for CDXML and extended XYZ.
//!
//! - **[`engine`]: The Pipeline Stages.** PCA embedding, bond-length based scale
//!   estimation, structure scaling, periodic neighbor lists and cell construction,
//!   together with configuration, errors and progress reporting.
//!
//! - **[`workflows`]: The Public API.** The explicit [`workflows::session::Session`]
//!   object that owns the uploaded sketch, the parsed fragments and the active
//!   structure, plus stateless conversion helpers used by the CLI.

pub mod core;
pub mod engine;
pub mod workflows;
