//! # Core Module
//!
//! Fundamental building blocks for the sketch-to-structure pipeline.
//!
//! ## Architecture
//!
//! - **Chemical Representation** ([`models`]) - Elements, sketch molecules and 3D structures
//! - **File I/O** ([`io`]) - CDXML fragment extraction and parsing, extended XYZ reading/writing
//! - **Geometry Utilities** ([`utils`]) - Rotations, principal axes and bounding boxes
//!
//! Everything in this module is stateless: operations take data in and hand
//! new data back, so the [`crate::engine`] stages can be composed freely.

pub mod io;
pub mod models;
pub mod utils;
