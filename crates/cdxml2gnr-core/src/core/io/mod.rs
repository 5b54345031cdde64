//! Provides input/output functionality for chemical file formats.
//!
//! Sketches come in as ChemDraw CDXML documents ([`cdxml`]); structures go out
//! (and can be read back) as extended XYZ ([`xyz`]). Structure formats share the
//! trait-based interface defined in [`traits`].

pub mod cdxml;
pub mod traits;
pub mod xyz;
