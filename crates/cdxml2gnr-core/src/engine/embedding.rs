use super::config::PipelineConfig;
use super::error::EngineError;
use crate::core::models::molecule::Molecule;
use crate::core::models::structure::{Cell, Structure};
use crate::core::utils::geometry::{principal_axes, rotation_about_z};
use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

/// Turns sketch coordinates into a 3D structure in a padded periodic box.
///
/// Coordinates are projected onto their principal axes (largest spread first),
/// then rotated about z by `embedding_rotation_degrees`. The box spans the
/// rotated coordinates plus `embedding_padding` on every axis and the atoms are
/// centered in it. Atom order follows the molecule's iteration order.
///
/// # Errors
///
/// Returns [`EngineError::DegenerateGeometry`] for an empty molecule or a box that
/// cannot be inverted (zero padding on a flat sketch).
#[instrument(skip_all, name = "embed_molecule", fields(atoms = molecule.atom_count()))]
pub fn embed_molecule(molecule: &Molecule, config: &PipelineConfig) -> Result<Structure, EngineError> {
    let positions: Vec<Point3<f64>> = molecule.atoms_iter().map(|(_, a)| a.position).collect();
    let axes = principal_axes(&positions).ok_or_else(|| {
        EngineError::DegenerateGeometry("cannot embed a molecule without atoms".to_string())
    })?;
    debug!(variances = ?axes.variances, "Principal axes computed.");

    let rotation = rotation_about_z(config.embedding_rotation_degrees.to_radians());
    let mut structure = Structure::new();
    for ((_, atom), position) in molecule.atoms_iter().zip(&positions) {
        let projected = axes.project(position);
        structure.push(atom.element, rotation * projected);
    }

    let size = structure.extents() + Vector3::repeat(config.embedding_padding);
    structure.set_cell(Cell::orthorhombic(size.x, size.y, size.z));
    structure.set_pbc([true; 3]);
    structure
        .center()
        .map_err(|e| EngineError::DegenerateGeometry(format!("embedding cell: {e}")))?;
    Ok(structure)
}
