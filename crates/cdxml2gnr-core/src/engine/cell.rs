use super::config::PipelineConfig;
use super::error::EngineError;
use super::neighbors::{NeighborList, NeighborMode};
use crate::core::models::element::Element;
use crate::core::models::structure::{Cell, Structure, StructureError};
use crate::core::utils::geometry::{rotation_about_z, signed_angle_2d};
use nalgebra::{Point3, Vector2, Vector3};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

const MIN_REPEAT_LENGTH: f64 = 1e-6;
const MIN_NET_NEIGHBOR_VECTOR: f64 = 1e-9;

/// Result of re-cutting a structure into a periodic cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicCell {
    pub structure: Structure,
    /// Indices (in the wrapped input) of the periodic duplicates that were removed.
    pub removed_duplicates: Vec<usize>,
    /// Indices (in `structure`) of the capping hydrogens that were added.
    pub added_hydrogens: Vec<usize>,
}

/// Cuts a periodic cell whose repeat vector runs from atom `id1` to atom `id2`.
///
/// The structure is rotated about `id1` so the repeat vector points along +x
/// (skipped when it is already within `alignment_tolerance`), boxed in a cell of
/// `|v|` by `cell_padding` plus the y and z spread, centered and wrapped. Atoms
/// that coincide with a periodic image of an earlier atom are then removed, and
/// every carbon or nitrogen left with fewer than `min_coordination` neighbors
/// receives one hydrogen opposite to its bonds.
///
/// # Errors
///
/// - [`EngineError::AtomIndexOutOfRange`] if either index is not an atom.
/// - [`EngineError::DegenerateGeometry`] if the two atoms coincide in the xy plane,
///   or an under-coordinated atom has no net bond direction to cap against.
#[instrument(skip_all, name = "construct_cell", fields(id1, id2))]
pub fn construct_cell(
    structure: &Structure,
    id1: usize,
    id2: usize,
    config: &PipelineConfig,
) -> Result<PeriodicCell, EngineError> {
    let len = structure.len();
    let p1 = atom_position(structure, id1)?;
    let p2 = atom_position(structure, id2)?;

    let v = Vector2::new(p2.x - p1.x, p2.y - p1.y);
    let repeat = v.norm();
    if id1 == id2 || repeat < MIN_REPEAT_LENGTH {
        return Err(EngineError::DegenerateGeometry(format!(
            "atoms {id1} and {id2} do not define a repeat vector"
        )));
    }

    let mut cell_structure = structure.clone();
    let angle = signed_angle_2d(&v, &Vector2::x());
    if angle.abs() > config.alignment_tolerance {
        debug!(angle_degrees = angle.to_degrees(), "Aligning repeat vector with +x.");
        cell_structure.rotate_about(&rotation_about_z(angle), &p1);
    }

    let extents = cell_structure.extents();
    cell_structure.set_cell(Cell::orthorhombic(
        repeat,
        config.cell_padding + extents.y,
        config.cell_padding + extents.z,
    ));
    cell_structure.set_pbc([true; 3]);
    cell_structure
        .center()
        .and_then(|()| cell_structure.wrap(config.wrap_eps))
        .map_err(degenerate)?;

    let removed_duplicates = remove_periodic_duplicates(&mut cell_structure, config)?;
    let added_hydrogens = saturate(&mut cell_structure, config)?;

    info!(
        atoms_in = len,
        atoms_out = cell_structure.len(),
        removed = removed_duplicates.len(),
        "Periodic cell constructed."
    );
    Ok(PeriodicCell {
        structure: cell_structure,
        removed_duplicates,
        added_hydrogens,
    })
}

fn atom_position(structure: &Structure, index: usize) -> Result<Point3<f64>, EngineError> {
    structure
        .atom(index)
        .map(|a| a.position)
        .ok_or(EngineError::AtomIndexOutOfRange {
            index,
            len: structure.len(),
        })
}

fn degenerate(e: StructureError) -> EngineError {
    EngineError::DegenerateGeometry(e.to_string())
}

/// Removes every atom that sits on top of a periodic image of a lower-indexed atom.
///
/// All duplicates are collected first and deleted in one batch, so each is
/// removed exactly once.
fn remove_periodic_duplicates(
    structure: &mut Structure,
    config: &PipelineConfig,
) -> Result<Vec<usize>, EngineError> {
    let list = NeighborList::build(structure, config.neighbor_skin, NeighborMode::OneWay)
        .map_err(degenerate)?;
    let duplicates: BTreeSet<usize> = (0..structure.len())
        .flat_map(|i| list.neighbors(i))
        .filter(|n| n.distance() < config.duplicate_distance)
        .map(|n| n.index)
        .collect();
    let duplicates: Vec<usize> = duplicates.into_iter().collect();
    structure.remove_atoms(&duplicates);
    debug!(?duplicates, "Removed periodic duplicates.");
    Ok(duplicates)
}

/// Caps under-coordinated carbon and nitrogen atoms with one hydrogen each.
///
/// Directions come from a single neighbor list built before any hydrogen is added.
fn saturate(structure: &mut Structure, config: &PipelineConfig) -> Result<Vec<usize>, EngineError> {
    let list = NeighborList::build(structure, config.neighbor_skin, NeighborMode::BothWays)
        .map_err(degenerate)?;

    let mut caps: Vec<Point3<f64>> = Vec::new();
    for (i, atom) in structure.atoms().iter().enumerate() {
        if !matches!(atom.element, Element::CARBON | Element::NITROGEN) {
            continue;
        }
        let neighbors = list.neighbors(i);
        if neighbors.len() >= config.min_coordination {
            continue;
        }
        let net: Vector3<f64> = neighbors.iter().map(|n| n.displacement).sum();
        let norm = net.norm();
        if norm < MIN_NET_NEIGHBOR_VECTOR {
            return Err(EngineError::DegenerateGeometry(format!(
                "atom {i} ({}) has {} neighbor(s) with no net direction to place a hydrogen",
                atom.element,
                neighbors.len()
            )));
        }
        caps.push(atom.position - net / norm * config.saturation_bond_length);
    }

    let added: Vec<usize> = caps
        .into_iter()
        .map(|position| structure.push(Element::HYDROGEN, position))
        .collect();
    if !added.is_empty() {
        info!(?added, "Added capping hydrogens.");
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;

    /// Five carbons of a trans-polyacetylene zigzag; atoms 0, 2 and 4 are
    /// equivalent, as are 1 and 3, with a repeat length of 2.5.
    fn zigzag() -> Structure {
        let mut s = Structure::new();
        for i in 0..5 {
            let y = if i % 2 == 0 { 0.0 } else { 0.7 };
            s.push(Element::CARBON, Point3::new(1.25 * i as f64, y, 0.0));
        }
        s
    }

    fn hydrogens(structure: &Structure) -> Vec<&Atom> {
        structure
            .atoms()
            .iter()
            .filter(|a| a.element.is_hydrogen())
            .collect()
    }

    #[test]
    fn zigzag_reduces_to_one_repeat_unit_with_caps() {
        let input = zigzag();
        let result = construct_cell(&input, 0, 2, &PipelineConfig::default()).unwrap();
        let s = &result.structure;

        assert_eq!(result.removed_duplicates, vec![2, 3, 4]);
        assert_eq!(result.added_hydrogens, vec![2, 3]);
        assert_eq!(s.formula(), "C2H2");
        assert_eq!(
            s.len(),
            input.len() - result.removed_duplicates.len() + result.added_hydrogens.len()
        );

        let cell = s.cell().unwrap();
        assert!((cell.lengths().x - 2.5).abs() < 1e-9);
        assert!((cell.lengths().y - 15.7).abs() < 1e-9);
        assert!((cell.lengths().z - 15.0).abs() < 1e-9);
        assert_eq!(s.pbc(), [true; 3]);

        let c0 = s.atoms()[0].position;
        let c1 = s.atoms()[1].position;
        let h0 = s.atoms()[2].position;
        let h1 = s.atoms()[3].position;
        assert!(((h0 - c0) - Vector3::new(0.0, -1.1, 0.0)).norm() < 1e-9);
        assert!(((h1 - c1) - Vector3::new(0.0, 1.1, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn aligned_reference_pair_is_not_rotated() {
        let input = zigzag();
        let result = construct_cell(&input, 0, 2, &PipelineConfig::default()).unwrap();
        let before = input.atoms()[1].position - input.atoms()[0].position;
        let after = result.structure.atoms()[1].position - result.structure.atoms()[0].position;
        // Wrapping may move either atom by whole repeat lengths along x.
        let shift = (after.x - before.x) / 2.5;
        assert!((shift - shift.round()).abs() < 1e-9);
        assert!((after.y - before.y).abs() < 1e-9);
        assert!((after.z - before.z).abs() < 1e-9);
    }

    #[test]
    fn misaligned_reference_pair_is_rotated_onto_x() {
        let mut input = zigzag();
        input.rotate_about(&rotation_about_z(0.6), &Point3::new(3.0, -2.0, 0.0));
        let result = construct_cell(&input, 0, 2, &PipelineConfig::default()).unwrap();
        let s = &result.structure;

        assert_eq!(s.formula(), "C2H2");
        assert!((s.cell().unwrap().lengths().x - 2.5).abs() < 1e-9);
        let h: Vec<&Atom> = hydrogens(s);
        assert_eq!(h.len(), 2);
        for (carbon, hydrogen) in s.atoms()[..2].iter().zip(h) {
            let bond = hydrogen.position - carbon.position;
            assert!(bond.x.abs() < 1e-9);
            assert!((bond.norm() - 1.1).abs() < 1e-9);
        }
    }

    #[test]
    fn input_structure_is_left_untouched() {
        let input = zigzag();
        let copy = input.clone();
        construct_cell(&input, 0, 2, &PipelineConfig::default()).unwrap();
        assert_eq!(input, copy);
    }

    #[test]
    fn well_coordinated_carbon_is_not_capped() {
        let mut s = Structure::new();
        s.push(Element::CARBON, Point3::new(0.0, 0.0, 0.0));
        s.push(Element::CARBON, Point3::new(1.4, 0.0, 0.0));
        s.push(Element::OXYGEN, Point3::new(0.7, 1.2, 0.0));
        let result = construct_cell(&s, 0, 1, &PipelineConfig::default()).unwrap();
        // The cell is exactly one C-C bond long, so atom 1 is an image of atom 0.
        assert_eq!(result.removed_duplicates, vec![1]);
        assert!(result.added_hydrogens.is_empty());
        assert_eq!(result.structure.formula(), "CO");
    }

    #[test]
    fn invalid_reference_atoms_are_rejected() {
        let input = zigzag();
        let config = PipelineConfig::default();
        assert!(matches!(
            construct_cell(&input, 0, 9, &config),
            Err(EngineError::AtomIndexOutOfRange { index: 9, len: 5 })
        ));
        assert!(matches!(
            construct_cell(&input, 3, 3, &config),
            Err(EngineError::DegenerateGeometry(_))
        ));

        let mut stacked = Structure::new();
        stacked.push(Element::CARBON, Point3::new(0.0, 0.0, 0.0));
        stacked.push(Element::CARBON, Point3::new(0.0, 0.0, 1.4));
        assert!(matches!(
            construct_cell(&stacked, 0, 1, &config),
            Err(EngineError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn isolated_carbon_cannot_be_capped() {
        let mut s = Structure::new();
        s.push(Element::CARBON, Point3::new(0.0, 0.0, 0.0));
        s.push(Element::HYDROGEN, Point3::new(5.0, 0.0, 0.0));
        s.push(Element::CARBON, Point3::new(10.0, 0.0, 0.0));
        assert!(matches!(
            construct_cell(&s, 0, 2, &PipelineConfig::default()),
            Err(EngineError::DegenerateGeometry(_))
        ));
    }
}
