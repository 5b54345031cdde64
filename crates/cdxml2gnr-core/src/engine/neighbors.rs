use crate::core::models::structure::{Structure, StructureError};
use nalgebra::Vector3;
use std::cmp::Ordering;

/// Which pairs a [`NeighborList`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborMode {
    /// Each pair once, on the atom with the lower index. A pair of an atom with
    /// its own periodic image is kept for the lexicographically positive offset only.
    OneWay,
    /// Each pair on both atoms, with opposite offsets.
    BothWays,
}

/// A neighbor of some atom: the neighbor's index and the periodic image it sits in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub offset: [i32; 3],
    /// Vector from the central atom to the neighbor image.
    pub displacement: Vector3<f64>,
}

impl Neighbor {
    pub fn distance(&self) -> f64 {
        self.displacement.norm()
    }
}

/// Covalent-radius neighbor list over periodic images.
///
/// Two atoms are neighbors when their distance is below
/// `(r_i + skin) + (r_j + skin)`, with `r` the covalent radius. Images are
/// searched along periodic directions only, as far as the largest possible
/// cutoff reaches through the cell.
#[derive(Debug, Clone, Default)]
pub struct NeighborList {
    neighbors: Vec<Vec<Neighbor>>,
}

impl NeighborList {
    /// Builds the list for the current atom positions.
    ///
    /// # Errors
    ///
    /// Fails if the structure is periodic in some direction but has no cell, or
    /// the cell is singular.
    pub fn build(structure: &Structure, skin: f64, mode: NeighborMode) -> Result<Self, StructureError> {
        let atoms = structure.atoms();
        let cutoffs: Vec<f64> = atoms.iter().map(|a| a.element.covalent_radius() + skin).collect();
        let max_pair_cutoff = 2.0 * cutoffs.iter().copied().fold(0.0, f64::max);
        let offsets = image_offsets(structure, max_pair_cutoff)?;

        let mut neighbors = vec![Vec::new(); atoms.len()];
        for (i, center) in atoms.iter().enumerate() {
            let first_j = if mode == NeighborMode::OneWay { i } else { 0 };
            for (j, other) in atoms.iter().enumerate().skip(first_j) {
                for &(offset, shift) in &offsets {
                    if i == j {
                        let keep = match mode {
                            NeighborMode::OneWay => is_positive(&offset),
                            NeighborMode::BothWays => offset != [0, 0, 0],
                        };
                        if !keep {
                            continue;
                        }
                    }
                    let displacement = other.position + shift - center.position;
                    if displacement.norm() < cutoffs[i] + cutoffs[j] {
                        neighbors[i].push(Neighbor {
                            index: j,
                            offset,
                            displacement,
                        });
                    }
                }
            }
        }
        Ok(Self { neighbors })
    }

    pub fn neighbors(&self, index: usize) -> &[Neighbor] {
        self.neighbors.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Total number of recorded (atom, neighbor) entries.
    pub fn pair_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum()
    }
}

fn is_positive(offset: &[i32; 3]) -> bool {
    offset.iter().find(|&&o| o != 0).is_some_and(|&o| o > 0)
}

fn image_offsets(
    structure: &Structure,
    max_pair_cutoff: f64,
) -> Result<Vec<([i32; 3], Vector3<f64>)>, StructureError> {
    let pbc = structure.pbc();
    if !pbc.iter().any(|&p| p) {
        return Ok(vec![([0, 0, 0], Vector3::zeros())]);
    }
    let cell = structure.cell().ok_or(StructureError::MissingCell)?;
    if cell.is_singular() {
        return Err(StructureError::SingularCell {
            volume: cell.volume(),
        });
    }

    let spacings = cell.plane_spacings();
    let reach: Vec<i32> = (0..3)
        .map(|axis| {
            if pbc[axis] {
                (max_pair_cutoff / spacings[axis]).ceil() as i32
            } else {
                0
            }
        })
        .collect();

    let mut offsets = Vec::new();
    for a in -reach[0]..=reach[0] {
        for b in -reach[1]..=reach[1] {
            for c in -reach[2]..=reach[2] {
                let offset = [a, b, c];
                offsets.push((offset, cell.translation(&offset)));
            }
        }
    }
    offsets.sort_by(|x, y| compare_offsets(&x.0, &y.0));
    Ok(offsets)
}

/// Orders the home cell first, then by increasing image distance in index space.
fn compare_offsets(a: &[i32; 3], b: &[i32; 3]) -> Ordering {
    let norm = |o: &[i32; 3]| o.iter().map(|x| x.abs()).sum::<i32>();
    norm(a).cmp(&norm(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use crate::core::models::structure::Cell;
    use nalgebra::Point3;

    fn periodic_chain() -> Structure {
        let mut s = Structure::new();
        s.push(Element::CARBON, Point3::new(0.5, 5.0, 5.0));
        s.push(Element::CARBON, Point3::new(1.9, 5.0, 5.0));
        s.set_cell(Cell::orthorhombic(2.8, 10.0, 10.0));
        s.set_pbc([true; 3]);
        s
    }

    #[test]
    fn both_ways_lists_every_pair_on_both_atoms() {
        let list = NeighborList::build(&periodic_chain(), 0.3, NeighborMode::BothWays).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.neighbors(0).len(), 2);
        assert_eq!(list.neighbors(1).len(), 2);

        let offsets: Vec<[i32; 3]> = list.neighbors(0).iter().map(|n| n.offset).collect();
        assert!(offsets.contains(&[0, 0, 0]));
        assert!(offsets.contains(&[-1, 0, 0]));
        for n in list.neighbors(0) {
            assert_eq!(n.index, 1);
            assert!((n.distance() - 1.4).abs() < 1e-9);
        }
    }

    #[test]
    fn one_way_lists_each_pair_once() {
        let list = NeighborList::build(&periodic_chain(), 0.3, NeighborMode::OneWay).unwrap();
        assert_eq!(list.neighbors(0).len(), 2);
        assert!(list.neighbors(1).is_empty());
        assert_eq!(list.pair_count(), 2);
    }

    #[test]
    fn self_images_are_listed_once_in_one_way_mode() {
        let mut s = Structure::new();
        s.push(Element::CARBON, Point3::new(0.5, 5.0, 5.0));
        s.set_cell(Cell::orthorhombic(1.5, 10.0, 10.0));
        s.set_pbc([true; 3]);

        let one_way = NeighborList::build(&s, 0.3, NeighborMode::OneWay).unwrap();
        assert_eq!(one_way.neighbors(0).len(), 1);
        assert_eq!(one_way.neighbors(0)[0].offset, [1, 0, 0]);

        let both = NeighborList::build(&s, 0.3, NeighborMode::BothWays).unwrap();
        assert_eq!(both.neighbors(0).len(), 2);
    }

    #[test]
    fn non_periodic_structure_needs_no_cell() {
        let mut s = Structure::new();
        s.push(Element::CARBON, Point3::origin());
        s.push(Element::HYDROGEN, Point3::new(1.09, 0.0, 0.0));
        s.push(Element::HYDROGEN, Point3::new(5.0, 0.0, 0.0));
        let list = NeighborList::build(&s, 0.3, NeighborMode::BothWays).unwrap();
        assert_eq!(list.neighbors(0).len(), 1);
        assert!(list.neighbors(2).is_empty());
        assert!(list.neighbors(7).is_empty());
    }

    #[test]
    fn periodic_structure_without_cell_fails() {
        let mut s = Structure::new();
        s.push(Element::CARBON, Point3::origin());
        s.set_pbc([true, false, false]);
        assert_eq!(
            NeighborList::build(&s, 0.3, NeighborMode::OneWay).unwrap_err(),
            StructureError::MissingCell
        );
    }

    #[test]
    fn offset_ordering_and_sign() {
        assert!(is_positive(&[0, 0, 1]));
        assert!(is_positive(&[1, -1, 0]));
        assert!(!is_positive(&[0, -1, 5]));
        assert!(!is_positive(&[0, 0, 0]));
        assert_eq!(compare_offsets(&[0, 0, 0], &[-1, 0, 0]), Ordering::Less);
    }
}
