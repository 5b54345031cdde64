use super::atom::SketchAtom;
use super::element::Element;
use super::ids::AtomId;
use super::topology::{Bond, BondOrder};
use nalgebra::{Point3, Vector3};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

/// ChemDraw's default bond length in points, used when a sketch has no bonds to measure.
pub const DEFAULT_SKETCH_BOND_LENGTH: f64 = 14.4;

/// A molecule parsed from a single sketch fragment.
///
/// Atoms live in a slot map so bonds can reference them by stable [`AtomId`]s.
/// Atoms are never removed, so iteration order always equals insertion order,
/// which in turn equals the node order of the source document.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    atoms: SlotMap<AtomId, SketchAtom>,
    bonds: Vec<Bond>,
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, id: AtomId) -> Option<&SketchAtom> {
        self.atoms.get(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut SketchAtom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms in document order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &SketchAtom)> {
        self.atoms.iter()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn add_atom(&mut self, atom: SketchAtom) -> AtomId {
        let id = self.atoms.insert(atom);
        self.bond_adjacency.insert(id, Vec::new());
        id
    }

    /// Adds a bond between two atoms.
    ///
    /// Adding a bond that already exists succeeds without creating a duplicate.
    ///
    /// # Return
    ///
    /// Returns `None` if either atom does not exist or both ids are the same atom.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }
        if self.bond_adjacency[atom1_id].contains(&atom2_id) {
            return Some(());
        }
        self.bonds.push(Bond::new(atom1_id, atom2_id, order));
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    /// Retrieves the bonded neighbors of an atom.
    pub fn neighbors(&self, atom_id: AtomId) -> &[AtomId] {
        self.bond_adjacency
            .get(atom_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sum of the valence contributions of all bonds touching `atom_id`.
    pub fn bond_order_sum(&self, atom_id: AtomId) -> f64 {
        self.bonds
            .iter()
            .filter(|bond| bond.contains(atom_id))
            .map(|bond| bond.order.valence_contribution())
            .sum()
    }

    pub fn has_aromatic_bond(&self, atom_id: AtomId) -> bool {
        self.bonds
            .iter()
            .any(|bond| bond.contains(atom_id) && bond.order == BondOrder::Aromatic)
    }

    /// Total number of hydrogens, explicit atoms and implicit counts combined.
    pub fn hydrogen_count(&self) -> usize {
        self.atoms
            .values()
            .map(|atom| {
                usize::from(atom.element.is_hydrogen()) + usize::from(atom.implicit_hydrogens)
            })
            .sum()
    }

    /// Mean length of the drawn bonds in sketch units, if the sketch has any bonds.
    pub fn mean_bond_length(&self) -> Option<f64> {
        if self.bonds.is_empty() {
            return None;
        }
        let total: f64 = self
            .bonds
            .iter()
            .map(|bond| (self.atoms[bond.atom1_id].position - self.atoms[bond.atom2_id].position).norm())
            .sum();
        Some(total / self.bonds.len() as f64)
    }

    /// Molecular formula in Hill order, counting implicit hydrogens.
    ///
    /// With carbon present, C comes first, then H, then the remaining symbols
    /// alphabetically; without carbon every symbol (H included) is alphabetical.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for atom in self.atoms.values() {
            *counts.entry(atom.element.symbol()).or_default() += 1;
            if atom.implicit_hydrogens > 0 {
                *counts.entry(Element::HYDROGEN.symbol()).or_default() +=
                    usize::from(atom.implicit_hydrogens);
            }
        }
        hill_formula(&counts)
    }

    /// Returns a copy in which every implicit hydrogen is a real atom.
    ///
    /// Hydrogens are laid out in the sketch plane, spread evenly over the widest
    /// angular gap between the parent atom's existing bonds, at
    /// `mean bond length * length_ratio`. New atoms are appended after all existing
    /// atoms, so the positions of existing atoms in iteration order are unchanged.
    pub fn with_explicit_hydrogens(&self, length_ratio: f64) -> Molecule {
        let mut molecule = self.clone();
        let bond_length =
            self.mean_bond_length().unwrap_or(DEFAULT_SKETCH_BOND_LENGTH) * length_ratio;

        let parents: Vec<AtomId> = self
            .atoms
            .iter()
            .filter(|(_, atom)| atom.implicit_hydrogens > 0)
            .map(|(id, _)| id)
            .collect();

        for parent_id in parents {
            let parent = &self.atoms[parent_id];
            let neighbor_angles: Vec<f64> = self
                .neighbors(parent_id)
                .iter()
                .map(|&n| {
                    let d = self.atoms[n].position - parent.position;
                    d.y.atan2(d.x)
                })
                .collect();
            let angles = hydrogen_angles(&neighbor_angles, usize::from(parent.implicit_hydrogens));
            let origin = parent.position;

            for angle in angles {
                let position: Point3<f64> =
                    origin + Vector3::new(angle.cos(), angle.sin(), 0.0) * bond_length;
                let h_id = molecule.add_atom(SketchAtom::new(Element::HYDROGEN, position));
                molecule.add_bond(parent_id, h_id, BondOrder::Single);
            }
            molecule.atoms[parent_id].implicit_hydrogens = 0;
        }
        molecule
    }
}

pub(crate) fn hill_formula(counts: &BTreeMap<&'static str, usize>) -> String {
    let mut formula = String::new();
    let mut push = |symbol: &str, count: usize| {
        formula.push_str(symbol);
        if count > 1 {
            formula.push_str(&count.to_string());
        }
    };

    if let Some(&carbon) = counts.get("C") {
        push("C", carbon);
        if let Some(&hydrogen) = counts.get("H") {
            push("H", hydrogen);
        }
        for (symbol, &count) in counts.iter().filter(|(s, _)| !matches!(**s, "C" | "H")) {
            push(symbol, count);
        }
    } else {
        for (symbol, &count) in counts {
            push(symbol, count);
        }
    }
    formula
}

/// Directions (radians in the sketch plane) for `count` new substituents on an atom
/// whose existing bonds point along `neighbor_angles`.
fn hydrogen_angles(neighbor_angles: &[f64], count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    if neighbor_angles.is_empty() {
        return (0..count).map(|j| TAU * j as f64 / count as f64).collect();
    }

    let mut sorted: Vec<f64> = neighbor_angles
        .iter()
        .map(|a| a.rem_euclid(TAU))
        .collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let (gap_start, gap_width) = (0..sorted.len())
        .map(|i| {
            let start = sorted[i];
            let end = if i + 1 < sorted.len() {
                sorted[i + 1]
            } else {
                sorted[0] + TAU
            };
            (start, end - start)
        })
        .fold((sorted[0], 0.0_f64), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        });

    (1..=count)
        .map(|j| gap_start + gap_width * j as f64 / (count + 1) as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn ethylene() -> Molecule {
        let mut molecule = Molecule::new();
        let mut c1 = SketchAtom::new(Element::CARBON, Point3::new(0.0, 0.0, 0.0));
        c1.implicit_hydrogens = 2;
        let mut c2 = SketchAtom::new(Element::CARBON, Point3::new(14.4, 0.0, 0.0));
        c2.implicit_hydrogens = 2;
        let a = molecule.add_atom(c1);
        let b = molecule.add_atom(c2);
        molecule.add_bond(a, b, BondOrder::Double).unwrap();
        molecule
    }

    #[test]
    fn add_bond_is_idempotent_and_rejects_unknown_atoms() {
        let mut molecule = ethylene();
        let ids: Vec<AtomId> = molecule.atoms_iter().map(|(id, _)| id).collect();
        assert!(molecule.add_bond(ids[1], ids[0], BondOrder::Double).is_some());
        assert_eq!(molecule.bonds().len(), 1);
        assert!(molecule.add_bond(ids[0], ids[0], BondOrder::Single).is_none());

        let mut other = Molecule::new();
        let foreign = (0..4)
            .map(|_| other.add_atom(SketchAtom::new(Element::OXYGEN, Point3::origin())))
            .last()
            .unwrap();
        assert!(molecule.add_bond(ids[0], foreign, BondOrder::Single).is_none());
    }

    #[test]
    fn formula_counts_implicit_hydrogens_in_hill_order() {
        let mut molecule = ethylene();
        assert_eq!(molecule.formula(), "C2H4");
        assert_eq!(molecule.hydrogen_count(), 4);

        let c_id = molecule.atoms_iter().next().unwrap().0;
        let mut oxygen = SketchAtom::new(Element::OXYGEN, Point3::new(-14.4, 0.0, 0.0));
        oxygen.implicit_hydrogens = 1;
        let o_id = molecule.add_atom(oxygen);
        molecule.add_bond(c_id, o_id, BondOrder::Single);
        molecule.add_atom(SketchAtom::new(
            "Br".parse().unwrap(),
            Point3::new(0.0, 14.4, 0.0),
        ));
        assert_eq!(molecule.formula(), "C2H5BrO");
    }

    #[test]
    fn formula_without_carbon_is_alphabetical() {
        let mut water = Molecule::new();
        let mut oxygen = SketchAtom::new(Element::OXYGEN, Point3::origin());
        oxygen.implicit_hydrogens = 2;
        water.add_atom(oxygen);
        assert_eq!(water.formula(), "H2O");
    }

    #[test]
    fn mean_bond_length_measures_drawn_bonds() {
        assert_eq!(ethylene().mean_bond_length(), Some(14.4));
        assert_eq!(Molecule::new().mean_bond_length(), None);
    }

    #[test]
    fn explicit_hydrogens_are_appended_after_heavy_atoms() {
        let molecule = ethylene();
        let expanded = molecule.with_explicit_hydrogens(0.5);

        assert_eq!(expanded.atom_count(), 6);
        assert_eq!(expanded.formula(), "C2H4");
        let elements: Vec<Element> = expanded.atoms_iter().map(|(_, a)| a.element).collect();
        assert_eq!(&elements[..2], &[Element::CARBON, Element::CARBON]);
        assert!(elements[2..].iter().all(|e| e.is_hydrogen()));
        assert!(expanded.atoms_iter().all(|(_, a)| a.implicit_hydrogens == 0));
        assert_eq!(expanded.bonds().len(), 5);

        let (c_id, carbon) = expanded.atoms_iter().next().unwrap();
        for &n in expanded.neighbors(c_id) {
            let neighbor = expanded.atom(n).unwrap();
            if neighbor.element.is_hydrogen() {
                let d = (neighbor.position - carbon.position).norm();
                assert!((d - 7.2).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn hydrogen_angles_fill_the_widest_gap() {
        let single = hydrogen_angles(&[0.0], 1);
        assert!((single[0] - PI).abs() < 1e-12);

        let benzene_like = hydrogen_angles(&[PI / 3.0, -PI / 3.0], 1);
        assert!((benzene_like[0] - PI).abs() < 1e-12);

        let lone = hydrogen_angles(&[], 4);
        assert_eq!(lone.len(), 4);
        assert!((lone[1] - PI / 2.0).abs() < 1e-12);

        assert!(hydrogen_angles(&[0.0], 0).is_empty());
    }
}
