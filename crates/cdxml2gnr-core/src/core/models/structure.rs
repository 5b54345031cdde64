use super::atom::Atom;
use super::element::Element;
use super::molecule::hill_formula;
use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StructureError {
    #[error("Operation requires a unit cell, but the structure has none")]
    MissingCell,
    #[error("Unit cell is singular (volume {volume:.3e})")]
    SingularCell { volume: f64 },
}

/// A unit cell defined by three lattice vectors, stored as matrix rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    matrix: Matrix3<f64>,
}

impl Cell {
    const SINGULAR_VOLUME: f64 = 1e-12;

    /// Creates a cell from three lattice vectors.
    pub fn from_vectors(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Self {
        Self {
            matrix: Matrix3::from_rows(&[a.transpose(), b.transpose(), c.transpose()]),
        }
    }

    /// Creates a rectangular cell with the given edge lengths along x, y and z.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self {
            matrix: Matrix3::from_diagonal(&Vector3::new(a, b, c)),
        }
    }

    /// Lattice vector `i` (0 = a, 1 = b, 2 = c).
    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.matrix.row(i).transpose()
    }

    pub fn vectors(&self) -> [Vector3<f64>; 3] {
        [self.vector(0), self.vector(1), self.vector(2)]
    }

    pub fn lengths(&self) -> Vector3<f64> {
        Vector3::new(
            self.vector(0).norm(),
            self.vector(1).norm(),
            self.vector(2).norm(),
        )
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    pub fn is_singular(&self) -> bool {
        self.volume() < Self::SINGULAR_VOLUME
    }

    /// Returns a copy with lattice vector `i` multiplied by `factor`.
    pub fn with_scaled_vector(&self, i: usize, factor: f64) -> Self {
        let mut matrix = self.matrix;
        let scaled = matrix.row(i) * factor;
        matrix.set_row(i, &scaled);
        Self { matrix }
    }

    /// Cartesian position of a point given in fractional coordinates.
    pub fn to_cartesian(&self, fractional: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix.transpose() * fractional)
    }

    /// Cartesian displacement of an integer lattice translation.
    pub fn translation(&self, offset: &[i32; 3]) -> Vector3<f64> {
        self.matrix.transpose()
            * Vector3::new(
                f64::from(offset[0]),
                f64::from(offset[1]),
                f64::from(offset[2]),
            )
    }

    /// Fractional coordinates of a Cartesian point.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::SingularCell`] if the lattice vectors are (nearly) coplanar.
    pub fn to_fractional(&self, position: &Point3<f64>) -> Result<Vector3<f64>, StructureError> {
        let inverse = self.inverse_transpose()?;
        Ok(inverse * position.coords)
    }

    /// Distances between opposite faces of the cell, one per lattice direction.
    pub fn plane_spacings(&self) -> Vector3<f64> {
        let [a, b, c] = self.vectors();
        let volume = self.volume();
        let spacing = |u: Vector3<f64>, v: Vector3<f64>| {
            let area = u.cross(&v).norm();
            if area > 0.0 { volume / area } else { 0.0 }
        };
        Vector3::new(spacing(b, c), spacing(c, a), spacing(a, b))
    }

    fn inverse_transpose(&self) -> Result<Matrix3<f64>, StructureError> {
        if self.is_singular() {
            return Err(StructureError::SingularCell {
                volume: self.volume(),
            });
        }
        self.matrix
            .transpose()
            .try_inverse()
            .ok_or(StructureError::SingularCell {
                volume: self.volume(),
            })
    }
}

/// A three-dimensional atomic structure with an optional periodic cell.
///
/// Atom order is significant: atom indices are how callers refer to atoms
/// (for example the two reference atoms of a periodic cell), and every
/// operation either preserves the order or documents how it changes it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Structure {
    atoms: Vec<Atom>,
    cell: Option<Cell>,
    pbc: [bool; 3],
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        Self {
            atoms,
            ..Self::default()
        }
    }

    pub fn push(&mut self, element: Element, position: Point3<f64>) -> usize {
        self.atoms.push(Atom::new(element, position));
        self.atoms.len() - 1
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn cell(&self) -> Option<&Cell> {
        self.cell.as_ref()
    }

    /// Replaces the cell without moving any atom.
    pub fn set_cell(&mut self, cell: Cell) {
        self.cell = Some(cell);
    }

    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    pub fn set_pbc(&mut self, pbc: [bool; 3]) {
        self.pbc = pbc;
    }

    pub fn count(&self, element: Element) -> usize {
        self.atoms.iter().filter(|a| a.element == element).count()
    }

    /// Molecular formula in Hill order.
    pub fn formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.element.symbol()).or_default() += 1;
        }
        hill_formula(&counts)
    }

    /// Axis-aligned bounding box as `(min, max)` corners, or `None` for an empty structure.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.atoms.first()?.position;
        Some(self.atoms.iter().fold((first, first), |(lo, hi), atom| {
            (lo.inf(&atom.position), hi.sup(&atom.position))
        }))
    }

    /// Peak-to-peak spread of the coordinates along each Cartesian axis.
    pub fn extents(&self) -> Vector3<f64> {
        self.bounding_box()
            .map(|(lo, hi)| hi - lo)
            .unwrap_or_else(Vector3::zeros)
    }

    pub fn translate(&mut self, displacement: &Vector3<f64>) {
        for atom in &mut self.atoms {
            atom.position += displacement;
        }
    }

    /// Rotates every atom about `center`. The cell is left untouched.
    pub fn rotate_about(&mut self, rotation: &Rotation3<f64>, center: &Point3<f64>) {
        for atom in &mut self.atoms {
            atom.position = center + rotation * (atom.position - center);
        }
    }

    /// Moves the atoms so their bounding box sits in the middle of the cell.
    ///
    /// The midpoint is taken in fractional coordinates, so non-orthogonal cells are
    /// handled the same way as rectangular ones.
    ///
    /// # Errors
    ///
    /// Fails if the structure has no cell or the cell is singular.
    pub fn center(&mut self) -> Result<(), StructureError> {
        let cell = self.cell.ok_or(StructureError::MissingCell)?;
        if self.atoms.is_empty() {
            return Ok(());
        }
        let fractional = self.fractional_positions(&cell)?;
        let mut lo = fractional[0];
        let mut hi = fractional[0];
        for f in &fractional {
            lo = lo.inf(f);
            hi = hi.sup(f);
        }
        let shift = Vector3::repeat(0.5) - (lo + hi) / 2.0;
        let displacement = cell.to_cartesian(&shift).coords;
        self.translate(&displacement);
        Ok(())
    }

    /// Replaces the cell and maps every atom onto it through its fractional coordinates.
    ///
    /// # Errors
    ///
    /// Fails if the structure has no cell or the current cell is singular.
    pub fn set_cell_scaled(&mut self, new_cell: Cell) -> Result<(), StructureError> {
        let cell = self.cell.ok_or(StructureError::MissingCell)?;
        let fractional = self.fractional_positions(&cell)?;
        for (atom, f) in self.atoms.iter_mut().zip(&fractional) {
            atom.position = new_cell.to_cartesian(f);
        }
        self.cell = Some(new_cell);
        Ok(())
    }

    /// Wraps atoms back into the cell along periodic directions.
    ///
    /// Fractional coordinates end up in `[-eps, 1 - eps)`, so atoms sitting on the
    /// upper boundary within `eps` are mapped to the lower one instead of producing
    /// an image pair at both faces.
    ///
    /// # Errors
    ///
    /// Fails if the structure has no cell or the cell is singular.
    pub fn wrap(&mut self, eps: f64) -> Result<(), StructureError> {
        let cell = self.cell.ok_or(StructureError::MissingCell)?;
        let fractional = self.fractional_positions(&cell)?;
        for (atom, mut f) in self.atoms.iter_mut().zip(fractional) {
            for axis in 0..3 {
                if self.pbc[axis] {
                    f[axis] = (f[axis] + eps).rem_euclid(1.0) - eps;
                }
            }
            atom.position = cell.to_cartesian(&f);
        }
        Ok(())
    }

    /// Removes the atoms at `indices` in one pass.
    ///
    /// Duplicate and out-of-range indices are ignored. Remaining atoms keep their
    /// relative order. Returns the number of atoms removed.
    pub fn remove_atoms(&mut self, indices: &[usize]) -> usize {
        let doomed: BTreeSet<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.atoms.len())
            .collect();
        let mut index = 0;
        self.atoms.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });
        doomed.len()
    }

    fn fractional_positions(&self, cell: &Cell) -> Result<Vec<Vector3<f64>>, StructureError> {
        let inverse = cell.inverse_transpose()?;
        Ok(self.atoms.iter().map(|a| inverse * a.position.coords).collect())
    }
}
