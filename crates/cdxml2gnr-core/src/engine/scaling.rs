use super::config::PipelineConfig;
use super::error::EngineError;
use crate::core::models::element::Element;
use crate::core::models::structure::{Cell, Structure};
use nalgebra::Point3;
use tracing::{debug, info, instrument};

const MIN_EXTENT: f64 = 1e-6;

/// Places the structure in the working cell used for scale estimation.
///
/// The cell is `working_cell_xy_factor` times the x and y spread of the atoms and
/// `working_cell_z` along z, periodic in all directions. A spread too small to
/// span a cell (a molecule lying along one axis) falls back to `working_cell_z`.
/// Atom positions are not changed.
pub fn working_frame(structure: &Structure, config: &PipelineConfig) -> Structure {
    let extents = structure.extents();
    let side = |extent: f64| {
        let length = config.working_cell_xy_factor * extent;
        if length < MIN_EXTENT {
            config.working_cell_z
        } else {
            length
        }
    };
    let mut framed = structure.clone();
    framed.set_cell(Cell::orthorhombic(
        side(extents.x),
        side(extents.y),
        config.working_cell_z,
    ));
    framed.set_pbc([true; 3]);
    framed
}

/// Estimates the factor that brings the sketch's C-C bonds to `cc_equilibrium_bond`.
///
/// For every carbon the distance to its nearest other carbon is taken (plain
/// Cartesian distances, no periodic images). The most common of these distances
/// is assumed to be the drawn C-C bond length, so a few stretched or distorted
/// bonds do not shift the result.
///
/// # Errors
///
/// Returns [`EngineError::DegenerateGeometry`] if there are fewer than two carbon
/// atoms or the most common distance is zero.
#[instrument(skip_all, name = "estimate_scale_factor")]
pub fn estimate_scale_factor(structure: &Structure, config: &PipelineConfig) -> Result<f64, EngineError> {
    let carbons: Vec<Point3<f64>> = structure
        .atoms()
        .iter()
        .filter(|a| a.element == Element::CARBON)
        .map(|a| a.position)
        .collect();
    if carbons.len() < 2 {
        return Err(EngineError::DegenerateGeometry(format!(
            "scale estimation needs at least two carbon atoms, found {}",
            carbons.len()
        )));
    }

    let nearest: Vec<f64> = carbons
        .iter()
        .enumerate()
        .map(|(i, p)| {
            carbons
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, q)| (p - q).norm())
                .fold(f64::INFINITY, f64::min)
        })
        .collect();

    let mode = tolerant_mode(&nearest, config.mode_tolerance).ok_or_else(|| {
        EngineError::DegenerateGeometry("no nearest-neighbor distances".to_string())
    })?;
    if !(mode.is_finite() && mode > 0.0) {
        return Err(EngineError::DegenerateGeometry(format!(
            "most common C-C distance is {mode}; carbon atoms overlap"
        )));
    }

    let factor = config.cc_equilibrium_bond / mode;
    info!(carbons = carbons.len(), mode, factor, "Estimated scale factor.");
    Ok(factor)
}

/// Scales the first two lattice vectors by `factor`, carrying the atoms along, and re-centers.
///
/// The third lattice vector is left as is, so a flat molecule keeps its vacuum
/// layer. The input structure is not modified.
///
/// # Errors
///
/// Returns [`EngineError::DegenerateGeometry`] if the factor is not a positive
/// number or the structure has no usable cell.
#[instrument(skip_all, name = "scale_structure", fields(factor))]
pub fn scale_structure(structure: &Structure, factor: f64) -> Result<Structure, EngineError> {
    if !(factor.is_finite() && factor > 0.0) {
        return Err(EngineError::DegenerateGeometry(format!(
            "invalid scale factor {factor}"
        )));
    }
    let cell = structure.cell().ok_or_else(|| {
        EngineError::DegenerateGeometry("cannot scale a structure without a cell".to_string())
    })?;
    let new_cell = cell.with_scaled_vector(0, factor).with_scaled_vector(1, factor);

    let mut scaled = structure.clone();
    scaled
        .set_cell_scaled(new_cell)
        .and_then(|()| scaled.center())
        .map_err(|e| EngineError::DegenerateGeometry(format!("scaling: {e}")))?;
    debug!(cell = ?new_cell.lengths(), "Structure scaled.");
    Ok(scaled)
}

/// Most frequent value, treating values within `tolerance` of a group's smallest
/// member as equal. Ties go to the smaller group; the group's smallest member is returned.
fn tolerant_mode(values: &[f64], tolerance: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut best: Option<(f64, usize)> = None;
    let mut start = 0;
    while start < sorted.len() {
        let head = sorted[start];
        let end = sorted[start..]
            .iter()
            .position(|&v| v - head > tolerance)
            .map_or(sorted.len(), |offset| start + offset);
        let count = end - start;
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((head, count));
        }
        start = end;
    }
    best.map(|(value, _)| value)
}
