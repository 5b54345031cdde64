use crate::core::models::molecule::Molecule;
use crate::core::models::structure::Structure;
use crate::engine::cell::{PeriodicCell, construct_cell};
use crate::engine::config::PipelineConfig;
use crate::engine::embedding::embed_molecule;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scaling::{estimate_scale_factor, scale_structure, working_frame};
use tracing::{info, instrument};

/// Converts a parsed molecule into a scaled 3D structure.
///
/// With `explicit_hydrogens` enabled the molecule's implicit hydrogens become
/// atoms first, placed after all heavy atoms.
///
/// # Errors
///
/// Returns [`EngineError::DegenerateGeometry`] if the molecule cannot be embedded
/// or has too few carbon atoms to estimate a scale.
#[instrument(skip_all, name = "fragment_to_structure")]
pub fn fragment_to_structure(
    molecule: &Molecule,
    config: &PipelineConfig,
    reporter: &ProgressReporter,
) -> Result<Structure, EngineError> {
    if config.explicit_hydrogens {
        let expanded = molecule.with_explicit_hydrogens(config.hydrogen_length_ratio());
        scaled_structure(&expanded, config, reporter)
    } else {
        scaled_structure(molecule, config, reporter)
    }
}

/// Converts a parsed molecule into a periodic cell repeating from atom `id1` to atom `id2`.
///
/// The cell is cut from the heavy-atom skeleton; atom indices refer to the
/// molecule's atoms in document order. Hydrogens are added by the cell
/// construction itself wherever a carbon or nitrogen is left under-coordinated.
///
/// # Errors
///
/// Returns the errors of [`fragment_to_structure`] and
/// [`construct_cell`](crate::engine::cell::construct_cell).
#[instrument(skip_all, name = "periodic_structure", fields(id1, id2))]
pub fn periodic_structure(
    molecule: &Molecule,
    id1: usize,
    id2: usize,
    config: &PipelineConfig,
    reporter: &ProgressReporter,
) -> Result<PeriodicCell, EngineError> {
    let skeleton = scaled_structure(molecule, config, reporter)?;
    let cell = reporter.phase("Periodic cell", || construct_cell(&skeleton, id1, id2, config))?;
    reporter.report(Progress::Message(format!(
        "Removed {} periodic duplicate(s), added {} hydrogen(s)",
        cell.removed_duplicates.len(),
        cell.added_hydrogens.len()
    )));
    Ok(cell)
}

fn scaled_structure(
    molecule: &Molecule,
    config: &PipelineConfig,
    reporter: &ProgressReporter,
) -> Result<Structure, EngineError> {
    let embedded = reporter.phase("Embedding", || embed_molecule(molecule, config))?;
    reporter.phase("Scaling", || {
        let framed = working_frame(&embedded, config);
        let factor = estimate_scale_factor(&framed, config)?;
        reporter.report(Progress::Message(format!("Scale factor: {factor:.6}")));
        let scaled = scale_structure(&framed, factor)?;
        info!(formula = %scaled.formula(), "Structure derived.");
        Ok(scaled)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::cdxml::parse_fragment;
    use crate::core::io::cdxml::tests::{BENZENE_FRAGMENT, ETHYLENE_FRAGMENT};
    use crate::core::models::element::Element;
    use std::sync::Mutex;

    fn nearest_carbon_distances(structure: &Structure) -> Vec<f64> {
        let carbons: Vec<_> = structure
            .atoms()
            .iter()
            .filter(|a| a.element == Element::CARBON)
            .map(|a| a.position)
            .collect();
        carbons
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
            .collect()
    }

    #[test]
    fn benzene_becomes_scaled_c6h6() {
        let molecule = parse_fragment(BENZENE_FRAGMENT).unwrap();
        let structure =
            fragment_to_structure(&molecule, &PipelineConfig::default(), &ProgressReporter::new())
                .unwrap();

        assert_eq!(structure.count(Element::CARBON), 6);
        assert_eq!(structure.count(Element::HYDROGEN), 6);
        assert!(structure.cell().is_some());
        assert_eq!(structure.pbc(), [true; 3]);
        for d in nearest_carbon_distances(&structure) {
            assert!((d - 1.4313333333).abs() < 1e-3, "C-C distance {d}");
        }
        for h in structure.atoms().iter().filter(|a| a.element.is_hydrogen()) {
            let nearest = structure
                .atoms()
                .iter()
                .filter(|a| a.element == Element::CARBON)
                .map(|c| (c.position - h.position).norm())
                .fold(f64::INFINITY, f64::min);
            assert!((nearest - 1.09).abs() < 1e-2, "C-H distance {nearest}");
        }
    }

    #[test]
    fn hydrogens_can_stay_implicit() {
        let molecule = parse_fragment(ETHYLENE_FRAGMENT).unwrap();
        let config = PipelineConfig {
            explicit_hydrogens: false,
            ..PipelineConfig::default()
        };
        let structure = fragment_to_structure(&molecule, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(structure.formula(), "C2");
        let d = (structure.atoms()[0].position - structure.atoms()[1].position).norm();
        assert!((d - 1.4313333333).abs() < 1e-9);
    }

    #[test]
    fn deriving_twice_is_identical() {
        let molecule = parse_fragment(BENZENE_FRAGMENT).unwrap();
        let config = PipelineConfig::default();
        let reporter = ProgressReporter::new();
        let first = fragment_to_structure(&molecule, &config, &reporter).unwrap();
        let second = fragment_to_structure(&molecule, &config, &reporter).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn phases_are_reported_in_order() {
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));
        let molecule = parse_fragment(ETHYLENE_FRAGMENT).unwrap();
        fragment_to_structure(&molecule, &PipelineConfig::default(), &reporter).unwrap();
        drop(reporter);
        assert_eq!(phases.into_inner().unwrap(), vec!["Embedding", "Scaling"]);
    }
}
