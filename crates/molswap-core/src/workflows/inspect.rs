use crate::core::io::gro::GroFile;
use crate::core::io::ndx::NdxFile;
use crate::core::io::top::TopFile;
use crate::core::io::traits::CoordinateFile;
use crate::core::models::snapshot::{AssemblySnapshot, ReferencePoint};
use crate::core::models::subset::EligibleSubset;
use crate::core::models::topology::MoleculeBlock;
use crate::engine::config::{InputFiles, SpatialWindow};
use crate::engine::error::EngineError;
use tracing::{instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSummary {
    pub name: String,
    pub atom_count: usize,
    pub total_mass: f64,
    pub total_charge: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub name: String,
    pub atom_count: usize,
    /// Number of molecule instances the group maps onto; `None` when the group
    /// references atoms outside the system.
    pub instance_count: Option<usize>,
    /// How many of those instances have their reference point inside the window.
    pub in_window: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemSummary {
    pub title: String,
    pub system_name: String,
    pub atom_count: usize,
    pub instance_count: usize,
    pub templates: Vec<TemplateSummary>,
    pub blocks: Vec<MoleculeBlock>,
    pub groups: Vec<GroupSummary>,
}

/// Loads a system and summarizes it without changing anything.
///
/// # Errors
///
/// Returns [`EngineError`] if any input file cannot be read or the coordinates
/// do not match the topology.
#[instrument(skip_all, name = "inspect_workflow")]
pub fn run(
    files: &InputFiles,
    window: &SpatialWindow,
    reference: ReferencePoint,
) -> Result<SystemSummary, EngineError> {
    let topology = TopFile::read_from_path(&files.topology_path)?;
    let groups = NdxFile::read_from_path(&files.index_path)?;
    let (snapshot, metadata) = GroFile::read_from_path(&files.coordinates_path, topology)?;

    let mut templates: Vec<_> = snapshot
        .topology()
        .templates_iter()
        .map(|(_, t)| TemplateSummary {
            name: t.name.clone(),
            atom_count: t.atom_count(),
            total_mass: t.total_mass(),
            total_charge: t.total_charge(),
        })
        .collect();
    templates.sort_by(|a, b| a.name.cmp(&b.name));

    let group_summaries = groups
        .iter()
        .map(|(name, atoms)| {
            let subset = match EligibleSubset::from_group(&snapshot, &groups, name) {
                Ok(subset) => Some(subset),
                Err(e) => {
                    warn!("Skipping group '{}': {}", name, e);
                    None
                }
            };
            GroupSummary {
                name: name.to_string(),
                atom_count: atoms.len(),
                instance_count: subset.as_ref().map(EligibleSubset::size),
                in_window: subset
                    .as_ref()
                    .map(|s| count_in_window(&snapshot, s, window, reference)),
            }
        })
        .collect();

    Ok(SystemSummary {
        title: metadata.title,
        system_name: snapshot.topology().system_name.clone(),
        atom_count: snapshot.atom_count(),
        instance_count: snapshot.instance_count(),
        templates,
        blocks: snapshot.molecule_blocks(),
        groups: group_summaries,
    })
}

fn count_in_window(
    snapshot: &AssemblySnapshot,
    subset: &EligibleSubset,
    window: &SpatialWindow,
    reference: ReferencePoint,
) -> usize {
    let axis = window.axis.index();
    subset
        .members()
        .iter()
        .filter_map(|&i| snapshot.reference_point(i, reference).ok())
        .filter(|p| window.contains(p[axis]))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::replace::test_files::write_system;
    use tempfile::tempdir;

    #[test]
    fn summarizes_templates_blocks_and_groups() {
        let dir = tempdir().unwrap();
        write_system(
            dir.path(),
            &[0.50, 0.80, 1.20, 1.75, 0.30, 1.50, 2.50, 1.05, 0.95, 1.65],
        );
        let files = InputFiles {
            coordinates_path: dir.path().join("out.gro"),
            topology_path: dir.path().join("topol.top"),
            index_path: dir.path().join("index.ndx"),
        };

        let summary = run(&files, &SpatialWindow::default(), ReferencePoint::CenterOfMass).unwrap();

        assert_eq!(summary.title, "Ten waters and helium");
        assert_eq!(summary.system_name, "Water test");
        assert_eq!(summary.atom_count, 31);
        assert_eq!(summary.instance_count, 11);

        let names: Vec<_> = summary.templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["CO2", "He", "SOL"]);
        let sol = &summary.templates[2];
        assert_eq!(sol.atom_count, 3);
        assert!(sol.total_charge.abs() < 1e-12);

        let blocks: Vec<_> = summary
            .blocks
            .iter()
            .map(|b| (b.name.as_str(), b.count))
            .collect();
        assert_eq!(blocks, vec![("SOL", 10), ("He", 1)]);

        let sol_group = summary.groups.iter().find(|g| g.name == "SOL").unwrap();
        assert_eq!(sol_group.atom_count, 30);
        assert_eq!(sol_group.instance_count, Some(10));
        assert_eq!(sol_group.in_window, Some(4));

        let empty = summary.groups.iter().find(|g| g.name == "Empty").unwrap();
        assert_eq!(empty.instance_count, Some(0));
        assert_eq!(empty.in_window, Some(0));
    }
}
