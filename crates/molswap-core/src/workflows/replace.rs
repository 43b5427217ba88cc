use crate::core::io::gro::{GroFile, GroMetadata};
use crate::core::io::ndx::NdxFile;
use crate::core::io::report::ReportRow;
use crate::core::io::top::TopFile;
use crate::core::io::traits::CoordinateFile;
use crate::core::models::ids::TemplateId;
use crate::core::models::snapshot::AssemblySnapshot;
use crate::core::models::subset::EligibleSubset;
use crate::core::models::topology::MoleculeBlock;
use crate::engine::config::ReplaceConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::replacement::{ReplacementEngine, ReplacementOutcome, ReplacementRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct ReplaceResult {
    /// The system after replacement.
    pub snapshot: AssemblySnapshot,
    /// Title and box line of the input coordinate file.
    pub metadata: GroMetadata,
    pub outcome: ReplacementOutcome,
    /// The seed the random source was created from.
    pub seed: u64,
    pub replacement: TemplateId,
}

impl ReplaceResult {
    /// Title for the output frame: `description`, or the input title when it is empty.
    pub fn output_title<'s>(&'s self, description: &'s str) -> &'s str {
        if description.is_empty() {
            &self.metadata.title
        } else {
            description
        }
    }

    /// The `[ molecules ]` composition matching the replaced system.
    pub fn molecule_blocks(&self) -> Vec<MoleculeBlock> {
        self.snapshot.molecule_blocks()
    }

    /// One report row per replaced instance, in replacement order.
    pub fn report_rows(&self) -> Vec<ReportRow> {
        let topology = self.snapshot.topology();
        let name_of = |id| topology.template(id).map_or("", |t| t.name.as_str()).to_string();
        self.outcome
            .replacements
            .iter()
            .map(|r| ReportRow {
                instance: r.instance + 1,
                first_atom: self
                    .snapshot
                    .instance(r.instance)
                    .map_or(0, |inst| inst.offset() + 1),
                previous: name_of(r.previous),
                replacement: name_of(self.replacement),
                x: r.reference.x,
                y: r.reference.y,
                z: r.reference.z,
            })
            .collect()
    }
}

/// Loads the configured system and replaces molecules of the configured group.
///
/// # Errors
///
/// Returns [`EngineError`] if an input file cannot be read, the replacement
/// molecule or the group is unknown, the engine rejects the run, or (in strict
/// mode) fewer molecules than requested were replaced.
#[instrument(skip_all, name = "replace_workflow", fields(group = %config.group, molecule = %config.molecule))]
pub fn run(config: &ReplaceConfig, reporter: &ProgressReporter) -> Result<ReplaceResult, EngineError> {
    let (mut snapshot, metadata, mut subset, replacement) =
        reporter.phase("Loading Inputs", || load_inputs(config))?;

    let seed = config.sampling.seed.unwrap_or_else(|| rand::thread_rng().r#gen::<u64>());
    info!("Random seed: {}", seed);
    reporter.report(Progress::Message(format!("Random seed: {}", seed)));
    let mut rng = StdRng::seed_from_u64(seed);

    let request = ReplacementRequest::from_config(config);
    let outcome = ReplacementEngine::new(reporter).run(
        &mut snapshot,
        &mut subset,
        replacement,
        &request,
        &mut rng,
    )?;

    if config.strict && !outcome.is_complete() {
        return Err(EngineError::Incomplete {
            requested: outcome.requested,
            replaced: outcome.replaced_count,
            attempts: outcome.attempt_count,
        });
    }

    Ok(ReplaceResult {
        snapshot,
        metadata,
        outcome,
        seed,
        replacement,
    })
}

fn load_inputs(
    config: &ReplaceConfig,
) -> Result<(AssemblySnapshot, GroMetadata, EligibleSubset, TemplateId), EngineError> {
    info!("Reading topology from {:?}.", config.files.topology_path);
    let topology = TopFile::read_from_path(&config.files.topology_path)?;
    let replacement = topology
        .find(&config.molecule)
        .map_err(|_| EngineError::TemplateNotFound(config.molecule.clone()))?;

    info!("Reading index groups from {:?}.", config.files.index_path);
    let groups = NdxFile::read_from_path(&config.files.index_path)?;

    info!("Reading coordinates from {:?}.", config.files.coordinates_path);
    let (snapshot, metadata) = GroFile::read_from_path(&config.files.coordinates_path, topology)?;

    let subset = EligibleSubset::from_group(&snapshot, &groups, &config.group)?;
    info!(
        "Group '{}' maps onto {} molecule(s) out of {}.",
        config.group,
        subset.size(),
        snapshot.instance_count()
    );
    Ok((snapshot, metadata, subset, replacement))
}

#[cfg(test)]
pub(crate) mod test_files {
    use std::fmt::Write;
    use std::fs;
    use std::path::Path;

    pub(crate) const TOPOLOGY: &str = "\
[ atomtypes ]
OW 8 15.9994 0.0 A 0.315 0.636
HW 1 1.008 0.0 A 0.0 0.0
He 2 4.0026 0.0 A 0.256 0.084
C 6 12.011 0.0 A 0.350 0.276
[ moleculetype ]
SOL 2
[ atoms ]
1 OW 1 SOL OW 1 -0.82
2 HW 1 SOL HW1 1 0.41
3 HW 1 SOL HW2 1 0.41
[ moleculetype ]
He 1
[ atoms ]
1 He 1 HE He 1 0.0
[ moleculetype ]
CO2 1
[ atoms ]
1 C 1 CO2 C 1 0.7
2 OW 1 CO2 O1 1 -0.35
3 OW 1 CO2 O2 1 -0.35
[ system ]
Water test
[ molecules ]
SOL 10
He 1
";

    /// Writes `topol.top`, `index.ndx` and `out.gro` for ten waters with the
    /// given z coordinates followed by one helium atom.
    pub(crate) fn write_system(dir: &Path, z_values: &[f64; 10]) {
        fs::write(dir.join("topol.top"), TOPOLOGY).unwrap();

        let mut gro = String::from("Ten waters and helium\n   31\n");
        let mut serial = 1;
        for (i, z) in z_values.iter().enumerate() {
            for name in ["OW", "HW1", "HW2"] {
                writeln!(
                    gro,
                    "{:>5}{:<5}{:>5}{:>5}{:8.3}{:8.3}{:8.3}",
                    i + 1,
                    "SOL",
                    name,
                    serial,
                    i as f64 * 0.3,
                    0.0,
                    z
                )
                .unwrap();
                serial += 1;
            }
        }
        writeln!(gro, "{:>5}{:<5}{:>5}{:>5}{:8.3}{:8.3}{:8.3}", 11, "HE", "He", 31, 2.9, 2.9, 2.9).unwrap();
        gro.push_str("   3.00000   3.00000   3.00000\n");
        fs::write(dir.join("out.gro"), gro).unwrap();

        let sol: Vec<String> = (1..=30).map(|n| n.to_string()).collect();
        fs::write(
            dir.join("index.ndx"),
            format!("[ System ]\n{} 31\n[ SOL ]\n{}\n[ Empty ]\n", sol.join(" "), sol.join(" ")),
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_files::write_system;
    use super::*;
    use crate::core::io::gro::GroFile;
    use crate::engine::config::ReplaceConfigBuilder;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    const TEN_Z: [f64; 10] = [0.50, 0.80, 1.20, 1.75, 0.30, 1.50, 2.50, 1.05, 0.95, 1.65];

    fn config(dir: &Path, molecule: &str, group: &str, count: usize) -> ReplaceConfigBuilder {
        ReplaceConfigBuilder::new()
            .coordinates_path(dir.join("out.gro"))
            .topology_path(dir.join("topol.top"))
            .index_path(dir.join("index.ndx"))
            .group(group)
            .molecule(molecule)
            .count(count)
            .seed(Some(1234))
    }

    #[test]
    fn replaces_molecules_and_reports_them() {
        let dir = tempdir().unwrap();
        write_system(dir.path(), &TEN_Z);
        let config = config(dir.path(), "CO2", "SOL", 3).build().unwrap();

        let result = run(&config, &ProgressReporter::new()).unwrap();

        assert_eq!(result.seed, 1234);
        assert_eq!(result.outcome.replaced_count, 3);
        let rows = result.report_rows();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.previous, "SOL");
            assert_eq!(row.replacement, "CO2");
            assert!([3, 6, 8, 10].contains(&row.instance));
            assert_eq!(row.first_atom, (row.instance - 1) * 3 + 1);
        }
        let total: usize = result.molecule_blocks().iter().map(|b| b.count).sum();
        assert_eq!(total, 11);
        assert_eq!(result.output_title(""), "Ten waters and helium");
        assert_eq!(result.output_title("new"), "new");
    }

    #[test]
    fn written_output_reads_back_with_updated_composition() {
        let dir = tempdir().unwrap();
        write_system(dir.path(), &TEN_Z);
        let config = config(dir.path(), "CO2", "SOL", 2).build().unwrap();
        let result = run(&config, &ProgressReporter::new()).unwrap();

        let out = dir.path().join("conf.gro");
        let metadata = GroMetadata {
            title: result.output_title("").to_string(),
            ..result.metadata.clone()
        };
        GroFile::write_to_path(&result.snapshot, &metadata, &out).unwrap();

        let mut topology = TopFile::read_from_path(dir.path().join("topol.top")).unwrap();
        let mut rebuilt = crate::core::models::topology::Topology::new();
        rebuilt.system_name = topology.system_name.clone();
        for name in ["SOL", "He", "CO2"] {
            let id = topology.find(name).unwrap();
            let template = topology.template(id).unwrap().clone();
            rebuilt.add_template(template).unwrap();
        }
        for block in result.molecule_blocks() {
            rebuilt.push_block(&block.name, block.count);
        }
        topology = rebuilt;

        let (reread, _) = GroFile::read_from_path(&out, topology).unwrap();
        let co2 = (0..reread.instance_count())
            .filter(|&i| reread.template_of(i).unwrap().name == "CO2")
            .count();
        assert_eq!(co2, 2);
        assert_eq!(reread.positions(), result.snapshot.positions());
    }

    #[test]
    fn seed_is_announced_through_the_reporter() {
        let dir = tempdir().unwrap();
        write_system(dir.path(), &TEN_Z);
        let config = config(dir.path(), "CO2", "SOL", 1).build().unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = ProgressReporter::with_callback(Box::new(move |e: Progress| {
            sink.lock().unwrap().push(e);
        }));
        run(&config, &reporter).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            events[..2],
            [
                Progress::PhaseStart {
                    name: "Loading Inputs"
                },
                Progress::PhaseFinish
            ]
        );
        assert_eq!(events[2], Progress::Message("Random seed: 1234".to_string()));
    }

    #[test]
    fn same_seed_reproduces_the_same_selection() {
        let dir = tempdir().unwrap();
        write_system(dir.path(), &TEN_Z);
        let config = config(dir.path(), "CO2", "SOL", 2).build().unwrap();
        let a = run(&config, &ProgressReporter::new()).unwrap();
        let b = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(a.outcome.replaced_instances, b.outcome.replaced_instances);
    }

    #[test]
    fn unknown_replacement_molecule_is_reported_by_name() {
        let dir = tempdir().unwrap();
        write_system(dir.path(), &TEN_Z);
        let config = config(dir.path(), "Ar", "SOL", 1).build().unwrap();
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(EngineError::TemplateNotFound(name)) if name == "Ar"
        ));
    }

    #[test]
    fn empty_group_is_an_empty_pool() {
        let dir = tempdir().unwrap();
        write_system(dir.path(), &TEN_Z);
        let config = config(dir.path(), "CO2", "Empty", 1).build().unwrap();
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(EngineError::EmptyPool { .. })
        ));
    }

    #[test]
    fn group_containing_other_molecule_sizes_is_rejected() {
        let dir = tempdir().unwrap();
        write_system(dir.path(), &TEN_Z);
        let config = config(dir.path(), "CO2", "System", 1).build().unwrap();
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(EngineError::Snapshot { .. })
        ));
    }

    #[test]
    fn strict_mode_turns_shortfall_into_error() {
        let dir = tempdir().unwrap();
        write_system(dir.path(), &TEN_Z);
        let lenient = config(dir.path(), "CO2", "SOL", 6)
            .max_attempts(500)
            .build()
            .unwrap();
        let result = run(&lenient, &ProgressReporter::new()).unwrap();
        assert_eq!(result.outcome.replaced_count, 4);

        let strict = config(dir.path(), "CO2", "SOL", 6)
            .max_attempts(500)
            .strict(true)
            .build()
            .unwrap();
        assert!(matches!(
            run(&strict, &ProgressReporter::new()),
            Err(EngineError::Incomplete {
                requested: 6,
                replaced: 4,
                attempts: 500
            })
        ));
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let dir = tempdir().unwrap();
        let config = config(dir.path(), "CO2", "SOL", 1).build().unwrap();
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(EngineError::Topology { .. })
        ));
    }
}
