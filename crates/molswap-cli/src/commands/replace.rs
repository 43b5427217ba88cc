use crate::cli::ReplaceArgs;
use crate::config::{PartialReplaceConfig, ResolvedReplace};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use molswap::core::io::gro::{GroFile, GroMetadata};
use molswap::core::io::report::write_report_to_path;
use molswap::core::io::top::write_molecules_section;
use molswap::core::io::traits::CoordinateFile;
use molswap::engine::error::EngineError;
use molswap::engine::progress::ProgressReporter;
use molswap::workflows::replace::{self, ReplaceResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, info, warn};

pub fn run(args: ReplaceArgs, quiet: bool) -> Result<()> {
    info!("Starting 'replace' command.");
    let file_config = match &args.config {
        Some(path) => PartialReplaceConfig::from_file(path)?,
        None => PartialReplaceConfig::default(),
    };
    let resolved = file_config.merge_with_cli(&args)?;
    debug!("Resolved configuration: {:?}", resolved);

    let handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(handler.get_callback());

    let result = replace::run(&resolved.core, &reporter)?;
    write_outputs(&resolved, &result)?;

    if !quiet {
        print_summary(&resolved, &result);
    }
    Ok(())
}

fn write_outputs(resolved: &ResolvedReplace, result: &ReplaceResult) -> Result<()> {
    let metadata = GroMetadata {
        title: result.output_title(&resolved.description).to_string(),
        box_line: result.metadata.box_line.clone(),
    };
    GroFile::write_to_path(&result.snapshot, &metadata, &resolved.output)
        .map_err(EngineError::from)?;
    info!("Wrote coordinates to {:?}.", resolved.output);

    if let Some(path) = &resolved.report {
        write_report_to_path(path, &result.report_rows())?;
        info!("Wrote replacement report to {:?}.", path);
    }

    if let Some(path) = &resolved.molecules_out {
        let mut writer = BufWriter::new(File::create(path)?);
        write_molecules_section(&mut writer, &result.molecule_blocks())?;
        writer.flush()?;
        info!("Wrote [ molecules ] section to {:?}.", path);
    }
    Ok(())
}

fn print_summary(resolved: &ResolvedReplace, result: &ReplaceResult) {
    let outcome = &result.outcome;
    println!(
        "Replaced {} of {} '{}' molecule(s) with '{}' in {} attempt(s) (seed {}).",
        outcome.replaced_count,
        outcome.requested,
        resolved.core.group,
        resolved.core.molecule,
        outcome.attempt_count,
        result.seed
    );
    if !outcome.is_complete() {
        warn!(
            "Requested {} replacements but only {} molecules in {} were selected.",
            outcome.requested, outcome.replaced_count, resolved.core.window
        );
        println!(
            "⚠️  Only {} of {} requested molecules were replaced; try a larger --max-attempts or a wider window.",
            outcome.replaced_count, outcome.requested
        );
    }
    println!("Coordinates written to {}.", resolved.output.display());
    println!("Update the [ molecules ] section of your topology:");
    for block in result.molecule_blocks() {
        println!("  {:<18}{:>6}", block.name, block.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fmt::Write as _;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const TOPOLOGY: &str = "\
[ atomtypes ]
OW 8 15.9994 0.0 A 0.315 0.636
HW 1 1.008 0.0 A 0.0 0.0
C 6 12.011 0.0 A 0.350 0.276
[ moleculetype ]
SOL 2
[ atoms ]
1 OW 1 SOL OW 1 -0.82
2 HW 1 SOL HW1 1 0.41
3 HW 1 SOL HW2 1 0.41
[ moleculetype ]
CO2 1
[ atoms ]
1 C 1 CO2 C 1 0.7
2 OW 1 CO2 O1 1 -0.35
3 OW 1 CO2 O2 1 -0.35
[ system ]
Four waters
[ molecules ]
SOL 4
";

    /// Four waters; the second and fourth sit inside the default window.
    fn write_system(dir: &Path) {
        fs::write(dir.join("topol.top"), TOPOLOGY).unwrap();
        let mut gro = String::from("Four waters\n   12\n");
        for (i, z) in [0.40, 1.30, 2.20, 1.45].iter().enumerate() {
            for (j, name) in ["OW", "HW1", "HW2"].iter().enumerate() {
                writeln!(
                    gro,
                    "{:>5}{:<5}{:>5}{:>5}{:8.3}{:8.3}{:8.3}",
                    i + 1,
                    "SOL",
                    name,
                    i * 3 + j + 1,
                    i as f64 * 0.5,
                    0.2,
                    z
                )
                .unwrap();
            }
        }
        gro.push_str("   2.00000   2.00000   3.00000\n");
        fs::write(dir.join("out.gro"), gro).unwrap();
        fs::write(dir.join("index.ndx"), "[ SOL ]\n1 2 3 4 5 6 7 8 9 10 11 12\n").unwrap();
    }

    fn args(dir: &Path, count: usize) -> ReplaceArgs {
        ReplaceArgs {
            input: Some(dir.join("out.gro")),
            output: Some(dir.join("conf.gro")),
            topology: Some(dir.join("topol.top")),
            index: Some(dir.join("index.ndx")),
            molecule: Some("CO2".to_string()),
            count: Some(count),
            seed: Some(11),
            report: Some(dir.join("replaced.csv")),
            molecules_out: Some(dir.join("molecules.itp")),
            ..Default::default()
        }
    }

    #[test]
    fn replace_writes_coordinates_report_and_molecules_section() {
        let dir = tempdir().unwrap();
        write_system(dir.path());

        run(
            ReplaceArgs {
                description: Some("Two CO2 in the slab".to_string()),
                ..args(dir.path(), 2)
            },
            true,
        )
        .unwrap();

        let gro = fs::read_to_string(dir.path().join("conf.gro")).unwrap();
        let lines: Vec<_> = gro.lines().collect();
        assert_eq!(lines[0], "Two CO2 in the slab");
        assert_eq!(lines[1].trim(), "12");
        assert_eq!(lines.len(), 15);
        assert_eq!(lines[14], "   2.00000   2.00000   3.00000");
        assert!(lines[2].starts_with("    1SOL"));
        assert!(lines[5].starts_with("    2CO2"));
        assert!(lines[8].starts_with("    3SOL"));
        assert!(lines[11].starts_with("    4CO2"));

        let report = fs::read_to_string(dir.path().join("replaced.csv")).unwrap();
        let rows: Vec<_> = report.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("instance,"));

        let molecules = fs::read_to_string(dir.path().join("molecules.itp")).unwrap();
        let counts: Vec<_> = molecules
            .lines()
            .skip(2)
            .map(|l| l.split_whitespace().collect::<Vec<_>>())
            .collect();
        assert_eq!(counts, vec![vec!["SOL", "1"], vec!["CO2", "1"], vec!["SOL", "1"], vec!["CO2", "1"]]);
    }

    #[test]
    fn empty_description_keeps_input_title() {
        let dir = tempdir().unwrap();
        write_system(dir.path());

        run(args(dir.path(), 1), true).unwrap();

        let gro = fs::read_to_string(dir.path().join("conf.gro")).unwrap();
        assert_eq!(gro.lines().next(), Some("Four waters"));
    }

    #[test]
    fn strict_shortfall_fails_without_writing_output() {
        let dir = tempdir().unwrap();
        write_system(dir.path());

        let result = run(
            ReplaceArgs {
                strict: true,
                max_attempts: Some(200),
                ..args(dir.path(), 3)
            },
            true,
        );

        assert!(matches!(
            result,
            Err(CliError::Core(EngineError::Incomplete {
                requested: 3,
                replaced: 2,
                ..
            }))
        ));
        assert!(!dir.path().join("conf.gro").exists());
    }

    #[test]
    fn config_file_supplies_unset_options() {
        let dir = tempdir().unwrap();
        write_system(dir.path());
        let config = dir.path().join("molswap.toml");
        fs::write(&config, "[sampling]\ncount = 1\nseed = 5\n").unwrap();

        run(
            ReplaceArgs {
                count: None,
                config: Some(config),
                report: None,
                molecules_out: None,
                ..args(dir.path(), 0)
            },
            true,
        )
        .unwrap();

        let gro = fs::read_to_string(dir.path().join("conf.gro")).unwrap();
        assert_eq!(gro.matches("CO2").count(), 3);
    }
}
