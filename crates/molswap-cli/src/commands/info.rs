use crate::cli::InfoArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use molswap::engine::config::{InputFiles, SpatialWindow};
use molswap::workflows::inspect::{self, SystemSummary};
use std::fmt::Write;
use tracing::info;

pub fn run(args: InfoArgs) -> Result<()> {
    info!("Starting 'info' command.");
    let window =
        parser::parse_window(&args.window).map_err(|e| CliError::Argument(e.to_string()))?;
    let files = InputFiles {
        coordinates_path: args.input,
        topology_path: args.topology,
        index_path: args.index,
    };

    let summary = inspect::run(&files, &window, args.reference.into())?;
    print!("{}", render(&summary, &window));
    Ok(())
}

fn render(summary: &SystemSummary, window: &SpatialWindow) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Title:     {}", summary.title);
    let _ = writeln!(out, "System:    {}", summary.system_name);
    let _ = writeln!(
        out,
        "Contents:  {} atoms in {} molecules",
        summary.atom_count, summary.instance_count
    );

    let _ = writeln!(out, "\nMolecule types:");
    let _ = writeln!(out, "  {:<12}{:>7}{:>12}{:>10}", "name", "atoms", "mass", "charge");
    for t in &summary.templates {
        let _ = writeln!(
            out,
            "  {:<12}{:>7}{:>12.4}{:>10.3}",
            t.name, t.atom_count, t.total_mass, t.total_charge
        );
    }

    let _ = writeln!(out, "\n[ molecules ]");
    for block in &summary.blocks {
        let _ = writeln!(out, "  {:<18}{:>6}", block.name, block.count);
    }

    let _ = writeln!(out, "\nIndex groups (window {}):", window);
    for g in &summary.groups {
        match (g.instance_count, g.in_window) {
            (Some(n), Some(w)) => {
                let _ = writeln!(
                    out,
                    "  {:<16}{:>8} atoms{:>8} molecules{:>8} in window",
                    g.name, g.atom_count, n, w
                );
            }
            _ => {
                let _ = writeln!(
                    out,
                    "  {:<16}{:>8} atoms   (does not match the system)",
                    g.name, g.atom_count
                );
            }
        }
    }
    out
}
