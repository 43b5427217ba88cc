use crate::core::models::atom::Atom;
use crate::core::models::molecule::MoleculeTemplate;
use crate::core::models::topology::{MoleculeBlock, Topology, TopologyModelError};
use phf::phf_map;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Defaults,
    AtomTypes,
    NonbondParams,
    MoleculeType,
    Atoms,
    System,
    Molecules,
    Ignored,
}

static SECTIONS: phf::Map<&'static str, Section> = phf_map! {
    "defaults" => Section::Defaults,
    "atomtypes" => Section::AtomTypes,
    "nonbond_params" => Section::NonbondParams,
    "moleculetype" => Section::MoleculeType,
    "atoms" => Section::Atoms,
    "system" => Section::System,
    "molecules" => Section::Molecules,
};

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Parse error in '{file}' on line {line}: {kind}")]
    Parse {
        file: String,
        line: usize,
        kind: TopParseErrorKind,
    },
    #[error("Includes nested deeper than {MAX_INCLUDE_DEPTH} levels at '{0}'")]
    IncludeDepth(String),
    #[error(transparent)]
    Model(#[from] TopologyModelError),
}

#[derive(Debug, Error, PartialEq)]
pub enum TopParseErrorKind {
    #[error("Section [ {section} ] expects at least {expected} fields, found {found}")]
    TooFewFields {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float for {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("[ atoms ] entry appears before any [ moleculetype ]")]
    AtomsOutsideMoleculeType,
    #[error("No mass given for atom '{atom}' and atom type '{atom_type}' defines none")]
    MissingMass { atom: String, atom_type: String },
    #[error("Malformed section header '{0}'")]
    MalformedHeader(String),
    #[error("Malformed #include directive '{0}'")]
    MalformedInclude(String),
}

#[derive(Debug, Clone, Copy)]
struct AtomTypeParams {
    mass: f64,
    sigma: f64,
    epsilon: f64,
}

#[derive(Debug, Clone)]
struct PairOverride {
    type_i: String,
    type_j: String,
    sigma: f64,
    epsilon: f64,
}

/// Reads GROMACS topology files (`.top`/`.itp`) into a [`Topology`].
pub struct TopFile;

impl TopFile {
    /// Reads a topology from a file path, resolving `#include` directives
    /// relative to the including file.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] if the file cannot be read, a line cannot be
    /// parsed, or a molecule type is defined twice.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Topology, TopologyError> {
        let mut parser = TopParser::default();
        parser.process_path(path.as_ref(), 0)?;
        parser.finish()
    }

    /// Reads a topology from a buffered reader. Includes are resolved relative to `base_dir`.
    pub fn read_from(reader: &mut impl BufRead, base_dir: &Path) -> Result<Topology, TopologyError> {
        let mut parser = TopParser::default();
        parser.process_reader(reader, base_dir, "<input>", 0)?;
        parser.finish()
    }
}

#[derive(Default)]
struct TopParser {
    section: Option<Section>,
    atom_types: HashMap<String, AtomTypeParams>,
    overrides: Vec<PairOverride>,
    templates: Vec<MoleculeTemplate>,
    current: Option<MoleculeTemplate>,
    system_name: Vec<String>,
    composition: Vec<(String, usize)>,
}

impl TopParser {
    fn process_path(&mut self, path: &Path, depth: usize) -> Result<(), TopologyError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(TopologyError::IncludeDepth(path.display().to_string()));
        }
        debug!("Reading topology file {:?}", path);
        let file = File::open(path).map_err(|e| TopologyError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut reader = BufReader::new(file);
        self.process_reader(&mut reader, base_dir, &path.display().to_string(), depth)
    }

    fn process_reader(
        &mut self,
        reader: &mut impl BufRead,
        base_dir: &Path,
        label: &str,
        depth: usize,
    ) -> Result<(), TopologyError> {
        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res.map_err(|e| TopologyError::Io {
                path: label.to_string(),
                source: e,
            })?;
            let line_num = line_num + 1;
            let parse_err = |kind| TopologyError::Parse {
                file: label.to_string(),
                line: line_num,
                kind,
            };

            let content = line.split(';').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            if let Some(directive) = content.strip_prefix('#') {
                if let Some(target) = directive.trim_start().strip_prefix("include") {
                    let include = parse_include_target(target)
                        .ok_or_else(|| parse_err(TopParseErrorKind::MalformedInclude(content.into())))?;
                    self.include(base_dir, include, depth)?;
                } else {
                    debug!("Ignoring preprocessor directive '{}' in {}", content, label);
                }
                continue;
            }

            if content.starts_with('[') {
                let name = content
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .map(|s| s.trim().to_ascii_lowercase())
                    .ok_or_else(|| parse_err(TopParseErrorKind::MalformedHeader(content.into())))?;
                self.section = Some(SECTIONS.get(name.as_str()).copied().unwrap_or(Section::Ignored));
                continue;
            }

            let fields: Vec<&str> = content.split_whitespace().collect();
            match self.section {
                Some(Section::AtomTypes) => self.parse_atom_type(&fields).map_err(parse_err)?,
                Some(Section::NonbondParams) => {
                    self.parse_nonbond_param(&fields).map_err(parse_err)?
                }
                Some(Section::MoleculeType) => self.parse_molecule_type(&fields).map_err(parse_err)?,
                Some(Section::Atoms) => self.parse_atom(&fields).map_err(parse_err)?,
                Some(Section::System) => self.system_name.push(content.to_string()),
                Some(Section::Molecules) => self.parse_molecule_entry(&fields).map_err(parse_err)?,
                Some(Section::Defaults) | Some(Section::Ignored) | None => {}
            }
        }
        Ok(())
    }

    fn include(&mut self, base_dir: &Path, target: &str, depth: usize) -> Result<(), TopologyError> {
        let candidate: PathBuf = base_dir.join(target);
        if candidate.exists() {
            self.process_path(&candidate, depth + 1)
        } else {
            warn!(
                "Included topology file {:?} not found; its definitions are skipped.",
                candidate
            );
            Ok(())
        }
    }

    fn parse_atom_type(&mut self, fields: &[&str]) -> Result<(), TopParseErrorKind> {
        require_fields("atomtypes", fields, 6)?;
        let n = fields.len();
        let params = AtomTypeParams {
            mass: parse_float(fields[n - 5], "atom type mass")?,
            sigma: parse_float(fields[n - 2], "atom type sigma")?,
            epsilon: parse_float(fields[n - 1], "atom type epsilon")?,
        };
        self.atom_types.insert(fields[0].to_string(), params);
        Ok(())
    }

    fn parse_nonbond_param(&mut self, fields: &[&str]) -> Result<(), TopParseErrorKind> {
        require_fields("nonbond_params", fields, 5)?;
        self.overrides.push(PairOverride {
            type_i: fields[0].to_string(),
            type_j: fields[1].to_string(),
            sigma: parse_float(fields[3], "pair sigma")?,
            epsilon: parse_float(fields[4], "pair epsilon")?,
        });
        Ok(())
    }

    fn parse_molecule_type(&mut self, fields: &[&str]) -> Result<(), TopParseErrorKind> {
        require_fields("moleculetype", fields, 1)?;
        if let Some(done) = self.current.take() {
            self.templates.push(done);
        }
        self.current = Some(MoleculeTemplate::new(fields[0], Vec::new()));
        Ok(())
    }

    fn parse_atom(&mut self, fields: &[&str]) -> Result<(), TopParseErrorKind> {
        require_fields("atoms", fields, 7)?;
        let atom_type = fields[1];
        let type_params = self.atom_types.get(atom_type).copied();
        let residue_number = parse_int(fields[2], "residue number")?;
        let charge = parse_float(fields[6], "charge")?;
        let mass = match (fields.get(7), type_params) {
            (Some(value), _) => parse_float(value, "mass")?,
            (None, Some(params)) => params.mass,
            (None, None) => {
                return Err(TopParseErrorKind::MissingMass {
                    atom: fields[4].to_string(),
                    atom_type: atom_type.to_string(),
                });
            }
        };
        let (sigma, epsilon) = type_params.map_or((0.0, 0.0), |p| (p.sigma, p.epsilon));

        let template = self
            .current
            .as_mut()
            .ok_or(TopParseErrorKind::AtomsOutsideMoleculeType)?;
        template.push_atom(
            Atom::new(fields[4], atom_type)
                .with_residue(fields[3], residue_number)
                .with_charge(charge)
                .with_mass(mass)
                .with_lj(sigma, epsilon),
        );
        Ok(())
    }

    fn parse_molecule_entry(&mut self, fields: &[&str]) -> Result<(), TopParseErrorKind> {
        require_fields("molecules", fields, 2)?;
        let count = parse_int(fields[1], "molecule count")?;
        self.composition.push((fields[0].to_string(), count));
        Ok(())
    }

    fn finish(mut self) -> Result<Topology, TopologyError> {
        if let Some(done) = self.current.take() {
            self.templates.push(done);
        }

        let mut topology = Topology::new();
        topology.system_name = self.system_name.join(" ");
        for template in self.templates {
            topology.add_template(template)?;
        }

        for (_, template) in topology.templates_iter_mut() {
            for atom in template.atoms_mut() {
                for pair in &self.overrides {
                    if atom.atom_type == pair.type_i {
                        atom.set_cross_lj(&pair.type_j, pair.sigma, pair.epsilon);
                    }
                    if atom.atom_type == pair.type_j {
                        atom.set_cross_lj(&pair.type_i, pair.sigma, pair.epsilon);
                    }
                }
            }
        }

        for (name, count) in &self.composition {
            topology.push_block(name, *count);
        }

        debug!(
            templates = topology.template_count(),
            blocks = topology.composition().len(),
            "Topology parsed."
        );
        Ok(topology)
    }
}

/// Writes a `[ molecules ]` section for the given composition.
///
/// After a replacement run this is what the system's topology must list so
/// that it matches the written coordinates.
pub fn write_molecules_section(
    writer: &mut impl Write,
    blocks: &[MoleculeBlock],
) -> io::Result<()> {
    writeln!(writer, "[ molecules ]")?;
    writeln!(writer, "; Compound        #mols")?;
    for block in blocks {
        writeln!(writer, "{:<18}{:>6}", block.name, block.count)?;
    }
    Ok(())
}

fn parse_include_target(target: &str) -> Option<&str> {
    let target = target.trim();
    let inner = target
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| target.strip_prefix('<').and_then(|s| s.strip_suffix('>')))?;
    (!inner.is_empty()).then_some(inner)
}

fn require_fields(
    section: &'static str,
    fields: &[&str],
    expected: usize,
) -> Result<(), TopParseErrorKind> {
    if fields.len() < expected {
        return Err(TopParseErrorKind::TooFewFields {
            section,
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn parse_float(value: &str, field: &'static str) -> Result<f64, TopParseErrorKind> {
    value.parse().map_err(|_| TopParseErrorKind::InvalidFloat {
        field,
        value: value.to_string(),
    })
}

fn parse_int(value: &str, field: &'static str) -> Result<usize, TopParseErrorKind> {
    value.parse().map_err(|_| TopParseErrorKind::InvalidInt {
        field,
        value: value.to_string(),
    })
}
