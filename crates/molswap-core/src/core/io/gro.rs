use crate::core::io::traits::CoordinateFile;
use crate::core::models::snapshot::{AssemblySnapshot, SnapshotError};
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, warn};

/// `.gro` atom and residue numbers are 5 columns wide and wrap around.
const NUMBER_WRAP: usize = 100_000;
/// Coordinates start after the residue number, residue name, atom name and atom number.
const COORDINATE_START: usize = 20;
/// Width of a coordinate column at the default precision of 3 decimals.
const DEFAULT_COLUMN_WIDTH: usize = 8;
/// Upper bound on buffers sized from the header's atom count.
const MAX_PREALLOCATED_ATOMS: usize = 1 << 20;

/// Frame-level text of a `.gro` file that is not part of the snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroMetadata {
    /// The first line of the file.
    pub title: String,
    /// The raw trailing box line, as read.
    pub box_line: String,
}

#[derive(Debug, Error)]
pub enum GroError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: GroParseErrorKind },
    #[error("Coordinates do not match the topology: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum GroParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Atom line is too short (must be at least {0} chars)")]
    LineTooShort(usize),
    #[error("File ended early: expected {expected} atom lines and a box line")]
    UnexpectedEof { expected: usize },
    #[error("Box line must hold 3 or 9 numbers (got '{0}')")]
    InvalidBox(String),
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_column(line: &str, start: usize, end: usize) -> Result<f64, GroParseErrorKind> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| GroParseErrorKind::InvalidFloat {
        columns: format!("{}-{}", start + 1, end),
        value: value.to_string(),
    })
}

/// Parses the trailing box line of a `.gro` frame.
///
/// Rectangular boxes carry three numbers; triclinic boxes carry nine, of which
/// the first three are the diagonal. Off-diagonal terms are dropped with a
/// warning since snapshots only model rectangular cells.
pub fn parse_box_line(line: &str) -> Result<Vector3<f64>, GroParseErrorKind> {
    let values: Vec<f64> = line
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| GroParseErrorKind::InvalidBox(line.trim().to_string()))?;

    match values.len() {
        3 => Ok(Vector3::new(values[0], values[1], values[2])),
        9 => {
            if values[3..].iter().any(|&v| v != 0.0) {
                warn!("Triclinic box terms are ignored; only the diagonal is kept.");
            }
            Ok(Vector3::new(values[0], values[1], values[2]))
        }
        _ => Err(GroParseErrorKind::InvalidBox(line.trim().to_string())),
    }
}

fn wrap_number(n: usize) -> usize {
    n % NUMBER_WRAP
}

fn fit_column(s: &str, width: usize) -> &str {
    s.get(..width).unwrap_or(s)
}

/// Writes one `.gro` frame for a snapshot.
///
/// Atom and residue names come from each instance's current template. Residue
/// numbers are assigned sequentially across instances, one per distinct local
/// residue, and both atom and residue numbers wrap at 100000.
///
/// # Arguments
///
/// * `writer` - Destination of the frame.
/// * `snapshot` - The snapshot to write.
/// * `box_vector` - The box edge lengths written on the last line.
/// * `title` - The title line; line breaks are replaced by spaces.
///
/// # Errors
///
/// Returns [`GroError::Io`] if writing fails and [`GroError::Snapshot`] if an
/// instance refers to a template missing from the snapshot's topology.
pub fn write_frame(
    writer: &mut impl Write,
    snapshot: &AssemblySnapshot,
    box_vector: &Vector3<f64>,
    title: &str,
) -> Result<(), GroError> {
    writeln!(writer, "{}", title.replace(['\r', '\n'], " "))?;
    writeln!(writer, "{:5}", snapshot.atom_count())?;

    let positions = snapshot.positions();
    let velocities = snapshot.velocities();
    let mut residue_counter = 0usize;

    for index in 0..snapshot.instance_count() {
        let template = snapshot.template_of(index)?;
        let range = snapshot.atom_range(index)?;
        let mut last_local_residue = None;

        for (atom, atom_index) in template.atoms().iter().zip(range) {
            if last_local_residue != Some(atom.residue_number) {
                residue_counter += 1;
                last_local_residue = Some(atom.residue_number);
            }
            let p = &positions[atom_index];
            write!(
                writer,
                "{:>5}{:<5}{:>5}{:>5}{:8.3}{:8.3}{:8.3}",
                wrap_number(residue_counter),
                fit_column(&atom.residue_name, 5),
                fit_column(&atom.name, 5),
                wrap_number(atom_index + 1),
                p.x,
                p.y,
                p.z
            )?;
            if let Some(v) = velocities.map(|vs| &vs[atom_index]) {
                write!(writer, "{:8.4}{:8.4}{:8.4}", v.x, v.y, v.z)?;
            }
            writeln!(writer)?;
        }
    }

    writeln!(
        writer,
        "{:10.5}{:10.5}{:10.5}",
        box_vector.x, box_vector.y, box_vector.z
    )?;
    Ok(())
}

struct AtomLine {
    name: String,
    position: Point3<f64>,
    velocity: Option<Vector3<f64>>,
}

/// Width of the coordinate columns, taken from the distance between the first
/// two decimal points after column 20. Files written with more decimals use
/// wider columns; velocities share the width.
fn column_width(line: &str) -> usize {
    let Some(rest) = line.get(COORDINATE_START..) else {
        return DEFAULT_COLUMN_WIDTH;
    };
    let mut dots = rest.match_indices('.').map(|(i, _)| i);
    match (dots.next(), dots.next()) {
        (Some(first), Some(second)) if second > first => second - first,
        _ => DEFAULT_COLUMN_WIDTH,
    }
}

fn parse_atom_line(line: &str, width: usize) -> Result<AtomLine, GroParseErrorKind> {
    let column = |n: usize| {
        let start = COORDINATE_START + n * width;
        (start, start + width)
    };
    let (_, coordinates_end) = column(2);
    if line.len() < coordinates_end {
        return Err(GroParseErrorKind::LineTooShort(coordinates_end));
    }
    let read = |n: usize| {
        let (start, end) = column(n);
        parse_column(line, start, end)
    };

    let position = Point3::new(read(0)?, read(1)?, read(2)?);
    let velocity = if slice_and_trim(line, column(3).0, column(5).1).is_empty() {
        None
    } else {
        Some(Vector3::new(read(3)?, read(4)?, read(5)?))
    };
    Ok(AtomLine {
        name: slice_and_trim(line, 10, 15).to_string(),
        position,
        velocity,
    })
}

fn warn_on_name_mismatches(snapshot: &AssemblySnapshot, names: &[String]) {
    let mut mismatches = 0usize;
    let mut first = None;
    for index in 0..snapshot.instance_count() {
        let (Ok(template), Ok(range)) = (snapshot.template_of(index), snapshot.atom_range(index))
        else {
            continue;
        };
        for (atom, atom_index) in template.atoms().iter().zip(range) {
            if atom.name != names[atom_index] {
                mismatches += 1;
                first.get_or_insert((atom_index + 1, names[atom_index].clone(), atom.name.clone()));
            }
        }
    }
    if let Some((number, found, expected)) = first {
        warn!(
            "{} atom names in the coordinate file differ from the topology (first: atom {} is '{}', topology says '{}').",
            mismatches, number, found, expected
        );
    }
}

pub struct GroFile;

impl CoordinateFile for GroFile {
    type Metadata = GroMetadata;
    type Error = GroError;

    fn read_from(
        reader: &mut impl BufRead,
        topology: Topology,
    ) -> Result<(AssemblySnapshot, Self::Metadata), Self::Error> {
        let mut lines = reader.lines();
        let mut next_line = |line: usize, expected: usize| -> Result<String, GroError> {
            match lines.next() {
                Some(res) => Ok(res?),
                None => Err(GroError::Parse {
                    line,
                    kind: GroParseErrorKind::UnexpectedEof { expected },
                }),
            }
        };

        let title = next_line(1, 0)?.trim_end().to_string();
        let count_line = next_line(2, 0)?;
        let atom_count: usize = count_line.trim().parse().map_err(|_| GroError::Parse {
            line: 2,
            kind: GroParseErrorKind::InvalidInt {
                columns: "1-5".to_string(),
                value: count_line.trim().to_string(),
            },
        })?;

        let capacity = atom_count.min(MAX_PREALLOCATED_ATOMS);
        let mut names = Vec::with_capacity(capacity);
        let mut positions = Vec::with_capacity(capacity);
        let mut velocities = Vec::with_capacity(capacity);
        let mut frame_width = None;
        for i in 0..atom_count {
            let line_num = i + 3;
            let line = next_line(line_num, atom_count)?;
            let width = *frame_width.get_or_insert_with(|| column_width(&line));
            let atom = parse_atom_line(&line, width).map_err(|kind| GroError::Parse {
                line: line_num,
                kind,
            })?;
            names.push(atom.name);
            positions.push(atom.position);
            velocities.push(atom.velocity);
        }

        let box_line_num = atom_count.saturating_add(3);
        let box_line = next_line(box_line_num, atom_count)?;
        let box_vector = parse_box_line(&box_line).map_err(|kind| GroError::Parse {
            line: box_line_num,
            kind,
        })?;

        let with_velocity = velocities.iter().filter(|v| v.is_some()).count();
        let mut snapshot = AssemblySnapshot::from_composition(topology, positions, box_vector)?;
        if with_velocity == atom_count && atom_count > 0 {
            snapshot = snapshot.with_velocities(velocities.into_iter().flatten().collect())?;
        } else if with_velocity > 0 {
            return Err(GroError::Inconsistency(format!(
                "only {} of {} atoms carry velocities",
                with_velocity, atom_count
            )));
        }

        warn_on_name_mismatches(&snapshot, &names);
        debug!(
            atoms = atom_count,
            instances = snapshot.instance_count(),
            "Coordinate frame read."
        );
        Ok((
            snapshot,
            GroMetadata {
                title,
                box_line: box_line.trim_end().to_string(),
            },
        ))
    }

    fn write_to(
        snapshot: &AssemblySnapshot,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        write_frame(writer, snapshot, snapshot.box_vector(), &metadata.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::snapshot::test_support::{water_snapshot, water_template};
    use std::io::Cursor;

    const TWO_WATERS: &str = "\
Two waters
    6
    1SOL     OW    1   0.126   1.624   1.679
    1SOL    HW1    2   0.190   1.661   1.747
    1SOL    HW2    3   0.177   1.568   1.613
    2SOL     OW    4   1.275   0.053   0.622
    2SOL    HW1    5   1.337   0.002   0.680
    2SOL    HW2    6   1.326   0.120   0.568
   1.86206   1.86206   1.86206
";

    fn water_topology(count: usize) -> Topology {
        let mut topology = Topology::new();
        topology.add_template(water_template()).unwrap();
        topology.push_block("SOL", count);
        topology
    }

    fn read(content: &str, count: usize) -> Result<(AssemblySnapshot, GroMetadata), GroError> {
        GroFile::read_from(&mut Cursor::new(content), water_topology(count))
    }

    fn write(snapshot: &AssemblySnapshot, title: &str) -> String {
        String::from_utf8(snapshot.serialize(snapshot.box_vector(), title).unwrap()).unwrap()
    }

    #[test]
    fn reads_title_positions_and_box() {
        let (snapshot, metadata) = read(TWO_WATERS, 2).unwrap();
        assert_eq!(metadata.title, "Two waters");
        assert_eq!(metadata.box_line, "   1.86206   1.86206   1.86206");
        assert_eq!(snapshot.instance_count(), 2);
        assert_eq!(snapshot.positions()[3], Point3::new(1.275, 0.053, 0.622));
        assert_eq!(*snapshot.box_vector(), Vector3::new(1.86206, 1.86206, 1.86206));
        assert!(snapshot.velocities().is_none());
    }

    #[test]
    fn unchanged_snapshot_writes_back_identically() {
        let (snapshot, metadata) = read(TWO_WATERS, 2).unwrap();
        let mut out = Vec::new();
        GroFile::write_to(&snapshot, &metadata, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), TWO_WATERS);
    }

    #[test]
    fn velocities_are_read_and_written() {
        let content = "\
v
    3
    1SOL     OW    1   0.126   1.624   1.679  0.1234 -0.5000  0.0000
    1SOL    HW1    2   0.190   1.661   1.747  1.0000  2.0000  3.0000
    1SOL    HW2    3   0.177   1.568   1.613 -1.0000 -2.0000 -3.0000
   1.00000   1.00000   1.00000
";
        let (snapshot, metadata) = read(content, 1).unwrap();
        assert_eq!(snapshot.velocities().unwrap()[0], Vector3::new(0.1234, -0.5, 0.0));
        assert_eq!(write(&snapshot, &metadata.title), content);
    }

    #[test]
    fn partial_velocities_are_rejected() {
        let content = "\
v
    3
    1SOL     OW    1   0.126   1.624   1.679  0.1234 -0.5000  0.0000
    1SOL    HW1    2   0.190   1.661   1.747
    1SOL    HW2    3   0.177   1.568   1.613
   1.00000   1.00000   1.00000
";
        assert!(matches!(read(content, 1), Err(GroError::Inconsistency(_))));
    }

    #[test]
    fn atom_count_mismatch_with_topology_is_rejected() {
        assert!(matches!(
            read(TWO_WATERS, 3),
            Err(GroError::Snapshot(SnapshotError::PartitionMismatch {
                expected: 9,
                found: 6
            }))
        ));
    }

    #[test]
    fn truncated_file_reports_unexpected_eof() {
        let truncated: String = TWO_WATERS.lines().take(5).collect::<Vec<_>>().join("\n");
        assert!(matches!(
            read(&truncated, 2),
            Err(GroError::Parse {
                line: 6,
                kind: GroParseErrorKind::UnexpectedEof { expected: 6 }
            })
        ));
    }

    #[test]
    fn malformed_coordinate_reports_line_and_columns() {
        let broken = TWO_WATERS.replace("   0.190", "   0.1x0");
        match read(&broken, 2) {
            Err(GroError::Parse { line, kind }) => {
                assert_eq!(line, 4);
                assert_eq!(
                    kind,
                    GroParseErrorKind::InvalidFloat {
                        columns: "21-28".into(),
                        value: "0.1x0".into()
                    }
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn oversized_atom_count_reports_unexpected_eof() {
        let content = "\
Truncated
99999999999999
    1SOL     OW    1   0.126   1.624   1.679
";
        assert!(matches!(
            read(content, 1),
            Err(GroError::Parse {
                line: 4,
                kind: GroParseErrorKind::UnexpectedEof {
                    expected: 99_999_999_999_999
                }
            })
        ));
    }

    #[test]
    fn wider_columns_from_extra_decimals_are_read() {
        let content = "\
Four decimals
    3
    1SOL     OW    1   0.1260   1.6240   1.6790  0.12340 -0.50000  0.00000
    1SOL    HW1    2   0.1900   1.6610   1.7470  1.00000  2.00000  3.00000
    1SOL    HW2    3   0.1770   1.5680   1.6130 -1.00000 -2.00000 -3.00000
   1.86206   1.86206   1.86206
";
        let (snapshot, _) = read(content, 1).unwrap();
        assert_eq!(snapshot.positions()[0], Point3::new(0.126, 1.624, 1.679));
        assert_eq!(snapshot.positions()[2], Point3::new(0.177, 1.568, 1.613));
        assert_eq!(snapshot.velocities().unwrap()[0], Vector3::new(0.1234, -0.5, 0.0));
    }

    #[test]
    fn column_width_follows_decimal_points() {
        assert_eq!(column_width("    1SOL     OW    1   0.126   1.624   1.679"), 8);
        assert_eq!(column_width("    1SOL     OW    1   0.12600   1.62400   1.67900"), 10);
        assert_eq!(column_width("    1SOL     OW    1"), 8);
    }

    #[test]
    fn short_atom_line_reports_required_length() {
        let broken = TWO_WATERS.replace("   0.190   1.661   1.747", "   0.190   1.661");
        assert!(matches!(
            read(&broken, 2),
            Err(GroError::Parse {
                line: 4,
                kind: GroParseErrorKind::LineTooShort(44)
            })
        ));
    }

    #[test]
    fn box_line_accepts_triclinic_form() {
        let v = parse_box_line("   2.00000   3.00000   4.00000   0.00000   0.00000   0.00000   0.00000   0.00000   0.00000").unwrap();
        assert_eq!(v, Vector3::new(2.0, 3.0, 4.0));
        assert!(matches!(
            parse_box_line("1.0 2.0"),
            Err(GroParseErrorKind::InvalidBox(_))
        ));
    }

    #[test]
    fn replaced_instances_are_written_with_new_names_and_sequential_residues() {
        let (mut snapshot, ids) = water_snapshot(&[0.5, 1.2, 2.0]);
        snapshot.replace_instance(1, ids.moh).unwrap();
        let text = write(&snapshot, "after");
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "after");
        assert_eq!(lines[1], "    9");
        assert!(lines[5].starts_with("    2MOH      C    4"));
        assert!(lines[8].starts_with("    3SOL     OW    7"));
        assert_eq!(lines[11], "   3.00000   3.00000   3.00000");
    }

    #[test]
    fn title_is_kept_on_one_line() {
        let (snapshot, _) = water_snapshot(&[0.5]);
        let text = write(&snapshot, "a\nb");
        assert_eq!(text.lines().next(), Some("a b"));
    }

    #[test]
    fn numbers_wrap_at_five_digits() {
        assert_eq!(wrap_number(99_999), 99_999);
        assert_eq!(wrap_number(100_000), 0);
        assert_eq!(wrap_number(100_001), 1);
        assert_eq!(fit_column("LONGNAME", 5), "LONGN");
    }
}
