use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum NdxError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: NdxParseErrorKind },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NdxParseErrorKind {
    #[error("Atom number found before any group header")]
    EntryOutsideGroup,
    #[error("Malformed group header '{0}'")]
    MalformedHeader(String),
    #[error("Invalid atom number '{0}'")]
    InvalidAtomNumber(String),
}

/// Named groups of 1-based atom numbers, in the order they appear in the index file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexGroups {
    groups: Vec<(String, Vec<usize>)>,
    name_map: HashMap<String, usize>,
}

impl IndexGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a group, replacing the atoms of an existing group with the same name.
    ///
    /// # Return
    ///
    /// `true` if a group with this name already existed.
    pub fn insert(&mut self, name: &str, atoms: Vec<usize>) -> bool {
        match self.name_map.get(name) {
            Some(&slot) => {
                self.groups[slot].1 = atoms;
                true
            }
            None => {
                self.name_map.insert(name.to_string(), self.groups.len());
                self.groups.push((name.to_string(), atoms));
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[usize]> {
        self.name_map
            .get(name)
            .map(|&slot| self.groups[slot].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.groups.iter().map(|(n, a)| (n.as_str(), a.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub struct NdxFile;

impl NdxFile {
    pub fn read_from(reader: &mut impl BufRead) -> Result<IndexGroups, NdxError> {
        let mut groups = IndexGroups::new();
        let mut current: Option<(String, Vec<usize>)> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| NdxError::Parse {
                        line: line_num,
                        kind: NdxParseErrorKind::MalformedHeader(trimmed.to_string()),
                    })?;
                if let Some((prev_name, atoms)) = current.take() {
                    Self::commit(&mut groups, prev_name, atoms);
                }
                current = Some((name.to_string(), Vec::new()));
                continue;
            }

            let (_, atoms) = current.as_mut().ok_or(NdxError::Parse {
                line: line_num,
                kind: NdxParseErrorKind::EntryOutsideGroup,
            })?;
            for token in trimmed.split_whitespace() {
                let number: usize = token.parse().map_err(|_| NdxError::Parse {
                    line: line_num,
                    kind: NdxParseErrorKind::InvalidAtomNumber(token.to_string()),
                })?;
                atoms.push(number);
            }
        }

        if let Some((name, atoms)) = current.take() {
            Self::commit(&mut groups, name, atoms);
        }
        Ok(groups)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<IndexGroups, NdxError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn commit(groups: &mut IndexGroups, name: String, atoms: Vec<usize>) {
        if groups.insert(&name, atoms) {
            warn!("Index group '{}' is defined more than once; keeping the last definition.", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(content: &str) -> Result<IndexGroups, NdxError> {
        NdxFile::read_from(&mut Cursor::new(content))
    }

    #[test]
    fn reads_groups_in_file_order() {
        let groups = parse(
            "[ System ]\n   1   2   3   4\n   5   6\n\n[ SOL ]\n4 5 6\n[Ion]\n7\n",
        )
        .unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups.get("System"), Some(&[1, 2, 3, 4, 5, 6][..]));
        assert_eq!(groups.get("SOL"), Some(&[4, 5, 6][..]));
        assert_eq!(groups.get("Ion"), Some(&[7][..]));
        let names: Vec<_> = groups.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["System", "SOL", "Ion"]);
    }

    #[test]
    fn empty_group_is_kept() {
        let groups = parse("[ Empty ]\n[ SOL ]\n1 2 3\n").unwrap();
        assert_eq!(groups.get("Empty"), Some(&[][..]));
    }

    #[test]
    fn duplicate_group_keeps_last_definition() {
        let groups = parse("[ SOL ]\n1 2\n[ SOL ]\n3 4\n").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("SOL"), Some(&[3, 4][..]));
    }

    #[test]
    fn entries_before_header_are_rejected() {
        let err = parse("1 2 3\n[ SOL ]\n").unwrap_err();
        assert!(matches!(
            err,
            NdxError::Parse {
                line: 1,
                kind: NdxParseErrorKind::EntryOutsideGroup
            }
        ));
    }

    #[test]
    fn invalid_numbers_are_rejected_with_line() {
        let err = parse("[ SOL ]\n1 2\n3 x\n").unwrap_err();
        match err {
            NdxError::Parse { line, kind } => {
                assert_eq!(line, 3);
                assert_eq!(kind, NdxParseErrorKind::InvalidAtomNumber("x".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_header_is_rejected() {
        let err = parse("[ SOL\n1\n").unwrap_err();
        assert!(matches!(
            err,
            NdxError::Parse {
                kind: NdxParseErrorKind::MalformedHeader(_),
                ..
            }
        ));
    }

    #[test]
    fn read_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.ndx");
        std::fs::write(&path, "[ SOL ]\n1 2 3\n").unwrap();
        let groups = NdxFile::read_from_path(&path).unwrap();
        assert_eq!(groups.get("SOL"), Some(&[1, 2, 3][..]));
    }
}
