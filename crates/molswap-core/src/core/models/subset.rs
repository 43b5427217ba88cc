use super::snapshot::{AssemblySnapshot, SnapshotError};
use crate::core::io::ndx::IndexGroups;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum SubsetError {
    #[error("Pool entry {0} has already been replaced")]
    AlreadyReplaced(usize),
    #[error("Pool entry {index} is out of range (pool size {size})")]
    LocalIndexOutOfRange { index: usize, size: usize },
    #[error("Group '{0}' not found in index")]
    GroupNotFound(String),
    #[error("Invalid group '{group}': {source}")]
    InvalidGroup {
        group: String,
        #[source]
        source: SnapshotError,
    },
}

/// The pool of molecule instances a replacement run samples from.
///
/// Members are instance indices into an [`AssemblySnapshot`]. The member list
/// never changes length or order; instances leave the pool only by being
/// marked in the replaced mask, which keeps local indices stable while sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleSubset {
    group: String,
    members: Vec<usize>,
    replaced: Vec<bool>,
}

impl EligibleSubset {
    pub fn new(group: &str, members: Vec<usize>) -> Self {
        Self {
            group: group.to_string(),
            replaced: vec![false; members.len()],
            members,
        }
    }

    /// Builds the pool from a named index group.
    ///
    /// The group's atom numbers are mapped onto the instances that contain them.
    ///
    /// # Errors
    ///
    /// Returns [`SubsetError::GroupNotFound`] if the index has no such group and
    /// [`SubsetError::InvalidGroup`] if it references atoms outside the snapshot.
    pub fn from_group(
        snapshot: &AssemblySnapshot,
        groups: &IndexGroups,
        group: &str,
    ) -> Result<Self, SubsetError> {
        let atoms = groups
            .get(group)
            .ok_or_else(|| SubsetError::GroupNotFound(group.to_string()))?;
        let members =
            snapshot
                .instances_for_atoms(atoms)
                .map_err(|source| SubsetError::InvalidGroup {
                    group: group.to_string(),
                    source,
                })?;
        Ok(Self::new(group, members))
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Number of pool entries; does not shrink as entries are replaced.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of entries not yet replaced.
    pub fn remaining_count(&self) -> usize {
        self.replaced.iter().filter(|&&r| !r).count()
    }

    pub fn is_replaced(&self, local_index: usize) -> Result<bool, SubsetError> {
        self.replaced
            .get(local_index)
            .copied()
            .ok_or(SubsetError::LocalIndexOutOfRange {
                index: local_index,
                size: self.members.len(),
            })
    }

    /// Marks a pool entry as replaced.
    ///
    /// # Errors
    ///
    /// Returns [`SubsetError::AlreadyReplaced`] if the entry was already marked and
    /// [`SubsetError::LocalIndexOutOfRange`] for an invalid index.
    pub fn mark_replaced(&mut self, local_index: usize) -> Result<(), SubsetError> {
        let size = self.members.len();
        let slot = self
            .replaced
            .get_mut(local_index)
            .ok_or(SubsetError::LocalIndexOutOfRange {
                index: local_index,
                size,
            })?;
        if *slot {
            return Err(SubsetError::AlreadyReplaced(local_index));
        }
        *slot = true;
        Ok(())
    }

    /// Maps a pool entry onto its instance index in the backing snapshot.
    pub fn instance_index_at(&self, local_index: usize) -> Result<usize, SubsetError> {
        self.members
            .get(local_index)
            .copied()
            .ok_or(SubsetError::LocalIndexOutOfRange {
                index: local_index,
                size: self.members.len(),
            })
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Instance indices of the replaced entries, in pool order.
    pub fn replaced_instances(&self) -> Vec<usize> {
        self.members
            .iter()
            .zip(&self.replaced)
            .filter_map(|(&m, &r)| r.then_some(m))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::snapshot::test_support::water_snapshot;

    #[test]
    fn new_subset_starts_with_nothing_replaced() {
        let subset = EligibleSubset::new("SOL", vec![4, 2, 7]);
        assert_eq!(subset.size(), 3);
        assert_eq!(subset.remaining_count(), 3);
        assert_eq!(subset.group(), "SOL");
        assert!(subset.replaced_instances().is_empty());
    }

    #[test]
    fn mark_replaced_shrinks_remaining_but_not_size() {
        let mut subset = EligibleSubset::new("SOL", vec![4, 2, 7]);
        subset.mark_replaced(1).unwrap();
        assert_eq!(subset.size(), 3);
        assert_eq!(subset.remaining_count(), 2);
        assert_eq!(subset.is_replaced(1), Ok(true));
        assert_eq!(subset.replaced_instances(), vec![2]);
    }

    #[test]
    fn mark_replaced_twice_fails() {
        let mut subset = EligibleSubset::new("SOL", vec![0, 1]);
        subset.mark_replaced(0).unwrap();
        assert_eq!(
            subset.mark_replaced(0),
            Err(SubsetError::AlreadyReplaced(0))
        );
        assert_eq!(subset.remaining_count(), 1);
    }

    #[test]
    fn out_of_range_local_indices_are_rejected() {
        let mut subset = EligibleSubset::new("SOL", vec![0, 1]);
        let expected = SubsetError::LocalIndexOutOfRange { index: 2, size: 2 };
        assert_eq!(subset.mark_replaced(2), Err(expected.clone()));
        assert_eq!(subset.instance_index_at(2), Err(expected.clone()));
        assert_eq!(subset.is_replaced(2), Err(expected));
    }

    #[test]
    fn instance_index_at_maps_local_to_global() {
        let subset = EligibleSubset::new("SOL", vec![9, 5, 3]);
        assert_eq!(subset.instance_index_at(0), Ok(9));
        assert_eq!(subset.instance_index_at(2), Ok(3));
    }

    #[test]
    fn from_group_maps_atom_numbers_to_instances() {
        let (snapshot, _) = water_snapshot(&[0.1, 0.2, 0.3]);
        let mut groups = IndexGroups::new();
        groups.insert("SOL", vec![4, 5, 6, 7, 8, 9]);

        let subset = EligibleSubset::from_group(&snapshot, &groups, "SOL").unwrap();
        assert_eq!(subset.members(), &[1, 2]);
    }

    #[test]
    fn from_group_fails_for_missing_group() {
        let (snapshot, _) = water_snapshot(&[0.1]);
        let groups = IndexGroups::new();
        assert_eq!(
            EligibleSubset::from_group(&snapshot, &groups, "SOL"),
            Err(SubsetError::GroupNotFound("SOL".to_string()))
        );
    }

    #[test]
    fn from_group_fails_for_atoms_outside_the_snapshot() {
        let (snapshot, _) = water_snapshot(&[0.1]);
        let mut groups = IndexGroups::new();
        groups.insert("SOL", vec![1, 2, 3, 4]);
        assert!(matches!(
            EligibleSubset::from_group(&snapshot, &groups, "SOL"),
            Err(SubsetError::InvalidGroup { .. })
        ));
    }

    #[test]
    fn from_empty_group_gives_empty_pool() {
        let (snapshot, _) = water_snapshot(&[0.1]);
        let mut groups = IndexGroups::new();
        groups.insert("Empty", Vec::new());
        let subset = EligibleSubset::from_group(&snapshot, &groups, "Empty").unwrap();
        assert!(subset.is_empty());
        assert_eq!(subset.remaining_count(), 0);
    }
}
