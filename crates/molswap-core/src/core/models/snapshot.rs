use super::ids::TemplateId;
use super::molecule::MoleculeTemplate;
use super::topology::{MoleculeBlock, Topology, TopologyModelError};
use crate::core::io::gro::{GroError, write_frame};
use crate::core::utils::geometry::{Axis, center_of_mass};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// Selects which point of a molecule instance stands for "where the molecule is".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferencePoint {
    /// The mass-weighted center of the instance's atoms.
    #[default]
    CenterOfMass,
    /// The position of the instance's first atom.
    FirstAtom,
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum SnapshotError {
    #[error(
        "Cannot replace instance {instance}: it has {expected} atoms but the replacement has {found}"
    )]
    SizeMismatch {
        instance: usize,
        expected: usize,
        found: usize,
    },
    #[error("Instance index {index} is out of range (system has {count} instances)")]
    InstanceOutOfRange { index: usize, count: usize },
    #[error("Atom number {atom_number} is out of range (system has {atom_count} atoms)")]
    AtomOutOfRange {
        atom_number: usize,
        atom_count: usize,
    },
    #[error("Expected {expected} positions but got {found}")]
    PositionCountMismatch { expected: usize, found: usize },
    #[error("Topology describes {expected} atoms but the coordinates contain {found}")]
    PartitionMismatch { expected: usize, found: usize },
    #[error("Template id does not belong to this system's topology")]
    UnknownTemplate,
    #[error(transparent)]
    Topology(#[from] TopologyModelError),
}

/// One concrete occurrence of a molecule template inside the snapshot.
///
/// The instance owns a contiguous block of rows in the snapshot's positions
/// arena. Offsets are assigned by [`AssemblySnapshot`] and never edited elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoleculeInstance {
    template: TemplateId,
    offset: usize,
    atom_count: usize,
}

impl MoleculeInstance {
    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn atom_count(&self) -> usize {
        self.atom_count
    }

    pub fn atom_range(&self) -> Range<usize> {
        self.offset..self.offset + self.atom_count
    }
}

/// The instantiated molecular system: instances, a positions arena and a box.
///
/// This struct is the single owner of the position partition. Instances are
/// laid out in order and their atom ranges tile `[0, atom_count)` without gaps
/// or overlaps; every mutating method preserves that property. Per-instance
/// centers of mass are cached and refreshed by every mutation path, so reads
/// through [`AssemblySnapshot::position`] never observe stale values.
#[derive(Debug, Clone)]
pub struct AssemblySnapshot {
    /// The templates instances refer to.
    topology: Topology,
    /// Molecule instances in file order.
    instances: Vec<MoleculeInstance>,
    /// One position per atom, in nm.
    positions: Vec<Point3<f64>>,
    /// One velocity per atom in nm/ps, when the source file carried them.
    velocities: Option<Vec<Vector3<f64>>>,
    /// Edge lengths of the rectangular periodic cell, in nm.
    box_vector: Vector3<f64>,
    /// Cached center of mass of each instance.
    centers_of_mass: Vec<Point3<f64>>,
}

impl AssemblySnapshot {
    /// Builds a snapshot by instantiating the topology's `[ molecules ]` composition.
    ///
    /// # Arguments
    ///
    /// * `topology` - The topology whose composition defines the instances.
    /// * `positions` - One position per atom, in composition order.
    /// * `box_vector` - The periodic box edge lengths.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Topology`] if a composition entry names an undefined
    /// template and [`SnapshotError::PartitionMismatch`] if the composition does not
    /// account for exactly `positions.len()` atoms.
    pub fn from_composition(
        topology: Topology,
        positions: Vec<Point3<f64>>,
        box_vector: Vector3<f64>,
    ) -> Result<Self, SnapshotError> {
        let expected = topology.composition_atom_count()?;
        if expected != positions.len() {
            return Err(SnapshotError::PartitionMismatch {
                expected,
                found: positions.len(),
            });
        }

        let mut sequence = Vec::new();
        for block in topology.composition() {
            let id = topology.find(&block.name)?;
            sequence.extend(std::iter::repeat_n(id, block.count));
        }
        Self::from_template_sequence(topology, &sequence, positions, box_vector)
    }

    /// Builds a snapshot from an explicit sequence of templates, one per instance.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::UnknownTemplate`] for ids not present in `topology`
    /// and [`SnapshotError::PartitionMismatch`] if the templates do not account for
    /// exactly `positions.len()` atoms.
    pub fn from_template_sequence(
        topology: Topology,
        sequence: &[TemplateId],
        positions: Vec<Point3<f64>>,
        box_vector: Vector3<f64>,
    ) -> Result<Self, SnapshotError> {
        let mut instances = Vec::with_capacity(sequence.len());
        let mut offset = 0;
        for &id in sequence {
            let template = topology.template(id).ok_or(SnapshotError::UnknownTemplate)?;
            instances.push(MoleculeInstance {
                template: id,
                offset,
                atom_count: template.atom_count(),
            });
            offset += template.atom_count();
        }

        if offset != positions.len() {
            return Err(SnapshotError::PartitionMismatch {
                expected: offset,
                found: positions.len(),
            });
        }

        let mut snapshot = Self {
            topology,
            centers_of_mass: vec![Point3::origin(); instances.len()],
            instances,
            positions,
            velocities: None,
            box_vector,
        };
        snapshot.update_center_of_mass();
        Ok(snapshot)
    }

    /// Attaches per-atom velocities.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::PositionCountMismatch`] if the number of
    /// velocities differs from the number of atoms.
    pub fn with_velocities(mut self, velocities: Vec<Vector3<f64>>) -> Result<Self, SnapshotError> {
        if velocities.len() != self.positions.len() {
            return Err(SnapshotError::PositionCountMismatch {
                expected: self.positions.len(),
                found: velocities.len(),
            });
        }
        self.velocities = Some(velocities);
        Ok(self)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn instances(&self) -> &[MoleculeInstance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Option<&MoleculeInstance> {
        self.instances.get(index)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn velocities(&self) -> Option<&[Vector3<f64>]> {
        self.velocities.as_deref()
    }

    pub fn box_vector(&self) -> &Vector3<f64> {
        &self.box_vector
    }

    fn checked_instance(&self, index: usize) -> Result<&MoleculeInstance, SnapshotError> {
        self.instances
            .get(index)
            .ok_or(SnapshotError::InstanceOutOfRange {
                index,
                count: self.instances.len(),
            })
    }

    /// Returns the template the given instance currently refers to.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InstanceOutOfRange`] for an invalid index.
    pub fn template_of(&self, index: usize) -> Result<&MoleculeTemplate, SnapshotError> {
        let instance = self.checked_instance(index)?;
        self.topology
            .template(instance.template)
            .ok_or(SnapshotError::UnknownTemplate)
    }

    pub fn atom_range(&self, index: usize) -> Result<Range<usize>, SnapshotError> {
        Ok(self.checked_instance(index)?.atom_range())
    }

    pub fn instance_positions(&self, index: usize) -> Result<&[Point3<f64>], SnapshotError> {
        let range = self.atom_range(index)?;
        Ok(&self.positions[range])
    }

    /// Returns the cached center of mass of an instance.
    pub fn center_of_mass(&self, index: usize) -> Option<&Point3<f64>> {
        self.centers_of_mass.get(index)
    }

    /// Returns one coordinate of an instance's reference point (its center of mass).
    ///
    /// # Arguments
    ///
    /// * `index` - The instance index.
    /// * `axis` - The coordinate to read.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InstanceOutOfRange`] for an invalid index.
    pub fn position(&self, index: usize, axis: Axis) -> Result<f64, SnapshotError> {
        Ok(self.reference_point(index, ReferencePoint::CenterOfMass)?[axis.index()])
    }

    /// Returns the chosen reference point of an instance.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InstanceOutOfRange`] for an invalid index.
    pub fn reference_point(
        &self,
        index: usize,
        reference: ReferencePoint,
    ) -> Result<Point3<f64>, SnapshotError> {
        let instance = self.checked_instance(index)?;
        match reference {
            ReferencePoint::CenterOfMass => Ok(self.centers_of_mass[index]),
            ReferencePoint::FirstAtom => Ok(self
                .positions
                .get(instance.offset)
                .copied()
                .unwrap_or_else(Point3::origin)),
        }
    }

    fn compute_center_of_mass(&self, index: usize) -> Point3<f64> {
        let instance = &self.instances[index];
        let points = &self.positions[instance.atom_range()];
        match self.topology.template(instance.template) {
            Some(template) => center_of_mass(points, template.atoms().iter().map(|a| a.mass)),
            None => center_of_mass(points, std::iter::repeat(0.0)),
        }
    }

    /// Recomputes the cached center of mass of every instance from current positions.
    pub fn update_center_of_mass(&mut self) {
        let centers: Vec<_> = (0..self.instances.len())
            .map(|i| self.compute_center_of_mass(i))
            .collect();
        self.centers_of_mass = centers;
    }

    /// Replaces the molecular identity of one instance with another template.
    ///
    /// Positions are spatial data and stay untouched; only the instance's template
    /// changes, so atom names, masses and charges come from `new_template` afterwards.
    /// The instance's cached center of mass is refreshed with the new masses.
    ///
    /// # Arguments
    ///
    /// * `index` - The instance to replace.
    /// * `new_template` - The template the instance should refer to.
    ///
    /// # Return
    ///
    /// The template id the instance referred to before the call.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::SizeMismatch`] if the atom counts differ,
    /// [`SnapshotError::InstanceOutOfRange`] for an invalid index and
    /// [`SnapshotError::UnknownTemplate`] for a foreign id. The snapshot is
    /// unchanged on error.
    pub fn replace_instance(
        &mut self,
        index: usize,
        new_template: TemplateId,
    ) -> Result<TemplateId, SnapshotError> {
        let instance = *self.checked_instance(index)?;
        let template = self
            .topology
            .template(new_template)
            .ok_or(SnapshotError::UnknownTemplate)?;

        if template.atom_count() != instance.atom_count {
            return Err(SnapshotError::SizeMismatch {
                instance: index,
                expected: instance.atom_count,
                found: template.atom_count(),
            });
        }

        self.instances[index].template = new_template;
        self.centers_of_mass[index] = self.compute_center_of_mass(index);
        Ok(instance.template)
    }

    /// Replaces the whole positions arena.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::PositionCountMismatch`] if the new arena has a
    /// different length; the partition is fixed by the instances.
    pub fn set_positions(&mut self, positions: Vec<Point3<f64>>) -> Result<(), SnapshotError> {
        if positions.len() != self.positions.len() {
            return Err(SnapshotError::PositionCountMismatch {
                expected: self.positions.len(),
                found: positions.len(),
            });
        }
        self.positions = positions;
        self.update_center_of_mass();
        Ok(())
    }

    /// Rigidly shifts every atom of one instance.
    pub fn translate(&mut self, index: usize, shift: &Vector3<f64>) -> Result<(), SnapshotError> {
        let range = self.atom_range(index)?;
        for position in &mut self.positions[range] {
            *position += shift;
        }
        self.centers_of_mass[index] = self.compute_center_of_mass(index);
        Ok(())
    }

    /// Maps 1-based atom numbers onto the indices of the instances containing them.
    ///
    /// Each instance appears once, in the order its first atom is encountered.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::AtomOutOfRange`] if an atom number is zero or
    /// exceeds the number of atoms.
    pub fn instances_for_atoms(&self, atom_numbers: &[usize]) -> Result<Vec<usize>, SnapshotError> {
        let mut seen = vec![false; self.instances.len()];
        let mut result = Vec::new();

        for &atom_number in atom_numbers {
            if atom_number == 0 || atom_number > self.positions.len() {
                return Err(SnapshotError::AtomOutOfRange {
                    atom_number,
                    atom_count: self.positions.len(),
                });
            }
            let atom_index = atom_number - 1;
            let instance_index = self
                .instances
                .partition_point(|inst| inst.offset + inst.atom_count <= atom_index);
            if !seen[instance_index] {
                seen[instance_index] = true;
                result.push(instance_index);
            }
        }

        Ok(result)
    }

    /// Run-length encodes the current instance sequence by molecule type name.
    ///
    /// After replacements this is the `[ molecules ]` section a topology must
    /// carry to match the snapshot.
    pub fn molecule_blocks(&self) -> Vec<MoleculeBlock> {
        let mut blocks: Vec<MoleculeBlock> = Vec::new();
        for instance in &self.instances {
            let name = self
                .topology
                .template(instance.template)
                .map_or("", |t| t.name.as_str());
            match blocks.last_mut() {
                Some(last) if last.name == name => last.count += 1,
                _ => blocks.push(MoleculeBlock {
                    name: name.to_string(),
                    count: 1,
                }),
            }
        }
        blocks
    }

    /// Verifies that instance atom ranges tile the positions arena exactly.
    pub fn check_partition(&self) -> bool {
        let mut expected_offset = 0;
        for instance in &self.instances {
            if instance.offset != expected_offset {
                return false;
            }
            let template_size = self
                .topology
                .template(instance.template)
                .map(|t| t.atom_count());
            if template_size != Some(instance.atom_count) {
                return false;
            }
            expected_offset += instance.atom_count;
        }
        expected_offset == self.positions.len() && self.centers_of_mass.len() == self.instances.len()
    }

    /// Serializes the snapshot as a `.gro` frame.
    ///
    /// # Arguments
    ///
    /// * `box_vector` - The box written on the trailing line.
    /// * `description` - The title line.
    ///
    /// # Errors
    ///
    /// Returns [`GroError`] if formatting fails.
    pub fn serialize(
        &self,
        box_vector: &Vector3<f64>,
        description: &str,
    ) -> Result<Vec<u8>, GroError> {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, self, box_vector, description)?;
        Ok(buffer)
    }
}
