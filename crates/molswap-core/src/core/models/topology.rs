use super::ids::TemplateId;
use super::molecule::MoleculeTemplate;
use slotmap::SlotMap;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TopologyModelError {
    #[error("Molecule type '{0}' is defined more than once")]
    DuplicateTemplate(String),
    #[error("Molecule type '{0}' is not defined in the topology")]
    TemplateNotFound(String),
    #[error("The [ molecules ] section describes more atoms than can be addressed")]
    CompositionOverflow,
}

/// One entry of the `[ molecules ]` composition: `count` consecutive instances of `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeBlock {
    pub name: String,
    pub count: usize,
}

/// Holds every molecule template of a system and the order they are instantiated in.
///
/// Templates are stored in a slot map and addressed by [`TemplateId`]; names are
/// unique. The composition mirrors the topology's `[ molecules ]` section and
/// defines how the coordinate file's atoms are split into instances.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Human readable name from the `[ system ]` section.
    pub system_name: String,
    templates: SlotMap<TemplateId, MoleculeTemplate>,
    name_map: HashMap<String, TemplateId>,
    composition: Vec<MoleculeBlock>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new molecule template.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyModelError::DuplicateTemplate`] if a template with the
    /// same name already exists.
    pub fn add_template(
        &mut self,
        template: MoleculeTemplate,
    ) -> Result<TemplateId, TopologyModelError> {
        if self.name_map.contains_key(&template.name) {
            return Err(TopologyModelError::DuplicateTemplate(template.name));
        }
        let name = template.name.clone();
        let id = self.templates.insert(template);
        self.name_map.insert(name, id);
        Ok(id)
    }

    pub fn template(&self, id: TemplateId) -> Option<&MoleculeTemplate> {
        self.templates.get(id)
    }

    pub fn templates_iter(&self) -> impl Iterator<Item = (TemplateId, &MoleculeTemplate)> {
        self.templates.iter()
    }

    pub(crate) fn templates_iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (TemplateId, &mut MoleculeTemplate)> {
        self.templates.iter_mut()
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Finds a template by its molecule type name.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyModelError::TemplateNotFound`] when no template has that name.
    pub fn find(&self, name: &str) -> Result<TemplateId, TopologyModelError> {
        self.name_map
            .get(name)
            .copied()
            .ok_or_else(|| TopologyModelError::TemplateNotFound(name.to_string()))
    }

    pub fn composition(&self) -> &[MoleculeBlock] {
        &self.composition
    }

    /// Appends a block to the composition, merging it with the previous block
    /// when both name the same molecule type.
    pub fn push_block(&mut self, name: &str, count: usize) {
        if let Some(last) = self.composition.last_mut() {
            if last.name == name {
                last.count = last.count.saturating_add(count);
                return;
            }
        }
        self.composition.push(MoleculeBlock {
            name: name.to_string(),
            count,
        });
    }

    /// Total number of atoms implied by the composition, if every block's template exists.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyModelError::TemplateNotFound`] for an undefined block and
    /// [`TopologyModelError::CompositionOverflow`] if the total does not fit in `usize`.
    pub fn composition_atom_count(&self) -> Result<usize, TopologyModelError> {
        self.composition.iter().try_fold(0usize, |acc, block| {
            let id = self.find(&block.name)?;
            self.templates[id]
                .atom_count()
                .checked_mul(block.count)
                .and_then(|atoms| acc.checked_add(atoms))
                .ok_or(TopologyModelError::CompositionOverflow)
        })
    }
}
