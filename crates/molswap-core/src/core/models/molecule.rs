use super::atom::Atom;

/// A named molecule species: the ordered atoms shared by every instance of it.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeTemplate {
    pub name: String,
    atoms: Vec<Atom>,
}

impl MoleculeTemplate {
    pub fn new(name: &str, atoms: Vec<Atom>) -> Self {
        Self {
            name: name.to_string(),
            atoms,
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub(crate) fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub(crate) fn push_atom(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn total_mass(&self) -> f64 {
        self.atoms.iter().map(|a| a.mass).sum()
    }

    pub fn total_charge(&self) -> f64 {
        self.atoms.iter().map(|a| a.charge).sum()
    }
}
