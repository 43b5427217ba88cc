use std::collections::HashMap;

/// Lennard-Jones parameters that override the combination rule for one atom-type pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossLj {
    /// The collision diameter in nm.
    pub sigma: f64,
    /// The well depth in kJ/mol.
    pub epsilon: f64,
}

/// Represents one atom of a molecule template with its physicochemical properties.
///
/// Atoms carry no coordinates; positions live in the snapshot's arena and are
/// aligned with the template's atom order. The residue fields are the values
/// written in the topology's `[ atoms ]` section and are only needed to write
/// coordinate files.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "OW", "HW1").
    pub name: String,
    /// The force field atom type (e.g., "opls_116").
    pub atom_type: String,
    /// The residue name this atom is written under (e.g., "SOL").
    pub residue_name: String,
    /// The residue number local to the molecule, as numbered in the topology.
    pub residue_number: usize,
    /// The atomic mass in atomic mass units.
    pub mass: f64,
    /// The partial charge in elementary charge units.
    pub charge: f64,
    /// The Lennard-Jones collision diameter in nm.
    pub sigma: f64,
    /// The Lennard-Jones well depth in kJ/mol.
    pub epsilon: f64,
    cross_lj: HashMap<String, CrossLj>,
}

impl Atom {
    /// Creates a new `Atom` with zeroed physical parameters.
    ///
    /// The residue defaults to residue number 1 named after nothing; readers
    /// fill in every field they know about after construction.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `atom_type` - The force field atom type.
    pub fn new(name: &str, atom_type: &str) -> Self {
        Self {
            name: name.to_string(),
            atom_type: atom_type.to_string(),
            residue_name: String::new(),
            residue_number: 1,
            mass: 0.0,
            charge: 0.0,
            sigma: 0.0,
            epsilon: 0.0,
            cross_lj: HashMap::new(),
        }
    }

    pub fn with_residue(mut self, residue_name: &str, residue_number: usize) -> Self {
        self.residue_name = residue_name.to_string();
        self.residue_number = residue_number;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_lj(mut self, sigma: f64, epsilon: f64) -> Self {
        self.sigma = sigma;
        self.epsilon = epsilon;
        self
    }

    /// Records a pairwise Lennard-Jones override against a partner atom type.
    ///
    /// The override is stored on this atom only. A symmetric interaction needs
    /// the call on both atoms.
    ///
    /// # Arguments
    ///
    /// * `partner_type` - The atom type of the interaction partner.
    /// * `sigma` - The pair collision diameter in nm.
    /// * `epsilon` - The pair well depth in kJ/mol.
    pub fn set_cross_lj(&mut self, partner_type: &str, sigma: f64, epsilon: f64) {
        self.cross_lj
            .insert(partner_type.to_string(), CrossLj { sigma, epsilon });
    }

    /// Looks up the pairwise override recorded against `partner_type`, if any.
    pub fn cross_lj(&self, partner_type: &str) -> Option<CrossLj> {
        self.cross_lj.get(partner_type).copied()
    }

    pub fn cross_lj_partners(&self) -> impl Iterator<Item = (&str, &CrossLj)> {
        self.cross_lj.iter().map(|(k, v)| (k.as_str(), v))
    }
}
