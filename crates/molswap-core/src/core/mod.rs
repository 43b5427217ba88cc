//! # Core Module
//!
//! Stateless building blocks of MolSwap: the molecular data model, readers and
//! writers for GROMACS file formats, and small geometric helpers.
//!
//! - **Molecular Representation** ([`models`]) - Atoms, molecule templates, the
//!   topology, the assembled snapshot and the eligible subset sampled from it
//! - **File I/O** ([`io`]) - Topology, index and coordinate files, plus the CSV
//!   replacement report
//! - **Utilities** ([`utils`]) - Axes and center-of-mass arithmetic

pub mod io;
pub mod models;
pub mod utils;
