//! Provides input/output functionality for GROMACS file formats.
//!
//! Topologies (`.top`/`.itp`) and index files (`.ndx`) are read into plain
//! models; coordinate files (`.gro`) go through the [`traits::CoordinateFile`]
//! interface because they need a topology to be split into molecule instances.

pub mod gro;
pub mod ndx;
pub mod report;
pub mod top;
pub mod traits;
