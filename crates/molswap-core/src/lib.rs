//! # MolSwap Core Library
//!
//! Replaces molecules inside GROMACS simulation snapshots: a number of molecules
//! from an index group whose reference point lies inside a spatial window are
//! swapped for another molecule type of the same atom count, chosen by uniform
//! rejection sampling under an attempt budget.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`,
//!   `AssemblySnapshot`, `EligibleSubset`) and file I/O.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the rejection-sampling
//!   `ReplacementEngine`, progress reporting and error types.
//!
//! - **[`workflows`]: The Public API.** Complete procedures that load input
//!   files, run the engine and hand back a result ready to be written.

pub mod core;
pub mod engine;
pub mod workflows;
