//! # Core Models Module
//!
//! Data structures describing a molecular system as a set of molecule templates
//! instantiated over a shared positions arena.
//!
//! ## Key Components
//!
//! - [`atom`] - Per-atom physical parameters shared by all instances of a template
//! - [`molecule`] - Named, ordered atom lists (molecule types)
//! - [`topology`] - Template registry and the `[ molecules ]` composition
//! - [`snapshot`] - Instances, positions, velocities and the periodic box
//! - [`subset`] - The pool of instances a replacement run samples from
//! - [`ids`] - Stable keys for templates

pub mod atom;
pub mod ids;
pub mod molecule;
pub mod snapshot;
pub mod subset;
pub mod topology;
