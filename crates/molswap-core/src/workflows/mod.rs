//! # Workflows Module
//!
//! High-level entry points that tie [`crate::core`] and [`crate::engine`]
//! together: each workflow loads its input files, drives the engine and returns
//! a result the caller can inspect or write out.
//!
//! - **Replacement Workflow** ([`replace`]) - Load a system, replace molecules
//!   of an index group inside a spatial window, and report what changed
//! - **Inspection Workflow** ([`inspect`]) - Summarize templates, composition
//!   and index groups of a system without modifying it

pub mod inspect;
pub mod replace;
