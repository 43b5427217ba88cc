//! Helpers used by the engine's sampling loop.

pub mod sampling;
