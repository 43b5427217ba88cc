//! # Engine Module
//!
//! The stateful layer of MolSwap: it owns the replacement algorithm and the
//! parameters that drive it.
//!
//! - **Configuration** ([`config`]) - Input paths, selection, sampling budget and window
//! - **Replacement** ([`replacement`]) - Rejection sampling over an eligible subset
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-level error type wrapping lower layers

pub mod config;
pub mod error;
pub mod progress;
pub mod replacement;
pub mod utils;
