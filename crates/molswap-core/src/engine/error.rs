use thiserror::Error;

use crate::core::io::gro::GroError;
use crate::core::io::ndx::NdxError;
use crate::core::io::top::TopologyError;
use crate::core::models::snapshot::SnapshotError;
use crate::core::models::subset::SubsetError;

use super::config::SpatialWindow;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Group '{group}' contains no molecules to replace")]
    EmptyPool { group: String },

    #[error("Invalid spatial window {window}: bounds must be finite with lower < upper")]
    InvalidWindow { window: SpatialWindow },

    #[error("Replacement molecule '{0}' is not defined in the topology")]
    TemplateNotFound(String),

    #[error("Snapshot operation failed: {source}")]
    Snapshot {
        #[from]
        source: SnapshotError,
    },

    #[error("Eligible subset error: {source}")]
    Subset {
        #[from]
        source: SubsetError,
    },

    #[error("Failed to read topology: {source}")]
    Topology {
        #[from]
        source: TopologyError,
    },

    #[error("Failed to read index file: {source}")]
    Index {
        #[from]
        source: NdxError,
    },

    #[error("Failed to read or write coordinates: {source}")]
    Coordinates {
        #[from]
        source: GroError,
    },

    #[error("Only {replaced} of {requested} molecules were replaced after {attempts} attempts")]
    Incomplete {
        requested: usize,
        replaced: usize,
        attempts: u64,
    },
}
