use crate::core::models::snapshot::ReferencePoint;
use crate::core::utils::geometry::Axis;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_MAX_ATTEMPTS: u64 = 100_000;
pub const DEFAULT_WINDOW_LOWER: f64 = 1.00;
pub const DEFAULT_WINDOW_UPPER: f64 = 1.70;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// An open interval on one axis that a molecule's reference point must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialWindow {
    pub axis: Axis,
    pub lower: f64,
    pub upper: f64,
}

impl Default for SpatialWindow {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            lower: DEFAULT_WINDOW_LOWER,
            upper: DEFAULT_WINDOW_UPPER,
        }
    }
}

impl SpatialWindow {
    pub fn new(axis: Axis, lower: f64, upper: f64) -> Self {
        Self { axis, lower, upper }
    }

    pub fn is_valid(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper
    }

    /// Strict containment: both bounds are excluded.
    pub fn contains(&self, value: f64) -> bool {
        value > self.lower && value < self.upper
    }
}

impl fmt::Display for SpatialWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in ({}, {})", self.axis, self.lower, self.upper)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputFiles {
    pub coordinates_path: PathBuf,
    pub topology_path: PathBuf,
    pub index_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub count: usize,
    pub max_attempts: u64,
    pub reference: ReferencePoint,
    pub seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            count: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            reference: ReferencePoint::CenterOfMass,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceConfig {
    pub files: InputFiles,
    /// Index group whose molecules may be replaced.
    pub group: String,
    /// Molecule type name the selected molecules become.
    pub molecule: String,
    pub sampling: SamplingConfig,
    pub window: SpatialWindow,
    /// Treat falling short of `sampling.count` as an error.
    pub strict: bool,
}

#[derive(Default)]
pub struct ReplaceConfigBuilder {
    coordinates_path: Option<PathBuf>,
    topology_path: Option<PathBuf>,
    index_path: Option<PathBuf>,
    group: Option<String>,
    molecule: Option<String>,
    count: Option<usize>,
    max_attempts: Option<u64>,
    reference: Option<ReferencePoint>,
    seed: Option<u64>,
    window: Option<SpatialWindow>,
    strict: Option<bool>,
}

impl ReplaceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordinates_path(mut self, path: PathBuf) -> Self {
        self.coordinates_path = Some(path);
        self
    }
    pub fn topology_path(mut self, path: PathBuf) -> Self {
        self.topology_path = Some(path);
        self
    }
    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.index_path = Some(path);
        self
    }
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
    pub fn molecule(mut self, molecule: impl Into<String>) -> Self {
        self.molecule = Some(molecule.into());
        self
    }
    pub fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
    pub fn max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
    pub fn reference(mut self, reference: ReferencePoint) -> Self {
        self.reference = Some(reference);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
    pub fn window(mut self, window: SpatialWindow) -> Self {
        self.window = Some(window);
        self
    }
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn build(self) -> Result<ReplaceConfig, ConfigError> {
        let files = InputFiles {
            coordinates_path: self
                .coordinates_path
                .ok_or(ConfigError::MissingParameter("coordinates_path"))?,
            topology_path: self
                .topology_path
                .ok_or(ConfigError::MissingParameter("topology_path"))?,
            index_path: self
                .index_path
                .ok_or(ConfigError::MissingParameter("index_path"))?,
        };
        let defaults = SamplingConfig::default();
        Ok(ReplaceConfig {
            files,
            group: self.group.ok_or(ConfigError::MissingParameter("group"))?,
            molecule: self
                .molecule
                .ok_or(ConfigError::MissingParameter("molecule"))?,
            sampling: SamplingConfig {
                count: self.count.unwrap_or(defaults.count),
                max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
                reference: self.reference.unwrap_or(defaults.reference),
                seed: self.seed,
            },
            window: self.window.unwrap_or_default(),
            strict: self.strict.unwrap_or(false),
        })
    }
}
