use super::config::{ReplaceConfig, SpatialWindow};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::utils::sampling::uniform_index;
use crate::core::models::ids::TemplateId;
use crate::core::models::snapshot::{AssemblySnapshot, ReferencePoint, SnapshotError};
use crate::core::models::subset::EligibleSubset;
use nalgebra::Point3;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

/// Parameters of one replacement run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplacementRequest {
    /// How many molecules should be replaced.
    pub target_count: usize,
    /// Upper bound on the number of draws, successful or not.
    pub max_attempts: u64,
    pub window: SpatialWindow,
    pub reference: ReferencePoint,
}

impl ReplacementRequest {
    pub fn from_config(config: &ReplaceConfig) -> Self {
        Self {
            target_count: config.sampling.count,
            max_attempts: config.sampling.max_attempts,
            window: config.window,
            reference: config.sampling.reference,
        }
    }
}

/// One accepted draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    /// Instance index in the snapshot.
    pub instance: usize,
    /// The template the instance had before the swap.
    pub previous: TemplateId,
    /// The reference point that was tested against the window.
    pub reference: Point3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementOutcome {
    pub requested: usize,
    pub replaced_count: usize,
    pub attempt_count: u64,
    /// Instance indices in the order they were replaced.
    pub replaced_instances: Vec<usize>,
    pub replacements: Vec<Replacement>,
}

impl ReplacementOutcome {
    pub fn is_complete(&self) -> bool {
        self.replaced_count >= self.requested
    }
}

/// Replaces molecules of an eligible subset by uniform rejection sampling.
///
/// Each draw picks a pool entry uniformly from the full, fixed-size pool.
/// Entries already replaced or whose reference point lies outside the window
/// are rejected, and the draw still counts against the attempt budget. The
/// run stops when the target count is reached or the budget is spent,
/// whichever comes first. Falling short is reported in the outcome and logged,
/// not treated as an error.
pub struct ReplacementEngine<'a> {
    reporter: &'a ProgressReporter<'a>,
}

impl<'a> ReplacementEngine<'a> {
    pub fn new(reporter: &'a ProgressReporter<'a>) -> Self {
        Self { reporter }
    }

    /// Runs the sampling loop.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - The system whose instances get replaced.
    /// * `subset` - The pool to sample from; replaced entries are marked in it.
    /// * `replacement` - The template selected molecules become.
    /// * `request` - Target count, attempt budget, window and reference point.
    /// * `rng` - The random source for draws.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyPool`] for an empty subset (no draw is made),
    /// [`EngineError::InvalidWindow`] for a window that is not a finite open
    /// interval, and [`EngineError::Snapshot`] if the replacement template is
    /// foreign to the snapshot or differs in atom count from a pool member.
    /// All of these are detected before the snapshot is touched.
    #[instrument(skip_all, name = "replacement_engine", fields(group = subset.group(), target = request.target_count))]
    pub fn run(
        &self,
        snapshot: &mut AssemblySnapshot,
        subset: &mut EligibleSubset,
        replacement: TemplateId,
        request: &ReplacementRequest,
        rng: &mut impl Rng,
    ) -> Result<ReplacementOutcome, EngineError> {
        if subset.is_empty() {
            return Err(EngineError::EmptyPool {
                group: subset.group().to_string(),
            });
        }
        if !request.window.is_valid() {
            return Err(EngineError::InvalidWindow {
                window: request.window,
            });
        }
        Self::check_sizes(snapshot, subset, replacement)?;

        self.reporter.report(Progress::PhaseStart {
            name: "Replacing Molecules",
        });
        snapshot.update_center_of_mass();
        self.reporter.report(Progress::TaskStart {
            total_steps: request.target_count as u64,
        });

        let axis = request.window.axis.index();
        let mut attempts: u64 = 0;
        let mut replacements = Vec::with_capacity(request.target_count);

        while replacements.len() < request.target_count && attempts < request.max_attempts {
            let local = uniform_index(subset.size(), rng).map_err(|_| EngineError::EmptyPool {
                group: subset.group().to_string(),
            })?;
            attempts += 1;

            if subset.is_replaced(local)? {
                continue;
            }
            let instance = subset.instance_index_at(local)?;
            let reference = snapshot.reference_point(instance, request.reference)?;
            if !request.window.contains(reference[axis]) {
                continue;
            }

            let previous = snapshot.replace_instance(instance, replacement)?;
            subset.mark_replaced(local)?;
            debug!(instance, attempts, "Molecule replaced.");
            replacements.push(Replacement {
                instance,
                previous,
                reference,
            });
            self.reporter.report(Progress::TaskIncrement);
        }

        self.reporter.report(Progress::TaskFinish);
        self.reporter.report(Progress::PhaseFinish);

        let outcome = ReplacementOutcome {
            requested: request.target_count,
            replaced_count: replacements.len(),
            attempt_count: attempts,
            replaced_instances: replacements.iter().map(|r| r.instance).collect(),
            replacements,
        };

        if outcome.is_complete() {
            info!(
                "Replaced {} molecule(s) in {} attempt(s).",
                outcome.replaced_count, outcome.attempt_count
            );
        } else {
            warn!(
                "Only {} of {} requested molecules were replaced; the budget of {} attempts ran out.",
                outcome.replaced_count, outcome.requested, request.max_attempts
            );
        }
        Ok(outcome)
    }

    fn check_sizes(
        snapshot: &AssemblySnapshot,
        subset: &EligibleSubset,
        replacement: TemplateId,
    ) -> Result<(), SnapshotError> {
        let expected = snapshot
            .topology()
            .template(replacement)
            .ok_or(SnapshotError::UnknownTemplate)?
            .atom_count();
        for &member in subset.members() {
            let instance = snapshot
                .instance(member)
                .ok_or(SnapshotError::InstanceOutOfRange {
                    index: member,
                    count: snapshot.instance_count(),
                })?;
            if instance.atom_count() != expected {
                return Err(SnapshotError::SizeMismatch {
                    instance: member,
                    expected: instance.atom_count(),
                    found: expected,
                });
            }
        }
        Ok(())
    }
}
