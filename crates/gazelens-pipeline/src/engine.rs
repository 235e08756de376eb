//! The execution engine: runs a pipeline against a pristine source.
//!
//! A run works on a duplicate of the source handle, walks the pipeline
//! in effective order, and threads one handle from step to step. Each
//! step's dependencies are checked against the operations already
//! executed in this run before the step touches the image. Whatever
//! way a run ends, every intermediate handle has been released; only
//! the final image of a successful run survives.
//!
//! Only one run may be in flight per [`RunGate`]. A second request made
//! while the first is still executing (for example from a library
//! callback) is rejected with [`PipelineError::ConcurrentRunRejected`].

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::catalog::Catalog;
use crate::diagnostics::{RunReport, StepReport};
use crate::handle::ImageHandle;
use crate::library::ImageLibrary;
use crate::pipeline::Pipeline;
use crate::types::{PipelineError, Resource};

/// Shared in-progress flag.
#[derive(Debug, Clone, Default)]
pub struct RunGate {
    busy: Rc<Cell<bool>>,
}

impl RunGate {
    /// An idle gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run currently holds the gate.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Claim the gate.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConcurrentRunRejected`] if the gate is
    /// already held.
    pub fn enter(&self) -> Result<RunPermit, PipelineError> {
        if self.busy.replace(true) {
            return Err(PipelineError::ConcurrentRunRejected);
        }
        Ok(RunPermit {
            busy: Rc::clone(&self.busy),
        })
    }
}

/// Proof of holding the gate; dropping it frees the gate.
#[derive(Debug)]
pub struct RunPermit {
    busy: Rc<Cell<bool>>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunOutcome {
    /// The final image.
    pub image: ImageHandle,
    /// Per-step diagnostics.
    pub report: RunReport,
}

/// Runs pipelines, one at a time.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    gate: RunGate,
}

impl Engine {
    /// An engine with its own gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine sharing `gate` with others.
    #[must_use]
    pub const fn with_gate(gate: RunGate) -> Self {
        Self { gate }
    }

    /// The engine's gate.
    #[must_use]
    pub const fn gate(&self) -> &RunGate {
        &self.gate
    }

    /// Run `pipeline` against a duplicate of `source`.
    ///
    /// `source` itself is never modified.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::ConcurrentRunRejected`] if another run holds
    ///   the gate.
    /// - [`PipelineError::ResourceNotReady`] if `library` is not ready.
    /// - [`PipelineError::CatalogLookup`] if a step's operation is not
    ///   registered.
    /// - [`PipelineError::DependencyUnsatisfied`] for the first step
    ///   whose dependencies have not all executed earlier, listing every
    ///   missing one. That step and all later steps do not execute.
    /// - [`PipelineError::OperationExecution`] tagged with the failing
    ///   step's position.
    pub fn run<L: ImageLibrary + ?Sized>(
        &self,
        catalog: &Catalog,
        library: &L,
        pipeline: &Pipeline,
        source: &ImageHandle,
    ) -> Result<RunOutcome, PipelineError> {
        let _permit = self.gate.enter()?;
        if !library.is_ready() {
            return Err(PipelineError::ResourceNotReady(Resource::Library));
        }

        let started = web_time::Instant::now();
        let mut current = source.duplicate();
        let mut executed: HashSet<&str> = HashSet::new();
        let mut steps = Vec::with_capacity(pipeline.len());

        for (position, step) in pipeline.effective_order().into_iter().enumerate() {
            let descriptor = catalog.require(step.operation_id()).inspect_err(|err| {
                log::warn!("run aborted at step {position}: {err}");
            })?;

            let missing: Vec<String> = descriptor
                .dependencies()
                .iter()
                .filter(|dep| !executed.contains(dep.as_str()))
                .map(|dep| {
                    catalog
                        .lookup(dep)
                        .map_or_else(|| dep.clone(), |d| d.display_name().to_string())
                })
                .collect();
            if !missing.is_empty() {
                let err = PipelineError::DependencyUnsatisfied {
                    operation_id: descriptor.id().to_string(),
                    position,
                    missing,
                };
                log::warn!("run aborted at step {position}: {err}");
                return Err(err);
            }

            let step_started = web_time::Instant::now();
            current = descriptor
                .execute(library, current, step.bindings())
                .map_err(|err| match err {
                    PipelineError::OperationExecution {
                        operation_id,
                        display_name,
                        cause,
                        ..
                    } => PipelineError::OperationExecution {
                        operation_id,
                        display_name,
                        position: Some(position),
                        cause,
                    },
                    other => other,
                })
                .inspect_err(|err| log::warn!("run aborted at step {position}: {err}"))?;
            let duration = step_started.elapsed();

            log::debug!(
                "step {position} ({}) done in {:.3}ms",
                descriptor.id(),
                duration.as_secs_f64() * 1000.0,
            );
            executed.insert(descriptor.id());
            steps.push(StepReport {
                key: step.key(),
                operation_id: descriptor.id().to_string(),
                duration,
                output: current.dimensions(),
            });
        }

        let report = RunReport {
            source: source.dimensions(),
            steps,
            total_duration: started.elapsed(),
        };
        log::info!(
            "pipeline run finished: {} steps in {:.3}ms",
            report.steps.len(),
            report.total_duration.as_secs_f64() * 1000.0,
        );
        Ok(RunOutcome {
            image: current,
            report,
        })
    }
}
