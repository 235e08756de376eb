//! The ordered list of configured steps.
//!
//! Storage order is what the user sees top-to-bottom. The
//! [`Direction`] flag decides whether steps execute in that order or
//! its reverse; flipping it never moves anything in storage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::params::{ParamBindings, ParamValue};
use crate::types::{Direction, PipelineError};

/// Identity of a step within one pipeline.
///
/// Keys increase monotonically and are never reused, not even after
/// [`Pipeline::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceKey(u64);

impl SequenceKey {
    /// The raw key value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One configured operation in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStep {
    key: SequenceKey,
    operation_id: String,
    bindings: ParamBindings,
}

impl PipelineStep {
    /// The step's key.
    #[must_use]
    pub const fn key(&self) -> SequenceKey {
        self.key
    }

    /// The catalog id of the step's operation.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// The step's parameter values.
    #[must_use]
    pub const fn bindings(&self) -> &ParamBindings {
        &self.bindings
    }
}

/// An ordered sequence of steps plus the execution direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    direction: Direction,
    #[serde(skip)]
    next_key: u64,
}

impl Pipeline {
    /// An empty, forward pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step for `operation_id` and return its key.
    ///
    /// The step lands where it will execute last: the end of storage
    /// when running forward, the front when reversed.
    pub fn append(&mut self, operation_id: impl Into<String>, bindings: ParamBindings) -> SequenceKey {
        let key = SequenceKey(self.next_key);
        self.next_key += 1;
        let step = PipelineStep {
            key,
            operation_id: operation_id.into(),
            bindings,
        };
        match self.direction {
            Direction::Forward => self.steps.push(step),
            Direction::Reversed => self.steps.insert(0, step),
        }
        key
    }

    /// Remove the step with `key`, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn remove(&mut self, key: SequenceKey) -> Result<PipelineStep, PipelineError> {
        let index = self.index_of(key)?;
        Ok(self.steps.remove(index))
    }

    /// Swap the step with its predecessor in storage. No-op on the first.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn move_up(&mut self, key: SequenceKey) -> Result<(), PipelineError> {
        let index = self.index_of(key)?;
        if index > 0 {
            self.steps.swap(index, index - 1);
        }
        Ok(())
    }

    /// Swap the step with its successor in storage. No-op on the last.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn move_down(&mut self, key: SequenceKey) -> Result<(), PipelineError> {
        let index = self.index_of(key)?;
        if index + 1 < self.steps.len() {
            self.steps.swap(index, index + 1);
        }
        Ok(())
    }

    /// Move the step to storage position `index`, clamped to the end.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn move_to(&mut self, key: SequenceKey, index: usize) -> Result<(), PipelineError> {
        let from = self.index_of(key)?;
        let step = self.steps.remove(from);
        let to = index.min(self.steps.len());
        self.steps.insert(to, step);
        Ok(())
    }

    /// Flip the execution direction.
    pub const fn reverse_direction(&mut self) {
        self.direction = self.direction.flipped();
    }

    /// The current execution direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Set the execution direction.
    pub const fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Steps in the order they execute and render.
    #[must_use]
    pub fn effective_order(&self) -> Vec<&PipelineStep> {
        match self.direction {
            Direction::Forward => self.steps.iter().collect(),
            Direction::Reversed => self.steps.iter().rev().collect(),
        }
    }

    /// Steps in storage order.
    #[must_use]
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// The step with `key`.
    #[must_use]
    pub fn step(&self, key: SequenceKey) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.key == key)
    }

    /// Bind parameter `name` of step `key`, returning the previous value.
    ///
    /// The name is not checked against the operation's schema here;
    /// the session layer does that because it owns the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StepNotFound`] for an unknown key.
    pub fn set_param(
        &mut self,
        key: SequenceKey,
        name: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Result<Option<ParamValue>, PipelineError> {
        let index = self.index_of(key)?;
        Ok(self.steps[index].bindings.set(name, value))
    }

    /// Remove every step. The direction and key counter are kept.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn index_of(&self, key: SequenceKey) -> Result<usize, PipelineError> {
        self.steps
            .iter()
            .position(|s| s.key == key)
            .ok_or(PipelineError::StepNotFound(key))
    }
}
