// tienda-flow/src/flow/definition.rs

//! The `Flow<T, E>` struct and its structural editing methods.

use crate::branch::BranchBuilder;
use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered list of named steps operating on `ContextData<T>`.
///
/// `E` is the error type handlers return. It must absorb [`FlowError`] so that
/// engine-level failures (missing handlers, failed extractors, unmatched
/// branches) surface through the same channel.
pub struct Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<T>>,
  pub(crate) before_handlers: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on_handlers: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after_handlers: HashMap<String, Vec<Handler<T, E>>>,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(name, optional, skip_if)` triples.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<T>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef::new(*name, *optional, skip_if.clone()))
      .collect();

    Self {
      steps,
      before_handlers: HashMap::new(),
      on_handlers: HashMap::new(),
      after_handlers: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  fn position(&self, step_name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == step_name)
  }

  /// Panics on unknown step names: a typo in a flow definition is a programming
  /// error that should fail at startup, not per request.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.has_step(step_name) {
      panic!("Flow setup error: step '{}' not found in flow definition.", step_name);
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.has_step(step_name) {
      panic!("Flow setup error: step '{}' already exists in flow definition.", step_name);
    }
  }

  pub fn insert_before_step(
    &mut self,
    existing_step_name: &str,
    new_step_name: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipCondition<T>>,
  ) -> Result<(), FlowError> {
    let idx = self.position(existing_step_name).ok_or_else(|| FlowError::StepNotFound {
      step_name: existing_step_name.to_string(),
    })?;
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx, StepDef::new(name, optional, skip_if));
    Ok(())
  }

  pub fn insert_after_step(
    &mut self,
    existing_step_name: &str,
    new_step_name: impl Into<String>,
    optional: bool,
    skip_if: Option<SkipCondition<T>>,
  ) -> Result<(), FlowError> {
    let idx = self.position(existing_step_name).ok_or_else(|| FlowError::StepNotFound {
      step_name: existing_step_name.to_string(),
    })?;
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx + 1, StepDef::new(name, optional, skip_if));
    Ok(())
  }

  /// Removes a step and every handler attached to it. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Some(idx) = self.position(step_name) {
      self.steps.remove(idx);
      self.before_handlers.remove(step_name);
      self.on_handlers.remove(step_name);
      self.after_handlers.remove(step_name);
    }
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.optional = optional;
    }
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<T>>) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.skip_if = skip_if;
    }
  }

  /// Turns `step_name` into a branching step. The step is appended when it is
  /// not part of the definition yet.
  pub fn branch(&mut self, step_name: &str) -> BranchBuilder<'_, T, E> {
    if !self.has_step(step_name) {
      self.steps.push(StepDef::new(step_name, false, None));
    }
    BranchBuilder::new(self, step_name.to_string())
  }
}
