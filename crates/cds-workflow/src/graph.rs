use std::collections::{HashMap, HashSet};

use cds_config::{StepDef, WorkflowDef};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Label of an outgoing edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
  Success,
  Failure,
}

/// Validated, immutable workflow graph.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
  /// Step definitions keyed by name.
  steps: HashMap<String, StepDef>,
  /// Step names in declaration order.
  order: Vec<String>,
  /// step -> next steps on success.
  on_success: HashMap<String, Vec<String>>,
  /// step -> next steps on failure.
  on_failure: HashMap<String, Vec<String>>,
  /// Reverse adjacency: step -> steps with a transition into it.
  upstream: HashMap<String, Vec<String>>,
  entry_point: String,
}

impl WorkflowGraph {
  /// Build a graph from a workflow definition.
  pub fn from_workflow(def: &WorkflowDef) -> Result<Self, WorkflowError> {
    Self::build(&def.steps)
  }

  /// Validate the steps and build the graph.
  pub fn build(steps: &[StepDef]) -> Result<Self, WorkflowError> {
    if steps.is_empty() {
      return Err(WorkflowError::EmptyWorkflow);
    }

    let mut by_name: HashMap<String, StepDef> = HashMap::with_capacity(steps.len());
    let mut order = Vec::with_capacity(steps.len());
    for step in steps {
      if by_name.insert(step.name.clone(), step.clone()).is_some() {
        return Err(WorkflowError::DuplicateStep {
          step: step.name.clone(),
        });
      }
      order.push(step.name.clone());
    }

    // Validate transitions
    for step in steps {
      for next in step.on_success.iter().chain(step.on_failure.iter()) {
        if *next == step.name {
          return Err(WorkflowError::SelfTransition {
            step: step.name.clone(),
          });
        }
        if !by_name.contains_key(next) {
          return Err(WorkflowError::MissingStep {
            step: next.clone(),
            referenced_by: step.name.clone(),
          });
        }
      }
    }

    let mut on_success = HashMap::with_capacity(steps.len());
    let mut on_failure = HashMap::with_capacity(steps.len());
    let mut upstream: HashMap<String, Vec<String>> = HashMap::with_capacity(steps.len());

    for name in &order {
      upstream.entry(name.clone()).or_default();
    }

    for step in steps {
      on_success.insert(step.name.clone(), step.on_success.clone());
      on_failure.insert(step.name.clone(), step.on_failure.clone());

      let targets: HashSet<&String> = step.on_success.iter().chain(&step.on_failure).collect();
      for target in targets {
        upstream
          .entry(target.clone())
          .or_default()
          .push(step.name.clone());
      }
    }

    let entry_point = Self::find_entry_point(steps, &upstream)?;

    Ok(Self {
      steps: by_name,
      order,
      on_success,
      on_failure,
      upstream,
      entry_point,
    })
  }

  /// The explicitly marked start step, else the single step without incoming
  /// transitions.
  fn find_entry_point(
    steps: &[StepDef],
    upstream: &HashMap<String, Vec<String>>,
  ) -> Result<String, WorkflowError> {
    let marked: Vec<String> = steps
      .iter()
      .filter(|s| s.start)
      .map(|s| s.name.clone())
      .collect();

    match marked.len() {
      0 => {}
      1 => return Ok(marked[0].clone()),
      _ => return Err(WorkflowError::MultipleStartSteps { steps: marked }),
    }

    let candidates: Vec<String> = steps
      .iter()
      .filter(|s| upstream.get(&s.name).is_none_or(|v| v.is_empty()))
      .map(|s| s.name.clone())
      .collect();

    match candidates.len() {
      0 => Err(WorkflowError::NoEntryPoint),
      1 => Ok(candidates[0].clone()),
      _ => Err(WorkflowError::AmbiguousEntryPoint { candidates }),
    }
  }

  /// The step execution starts at.
  pub fn entry_point(&self) -> &str {
    &self.entry_point
  }

  /// Get a step by name.
  pub fn step(&self, name: &str) -> Option<&StepDef> {
    self.steps.get(name)
  }

  /// Declared next steps for a step on the given transition.
  pub fn transitions(&self, name: &str, transition: Transition) -> &[String] {
    let adjacency = match transition {
      Transition::Success => &self.on_success,
      Transition::Failure => &self.on_failure,
    };
    adjacency.get(name).map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// The step that actually runs next: the first declared transition. The
  /// remaining ones are alternative static destinations.
  pub fn next(&self, name: &str, transition: Transition) -> Option<&str> {
    self
      .transitions(name, transition)
      .first()
      .map(String::as_str)
  }

  /// Whether the step has no outgoing edge on the given transition.
  pub fn is_terminal(&self, name: &str, transition: Transition) -> bool {
    self.transitions(name, transition).is_empty()
  }

  /// Steps that have a transition into the given step.
  pub fn upstream(&self, name: &str) -> &[String] {
    self.upstream.get(name).map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Step names in declaration order.
  pub fn step_names(&self) -> &[String] {
    &self.order
  }

  /// All labelled edges, in declaration order.
  pub fn edges(&self) -> Vec<(String, String, Transition)> {
    let mut edges = Vec::new();
    for name in &self.order {
      for next in self.transitions(name, Transition::Success) {
        edges.push((name.clone(), next.clone(), Transition::Success));
      }
      for next in self.transitions(name, Transition::Failure) {
        edges.push((name.clone(), next.clone(), Transition::Failure));
      }
    }
    edges
  }

  /// Steps reachable from the entry step through any transition.
  pub fn reachable(&self) -> Vec<&str> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![self.entry_point.as_str()];
    let mut result = Vec::new();

    while let Some(name) = stack.pop() {
      if !seen.insert(name) {
        continue;
      }
      result.push(name);
      for next in self
        .transitions(name, Transition::Success)
        .iter()
        .chain(self.transitions(name, Transition::Failure))
      {
        stack.push(next.as_str());
      }
    }

    result
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}
