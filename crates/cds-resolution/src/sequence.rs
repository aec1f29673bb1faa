use std::collections::{BTreeSet, HashMap, HashSet};

use cds_config::{ResourceAssignment, ResourceDefinition};

use crate::error::ResolveError;

/// Dependencies of an assignment: its declared dependencies, the definition's
/// key dependencies, then the key dependencies of every source in its chain.
/// Deduplicated, first occurrence wins.
pub fn effective_dependencies(
  assignment: &ResourceAssignment,
  definition: Option<&ResourceDefinition>,
) -> Vec<String> {
  let mut deps: Vec<String> = assignment.dependencies.clone();

  if let Some(definition) = definition {
    deps.extend(definition.key_dependencies.iter().cloned());
    for source_name in assignment.source_chain() {
      if let Some(source) = definition.source(source_name) {
        deps.extend(source.key_dependencies());
      }
    }
  }

  let mut seen = HashSet::new();
  deps.retain(|d| d != &assignment.name && seen.insert(d.clone()));
  deps
}

/// Order nodes so that every node comes after its dependencies.
///
/// `nodes` are `(name, dependencies)` pairs in declaration order; the result
/// holds indices into `nodes`. Among nodes that are ready at the same time the
/// earliest declared one goes first.
pub fn topological_order(nodes: &[(String, Vec<String>)]) -> Result<Vec<usize>, ResolveError> {
  let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
  for (i, (name, _)) in nodes.iter().enumerate() {
    if index.insert(name.as_str(), i).is_some() {
      return Err(ResolveError::DuplicateAssignment { name: name.clone() });
    }
  }

  let mut in_degree = vec![0usize; nodes.len()];
  let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

  for (i, (name, deps)) in nodes.iter().enumerate() {
    for dep in deps {
      let Some(&d) = index.get(dep.as_str()) else {
        return Err(ResolveError::UnknownDependency {
          assignment: name.clone(),
          dependency: dep.clone(),
        });
      };
      in_degree[i] += 1;
      dependents[d].push(i);
    }
  }

  let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
  let mut order = Vec::with_capacity(nodes.len());

  while let Some(next) = ready.pop_first() {
    order.push(next);
    for &dependent in &dependents[next] {
      in_degree[dependent] -= 1;
      if in_degree[dependent] == 0 {
        ready.insert(dependent);
      }
    }
  }

  if order.len() < nodes.len() {
    let mut remaining: Vec<String> = (0..nodes.len())
      .filter(|&i| in_degree[i] > 0)
      .map(|i| nodes[i].0.clone())
      .collect();
    remaining.sort();
    return Err(ResolveError::CyclicDependency { remaining });
  }

  Ok(order)
}

/// Group assignments, already in resolution order, into batches of consecutive
/// assignments sharing a primary source where no assignment depends on another
/// one of the same batch.
pub fn sequence_batches(
  ordered: &[&ResourceAssignment],
  dependencies: &HashMap<String, Vec<String>>,
) -> Vec<Vec<String>> {
  let mut batches: Vec<Vec<String>> = Vec::new();
  let mut current_source: Option<&str> = None;

  for assignment in ordered {
    let deps = dependencies
      .get(&assignment.name)
      .map(Vec::as_slice)
      .unwrap_or(&[]);

    let joins_current = match (current_source, batches.last()) {
      (Some(source), Some(batch)) => {
        source == assignment.dictionary_source && !deps.iter().any(|d| batch.contains(d))
      }
      _ => false,
    };

    if joins_current {
      if let Some(batch) = batches.last_mut() {
        batch.push(assignment.name.clone());
      }
    } else {
      batches.push(vec![assignment.name.clone()]);
      current_source = Some(assignment.dictionary_source.as_str());
    }
  }

  batches
}
