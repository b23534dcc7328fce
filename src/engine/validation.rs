// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Submission-time validation of task graphs.
//!
//! A batch is checked before any of it reaches the ready queue, so a graph
//! that could never finish is rejected up front instead of parking forever.
//! Checks run in this order:
//!
//! 1. **Uniqueness**: no id repeats within the batch or collides with an id
//!    the scheduler already knows.
//! 2. **References**: every dependency is either known or part of the batch.
//! 3. **Cycles**: DFS with a recursion stack over the batch's own edges.
//!
//! Cycle detection only runs when the first two checks pass, since it needs
//! a structurally valid graph. All other errors are accumulated so the
//! caller sees every problem at once.

use std::collections::{HashMap, HashSet};

use crate::errors::ValidationError;
use crate::model::{SubTask, TaskId};

/// Validates `batch` against the ids the scheduler already tracks.
pub fn validate_submission(
    batch: &[SubTask],
    known: &HashSet<TaskId>,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(duplicates) = validate_unique_ids(batch, known) {
        errors.extend(duplicates);
    }

    if let Err(unresolved) = validate_dependency_references(batch, known) {
        errors.extend(unresolved);
    }

    if errors.is_empty() {
        if let Err(cycles) = validate_acyclic(batch) {
            errors.extend(cycles);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_ids(
    batch: &[SubTask],
    known: &HashSet<TaskId>,
) -> Result<(), Vec<ValidationError>> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for task in batch {
        if known.contains(&task.id) || !seen.insert(&task.id) {
            errors.push(ValidationError::DuplicateTaskId {
                task_id: task.id.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_dependency_references(
    batch: &[SubTask],
    known: &HashSet<TaskId>,
) -> Result<(), Vec<ValidationError>> {
    let batch_ids: HashSet<&TaskId> = batch.iter().map(|task| &task.id).collect();
    let mut errors = Vec::new();

    for task in batch {
        for dependency in &task.dependencies {
            if !batch_ids.contains(dependency) && !known.contains(dependency) {
                errors.push(ValidationError::UnresolvedDependency {
                    task_id: task.id.clone(),
                    missing_dependency: dependency.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Edges run dependency -> dependent; only edges inside the batch are
/// followed, since already-known tasks cannot wait on new ones.
fn validate_acyclic(batch: &[SubTask]) -> Result<(), Vec<ValidationError>> {
    let mut graph: HashMap<&str, Vec<&str>> = batch
        .iter()
        .map(|task| (task.id.as_str(), Vec::new()))
        .collect();

    for task in batch {
        for dependency in &task.dependencies {
            if let Some(dependents) = graph.get_mut(dependency.as_str()) {
                dependents.push(task.id.as_str());
            }
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    // batch order keeps the reported cycle stable
    for task in batch {
        if !visited.contains(task.id.as_str()) {
            if let Some(cycle) = dfs_cycle_detection(
                task.id.as_str(),
                &graph,
                &mut visited,
                &mut rec_stack,
                &mut path,
            ) {
                return Err(vec![ValidationError::CyclicDependency { cycle }]);
            }
        }
    }

    Ok(())
}

/// Returns the cycle path, first id repeated at the end, if one is reachable
/// from `node`.
fn dfs_cycle_detection<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if rec_stack.contains(neighbor) {
                let start = path.iter().position(|&id| id == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|id| id.to_string()).collect();
                cycle.push(neighbor.to_string());
                return Some(cycle);
            }

            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path)
                {
                    return Some(cycle);
                }
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}
