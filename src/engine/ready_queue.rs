// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency-aware task queue.
//!
//! The queue keeps pending tasks in insertion order and hands out only those
//! whose dependencies are all in the completed set. It does no validation of
//! its own: an unknown dependency id, or a cycle, simply leaves the affected
//! tasks parked. Callers that need stronger guarantees validate before
//! enqueueing (see `engine::validation`).
//!
//! ```rust
//! use serde_json::json;
//! use the_taskwood::engine::ReadyQueue;
//! use the_taskwood::model::SubTask;
//!
//! let mut queue = ReadyQueue::new();
//! queue.enqueue(SubTask::new("b", "shell", json!(null)).depends_on(["a"]));
//! queue.enqueue(SubTask::new("a", "shell", json!(null)));
//!
//! // "b" is at the front but blocked, so "a" is selected
//! assert_eq!(queue.dequeue().map(|t| t.id), Some("a".to_string()));
//! assert!(queue.dequeue().is_none());
//!
//! queue.mark_completed("a");
//! assert_eq!(queue.dequeue().map(|t| t.id), Some("b".to_string()));
//! ```

use std::collections::{HashSet, VecDeque};

use crate::model::{SubTask, Task, TaskId};

/// Anything the queue can order: an id plus the ids it waits on.
pub trait Schedulable {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &[TaskId];
}

impl Schedulable for SubTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &[TaskId] {
        &self.dependencies
    }
}

impl Schedulable for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &[TaskId] {
        &[]
    }
}

#[derive(Debug)]
pub struct ReadyQueue<T> {
    pending: VecDeque<T>,
    completed: HashSet<TaskId>,
    in_flight: HashSet<TaskId>,
}

impl<T: Schedulable> ReadyQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            completed: HashSet::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Appends a task without looking at its dependencies.
    pub fn enqueue(&mut self, task: T) {
        self.pending.push_back(task);
    }

    /// Removes and returns the first ready task, marking it in flight.
    ///
    /// Returns `None` when nothing is ready; try again on the next
    /// completion rather than polling.
    pub fn dequeue(&mut self) -> Option<T> {
        let index = self.first_ready()?;
        let task = self.pending.remove(index)?;
        self.in_flight.insert(task.id().to_string());
        Some(task)
    }

    /// The task `dequeue` would return, without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.first_ready().and_then(|index| self.pending.get(index))
    }

    /// Records `id` as completed. Calling it again has no further effect.
    pub fn mark_completed(&mut self, id: &str) {
        self.in_flight.remove(id);
        self.completed.insert(id.to_string());
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    /// Whether `id` is waiting in the queue.
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.iter().any(|task| task.id() == id)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of tasks still waiting in the queue.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops all pending tasks and forgets completed and in-flight ids.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.completed.clear();
        self.in_flight.clear();
    }

    /// Removes every pending task regardless of readiness.
    pub fn drain_pending(&mut self) -> Vec<T> {
        self.pending.drain(..).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.pending.iter()
    }

    fn first_ready(&self) -> Option<usize> {
        self.pending.iter().position(|task| {
            task.dependencies()
                .iter()
                .all(|dependency| self.completed.contains(dependency))
        })
    }
}

impl<T: Schedulable> Default for ReadyQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(id: &str, deps: &[&str]) -> SubTask {
        SubTask::new(id, "shell", json!(null)).depends_on(deps.iter().copied())
    }

    fn dequeued_id(queue: &mut ReadyQueue<SubTask>) -> Option<String> {
        queue.dequeue().map(|t| t.id)
    }

    #[test]
    fn tasks_without_dependencies_come_out_in_insertion_order() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(task("a", &[]));
        queue.enqueue(task("b", &[]));
        queue.enqueue(task("c", &[]));

        assert_eq!(dequeued_id(&mut queue).as_deref(), Some("a"));
        assert_eq!(dequeued_id(&mut queue).as_deref(), Some("b"));
        assert_eq!(dequeued_id(&mut queue).as_deref(), Some("c"));
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn dependent_is_held_until_dependency_completes() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(task("a", &[]));
        queue.enqueue(task("b", &["a"]));

        assert_eq!(dequeued_id(&mut queue).as_deref(), Some("a"));
        assert!(queue.is_in_flight("a"));
        // "a" is in flight, not completed
        assert!(queue.dequeue().is_none());
        assert!(queue.peek().is_none());

        queue.mark_completed("a");
        assert_eq!(queue.peek().map(|t| t.id.as_str()), Some("b"));
        assert_eq!(dequeued_id(&mut queue).as_deref(), Some("b"));
    }

    #[test]
    fn blocked_head_does_not_block_ready_tasks_behind_it() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(task("waits", &["missing"]));
        queue.enqueue(task("free", &[]));

        assert_eq!(dequeued_id(&mut queue).as_deref(), Some("free"));
        assert!(queue.dequeue().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn consecutive_dequeues_never_repeat_an_id() {
        let mut queue = ReadyQueue::new();
        for id in ["a", "b", "c", "d"] {
            queue.enqueue(task(id, &[]));
        }

        let mut seen = HashSet::new();
        while let Some(id) = dequeued_id(&mut queue) {
            assert!(seen.insert(id), "task dequeued twice");
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn peek_does_not_remove_or_mark_in_flight() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(task("a", &[]));

        assert_eq!(queue.peek().map(|t| t.id.as_str()), Some("a"));
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_in_flight("a"));
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(task("a", &[]));
        queue.enqueue(task("b", &["a"]));
        queue.dequeue();

        queue.mark_completed("a");
        let after_once = (queue.len(), queue.in_flight_len(), queue.is_completed("a"));
        queue.mark_completed("a");
        let after_twice = (queue.len(), queue.in_flight_len(), queue.is_completed("a"));

        assert_eq!(after_once, after_twice);
        assert_eq!(dequeued_id(&mut queue).as_deref(), Some("b"));
    }

    #[test]
    fn completion_of_unknown_id_still_unblocks() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(task("b", &["external"]));

        queue.mark_completed("external");
        assert_eq!(dequeued_id(&mut queue).as_deref(), Some("b"));
    }

    #[test]
    fn clear_resets_everything() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(task("a", &[]));
        queue.enqueue(task("b", &["a"]));
        queue.dequeue();
        queue.mark_completed("a");

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.in_flight_len(), 0);
        assert!(!queue.is_completed("a"));
    }

    #[test]
    fn drain_pending_returns_blocked_tasks() {
        let mut queue = ReadyQueue::new();
        queue.enqueue(task("x", &["never"]));
        queue.enqueue(task("y", &["x"]));

        let drained: Vec<String> = queue.drain_pending().into_iter().map(|t| t.id).collect();
        assert_eq!(drained, vec!["x", "y"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn plain_tasks_are_always_ready() {
        let mut queue: ReadyQueue<Task> = ReadyQueue::new();
        queue.enqueue(Task::new("t", "shell", json!(null)));

        assert_eq!(queue.dequeue().map(|t| t.id).as_deref(), Some("t"));
    }
}
