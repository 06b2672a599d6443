use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::{Error, Result, TaskType};

/// Output name of the reduce task with the given index.
pub fn reduce_identity(index: usize) -> String {
    format!("mr-out-{}", index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Unstarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone)]
pub struct TaskRecord {
    id: usize,
    identity: String,
    status: TaskStatus,
    // Start of the current lease, set while InProgress.
    assigned_at: Option<Instant>,
    attempts: u32,
}

impl TaskRecord {
    fn new(id: usize, identity: String) -> Self {
        Self {
            id,
            identity,
            status: TaskStatus::Unstarted,
            assigned_at: None,
            attempts: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Number of times this task has been handed out.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn start(&mut self, now: Instant) {
        self.status = TaskStatus::InProgress;
        self.assigned_at = Some(now);
        self.attempts += 1;
    }

    fn complete(&mut self) -> bool {
        if self.status == TaskStatus::Completed {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.assigned_at = None;
        true
    }

    fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        match (self.status, self.assigned_at) {
            (TaskStatus::InProgress, Some(at)) => now.saturating_duration_since(at) > timeout,
            _ => false,
        }
    }
}

/// All tasks of one phase, keyed by identity. Records are created once and
/// never added or removed afterwards.
#[derive(Debug, Clone)]
pub struct TaskTable {
    task: TaskType,
    records: Vec<TaskRecord>,
    index: HashMap<String, usize>,
    // Where the next scan for an unstarted task begins.
    cursor: usize,
}

impl TaskTable {
    /// One unstarted record per identity, ids assigned in the given order.
    pub fn new<I, S>(task: TaskType, identities: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut records = Vec::new();
        let mut index = HashMap::new();
        for (id, identity) in identities.into_iter().enumerate() {
            let identity = identity.into();
            if index.insert(identity.clone(), id).is_some() {
                return Err(Error::DuplicateTask { task, identity });
            }
            records.push(TaskRecord::new(id, identity));
        }
        Ok(Self {
            task,
            records,
            index,
            cursor: 0,
        })
    }

    /// Reduce table with `n` synthetic identities.
    pub fn reduce(n: usize) -> Self {
        let records: Vec<TaskRecord> = (0..n)
            .map(|id| TaskRecord::new(id, reduce_identity(id)))
            .collect();
        let index = records
            .iter()
            .map(|r| (r.identity.clone(), r.id))
            .collect();
        Self {
            task: TaskType::Reduce,
            records,
            index,
            cursor: 0,
        }
    }

    pub fn task_type(&self) -> TaskType {
        self.task
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, identity: &str) -> Option<&TaskRecord> {
        self.index.get(identity).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter()
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn all_completed(&self) -> bool {
        self.records
            .iter()
            .all(|r| r.status == TaskStatus::Completed)
    }

    /// Hand out the first unstarted task at or after the cursor, wrapping
    /// around. The cursor then moves past it, so every unstarted task is
    /// offered within `len()` consecutive calls.
    pub(crate) fn assign(&mut self, now: Instant) -> Option<&TaskRecord> {
        let n = self.records.len();
        let cursor = self.cursor;
        let idx = (0..n)
            .map(|i| (cursor + i) % n)
            .find(|&i| self.records[i].status == TaskStatus::Unstarted)?;
        self.cursor = (idx + 1) % n;
        self.records[idx].start(now);
        Some(&self.records[idx])
    }

    /// Mark a task completed. `None` if unknown, otherwise whether the status
    /// changed.
    pub(crate) fn complete(&mut self, identity: &str) -> Option<bool> {
        let i = *self.index.get(identity)?;
        Some(self.records[i].complete())
    }

    /// Revert every task whose lease has run out. Returns the reverted
    /// records' identities along with how often each had been handed out.
    pub(crate) fn reclaim_expired(&mut self, now: Instant, timeout: Duration) -> Vec<(String, u32)> {
        let mut reclaimed = Vec::new();
        for r in self.records.iter_mut() {
            if r.is_expired(now, timeout) {
                r.status = TaskStatus::Unstarted;
                r.assigned_at = None;
                reclaimed.push((r.identity.clone(), r.attempts));
            }
        }
        reclaimed
    }
}
