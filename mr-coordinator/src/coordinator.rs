use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{Config, Error, Phase, Result, TaskStatus, TaskTable, TaskType};

/// A task handed to a worker, with the totals it needs to name intermediate
/// and output files.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub task: TaskType,
    pub identity: String,
    pub id: usize,
    pub nmap: usize,
    pub nreduce: usize,
}

/// Answer to a task request.
#[derive(Debug, Clone, PartialEq)]
pub enum Offer {
    Assigned(Assignment),
    /// Everything assignable is in flight; poll again shortly.
    Wait,
    /// The job is finished.
    Done,
}

/// Task counts of the current phase's table, or of the reduce table once the
/// job is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub unstarted: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Debug)]
struct State {
    phase: Phase,
    map: TaskTable,
    reduce: TaskTable,
}

impl State {
    fn table(&self, task: TaskType) -> &TaskTable {
        match task {
            TaskType::Map => &self.map,
            TaskType::Reduce => &self.reduce,
        }
    }

    fn table_mut(&mut self, task: TaskType) -> &mut TaskTable {
        match task {
            TaskType::Map => &mut self.map,
            TaskType::Reduce => &mut self.reduce,
        }
    }

    /// Move forward while the current phase has nothing left to do. Empty
    /// tables are complete, so this may skip several phases at once.
    fn advance(&mut self) {
        while let Some(task) = self.phase.task_type() {
            if !self.table(task).all_completed() {
                break;
            }
            let next = self.phase.next();
            info!("all {} tasks finished, {:?} -> {:?}", task, self.phase, next);
            self.phase = next;
        }
    }

    fn reclaim(&mut self, now: Instant, timeout: Duration) -> usize {
        // Tables of other phases are either untouched or fully completed.
        let task = match self.phase.task_type() {
            Some(task) => task,
            None => return 0,
        };
        let reclaimed = self.table_mut(task).reclaim_expired(now, timeout);
        for (identity, attempts) in reclaimed.iter() {
            warn!(
                "{} task {} not finished within {:?} (attempt {}), reassigning",
                task, identity, timeout, attempts
            );
        }
        reclaimed.len()
    }

    fn assign(&mut self, now: Instant, timeout: Duration) -> Offer {
        let task = match self.phase.task_type() {
            Some(task) => task,
            None => return Offer::Done,
        };
        self.reclaim(now, timeout);

        let (nmap, nreduce) = (self.map.len(), self.reduce.len());
        match self.table_mut(task).assign(now) {
            Some(r) => {
                debug!("assigned {} task {} ({})", task, r.id(), r.identity());
                Offer::Assigned(Assignment {
                    task,
                    identity: r.identity().to_owned(),
                    id: r.id(),
                    nmap,
                    nreduce,
                })
            }
            None => Offer::Wait,
        }
    }

    fn complete(&mut self, task: TaskType, identity: &str) -> Result<()> {
        let not_found = || Error::NotFound {
            task,
            identity: identity.to_owned(),
        };
        // Tasks of a phase not yet reached were never handed out.
        if !self.phase.has_reached(task) {
            return Err(not_found());
        }
        match self.table_mut(task).complete(identity) {
            None => return Err(not_found()),
            Some(true) => info!("{} task {} finished", task, identity),
            Some(false) => debug!("{} task {} reported again, ignored", task, identity),
        }
        self.advance();
        Ok(())
    }

    fn progress(&self) -> Progress {
        // Once done, the reduce table is the last one that was active.
        let task = self.phase.task_type().unwrap_or(TaskType::Reduce);
        let table = self.table(task);
        Progress {
            phase: self.phase,
            unstarted: table.count(TaskStatus::Unstarted),
            in_progress: table.count(TaskStatus::InProgress),
            completed: table.count(TaskStatus::Completed),
        }
    }
}

/// Shared handle to the scheduling state of one job. Clones refer to the
/// same job; every operation is serialized by a single lock.
#[derive(Debug, Clone)]
pub struct Coordinator {
    state: Arc<RwLock<State>>,
    config: Config,
    nmap: usize,
    nreduce: usize,
}

impl Coordinator {
    /// One map task per input split, `nreduce` reduce tasks, default timing.
    pub fn new<I, S>(splits: I, nreduce: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(splits, nreduce, Config::default())
    }

    pub fn with_config<I, S>(splits: I, nreduce: usize, config: Config) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        config.validate()?;
        let map = TaskTable::new(TaskType::Map, splits)?;
        let reduce = TaskTable::reduce(nreduce);
        let (nmap, nreduce) = (map.len(), reduce.len());

        let mut state = State {
            phase: Phase::Mapping,
            map,
            reduce,
        };
        state.advance();
        info!(
            "coordinator ready: {} map tasks, {} reduce tasks, timeout {:?}",
            nmap, nreduce, config.timeout
        );

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            config,
            nmap,
            nreduce,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn nmap(&self) -> usize {
        self.nmap
    }

    pub fn nreduce(&self) -> usize {
        self.nreduce
    }

    /// Hand out an unstarted task of the current phase, if any. Expired
    /// leases are reclaimed first, under the same lock.
    pub fn request_task(&self) -> Offer {
        let mut state = self.write();
        state.assign(Instant::now(), self.config.timeout)
    }

    /// Mark a task finished and advance the phase if it was the last one.
    /// Reporting a finished task again succeeds without effect.
    pub fn report_task_complete(&self, task: TaskType, identity: &str) -> Result<()> {
        self.write().complete(task, identity)
    }

    /// Revert every task of the current phase whose lease has expired.
    /// Returns how many were reverted.
    pub fn reclaim_expired(&self) -> usize {
        let mut state = self.write();
        state.reclaim(Instant::now(), self.config.timeout)
    }

    pub fn is_job_done(&self) -> bool {
        self.read().phase.is_done()
    }

    pub fn phase(&self) -> Phase {
        self.read().phase
    }

    pub fn progress(&self) -> Progress {
        self.read().progress()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().expect("coordinator state lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().expect("coordinator state lock poisoned")
    }
}
