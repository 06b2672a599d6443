use std::fmt;
use tarpc::serde::{Deserialize, Serialize};

mod config;
mod coordinator;
mod error;
mod master;
mod phase;
mod task;
pub mod watchdog;

pub use config::Config;
pub use coordinator::{Assignment, Coordinator, Offer, Progress};
pub use error::{Error, Result};
pub use master::Master;
pub use phase::Phase;
pub use task::{reduce_identity, TaskRecord, TaskStatus, TaskTable};

#[tarpc::service]
pub trait Service {
    /// Ask for a task. `RequestReply::task` is `None` both when the worker
    /// should retry later and when the job is finished.
    async fn request() -> RequestReply;
    /// Report a task as finished.
    async fn report(task: TaskType, identity: String) -> ReportReply;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskType {
    Map,
    Reduce,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Map => f.write_str("map"),
            TaskType::Reduce => f.write_str("reduce"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub task: TaskType,
    pub id: usize,
    /// Input split for map tasks, output name for reduce tasks.
    pub identity: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestReply {
    pub task: Option<Task>,
    pub nmap: usize,
    pub nreduce: usize,
}

impl RequestReply {
    pub fn ok(&self) -> bool {
        self.task.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportReply {
    pub ok: bool,
}
