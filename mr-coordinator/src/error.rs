use thiserror::Error;

use crate::TaskType;

#[derive(Error, Debug)]
pub enum Error {
    /// A report named a task that was never handed out in a phase the job
    /// has reached.
    #[error("no {task} task named {identity:?}")]
    NotFound { task: TaskType, identity: String },

    #[error("{task} task {identity:?} is listed more than once")]
    DuplicateTask { task: TaskType, identity: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
