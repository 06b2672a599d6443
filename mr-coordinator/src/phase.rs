use crate::TaskType;

/// Stage of the job. Ordered, and only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Mapping,
    Reducing,
    AllDone,
}

impl Phase {
    /// Kind of task handed out in this phase, `None` once the job is done.
    pub fn task_type(self) -> Option<TaskType> {
        match self {
            Phase::Mapping => Some(TaskType::Map),
            Phase::Reducing => Some(TaskType::Reduce),
            Phase::AllDone => None,
        }
    }

    pub fn next(self) -> Phase {
        match self {
            Phase::Mapping => Phase::Reducing,
            Phase::Reducing | Phase::AllDone => Phase::AllDone,
        }
    }

    pub fn is_done(self) -> bool {
        self == Phase::AllDone
    }

    /// Whether tasks of the given type may have been handed out by now.
    pub fn has_reached(self, task: TaskType) -> bool {
        match task {
            TaskType::Map => true,
            TaskType::Reduce => self >= Phase::Reducing,
        }
    }
}
