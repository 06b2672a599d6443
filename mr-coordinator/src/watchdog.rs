//! Background reclamation of stalled tasks.
//!
//! There is no heartbeat between workers and the coordinator: a worker that
//! has held a task longer than the configured timeout is presumed dead and its
//! task is returned to the pool. The sweep only takes the coordinator lock
//! while it checks, never while it waits.

use std::time::Duration;

use log::{debug, trace};
use tokio::task::JoinHandle;

use crate::Coordinator;

/// Spawn the sweeper on the current tokio runtime. It exits once the job is
/// done.
pub fn spawn(coordinator: Coordinator) -> JoinHandle<()> {
    let period = coordinator.config().sweep_interval;
    tokio::spawn(run(coordinator, period))
}

async fn run(coordinator: Coordinator, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if coordinator.is_job_done() {
            debug!("job done, watchdog exiting");
            return;
        }
        let n = coordinator.reclaim_expired();
        trace!("watchdog sweep reclaimed {} task(s)", n);
    }
}
