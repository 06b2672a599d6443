use std::time::Duration;

use crate::{Error, Result};

/// Timing knobs of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// How long a worker may hold a task before it is handed to someone else.
    /// Must be larger than the time a single task normally takes.
    pub timeout: Duration,
    /// Period of the background sweep that reclaims expired tasks.
    pub sweep_interval: Duration,
    /// Period at which the driver polls for job completion.
    pub poll_interval: Duration,
    /// How long the server keeps answering after the job is done, so the
    /// reply to the last report still reaches its worker. May be zero.
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

impl Config {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("timeout", self.timeout),
            ("sweep_interval", self.sweep_interval),
            ("poll_interval", self.poll_interval),
        ];
        for (name, value) in fields.iter() {
            if *value == Duration::from_secs(0) {
                return Err(Error::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}
