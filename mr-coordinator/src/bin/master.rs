use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

use mr_coordinator::{Config, Master};

/// Hands out one map task per input file, then `--nreduce` reduce tasks named
/// mr-out-<n>, to workers polling over RPC. A task not reported within
/// `--timeout` seconds goes to the next worker that asks.
#[derive(StructOpt, Debug)]
#[structopt(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    after_help = "The process exits with status 0 once every map and reduce task has been \
                  reported finished, after answering for --grace-ms more milliseconds."
)]
struct Opt {
    /// Port to start master server
    #[structopt(short, long)]
    port: u16,

    /// Seconds a worker may hold a task before it is handed to another worker
    #[structopt(short, long, default_value = "5")]
    timeout: u64,

    /// Milliseconds between sweeps for stalled tasks
    #[structopt(long, default_value = "1000")]
    sweep_ms: u64,

    /// Milliseconds to keep serving after the job is done
    #[structopt(long, default_value = "1000")]
    grace_ms: u64,

    /// Input splits, one map task each
    #[structopt(name = "FILE", parse(from_os_str))]
    files: Vec<PathBuf>,

    /// Number of reduce tasks
    #[structopt(long, default_value = "10")]
    nreduce: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    let config = Config {
        timeout: Duration::from_secs(opt.timeout),
        sweep_interval: Duration::from_millis(opt.sweep_ms),
        shutdown_grace: Duration::from_millis(opt.grace_ms),
        ..Config::default()
    };
    config.validate()?;

    let m = Master {
        port: opt.port,
        files: opt.files,
        nreduce: opt.nreduce,
        config,
    };
    m.launch().await?;
    Ok(())
}
