use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;

use futures::{future, prelude::*};
use log::{info, trace, warn};

use tarpc::{
    context,
    server::{self, Channel, Handler},
    tokio_serde::formats::Json,
};

use crate::{watchdog, Config, Coordinator, Offer, Result};
use crate::{ReportReply, RequestReply, Service, Task, TaskType};

// This is the type that implements the generated Service trait. It is the business logic
// and is used to start the server.
#[derive(Debug, Clone)]
struct MapReduceServer {
    coordinator: Coordinator,
}

#[tarpc::server]
impl Service for MapReduceServer {
    async fn request(self, _: context::Context) -> RequestReply {
        let task = match self.coordinator.request_task() {
            Offer::Assigned(a) => Some(Task {
                task: a.task,
                id: a.id,
                identity: a.identity,
            }),
            Offer::Wait | Offer::Done => None,
        };
        RequestReply {
            task,
            nmap: self.coordinator.nmap(),
            nreduce: self.coordinator.nreduce(),
        }
    }

    async fn report(self, _: context::Context, task: TaskType, identity: String) -> ReportReply {
        match self.coordinator.report_task_complete(task, &identity) {
            Ok(()) => ReportReply { ok: true },
            Err(e) => {
                warn!("rejected report: {}", e);
                ReportReply { ok: false }
            }
        }
    }
}

pub struct Master {
    pub port: u16,
    pub files: Vec<PathBuf>,
    pub nreduce: usize,
    pub config: Config,
}

impl Master {
    /// Serve workers until every task of the job is finished, then keep
    /// answering for `config.shutdown_grace` before returning.
    pub async fn launch(&self) -> Result<()> {
        let splits = self
            .files
            .iter()
            .map(|f| f.to_string_lossy().into_owned());
        let coordinator = Coordinator::with_config(splits, self.nreduce, self.config)?;

        let server_addr = SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), self.port);
        let server = MapReduceServer {
            coordinator: coordinator.clone(),
        };
        // JSON transport is provided by the json_transport tarpc module. It makes it easy
        // to start up a serde-powered json serialization strategy over TCP.
        let mut listener = tarpc::serde_transport::tcp::listen(&server_addr, Json::default).await?;
        listener.config_mut().max_frame_length(4294967296);
        info!("listening on {}", server_addr);

        // Exits on its own once the job is done.
        watchdog::spawn(coordinator.clone());
        let serve = listener
            // Ignore accept errors.
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            // Limit channels to 10 per IP.
            .max_channels_per_key(10, |t| {
                t.as_ref()
                    .peer_addr()
                    .map(|a| a.ip())
                    .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            })
            .map(|channel| channel.respond_with(server.clone().serve()).execute())
            // Max 10 channels.
            .buffer_unordered(10)
            .for_each(|_| async {});
        futures::pin_mut!(serve);

        let done = tokio::select! {
            _ = &mut serve => false,
            _ = wait_until_done(&coordinator) => true,
        };
        if !done {
            warn!("listener closed before the job finished");
            return Ok(());
        }

        // The reply to the final report may not have been written yet.
        let grace = self.config.shutdown_grace;
        info!("job finished, serving {:?} more before shutdown", grace);
        let _ = tokio::time::timeout(grace, serve).await;
        Ok(())
    }
}

async fn wait_until_done(coordinator: &Coordinator) {
    let period = coordinator.config().poll_interval;
    while !coordinator.is_job_done() {
        trace!("{:?}", coordinator.progress());
        tokio::time::sleep(period).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn server(splits: Vec<&str>, nreduce: usize) -> MapReduceServer {
        MapReduceServer {
            coordinator: Coordinator::new(splits, nreduce).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_request_reply() {
        let s = server(vec!["a.txt"], 3);
        let reply = s.clone().request(context::current()).await;
        assert!(reply.ok());
        assert_eq!((reply.nmap, reply.nreduce), (1, 3));
        assert_eq!(
            reply.task,
            Some(Task {
                task: TaskType::Map,
                id: 0,
                identity: "a.txt".to_owned(),
            })
        );

        // In flight, nothing else to hand out.
        let reply = s.clone().request(context::current()).await;
        assert!(!reply.ok());
        assert_eq!(reply.nreduce, 3);
    }

    #[tokio::test]
    async fn test_report_reply() {
        let s = server(vec!["a.txt"], 1);
        s.clone().request(context::current()).await;

        let ok = s
            .clone()
            .report(context::current(), TaskType::Map, "a.txt".into())
            .await;
        assert!(ok.ok);
        let unknown = s
            .clone()
            .report(context::current(), TaskType::Map, "b.txt".into())
            .await;
        assert!(!unknown.ok);
        assert!(!s.coordinator.is_job_done());
    }

    #[test]
    fn test_wire_field_names() {
        let reply = RequestReply {
            task: Some(Task {
                task: TaskType::Reduce,
                id: 1,
                identity: "mr-out-1".into(),
            }),
            nmap: 2,
            nreduce: 2,
        };
        let v = serde_json::to_value(&reply).unwrap();
        assert_eq!(v["task"]["task"], "Reduce");
        assert_eq!(v["task"]["identity"], "mr-out-1");
        assert_eq!(v["nmap"], 2);

        let v = serde_json::to_value(&ReportReply { ok: false }).unwrap();
        assert_eq!(v, serde_json::json!({ "ok": false }));
    }
}
