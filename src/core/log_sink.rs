use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future;
use log::warn;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::LogError;
use crate::keeper_info;

pub type LogFuture<'a> = Pin<Box<dyn Future<Output = Result<(), LogError>> + Send + 'a>>;

/// Where human readable status lines for the operators go.
pub trait LogSink: Send + Sync {
    fn log(&self, message: String) -> LogFuture<'_>;
}

/// Queues status lines and writes them to the operator log from a single pump task, so they
/// land in submission order without the caller waiting on the writer.
pub struct OperatorLog {
    sender: UnboundedSender<(DateTime<Utc>, String)>,
}

impl OperatorLog {
    pub fn start() -> (Arc<Self>, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pump = tokio::spawn(pump(receiver));
        (Arc::new(OperatorLog { sender }), pump)
    }
}

impl LogSink for OperatorLog {
    fn log(&self, message: String) -> LogFuture<'_> {
        let queued = self.sender.send((Utc::now(), message)).map_err(|_| LogError::Closed);
        Box::pin(future::ready(queued))
    }
}

async fn pump(mut receiver: UnboundedReceiver<(DateTime<Utc>, String)>) {
    while let Some((queued_at, message)) = receiver.recv().await {
        let behind = Utc::now().signed_duration_since(queued_at);
        if behind.num_seconds() >= 5 {
            warn!("The operator log is running {}s behind", behind.num_seconds());
        }
        keeper_info!("{}", message);
    }
}
