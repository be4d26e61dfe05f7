//! Isolated execution context.
//!
//! A worker owns a [`Router`] and talks to its caller only through channels.
//! Messages are prepared strictly in arrival order, so switches apply in the
//! order they were posted; the operations themselves run as separate tasks and
//! may complete in any order.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use flume::{Receiver, Sender};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::message::Response;
use crate::registry::DispatchContext;
use crate::router::{Prepared, Router};

pub struct Worker {
    router: Router,
}

impl Worker {
    pub fn new(ctx: Arc<DispatchContext>) -> Self {
        Self { router: Router::new(ctx) }
    }

    /// Starts the message loop on the current runtime.
    pub fn spawn(self) -> WorkerHandle {
        let (requests, inbox) = flume::unbounded();
        let (outbox, responses) = flume::unbounded();
        let task = tokio::spawn(self.run(inbox, outbox));
        WorkerHandle { requests, responses, task }
    }

    async fn run(self, inbox: Receiver<Value>, outbox: Sender<Response>) {
        info!("worker started");

        while let Ok(message) = inbox.recv_async().await {
            match self.router.prepare(&message) {
                Prepared::Done(response) => {
                    // The caller may have stopped listening.
                    let _ = outbox.send(response);
                }
                Prepared::Job(job) => {
                    let outbox = outbox.clone();
                    tokio::spawn(async move {
                        let _ = outbox.send(job.run().await);
                    });
                }
            }
        }

        info!("worker stopped");
    }
}

/// The caller's side of a running worker.
pub struct WorkerHandle {
    requests: Sender<Value>,
    responses: Receiver<Response>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn post(&self, message: Value) -> Result<()> {
        self.requests.send(message).map_err(|_| anyhow!("worker is no longer accepting messages"))
    }

    /// Next response, or `None` once the loop has stopped and every job has
    /// reported back.
    pub async fn recv(&self) -> Option<Response> {
        self.responses.recv_async().await.ok()
    }

    /// Stops accepting messages. Responses for already-posted messages can
    /// still be received from the returned channel until it closes.
    pub fn close(self) -> Receiver<Response> {
        debug!("closing worker inbox");
        drop(self.requests);
        drop(self.task);
        self.responses
    }

    /// Splits the handle so intake and output can be driven from different
    /// tasks. The loop stops once the sender is dropped.
    pub fn into_parts(self) -> (Sender<Value>, Receiver<Response>) {
        (self.requests, self.responses)
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::prelude::BASE64_STANDARD;
    use serde_json::json;

    use super::*;
    use crate::backend::{AesCrypt, AgeEngine, Backends};
    use crate::error::ErrorCode;
    use crate::types::{Action, ProviderType};

    fn worker() -> (Arc<DispatchContext>, WorkerHandle) {
        let ctx = Arc::new(DispatchContext::new(Backends::new(AesCrypt::new(1_000), AgeEngine::ready())));
        (Arc::clone(&ctx), Worker::new(ctx).spawn())
    }

    async fn drain(handle: WorkerHandle) -> Vec<Response> {
        let responses = handle.close();
        let mut collected = Vec::new();
        while let Ok(response) = responses.recv_async().await {
            collected.push(response);
        }
        collected
    }

    #[tokio::test]
    async fn test_init_response() {
        let (ctx, handle) = worker();
        handle.post(json!({"action": "INIT", "providerType": "aead"})).unwrap();
        assert_eq!(handle.recv().await, Some(Response::InitSuccess { provider: ProviderType::Aead }));
        assert_eq!(ctx.active_type(), ProviderType::Aead);
    }

    #[tokio::test]
    async fn test_invalid_envelope_gets_error() {
        let (_, handle) = worker();
        handle.post(json!("not a message")).unwrap();
        let response = handle.recv().await.unwrap();
        assert!(!response.is_success());
        assert_eq!(response.code(), None);
    }

    #[tokio::test]
    async fn test_switches_apply_in_post_order() {
        let (_, handle) = worker();
        let payload = BASE64_STANDARD.encode(b"data");
        handle.post(json!(["ENCRYPT", payload, "pw", "first"])).unwrap();
        handle.post(json!(["INIT", "aead"])).unwrap();
        handle.post(json!(["ENCRYPT", payload, "pw", "second"])).unwrap();

        let responses = drain(handle).await;
        assert_eq!(responses.len(), 3);

        let mut names: Vec<String> = responses
            .iter()
            .filter_map(|response| match response {
                Response::Success { action: Action::Encrypt, file_name, .. } => Some(file_name.clone()),
                _ => None,
            })
            .collect();
        names.sort();
        assert_eq!(names, ["first.aes", "second.enc"]);
        assert!(responses.contains(&Response::InitSuccess { provider: ProviderType::Aead }));
    }

    #[tokio::test]
    async fn test_concurrent_operations_all_answered() {
        let (_, handle) = worker();
        for index in 0..8 {
            let payload = BASE64_STANDARD.encode(format!("payload {index}"));
            handle.post(json!({"action": "ENCRYPT", "payload": payload, "password": "pw", "fileName": format!("f{index}"), "providerType": "aead"})).unwrap();
        }
        handle.post(json!({"action": "DECRYPT", "payload": BASE64_STANDARD.encode([0u8; 10]), "password": "pw", "fileName": "bad.enc"})).unwrap();

        let responses = drain(handle).await;
        assert_eq!(responses.len(), 9);
        assert_eq!(responses.iter().filter(|response| response.is_success()).count(), 8);
        assert!(responses.iter().any(|response| response.code() == Some(ErrorCode::InvalidFormat)));
    }
}
