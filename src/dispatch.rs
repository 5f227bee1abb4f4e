//! Queued request dispatch.
//!
//! Callers never talk to the network directly. Each call becomes a
//! [`QueryJob`] pushed onto a shared queue; whatever worker drains that
//! queue answers on the job's own one-shot channel.

use crate::error::ApiError;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// HTTP verb the worker uses for a job. Read endpoints are GET; POST is
/// carried for write endpoints that share the same queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// What the worker sends back: the decoded JSON payload, or the error that
/// prevented producing it.
pub type QueryResponse = Result<Value, ApiError>;

/// One queued request. Consumed by exactly one worker, answered exactly once.
#[derive(Debug)]
pub struct QueryJob {
    pub id: Uuid,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub method: HttpMethod,
    responder: oneshot::Sender<QueryResponse>,
}

impl QueryJob {
    /// True once the submitting caller has stopped waiting.
    pub fn is_abandoned(&self) -> bool {
        self.responder.is_closed()
    }

    /// Resolves once the submitting caller stops waiting.
    pub async fn abandoned(&mut self) {
        self.responder.closed().await
    }

    /// Deliver the result. Consuming `self` makes a second reply impossible.
    /// Returns false if the caller had already gone away.
    pub fn respond(self, response: QueryResponse) -> bool {
        self.responder.send(response).is_ok()
    }
}

/// Caller-side handle to the shared dispatch queue. Cheap to clone; every
/// clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct DispatchClient {
    tx: mpsc::Sender<QueryJob>,
    call_timeout: Option<Duration>,
}

/// Create a bounded dispatch queue. The receiver goes to the worker.
pub fn dispatch_queue(capacity: usize) -> (DispatchClient, mpsc::Receiver<QueryJob>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        DispatchClient {
            tx,
            call_timeout: None,
        },
        rx,
    )
}

impl DispatchClient {
    /// Apply a deadline to every call made through this handle.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Queue a request and wait for the worker's reply, decoding it into `T`.
    pub async fn submit<T: DeserializeOwned>(
        &self,
        url: impl Into<String>,
        params: Vec<(String, String)>,
        method: HttpMethod,
    ) -> Result<T, ApiError> {
        match self.call_timeout {
            Some(limit) => self.submit_with_timeout(url, params, method, limit).await,
            None => self.exchange(url.into(), params, method).await,
        }
    }

    /// Like [`submit`](Self::submit) but gives up after `limit`. The queued
    /// job is abandoned; a worker that has not started it will skip it.
    pub async fn submit_with_timeout<T: DeserializeOwned>(
        &self,
        url: impl Into<String>,
        params: Vec<(String, String)>,
        method: HttpMethod,
        limit: Duration,
    ) -> Result<T, ApiError> {
        tokio::time::timeout(limit, self.exchange(url.into(), params, method))
            .await
            .map_err(|_| ApiError::Timeout(limit))?
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        url: String,
        params: Vec<(String, String)>,
        method: HttpMethod,
    ) -> Result<T, ApiError> {
        let (responder, response) = oneshot::channel();
        let job = QueryJob {
            id: Uuid::new_v4(),
            url,
            params,
            method,
            responder,
        };
        let id = job.id;
        debug!("queueing job {} {:?} {}", id, job.method, job.url);
        self.tx.send(job).await.map_err(|_| ApiError::QueueClosed)?;

        let payload = response.await.map_err(|_| ApiError::ResponseDropped)??;
        debug!("job {} answered", id);
        serde_json::from_value(payload).map_err(ApiError::from)
    }
}
