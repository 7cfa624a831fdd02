//! Shared helpers for the integration tests
//!
//! - `ScriptedTransport`: an in-memory transport that records every request
//!   and answers from a closure, so the client's lifecycle can be driven
//!   without a network
//! - `EventLog`: records the kinds of events a client or hub publishes

#![allow(dead_code)]

pub mod mockito;

use async_trait::async_trait;
use bytes::Bytes;
use courier::cancel::CancellationToken;
use courier::events::{EventKind, RequestEvent};
use courier::execution::{HttpTransport, TransportRequest, TransportResponse};
use courier::{HttpClient, HttpError, Hub};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE: &str = "https://api.example.com/v1/";

/// What the scripted transport does with one request.
pub enum Reply {
    Respond(TransportResponse),
    Fail(HttpError),
    /// Never settle; only cancellation ends the call.
    Hang,
    /// Wait (on the tokio clock), then act.
    After(Duration, Box<Reply>),
}

impl Reply {
    pub fn after(millis: u64, reply: Reply) -> Self {
        Self::After(Duration::from_millis(millis), Box::new(reply))
    }
}

pub fn json(status: u16, body: &'static str) -> Reply {
    Reply::Respond(
        TransportResponse::new(status)
            .with_content_type("application/json")
            .with_body(body),
    )
}

pub fn typed(status: u16, content_type: &'static str, body: &'static str) -> Reply {
    Reply::Respond(
        TransportResponse::new(status)
            .with_content_type(content_type)
            .with_body(body),
    )
}

type Handler = Box<dyn Fn(&TransportRequest) -> Reply + Send + Sync>;

pub struct ScriptedTransport {
    handler: Handler,
    seen: Arc<Mutex<Vec<TransportRequest>>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&TransportRequest) -> Reply + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            seen: Arc::default(),
        }
    }

    /// Requests the transport has been asked to perform, shared with the
    /// transport once it is moved into a client.
    pub fn seen(&self) -> Arc<Mutex<Vec<TransportRequest>>> {
        self.seen.clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn perform(
        &self,
        request: TransportRequest,
        _cancel: CancellationToken,
    ) -> Result<TransportResponse, HttpError> {
        let mut reply = (self.handler)(&request);
        self.seen.lock().unwrap().push(request);
        loop {
            match reply {
                Reply::Respond(response) => return Ok(response),
                Reply::Fail(error) => return Err(error),
                Reply::Hang => return std::future::pending().await,
                Reply::After(delay, next) => {
                    tokio::time::sleep(delay).await;
                    reply = *next;
                }
            }
        }
    }
}

/// A client on a private hub, so tests never observe each other.
pub struct Harness {
    pub client: HttpClient,
    pub hub: Arc<Hub>,
    pub seen: Arc<Mutex<Vec<TransportRequest>>>,
}

pub fn harness<F>(handler: F) -> Harness
where
    F: Fn(&TransportRequest) -> Reply + Send + Sync + 'static,
{
    harness_with(courier::HttpClient::builder(BASE), handler)
}

pub fn harness_with<F>(builder: courier::HttpClientBuilder, handler: F) -> Harness
where
    F: Fn(&TransportRequest) -> Reply + Send + Sync + 'static,
{
    let transport = ScriptedTransport::new(handler);
    let seen = transport.seen();
    let hub = Arc::new(Hub::new());
    let client = builder
        .transport(transport)
        .hub(hub.clone())
        .build()
        .unwrap();
    Harness { client, hub, seen }
}

/// Echo the request body back as JSON.
pub fn echo(request: &TransportRequest) -> Reply {
    let body = request.config.body.clone().unwrap_or_else(Bytes::new);
    Reply::Respond(
        TransportResponse::new(200)
            .with_content_type("application/json")
            .with_body(body),
    )
}

/// Ordered record of published event kinds.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<EventKind>>>);

impl EventLog {
    pub fn on_client(client: &HttpClient) -> Self {
        let log = Self::default();
        let sink = log.clone();
        client.register_all(move |event| sink.push(event));
        log
    }

    pub fn on_hub(hub: &Hub) -> Self {
        let log = Self::default();
        let sink = log.clone();
        hub.register_all(move |event| sink.push(event));
        log
    }

    fn push(&self, event: &RequestEvent<'_>) {
        self.0.lock().unwrap().push(event.kind());
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.0.lock().unwrap().iter().filter(|k| **k == kind).count()
    }
}

/// Yield until `hub` tracks `n` calls.
pub async fn wait_for_active(hub: &Hub, n: usize) {
    for _ in 0..1_000 {
        if hub.active_count() == n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("expected {n} active calls, found {}", hub.active_count());
}
