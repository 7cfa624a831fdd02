//! mockito test utilities
//!
//! Thin wrappers so the end-to-end tests do not depend on mockito's API
//! directly.

#![allow(dead_code)]

use mockito::{Matcher, Mock, Server, ServerGuard};

/// Start an async mockito Server
pub async fn start() -> ServerGuard {
    Server::new_async().await
}

/// Base URL with a trailing slash, ready to be used as a client base.
pub fn base(server: &ServerGuard) -> String {
    format!("{}/", server.url())
}

/// A mock answering `method path` with a JSON body.
pub async fn json_mock<P: Into<Matcher>>(
    server: &mut ServerGuard,
    method: &str,
    path: P,
    status: u16,
    body_json: &str,
) -> Mock {
    server
        .mock(method, path)
        .with_status(status as usize)
        .with_header("content-type", "application/json")
        .with_body(body_json)
        .create_async()
        .await
}

/// A mock answering `method path` with an arbitrary content type.
pub async fn typed_mock<P: Into<Matcher>>(
    server: &mut ServerGuard,
    method: &str,
    path: P,
    status: u16,
    content_type: &str,
    body: &str,
) -> Mock {
    server
        .mock(method, path)
        .with_status(status as usize)
        .with_header("content-type", content_type)
        .with_body(body)
        .create_async()
        .await
}
