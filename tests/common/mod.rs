//! Shared utilities for integration tests.
//!
//! Each test file owns a fixed port range so files can run in parallel:
//! lifecycle 28100-28109, statements 28110-28119, agent_profile 28120-28129,
//! routing 28130-28139.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use local_lrs::{LrsDelegate, LrsServer};

pub const ADDRESS: &str = "http://127.0.0.1";

/// A client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Build and start a server on `port` with the root suffix.
pub async fn start_server(port: u16, delegate: Option<Arc<dyn LrsDelegate>>) -> LrsServer {
    let server = LrsServer::new(ADDRESS, port, delegate).unwrap();
    server.start().await.unwrap();
    server
}

/// `http://127.0.0.1:{port}{path}`
pub fn url(port: u16, path: &str) -> String {
    format!("{ADDRESS}:{port}{path}")
}

/// Let the runtime retire aborted or stopped accept loops.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}
