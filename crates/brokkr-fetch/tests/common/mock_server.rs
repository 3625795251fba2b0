//! Mock server helpers for download executor tests
//!
//! Provides utilities for setting up wiremock mock servers with
//! common response patterns for artifact downloads.

use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve `content` at GET `route`
pub async fn mount_file(server: &MockServer, route: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .mount(server)
        .await;
}

/// Serve `content` at GET `route` after a fixed delay
pub async fn mount_delayed_file(
    server: &MockServer,
    route: &str,
    content: &[u8],
    delay: Duration,
) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Respond with a bare status code at GET `route`
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
