//! Mock server helpers for lifecycle API and distribution tree tests
//!
//! Provides wiremock setup for the two upstream surfaces a runtime
//! provider talks to: the endoflife.date-shaped lifecycle API and the
//! versioned distribution directory serving artifacts, checksum
//! manifests, and signatures.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve a JSON body at GET `route`
pub async fn mount_json(server: &MockServer, route: &str, body: &Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve `content` at GET `route`
pub async fn mount_file(server: &MockServer, route: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
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

/// An endoflife.date-shaped payload with three Node.js release lines:
/// an active LTS line ("20"), an end-of-life line ("12"), and a current
/// non-LTS line ("21"). Milestone dates are chosen far in the past or
/// far in the future so the folded flags are stable over time.
pub fn nodejs_cycles() -> Value {
    json!([
        {
            "cycle": "20",
            "releaseDate": "2020-04-21",
            "eol": "2099-04-30",
            "latest": "20.11.1",
            "latestReleaseDate": "2024-02-14",
            "lts": "2020-10-27",
            "support": "2099-10-22"
        },
        {
            "cycle": "12",
            "releaseDate": "2019-04-23",
            "eol": "2022-04-30",
            "latest": "12.22.12",
            "latestReleaseDate": "2022-04-05",
            "lts": "2019-10-21",
            "support": "2020-10-20"
        },
        {
            "cycle": "21",
            "releaseDate": "2023-10-17",
            "eol": "2099-06-01",
            "latest": "21.6.2",
            "latestReleaseDate": "2024-02-14",
            "lts": false,
            "support": true
        }
    ])
}
