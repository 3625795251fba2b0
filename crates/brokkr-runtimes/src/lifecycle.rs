//! Upstream lifecycle data client (endoflife.date API shape)
//!
//! The API reports release cycles whose `eol`/`support`/`lts` fields are
//! bool-or-date unions. They are decoded once here and folded into plain
//! booleans and optional dates on [`LifecycleRelease`]; nothing stringly
//! typed leaves this module.

use async_trait::async_trait;
use brokkr_core::error::{Error, Result};
use brokkr_core::retry::retry_with_policy;
use brokkr_core::types::{LifecycleConfig, NetworkConfig, RetryPolicy};
use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Lifecycle facts for one release line, folded to plain values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRelease {
    /// Release line as upstream names it (`20`, `20.11`)
    pub name: String,

    /// Latest patch release in the line
    pub latest: Option<String>,

    /// End-of-life milestone reached
    pub eol: bool,

    /// Active support has ended (security fixes may still land)
    pub eoas: bool,

    /// Line still receives fixes upstream
    pub maintained: bool,

    /// Upstream designates the line long-term support
    pub lts: bool,

    pub eol_date: Option<NaiveDate>,
    pub release_date: Option<NaiveDate>,
    pub latest_release_date: Option<NaiveDate>,
}

/// Source of upstream lifecycle data, injected into providers
#[async_trait]
pub trait LifecycleSource: Send + Sync {
    /// Lifecycle facts for every release line of a product
    async fn product_info(&self, product: &str) -> Result<Vec<LifecycleRelease>>;
}

/// A milestone field the API encodes as either a boolean or a date
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Milestone {
    Reached(bool),
    On(NaiveDate),
}

impl Milestone {
    /// Whether the milestone has been reached as of `today`
    fn reached(self, today: NaiveDate) -> bool {
        match self {
            Milestone::Reached(flag) => flag,
            Milestone::On(date) => date <= today,
        }
    }

    fn date(self) -> Option<NaiveDate> {
        match self {
            Milestone::On(date) => Some(date),
            Milestone::Reached(_) => None,
        }
    }
}

/// One cycle object as the API sends it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCycle {
    cycle: String,

    #[serde(default)]
    release_date: Option<NaiveDate>,

    #[serde(default)]
    eol: Option<Milestone>,

    #[serde(default)]
    latest: Option<String>,

    #[serde(default)]
    latest_release_date: Option<NaiveDate>,

    /// Active support milestone: `true` means still in active support,
    /// a date means active support ends (or ended) on that date.
    #[serde(default)]
    support: Option<Milestone>,

    #[serde(default)]
    lts: Option<Milestone>,
}

impl RawCycle {
    fn fold(self, today: NaiveDate) -> LifecycleRelease {
        let eol = self.eol.map(|m| m.reached(today)).unwrap_or(false);

        // `support` is phrased positively upstream, so the end-of-active-support
        // flag inverts the boolean form.
        let eoas = match self.support {
            Some(Milestone::Reached(active)) => !active,
            Some(Milestone::On(until)) => until <= today,
            None => false,
        };

        let lts = self.lts.map(|m| m.reached(today)).unwrap_or(false);

        LifecycleRelease {
            name: self.cycle,
            latest: self.latest,
            eol,
            eoas,
            // The API has no separate maintenance field; a line is maintained
            // until it reaches end of life.
            maintained: !eol,
            lts,
            eol_date: self.eol.and_then(|m| m.date()),
            release_date: self.release_date,
            latest_release_date: self.latest_release_date,
        }
    }
}

/// HTTP client for the lifecycle API
pub struct LifecycleClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl LifecycleClient {
    pub fn new(lifecycle: &LifecycleConfig, network: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&network.user_agent)
            .timeout(Duration::from_secs(network.http_timeout_secs))
            .build()
            .map_err(|e| Error::network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: lifecycle.base_url.trim_end_matches('/').to_string(),
            retry: network.retry.clone(),
        })
    }

    async fn fetch_cycles(&self, product: &str) -> Result<Vec<RawCycle>> {
        let url = format!("{}/api/{}.json", self.base_url, product);
        debug!("Fetching lifecycle data from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            Error::network(format!("lifecycle request for {} failed: {}", product, e))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!(
                "lifecycle data for product {}",
                product
            )));
        }
        if status.is_client_error() {
            return Err(Error::invalid_response(format!(
                "lifecycle API returned {} for {}",
                status, product
            )));
        }
        if !status.is_success() {
            return Err(Error::network(format!(
                "lifecycle API returned {} for {}",
                status, product
            )));
        }

        response.json::<Vec<RawCycle>>().await.map_err(|e| {
            Error::invalid_response(format!("cannot decode lifecycle data for {}: {}", product, e))
        })
    }
}

#[async_trait]
impl LifecycleSource for LifecycleClient {
    async fn product_info(&self, product: &str) -> Result<Vec<LifecycleRelease>> {
        let cycles = retry_with_policy(
            &self.retry,
            "lifecycle fetch",
            |err: &Error| matches!(err, Error::Network { .. }),
            || self.fetch_cycles(product),
        )
        .await?;

        let today = Utc::now().date_naive();
        Ok(cycles.into_iter().map(|c| c.fold(today)).collect())
    }
}
