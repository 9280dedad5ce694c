//! Retrieval Worker
//!
//! Fetches a web page and returns its largest HTML table as the working
//! dataset.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::html_table;
use crate::config::RetrievalConfig;
use sdk::errors::CapabilityError;
use sdk::{Artifact, Capability, CapabilityDescriptor, ContextSlot, Dataset, Invocation};

pub const NAME: &str = "SearchAndScrapeAgent";

pub struct RetrievalWorker {
    descriptor: CapabilityDescriptor,
    client: reqwest::Client,
    timeout: Duration,
    user_agent: String,
}

impl RetrievalWorker {
    pub fn new(config: &RetrievalConfig) -> Self {
        let descriptor = CapabilityDescriptor::new(
            NAME,
            "Finds and retrieves data (like tables) from a given URL.",
        )
        .requires_param("url")
        .writes(ContextSlot::Dataset)
        .example(json!({
            "agent": NAME,
            "goal": "Fetch the data table of highest grossing films.",
            "url": "https://en.wikipedia.org/wiki/List_of_highest-grossing_films"
        }));

        Self {
            descriptor,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Download `url` and extract its largest table
    pub async fn fetch_table(&self, url: &str) -> Result<Dataset, CapabilityError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| CapabilityError::InvalidParameter(format!("url '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CapabilityError::InvalidParameter(format!(
                "url '{}' must use http or https",
                url
            )));
        }

        info!("Fetching {}", url);
        let response = self
            .client
            .get(parsed)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CapabilityError::TransportError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CapabilityError::TransportError(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CapabilityError::TransportError(e.to_string()))?;
        debug!("Downloaded {} bytes from {}", body.len(), url);

        let table = html_table::largest_table(&body).ok_or_else(|| {
            CapabilityError::NotFound(format!("No HTML tables found at the URL: {}", url))
        })?;

        info!(
            "Extracted table with {} rows x {} columns",
            table.num_rows(),
            table.num_columns()
        );
        Ok(table)
    }
}

#[async_trait]
impl Capability for RetrievalWorker {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn invoke(&self, invocation: Invocation<'_>) -> Result<Artifact, CapabilityError> {
        let url = invocation.params().param_str("url")?;
        self.fetch_table(&url).await.map(Artifact::Dataset)
    }
}
