use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{Client, StatusCode};

use crate::error::DanmuApiError;

pub(crate) const USER_AGENT: &str = "danmu-server";

/// Runtime options of the danmu API scraper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DanmuApiOptions {
    /// Base URL including scheme, e.g. `http://127.0.0.1:9321`
    pub server_url: String,
    /// Platforms to take episodes from, in priority order. Empty allows all.
    pub allowed_platforms: Vec<String>,
    /// Collection sources to accept search results from. Empty allows all.
    pub allowed_sources: Vec<String>,
}

/// Options shared with the settings layer and updated at runtime.
pub type SharedOptions = Arc<RwLock<DanmuApiOptions>>;

pub struct DanmuApiClient {
    client: Client,
    options: SharedOptions,
}

impl DanmuApiClient {
    pub fn new(client: Client, options: SharedOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> DanmuApiOptions {
        self.options.read().clone()
    }

    pub fn is_configured(&self) -> bool {
        !self.options.read().server_url.trim().is_empty()
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn url(&self, path: &str) -> crate::Result<String> {
        let options = self.options.read();
        let base = options.server_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(DanmuApiError::NotConfigured);
        }
        Ok(format!("{}{}", base, path))
    }

    pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> crate::Result<T> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DanmuApiError::RateLimited);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DanmuApiError::Api {
                status_code: status.as_u16(),
                message: body,
            });
        }
        parse_body(&body)
    }
}

pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> crate::Result<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(deserializer).map_err(|e| DanmuApiError::Json {
        path: e.path().to_string(),
        source: e.into_inner(),
    })
}
