//! HTTP adapters
//!
//! `HttpSource` reads `GET {base}/{collection}`; `HttpAuthoritative` posts to
//! a remote engine that returns a full bundle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{AnalysisBundle, AppError, AppResult, Collection};
use crate::providers::file::rows_from_value;
use crate::providers::source::{AuthoritativeEngine, DataSource};
use crate::utils::constants::USER_AGENT;

fn client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::internal(format!("HTTP client init failed: {}", e)))
}

/// REST source serving one array per collection
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.as_str())
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self, collection: Collection) -> AppResult<Vec<Value>> {
        let url = self.url_for(collection);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::from(e).for_collection(collection))?;

        if !response.status().is_success() {
            return Err(AppError::input_unavailable(
                collection,
                format!("HTTP {} from {}", response.status(), url),
            ));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| AppError::input_malformed(collection, e.to_string()))?;

        rows_from_value(collection, value)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

/// Remote engine computing the same bundle contract
pub struct HttpAuthoritative {
    client: reqwest::Client,
    url: String,
}

impl HttpAuthoritative {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AuthoritativeEngine for HttpAuthoritative {
    async fn analyze(&self, now: DateTime<Utc>) -> AppResult<AnalysisBundle> {
        info!("📡 Requesting authoritative analysis from {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "now": now }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::timeout(format!("authoritative engine timed out: {}", e))
                } else {
                    AppError::authoritative_failed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(AppError::authoritative_failed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json::<AnalysisBundle>()
            .await
            .map_err(|e| AppError::authoritative_failed(format!("undecodable bundle: {}", e)))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_urls() {
        let source = HttpSource::new("http://localhost:9000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            source.url_for(Collection::Relationships),
            "http://localhost:9000/api/relationships"
        );
    }

    #[tokio::test]
    async fn test_unreachable_source_is_unavailable() {
        let source = HttpSource::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let err = source.fetch_cases().await.unwrap_err();
        assert_eq!(err.collection, Some(Collection::Cases));
        assert!(err.code.is_degradable());
    }
}
