//! Detail page fetching over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Url;

use sf_core::error::TransientIoError;
use sf_engine::DetailFetcher;

pub struct HttpFetcher {
    client: reqwest::Client,
    base: Url,
}

impl HttpFetcher {
    /// Relative item links are resolved against `base`.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, String> {
        let base = Url::parse(base).map_err(|e| format!("Invalid base url '{}': {}", base, e))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { client, base })
    }

    fn resolve(&self, link: &str) -> Result<Url, TransientIoError> {
        self.base.join(link).map_err(|e| TransientIoError::Fetch {
            url: link.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl DetailFetcher for HttpFetcher {
    async fn fetch(&self, link: &str) -> Result<String, TransientIoError> {
        let url = self.resolve(link)?;
        let fail = |reason: String| TransientIoError::Fetch {
            url: url.to_string(),
            reason,
        };

        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(response.status().to_string()));
        }
        response.text().await.map_err(|e| fail(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_resolve_against_base() {
        let fetcher = HttpFetcher::new("https://videos.example/search?q=cats", Duration::from_secs(1)).unwrap();
        assert_eq!(
            fetcher.resolve("/watch/42").unwrap().as_str(),
            "https://videos.example/watch/42"
        );
        assert_eq!(
            fetcher.resolve("https://cdn.example/v/1").unwrap().as_str(),
            "https://cdn.example/v/1"
        );
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        assert!(HttpFetcher::new("not a url", Duration::from_secs(1)).is_err());
    }
}
