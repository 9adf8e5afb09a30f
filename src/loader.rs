use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScriptLoadError {
    #[error("invalid script url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request for {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("script endpoint {url} returned status {status}")]
    Status { url: String, status: u16 },
}

/// Pluggable stand-in for the page's resource-loading subsystem.
///
/// One call per injected script element; the outcome is reported back to
/// the manager as its load or error event.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<(), ScriptLoadError>;
}

/// Loader that fetches the script over HTTP to confirm the endpoint serves
/// it. The body is discarded; only reachability and status matter.
pub struct HttpScriptLoader {
    client: reqwest::Client,
}

impl HttpScriptLoader {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ScriptLoader for HttpScriptLoader {
    async fn load(&self, url: &str) -> Result<(), ScriptLoadError> {
        let parsed = url::Url::parse(url).map_err(|e| ScriptLoadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| ScriptLoadError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScriptLoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        debug!(%url, "widget script endpoint reachable");
        Ok(())
    }
}

/// Loader with a fixed outcome, for tests and offline rendering.
#[derive(Clone, Default)]
pub struct StubScriptLoader {
    fail: bool,
}

impl StubScriptLoader {
    pub fn succeeding() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl ScriptLoader for StubScriptLoader {
    async fn load(&self, url: &str) -> Result<(), ScriptLoadError> {
        if self.fail {
            return Err(ScriptLoadError::Request {
                url: url.to_string(),
                reason: "stub loader configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_loader_reports_configured_outcome() {
        let ok = StubScriptLoader::succeeding();
        assert!(ok.load("https://widget.bubblav.com/widget.js").await.is_ok());

        let failing = StubScriptLoader::failing();
        let err = failing
            .load("https://widget.bubblav.com/widget.js")
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptLoadError::Request { .. }));
    }

    #[tokio::test]
    async fn http_loader_rejects_malformed_urls() {
        let loader = HttpScriptLoader::new(Duration::from_secs(1)).unwrap();
        let err = loader.load("not a url").await.unwrap_err();
        assert!(matches!(err, ScriptLoadError::InvalidUrl { .. }));
    }
}
