use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<FetchError>,
    },
}

/// Page transport used by the crawl loop.
pub(crate) trait Fetch {
    async fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError>;
}

/// `reqwest` transport that retries failed requests and non-success statuses
/// with a linearly growing pause (1s, 2s, 3s, ...).
pub(crate) struct HttpFetcher {
    client: reqwest::Client,
    attempts: usize,
    backoff_unit: Duration,
}

impl HttpFetcher {
    pub(crate) fn new(
        user_agent: &str,
        timeout: Duration,
        attempts: usize,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            attempts: attempts.max(1),
            backoff_unit: Duration::from_secs(1),
        })
    }

    async fn fetch_once(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        with_retries(url, self.attempts, self.backoff_unit, || self.fetch_once(url, query)).await
    }
}

/// Runs `attempt_once` until it succeeds or `attempts` runs have failed,
/// sleeping `attempt * backoff_unit` after each failure except the last.
async fn with_retries<T, F, Fut>(
    url: &str,
    attempts: usize,
    backoff_unit: Duration,
    mut attempt_once: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0usize;
    loop {
        match attempt_once().await {
            Ok(body) => return Ok(body),
            Err(err) => {
                attempt += 1;
                warn!(url, attempt, attempts, error = %err, "request failed");
                if attempt >= attempts {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                tokio::time::sleep(backoff_unit * attempt as u32).await;
            }
        }
    }
}
