//! Job fetch abstraction.
//!
//! [`JobFetcher`] is the only thing the completion waiter needs from the surrounding HTTP
//! client. [`HttpJobFetcher`] talks to the real service; [`MockJobFetcher`] replays scripted
//! responses in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::config::Config;
use crate::errors::TransportError;
use crate::jobs::models::{DocumentJob, JobId};

/// Fetch the current snapshot of a job.
///
/// Implementations must report network and HTTP failures as [`TransportError`]; the waiter
/// hands them to its caller unchanged.
#[async_trait]
pub trait JobFetcher: Send + Sync {
    async fn fetch_job(&self, job_id: &JobId) -> Result<DocumentJob, TransportError>;
}

#[async_trait]
impl<F: JobFetcher + ?Sized> JobFetcher for Arc<F> {
    async fn fetch_job(&self, job_id: &JobId) -> Result<DocumentJob, TransportError> {
        (**self).fetch_job(job_id).await
    }
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Fetches jobs with `GET {base_url}/v1/documents/{id}`.
#[derive(Debug, Clone)]
pub struct HttpJobFetcher {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpJobFetcher {
    pub fn new(base_url: Url, api_key: Option<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(config.base_url.clone(), config.api_key.clone(), config.request_timeout)
    }

    fn job_url(&self, job_id: &JobId) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base URL '{}' cannot have path segments", self.base_url))?
            .pop_if_empty()
            .extend(["v1", "documents", job_id.0.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl JobFetcher for HttpJobFetcher {
    #[tracing::instrument(skip(self, job_id), fields(job_id = %job_id))]
    async fn fetch_job(&self, job_id: &JobId) -> Result<DocumentJob, TransportError> {
        let url = self.job_url(job_id)?;

        let mut request = self.client.get(url.clone());
        // Only add Authorization header if an API key is configured
        if let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .inspect_err(|e| tracing::warn!(url = %url, error = %e, "Job fetch request failed"))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Job fetch returned error status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let job: DocumentJob = serde_json::from_str(&body)?;
        tracing::trace!(status = %job.status, "Fetched job");
        Ok(job)
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

/// Job fetcher replaying scripted responses in FIFO order.
///
/// Once the script is exhausted the last successful job is returned again, which keeps
/// "always processing" scenarios short to write.
#[derive(Clone, Default)]
pub struct MockJobFetcher {
    responses: Arc<Mutex<VecDeque<Result<DocumentJob, TransportError>>>>,
    last: Arc<Mutex<Option<DocumentJob>>>,
    calls: Arc<Mutex<Vec<JobId>>>,
}

impl MockJobFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push(&self, response: Result<DocumentJob, TransportError>) {
        self.responses.lock().push_back(response);
    }

    /// Queue a successful snapshot.
    pub fn push_job(&self, job: DocumentJob) {
        self.push(Ok(job));
    }

    /// Ids passed to `fetch_job`, in call order.
    pub fn get_calls(&self) -> Vec<JobId> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl JobFetcher for MockJobFetcher {
    async fn fetch_job(&self, job_id: &JobId) -> Result<DocumentJob, TransportError> {
        self.calls.lock().push(job_id.clone());

        let next = self.responses.lock().pop_front();
        match next {
            Some(Ok(job)) => {
                *self.last.lock() = Some(job.clone());
                Ok(job)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .clone()
                .ok_or_else(|| TransportError::Other(anyhow::anyhow!("No mock response configured for job {job_id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::models::JobStatus;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer, api_key: Option<&str>) -> HttpJobFetcher {
        HttpJobFetcher::new(
            server.uri().parse().unwrap(),
            api_key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_http_fetch_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/doc_123"))
            .and(header("authorization", "Bearer sk_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "doc_123",
                "status": "processing"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let job = fetcher(&server, Some("sk_test")).fetch_job(&JobId::from("doc_123")).await.unwrap();

        assert_eq!(job.id, JobId::from("doc_123"));
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_http_fetch_keeps_base_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/documents/doc_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "doc_1",
                "status": "completed",
                "downloadUrl": "https://cdn.example.com/doc_1.pdf"
            })))
            .mount(&server)
            .await;

        let base: Url = format!("{}/api/", server.uri()).parse().unwrap();
        let fetcher = HttpJobFetcher::new(base, None, Duration::from_secs(5)).unwrap();
        let job = fetcher.fetch_job(&JobId::from("doc_1")).await.unwrap();

        assert_eq!(job.download_url.as_deref(), Some("https://cdn.example.com/doc_1.pdf"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = fetcher(&server, None).fetch_job(&JobId::from("doc_missing")).await.unwrap_err();

        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "not found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = fetcher(&server, None).fetch_job(&JobId::from("doc_1")).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[tokio::test]
    async fn test_http_connection_refused() {
        // Nothing listens on port 1
        let uri: Url = "http://127.0.0.1:1".parse().unwrap();

        let fetcher = HttpJobFetcher::new(uri, None, Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch_job(&JobId::from("doc_1")).await.unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }

    #[tokio::test]
    async fn test_mock_fetcher_replays_in_order_then_repeats_last() {
        let mock = MockJobFetcher::new();
        mock.push_job(DocumentJob::new("doc_1", JobStatus::Queued));
        mock.push_job(DocumentJob::new("doc_1", JobStatus::Processing));

        let id = JobId::from("doc_1");
        assert_eq!(mock.fetch_job(&id).await.unwrap().status, JobStatus::Queued);
        assert_eq!(mock.fetch_job(&id).await.unwrap().status, JobStatus::Processing);
        assert_eq!(mock.fetch_job(&id).await.unwrap().status, JobStatus::Processing);
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.get_calls(), vec![id.clone(), id.clone(), id]);
    }

    #[tokio::test]
    async fn test_mock_fetcher_without_script_errors() {
        let mock = MockJobFetcher::new();
        assert!(mock.fetch_job(&JobId::from("doc_1")).await.is_err());
    }
}
