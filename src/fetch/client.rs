use async_trait::async_trait;
use reqwest::{Request, Response};

/// Minimal seam over an HTTP client so fetches can be stubbed in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
