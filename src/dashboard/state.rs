use crate::cache::FetchCache;
use crate::config::Config;
use crate::fetch::BasicClient;

/// Shared application state available to all route handlers via Axum's
/// `State` extractor.
pub struct AppState {
    pub config: Config,
    pub client: BasicClient,
    /// Fetched resources, keyed by source URL, reused across page loads.
    pub cache: FetchCache,
}

impl AppState {
    pub fn new(config: Config) -> reqwest::Result<Self> {
        let client = BasicClient::with_timeout(config.http_timeout)?;
        let cache = FetchCache::new(config.cache_ttl);
        Ok(Self {
            config,
            client,
            cache,
        })
    }
}
