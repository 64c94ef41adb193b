use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::pipeline::Coordinator;
use crate::sources::PostingFetcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub coordinator: Arc<Coordinator>,
    /// `HttpPostingFetcher` in production.
    pub fetcher: Arc<dyn PostingFetcher>,
    /// Root token; every request runs under a child of it and server shutdown cancels it.
    pub shutdown: CancellationToken,
}
