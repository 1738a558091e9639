//! A fully wired service: router plus the optional token reaper.

use std::sync::Arc;

use uptime_authn::TokenReaper;
use uptime_storage::RecordStore;

use crate::{
    config::ServiceConfig,
    orchestrator::Orchestrator,
    request::{Request, Response},
    router::Router,
};

/// Everything one process needs to answer requests.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use uptime_service::{App, Request, ServiceConfig};
/// use uptime_storage::MemoryStore;
///
/// #[tokio::main]
/// async fn main() {
///     let app = App::start(&ServiceConfig::default(), Arc::new(MemoryStore::new()));
///     let response = app.handle(&Request::builder().path("/ping").method("get").build()).await;
///     assert_eq!(response.status, 200);
///     app.shutdown().await;
/// }
/// ```
#[derive(Debug)]
pub struct App {
    router: Router,
    reaper: Option<TokenReaper>,
}

impl App {
    /// Wires the service from `config` over `store`.
    ///
    /// When [`ServiceConfig::reaper_interval`] is set, a [`TokenReaper`] is
    /// spawned, so this must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(config: &ServiceConfig, store: Arc<dyn RecordStore>) -> Self {
        let orchestrator = Arc::new(Orchestrator::from_config(config, store));
        let reaper = config.reaper_interval().map(|interval| {
            tracing::info!(?interval, "starting token reaper");
            TokenReaper::spawn(Arc::clone(orchestrator.tokens()), interval)
        });
        tracing::info!(
            env = config.env_name(),
            max_checks = config.max_checks(),
            "uptime service started"
        );
        Self { router: Router::new(orchestrator), reaper }
    }

    /// The request router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handles one request.
    pub async fn handle(&self, request: &Request) -> Response {
        self.router.handle(request).await
    }

    /// Stops the token reaper, if running, and waits for it to exit.
    pub async fn shutdown(self) {
        if let Some(reaper) = self.reaper {
            reaper.shutdown().await;
        }
    }
}
