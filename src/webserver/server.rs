//! Diagnostic webserver.
//!
//! # Responsibilities
//! - Keep the registry of diagnostic path handlers
//! - Bind the configured interface and port
//! - Dispatch requests to whichever handler is registered at request time
//! - Stop serving when dropped

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use dashmap::DashMap;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::ProcessConfig;
use crate::lifecycle::Shutdown;
use crate::webserver::handler::{PageArgs, PathHandler, PathHandlerRegistry};
use crate::webserver::pages::{self, DefaultPages};

/// Error type for webserver startup.
#[derive(Debug, Error)]
pub enum WebserverError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("webserver already started on {0}")]
    AlreadyStarted(SocketAddr),
}

/// The diagnostic listener as seen by the startup sequence.
pub trait DiagnosticServer: PathHandlerRegistry {
    /// Install the status, configuration and log pages.
    fn register_default_handlers(&self, pages: DefaultPages);

    /// Bind and begin serving; returns the bound address.
    fn start(&mut self) -> impl Future<Output = Result<SocketAddr, WebserverError>>;
}

type Handlers = Arc<DashMap<String, PathHandler>>;

/// HTTP server for the diagnostic pages.
pub struct Webserver {
    address: String,
    handlers: Handlers,
    shutdown: Shutdown,
    local_addr: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
}

impl Webserver {
    /// Create a webserver for the configured interface and port. Nothing is
    /// bound until [`DiagnosticServer::start`].
    pub fn new(config: &ProcessConfig) -> Self {
        Self::with_address(config.webserver_address())
    }

    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            handlers: Arc::new(DashMap::new()),
            shutdown: Shutdown::new(),
            local_addr: None,
            task: None,
        }
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Stop serving and wait for in-flight requests to finish.
    pub async fn stop(&mut self) {
        self.shutdown.trigger();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn build_router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(self.handlers.clone())
            .layer(TraceLayer::new_for_http())
    }
}

impl PathHandlerRegistry for Webserver {
    fn register_path_handler(&self, path: &str, handler: PathHandler) {
        if self.handlers.insert(path.to_string(), handler).is_some() {
            tracing::warn!(path = %path, "Replacing existing path handler");
        } else {
            tracing::debug!(path = %path, "Registered path handler");
        }
    }
}

impl DiagnosticServer for Webserver {
    fn register_default_handlers(&self, pages: DefaultPages) {
        pages::register(self, pages);
    }

    async fn start(&mut self) -> Result<SocketAddr, WebserverError> {
        if let Some(addr) = self.local_addr {
            return Err(WebserverError::AlreadyStarted(addr));
        }

        let bind_error = |source| WebserverError::Bind {
            address: self.address.clone(),
            source,
        };
        let listener = TcpListener::bind(&self.address).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let app = self.build_router();
        let mut stop = self.shutdown.subscribe();
        self.task = Some(tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.wait().await })
                .await;
            match result {
                Ok(()) => tracing::info!(address = %local_addr, "Webserver stopped"),
                Err(e) => tracing::error!(address = %local_addr, error = %e, "Webserver failed"),
            }
        }));
        self.local_addr = Some(local_addr);

        tracing::info!(address = %local_addr, "Webserver started");
        Ok(local_addr)
    }
}

impl Drop for Webserver {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn dispatch(
    State(handlers): State<Handlers>,
    uri: Uri,
    Query(args): Query<PageArgs>,
) -> Response {
    // Clone out of the map so no shard lock is held while rendering.
    let handler = handlers.get(uri.path()).map(|entry| entry.value().clone());
    match handler {
        Some(handler) => handler(&args).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("No page registered at {}", uri.path()),
        )
            .into_response(),
    }
}
