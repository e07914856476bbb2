//! The coordination service contract and the state store implementing it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics::{Counter, Gauge};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::lifecycle::shutdown::{Shutdown, ShutdownListener};
use crate::lifecycle::signals;
use crate::observability::MetricsRegistry;
use crate::state_store::api::{self, ApiState};
use crate::state_store::membership::Membership;
use crate::webserver::{Page, PageArgs, PathHandlerRegistry};

/// How often membership changes are published to subscribers.
pub const DEFAULT_UPDATE_FREQUENCY: Duration = Duration::from_millis(1000);

pub const STATE_STORE_PAGE: &str = "/state_store";

#[derive(Debug, Error)]
pub enum ServiceStartError {
    #[error("failed to bind state store port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("state store already started on {0}")]
    AlreadyStarted(SocketAddr),
}

/// What the startup sequence needs from the coordination service.
pub trait CoordinationService {
    /// Attach diagnostic pages; a no-op without a webserver.
    fn register_webpages(&self, webserver: Option<&dyn PathHandlerRegistry>);

    /// Bind the service port and start serving; returns the bound address.
    fn start(&mut self, port: u16) -> impl Future<Output = Result<SocketAddr, ServiceStartError>>;

    /// Suspend until the service has been stopped from outside.
    fn wait_for_server_to_stop(&mut self) -> impl Future<Output = ()>;
}

/// Metric handles used by the state store.
#[derive(Clone)]
pub struct StoreMetrics {
    pub registrations: Counter,
    pub unregistrations: Counter,
    pub update_rounds: Counter,
    pub live_members: Gauge,
    pub subscriptions: Gauge,
    pub snapshot_version: Gauge,
}

impl StoreMetrics {
    pub fn new(registry: &MetricsRegistry) -> Self {
        Self {
            registrations: registry.counter("statestore_registrations_total"),
            unregistrations: registry.counter("statestore_unregistrations_total"),
            update_rounds: registry.counter("statestore_update_rounds_total"),
            live_members: registry.gauge("statestore_live_members"),
            subscriptions: registry.gauge("statestore_subscriptions"),
            snapshot_version: registry.gauge("statestore_snapshot_version"),
        }
    }
}

/// In-memory membership service published at a fixed update frequency.
pub struct StateStore {
    update_frequency: Duration,
    metrics: StoreMetrics,
    membership: Arc<Membership>,
    shutdown: Shutdown,
    handle_signals: bool,
    local_addr: Option<SocketAddr>,
    server: Option<JoinHandle<()>>,
    background: Vec<JoinHandle<()>>,
}

impl StateStore {
    pub fn new(update_frequency: Duration, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            update_frequency,
            metrics: StoreMetrics::new(&metrics),
            membership: Arc::new(Membership::new()),
            shutdown: Shutdown::new(),
            handle_signals: true,
            local_addr: None,
            server: None,
            background: Vec::new(),
        }
    }

    /// Do not stop on SIGINT/SIGTERM/SIGQUIT; only the stop handle works.
    pub fn without_signal_handlers(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    /// Handle that stops the service when triggered.
    pub fn stop_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn membership(&self) -> Arc<Membership> {
        self.membership.clone()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl CoordinationService for StateStore {
    fn register_webpages(&self, webserver: Option<&dyn PathHandlerRegistry>) {
        let Some(webserver) = webserver else {
            return;
        };
        let membership = self.membership.clone();
        webserver.register_path_handler(
            STATE_STORE_PAGE,
            Arc::new(move |_: &PageArgs| {
                Page::Json(json!({
                    "snapshot": membership.snapshot().as_ref(),
                    "live_members": membership.live_members(),
                    "subscriptions": membership.subscriptions(),
                }))
            }),
        );
    }

    async fn start(&mut self, port: u16) -> Result<SocketAddr, ServiceStartError> {
        if let Some(addr) = self.local_addr {
            return Err(ServiceStartError::AlreadyStarted(addr));
        }

        let bind_error = |source| ServiceStartError::Bind { port, source };
        let listener = TcpListener::bind(("0.0.0.0", port)).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let app = api::router(ApiState {
            membership: self.membership.clone(),
            metrics: self.metrics.clone(),
        });
        let mut stop = self.shutdown.subscribe();
        let fault = self.shutdown.clone();
        self.server = Some(tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.wait().await })
                .await;
            if let Err(e) = result {
                tracing::error!(address = %local_addr, error = %e, "State store server failed");
                fault.trigger();
            }
        }));

        self.background.push(tokio::spawn(run_update_loop(
            self.membership.clone(),
            self.metrics.clone(),
            self.update_frequency,
            self.shutdown.subscribe(),
        )));
        if self.handle_signals {
            self.background.push(tokio::spawn(stop_on_signal(self.shutdown.clone())));
        }
        self.local_addr = Some(local_addr);

        tracing::info!(
            address = %local_addr,
            update_frequency_ms = self.update_frequency.as_millis() as u64,
            "State store started"
        );
        Ok(local_addr)
    }

    async fn wait_for_server_to_stop(&mut self) {
        // Awaited by reference so that a cancelled wait can be resumed.
        let Some(server) = self.server.as_mut() else {
            tracing::warn!("State store is not running");
            return;
        };
        if let Err(e) = server.await {
            tracing::error!(error = %e, "State store server task ended abnormally");
        }
        self.server = None;

        self.shutdown.trigger();
        for task in self.background.drain(..) {
            let _ = task.await;
        }
        tracing::info!("State store stopped");
    }
}

impl Drop for StateStore {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn run_update_loop(
    membership: Arc<Membership>,
    metrics: StoreMetrics,
    frequency: Duration,
    mut stop: ShutdownListener,
) {
    let mut ticker = tokio::time::interval(frequency);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                metrics.update_rounds.increment(1);
                if let Some(version) = membership.publish() {
                    tracing::debug!(version, "Published membership update");
                    metrics.snapshot_version.set(version as f64);
                }
                metrics.live_members.set(membership.live_members() as f64);
                metrics.subscriptions.set(membership.subscription_count() as f64);
            }
            _ = stop.wait() => break,
        }
    }
}

async fn stop_on_signal(shutdown: Shutdown) {
    let mut stopped = shutdown.subscribe();
    tokio::select! {
        result = signals::wait_for_shutdown_signal() => match result {
            Ok(()) => shutdown.trigger(),
            Err(e) => tracing::error!(error = %e, "Cannot install signal handlers"),
        },
        _ = stopped.wait() => {}
    }
}
