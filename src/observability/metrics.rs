//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Hold the daemon's counters and gauges
//! - Expose a Prometheus-compatible `/metrics` page when a webserver is present
//!
//! # Metrics
//! - `statestore_registrations_total` (counter): member registrations
//! - `statestore_unregistrations_total` (counter): member removals
//! - `statestore_update_rounds_total` (counter): update loop iterations
//! - `statestore_live_members` (gauge): currently registered members
//! - `statestore_subscriptions` (gauge): currently active subscriptions
//! - `statestore_snapshot_version` (gauge): last published membership version
//!
//! # Design Decisions
//! - The recorder is owned by the registry, not installed globally, so every
//!   registry is independent and the orchestrator hands it over explicitly
//! - Low-overhead metric updates (atomic operations)
//! - Metrics accumulate whether or not they are exposed over HTTP

use std::sync::Arc;
use std::sync::OnceLock;

use metrics::{Counter, Gauge, Key, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::webserver::{Page, PageArgs, PathHandlerRegistry};

pub const METRICS_PATH: &str = "/metrics";

/// Container for the daemon's metrics.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    /// Set once by [`MetricsRegistry::init`]; records whether `/metrics` exists.
    exposed: OnceLock<bool>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self {
            recorder,
            handle,
            exposed: OnceLock::new(),
        }
    }

    /// Finish initialization, registering `/metrics` on `webserver` if given.
    ///
    /// Calling this more than once keeps the first outcome.
    pub fn init(self: &Arc<Self>, webserver: Option<&dyn PathHandlerRegistry>) {
        if self.exposed.get().is_some() {
            tracing::warn!("Metrics registry already initialized");
            return;
        }

        match webserver {
            Some(webserver) => {
                let handle = self.handle.clone();
                webserver.register_path_handler(
                    METRICS_PATH,
                    Arc::new(move |_: &PageArgs| Page::Text(handle.render())),
                );
                tracing::info!(path = METRICS_PATH, "Metrics exposed on webserver");
            }
            None => tracing::info!("Metrics collected without an HTTP endpoint"),
        }
        let _ = self.exposed.set(webserver.is_some());
    }

    pub fn is_initialized(&self) -> bool {
        self.exposed.get().is_some()
    }

    /// Whether `/metrics` was registered during init.
    pub fn is_exposed(&self) -> bool {
        self.exposed.get().copied().unwrap_or(false)
    }

    pub fn counter(&self, name: &'static str) -> Counter {
        self.recorder
            .register_counter(&Key::from_name(name), &Self::metadata())
    }

    pub fn gauge(&self, name: &'static str) -> Gauge {
        self.recorder
            .register_gauge(&Key::from_name(name), &Self::metadata())
    }

    /// Current values in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    fn metadata() -> Metadata<'static> {
        Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webserver::PathHandler;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Pages(Mutex<HashMap<String, PathHandler>>);

    impl PathHandlerRegistry for Pages {
        fn register_path_handler(&self, path: &str, handler: PathHandler) {
            self.0.lock().unwrap().insert(path.to_string(), handler);
        }
    }

    #[test]
    fn counters_accumulate_without_webserver() {
        let metrics = Arc::new(MetricsRegistry::new());
        metrics.init(None);
        metrics.counter("statestore_registrations_total").increment(3);

        assert!(metrics.is_initialized());
        assert!(!metrics.is_exposed());
        assert!(metrics.render().contains("statestore_registrations_total 3"));
    }

    #[test]
    fn init_registers_metrics_page() {
        let pages = Pages::default();
        let metrics = Arc::new(MetricsRegistry::new());
        metrics.gauge("statestore_live_members").set(5.0);
        metrics.init(Some(&pages));

        assert!(metrics.is_exposed());
        let handlers = pages.0.lock().unwrap();
        let page = handlers[METRICS_PATH](&HashMap::new());
        match page {
            Page::Text(body) => assert!(body.contains("statestore_live_members 5")),
            other => panic!("unexpected page {:?}", other),
        }
    }

    #[test]
    fn second_init_keeps_first_outcome() {
        let pages = Pages::default();
        let metrics = Arc::new(MetricsRegistry::new());
        metrics.init(None);
        metrics.init(Some(&pages));

        assert!(!metrics.is_exposed());
        assert!(pages.0.lock().unwrap().is_empty());
    }

    #[test]
    fn registries_are_independent() {
        let a = MetricsRegistry::new();
        let b = MetricsRegistry::new();
        a.counter("statestore_update_rounds_total").increment(1);

        assert!(a.render().contains("statestore_update_rounds_total"));
        assert!(!b.render().contains("statestore_update_rounds_total"));
    }
}
