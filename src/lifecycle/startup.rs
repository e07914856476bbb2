//! Startup orchestration.
//!
//! # Responsibilities
//! - Bring subsystems up in dependency order
//! - Abort on the first failure, reporting the phase that was not reached
//! - Block until the state store stops
//!
//! # Design Decisions
//! - Fail fast: no retries, no rollback
//! - Each started part is a local binding, so scope exit tears parts down in
//!   reverse creation order on every path
//! - The orchestrator never exits the process; `main` turns the result into
//!   an exit status

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ProcessConfig;
use crate::error::{Aborted, StartupError};
use crate::lifecycle::phase::{Lifecycle, LifecyclePhase, PhaseWatch};
use crate::observability::{version_string, LogBuffer, MetricsRegistry};
use crate::platform::CpuInfo;
use crate::security::{Authenticator, SERVICE_NAME};
use crate::state_store::{CoordinationService, DEFAULT_UPDATE_FREQUENCY};
use crate::webserver::{DefaultPages, DiagnosticServer, PathHandlerRegistry};

/// Runs the startup sequence over pluggable subsystems.
///
/// `F` builds the coordination service from the update frequency and the
/// initialized metrics registry.
pub struct Orchestrator<A, W, F> {
    config: Arc<ProcessConfig>,
    log_buffer: Option<LogBuffer>,
    authenticator: A,
    webserver: W,
    service_factory: F,
    lifecycle: Lifecycle,
}

impl<A, W, F, S> Orchestrator<A, W, F>
where
    A: Authenticator,
    W: DiagnosticServer,
    F: FnOnce(Duration, Arc<MetricsRegistry>) -> S,
    S: CoordinationService,
{
    /// Takes an already resolved and validated configuration.
    pub fn new(
        config: Arc<ProcessConfig>,
        authenticator: A,
        webserver: W,
        service_factory: F,
    ) -> Self {
        let mut lifecycle = Lifecycle::new();
        enter(&mut lifecycle, LifecyclePhase::ConfigResolved);
        Self {
            config,
            log_buffer: None,
            authenticator,
            webserver,
            service_factory,
            lifecycle,
        }
    }

    /// Serve `buffer` on the `/logs` page.
    pub fn with_log_buffer(mut self, buffer: LogBuffer) -> Self {
        self.log_buffer = Some(buffer);
        self
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    /// Follow the phases `run` walks through, including after it returns.
    pub fn phases(&self) -> PhaseWatch {
        self.lifecycle.watch()
    }

    /// Run every phase and wait for the state store to stop.
    pub async fn run(self) -> Result<(), Aborted> {
        use LifecyclePhase::{
            AuthDone, LoggingReady, MetricsReady, ObservabilityDone, ServiceStarted, Stopped,
        };

        let Orchestrator {
            config,
            log_buffer,
            authenticator,
            webserver,
            service_factory,
            mut lifecycle,
        } = self;
        let started_at = Instant::now();

        tracing::info!("{}", version_string());
        tracing::info!(hostname = %config.hostname, "Using hostname");
        tracing::info!(config = ?config, "Configuration");
        enter(&mut lifecycle, LoggingReady);

        let _auth_session = if config.kerberos_enabled() {
            let session = authenticator
                .authenticate(SERVICE_NAME, &config)
                .await
                .map_err(|e| abort(&mut lifecycle, AuthDone, e))?;
            tracing::info!(principal = session.principal(), "Authenticated");
            Some(session)
        } else {
            None
        };
        enter(&mut lifecycle, AuthDone);

        let cpu_info = CpuInfo::init();

        // Rebound after auth so it is dropped before the auth session.
        let mut webserver = webserver;
        if config.enable_webserver {
            webserver.register_default_handlers(DefaultPages {
                config: config.clone(),
                cpu_info,
                log_buffer,
                started_at,
            });
            let addr = webserver
                .start()
                .await
                .map_err(|e| abort(&mut lifecycle, ObservabilityDone, e))?;
            tracing::info!(address = %addr, "Webserver started");
        } else {
            tracing::info!("Not starting webserver");
        }
        enter(&mut lifecycle, ObservabilityDone);

        let webpages: Option<&dyn PathHandlerRegistry> = if config.enable_webserver {
            Some(&webserver as &dyn PathHandlerRegistry)
        } else {
            None
        };

        let metrics = Arc::new(MetricsRegistry::new());
        metrics.init(webpages);
        enter(&mut lifecycle, MetricsReady);

        let mut service = service_factory(DEFAULT_UPDATE_FREQUENCY, metrics.clone());
        service.register_webpages(webpages);
        service
            .start(config.state_store_port)
            .await
            .map_err(|e| abort(&mut lifecycle, ServiceStarted, e))?;
        enter(&mut lifecycle, ServiceStarted);

        service.wait_for_server_to_stop().await;
        enter(&mut lifecycle, Stopped);
        tracing::info!(uptime_secs = started_at.elapsed().as_secs(), "State store stopped");
        Ok(())
    }
}

fn enter(lifecycle: &mut Lifecycle, phase: LifecyclePhase) {
    let accepted = lifecycle.advance(phase);
    debug_assert!(accepted, "startup entered {} out of order", phase);
}

fn abort(
    lifecycle: &mut Lifecycle,
    phase: LifecyclePhase,
    source: impl Into<StartupError>,
) -> Aborted {
    let aborted = Aborted::new(phase, source);
    enter(lifecycle, LifecyclePhase::Aborted);
    tracing::error!(
        phase = %phase,
        kind = aborted.source.as_label(),
        error = %aborted.source,
        "Startup aborted"
    );
    aborted
}
