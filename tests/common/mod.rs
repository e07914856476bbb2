//! Shared fakes for orchestrator and end-to-end tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use statestored::config::ProcessConfig;
use statestored::observability::MetricsRegistry;
use statestored::security::{AuthError, AuthSession, Authenticator};
use statestored::state_store::{CoordinationService, ServiceStartError};
use statestored::webserver::{
    DefaultPages, DiagnosticServer, PathHandler, PathHandlerRegistry, WebserverError,
};

/// Ordered log of what the fakes were asked to do.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == event)
    }

    /// Position of `event`, panicking if it never happened.
    pub fn index_of(&self, event: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("event {:?} not recorded in {:?}", event, self.all()))
    }
}

pub struct FakeAuthenticator {
    pub events: Events,
    pub fail: bool,
}

impl Authenticator for FakeAuthenticator {
    async fn authenticate(
        &self,
        service_name: &'static str,
        config: &ProcessConfig,
    ) -> Result<AuthSession, AuthError> {
        self.events.push(format!("auth:{}", service_name));
        if self.fail {
            return Err(AuthError::InvalidPrincipal {
                principal: config.principal.clone(),
                reason: "rejected by test",
            });
        }
        Ok(AuthSession::without_renewal(service_name, config.principal.clone()))
    }
}

pub struct FakeWebserver {
    pub events: Events,
    pub fail_start: bool,
    pub handlers: Arc<Mutex<HashMap<String, PathHandler>>>,
}

impl FakeWebserver {
    pub fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
            fail_start: false,
            handlers: Arc::default(),
        }
    }

    pub fn failing(events: &Events) -> Self {
        let mut webserver = Self::new(events);
        webserver.fail_start = true;
        webserver
    }
}

impl PathHandlerRegistry for FakeWebserver {
    fn register_path_handler(&self, path: &str, handler: PathHandler) {
        self.events.push(format!("webserver.register:{}", path));
        self.handlers.lock().unwrap().insert(path.to_string(), handler);
    }
}

impl DiagnosticServer for FakeWebserver {
    fn register_default_handlers(&self, _: DefaultPages) {
        self.events.push("webserver.default_handlers");
    }

    async fn start(&mut self) -> Result<SocketAddr, WebserverError> {
        self.events.push("webserver.start");
        if self.fail_start {
            return Err(WebserverError::Bind {
                address: "127.0.0.1:25010".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken"),
            });
        }
        Ok(SocketAddr::from(([127, 0, 0, 1], 25010)))
    }
}

impl Drop for FakeWebserver {
    fn drop(&mut self) {
        self.events.push("webserver.drop");
    }
}

pub struct FakeService {
    pub events: Events,
    pub metrics: Arc<MetricsRegistry>,
    pub fail_start: bool,
}

impl CoordinationService for FakeService {
    fn register_webpages(&self, webserver: Option<&dyn PathHandlerRegistry>) {
        self.events.push(format!(
            "service.register_webpages:{}",
            if webserver.is_some() { "some" } else { "none" }
        ));
    }

    async fn start(&mut self, port: u16) -> Result<SocketAddr, ServiceStartError> {
        self.events.push(format!(
            "service.start:metrics_initialized={}",
            self.metrics.is_initialized()
        ));
        if self.fail_start {
            return Err(ServiceStartError::Bind {
                port,
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken"),
            });
        }
        Ok(SocketAddr::from(([0, 0, 0, 0], port)))
    }

    async fn wait_for_server_to_stop(&mut self) {
        self.events.push("service.wait");
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.events.push("service.drop");
    }
}

/// Factory producing a [`FakeService`] that records into `events`.
pub fn fake_service(
    events: &Events,
    fail_start: bool,
) -> impl FnOnce(Duration, Arc<MetricsRegistry>) -> FakeService {
    let events = events.clone();
    move |frequency, metrics| {
        events.push(format!("service.new:{}ms", frequency.as_millis()));
        FakeService {
            events,
            metrics,
            fail_start,
        }
    }
}

pub fn config_with_principal(principal: &str) -> ProcessConfig {
    ProcessConfig {
        principal: principal.to_string(),
        keytab_file: "/etc/statestore.keytab".to_string(),
        state_store_port: 24100,
        ..ProcessConfig::default()
    }
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
