//! statestored: state store coordination daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   flags + --config_file ──▶ ProcessConfig (validated, immutable, Arc)
//!                                   │
//!                                   ▼
//!   ┌────────────────────────── Orchestrator ──────────────────────────┐
//!   │ logging ─▶ kerberos ─▶ webserver ─▶ metrics ─▶ state store ─▶ wait │
//!   └──────────────────────────────────────────────────────────────────┘
//!                                   │
//!                      Ok ─▶ exit 0 │ Aborted ─▶ exit 1
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use statestored::config::{self, Flags};
use statestored::lifecycle::{LifecyclePhase, Orchestrator};
use statestored::observability::{logging, version_string};
use statestored::security::{self, KinitAuthenticator};
use statestored::state_store::StateStore;
use statestored::webserver::Webserver;
use statestored::Aborted;

fn main() -> ExitCode {
    // Usage errors exit here with clap's status.
    let flags = Flags::parse();
    if flags.is_version_query() {
        println!("{}", version_string());
        return ExitCode::SUCCESS;
    }

    let config = match config::load_config(&flags) {
        Ok(config) => Arc::new(config),
        Err(e) => return fail(Aborted::new(LifecyclePhase::ConfigResolved, e)),
    };
    let log_buffer = match logging::init(&config) {
        Ok(buffer) => buffer,
        Err(e) => return fail(Aborted::new(LifecyclePhase::LoggingReady, e)),
    };

    // Before the runtime: no other threads exist yet.
    security::export_credential_cache(&config);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Cannot start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = Orchestrator::new(
        config.clone(),
        KinitAuthenticator::new(),
        Webserver::new(&config),
        StateStore::new,
    )
    .with_log_buffer(log_buffer);

    match runtime.block_on(orchestrator.run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(aborted) => fail(aborted),
    }
}

fn fail(aborted: Aborted) -> ExitCode {
    eprintln!("statestored: {}", aborted);
    ExitCode::FAILURE
}
