//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for the signals that stop the daemon
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - On Unix, SIGINT, SIGTERM and SIGQUIT all request a stop
//! - Elsewhere only Ctrl-C is observed

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => tracing::info!(signal = "SIGINT", "Shutdown signal received"),
        _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "Shutdown signal received"),
        _ = sigquit.recv() => tracing::info!(signal = "SIGQUIT", "Shutdown signal received"),
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = "ctrl-c", "Shutdown signal received");
    Ok(())
}
