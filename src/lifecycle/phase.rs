//! Startup phases.
//!
//! # State Transitions
//! ```text
//! Unstarted → ConfigResolved → LoggingReady → AuthDone → ObservabilityDone
//!     → MetricsReady → ServiceStarted → Stopped
//!
//! any phase except Stopped → Aborted (terminal)
//! ```

use std::fmt;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecyclePhase {
    Unstarted,
    ConfigResolved,
    LoggingReady,
    AuthDone,
    ObservabilityDone,
    MetricsReady,
    ServiceStarted,
    Stopped,
    Aborted,
}

impl LifecyclePhase {
    /// The phase that normally follows this one.
    pub fn next(self) -> Option<Self> {
        use LifecyclePhase::*;
        match self {
            Unstarted => Some(ConfigResolved),
            ConfigResolved => Some(LoggingReady),
            LoggingReady => Some(AuthDone),
            AuthDone => Some(ObservabilityDone),
            ObservabilityDone => Some(MetricsReady),
            MetricsReady => Some(ServiceStarted),
            ServiceStarted => Some(Stopped),
            Stopped | Aborted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecyclePhase::Stopped | LifecyclePhase::Aborted)
    }

    pub fn can_advance_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == LifecyclePhase::Aborted || self.next() == Some(to)
    }

    /// Name of the startup step that leads into this phase.
    pub fn step(self) -> &'static str {
        match self {
            LifecyclePhase::Unstarted => "process start",
            LifecyclePhase::ConfigResolved => "configuration",
            LifecyclePhase::LoggingReady => "logging",
            LifecyclePhase::AuthDone => "authentication",
            LifecyclePhase::ObservabilityDone => "webserver start",
            LifecyclePhase::MetricsReady => "metrics init",
            LifecyclePhase::ServiceStarted => "state store start",
            LifecyclePhase::Stopped => "shutdown",
            LifecyclePhase::Aborted => "abort",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks the current phase and enforces forward-only transitions.
///
/// Every phase entered is published, so a [`PhaseWatch`] taken before the
/// tracker is moved away can still read the whole path afterwards.
#[derive(Debug)]
pub struct Lifecycle {
    walked: watch::Sender<Vec<LifecyclePhase>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (walked, _) = watch::channel(vec![LifecyclePhase::Unstarted]);
        Self { walked }
    }

    pub fn phase(&self) -> LifecyclePhase {
        last_phase(&self.walked.borrow())
    }

    /// Every phase entered so far, starting with `Unstarted`.
    pub fn history(&self) -> Vec<LifecyclePhase> {
        self.walked.borrow().clone()
    }

    pub fn watch(&self) -> PhaseWatch {
        PhaseWatch {
            walked: self.walked.subscribe(),
        }
    }

    /// Move to `to`. Returns false, leaving the phase unchanged, if the
    /// transition is not allowed.
    pub fn advance(&mut self, to: LifecyclePhase) -> bool {
        let from = self.phase();
        if !from.can_advance_to(to) {
            tracing::error!(from = %from, to = %to, "Rejected lifecycle transition");
            return false;
        }
        tracing::debug!(from = %from, to = %to, "Lifecycle phase reached");
        self.walked.send_modify(|walked| walked.push(to));
        true
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a [`Lifecycle`]. Stays readable after the tracker is dropped.
#[derive(Debug, Clone)]
pub struct PhaseWatch {
    walked: watch::Receiver<Vec<LifecyclePhase>>,
}

impl PhaseWatch {
    pub fn phase(&self) -> LifecyclePhase {
        last_phase(&self.walked.borrow())
    }

    pub fn history(&self) -> Vec<LifecyclePhase> {
        self.walked.borrow().clone()
    }

    /// Wait until `phase` is entered or the lifecycle ends, returning the
    /// phase current at that moment.
    pub async fn reached(&mut self, phase: LifecyclePhase) -> LifecyclePhase {
        let result = self
            .walked
            .wait_for(|walked| walked.contains(&phase) || last_phase(walked).is_terminal())
            .await
            .map(|walked| last_phase(&walked));
        match result {
            Ok(current) => current,
            // Tracker dropped before reaching `phase`.
            Err(_) => self.phase(),
        }
    }
}

fn last_phase(walked: &[LifecyclePhase]) -> LifecyclePhase {
    walked.last().copied().unwrap_or(LifecyclePhase::Unstarted)
}

#[cfg(test)]
mod tests {
    use super::LifecyclePhase::*;
    use super::*;

    #[test]
    fn walks_every_phase_in_order() {
        let mut lifecycle = Lifecycle::new();
        for phase in [
            ConfigResolved,
            LoggingReady,
            AuthDone,
            ObservabilityDone,
            MetricsReady,
            ServiceStarted,
            Stopped,
        ] {
            assert!(lifecycle.advance(phase), "cannot enter {}", phase);
        }
        assert_eq!(lifecycle.phase(), Stopped);
    }

    #[test]
    fn rejects_skips_and_backward_moves() {
        let mut lifecycle = Lifecycle::new();
        assert!(!lifecycle.advance(AuthDone));
        assert!(lifecycle.advance(ConfigResolved));
        assert!(!lifecycle.advance(Unstarted));
        assert!(!lifecycle.advance(ConfigResolved));
        assert_eq!(lifecycle.phase(), ConfigResolved);
    }

    #[test]
    fn aborted_is_terminal() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(ConfigResolved);
        assert!(lifecycle.advance(Aborted));
        assert!(!lifecycle.advance(LoggingReady));
        assert!(!lifecycle.advance(Aborted));
    }

    #[test]
    fn stopped_cannot_abort() {
        assert!(!Stopped.can_advance_to(Aborted));
        assert!(ServiceStarted.can_advance_to(Aborted));
    }

    #[test]
    fn phases_are_ordered() {
        assert!(ConfigResolved < LoggingReady);
        assert!(MetricsReady < ServiceStarted);
    }

    #[test]
    fn watch_keeps_the_path_after_drop() {
        let mut lifecycle = Lifecycle::new();
        let watch = lifecycle.watch();
        lifecycle.advance(ConfigResolved);
        lifecycle.advance(LoggingReady);
        lifecycle.advance(Aborted);
        drop(lifecycle);

        assert_eq!(watch.phase(), Aborted);
        assert_eq!(
            watch.history(),
            vec![Unstarted, ConfigResolved, LoggingReady, Aborted]
        );
    }

    #[test]
    fn rejected_transition_is_not_recorded() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(MetricsReady);
        assert_eq!(lifecycle.history(), vec![Unstarted]);
    }

    #[tokio::test]
    async fn reached_waits_for_the_phase() {
        let mut lifecycle = Lifecycle::new();
        let mut watch = lifecycle.watch();

        let waiter = tokio::spawn(async move { watch.reached(LoggingReady).await });
        lifecycle.advance(ConfigResolved);
        tokio::task::yield_now().await;
        lifecycle.advance(LoggingReady);
        assert_eq!(waiter.await.unwrap(), LoggingReady);
    }

    #[tokio::test]
    async fn reached_returns_on_abort() {
        let mut lifecycle = Lifecycle::new();
        let mut watch = lifecycle.watch();
        lifecycle.advance(ConfigResolved);
        lifecycle.advance(Aborted);
        assert_eq!(watch.reached(ServiceStarted).await, Aborted);
    }

    #[tokio::test]
    async fn reached_returns_when_tracker_is_dropped() {
        let mut lifecycle = Lifecycle::new();
        let mut watch = lifecycle.watch();
        lifecycle.advance(ConfigResolved);
        drop(lifecycle);
        assert_eq!(watch.reached(ServiceStarted).await, ConfigResolved);
    }
}
