//! Kerberos identity bootstrap.
//!
//! # Responsibilities
//! - Resolve the configured principal (`_HOST` becomes the daemon hostname)
//! - Obtain an initial ticket from the keytab with `kinit`
//! - Keep the ticket fresh by re-running `kinit` periodically
//!
//! # Design Decisions
//! - The initial kinit is fatal on failure; renewal failures are only logged,
//!   since the existing ticket stays valid until it expires
//! - The renewal task belongs to the returned [`AuthSession`] and stops when
//!   the session is dropped

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::config::validation::MAX_REINIT_INTERVAL_MINS;
use crate::config::ProcessConfig;

/// Placeholder in principals that is replaced by the hostname.
const HOST_PLACEHOLDER: &str = "_HOST";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid principal '{principal}': {reason}")]
    InvalidPrincipal {
        principal: String,
        reason: &'static str,
    },
    #[error("cannot use keytab {path}: {source}")]
    Keytab {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("kinit for {principal} exited with {status}: {stderr}")]
    Kinit {
        principal: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// A parsed Kerberos principal: `primary[/instance]@REALM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub primary: String,
    pub instance: Option<String>,
    pub realm: String,
}

impl Principal {
    /// Parse `raw`, substituting `_HOST` in the instance with `hostname`.
    pub fn parse(raw: &str, hostname: &str) -> Result<Self, AuthError> {
        let invalid = |reason| AuthError::InvalidPrincipal {
            principal: raw.to_string(),
            reason,
        };

        let (name, realm) = raw.split_once('@').ok_or_else(|| invalid("missing @REALM"))?;
        if realm.is_empty() || realm.contains('@') {
            return Err(invalid("malformed realm"));
        }

        let (primary, instance) = match name.split_once('/') {
            Some((primary, instance)) => (primary, Some(instance)),
            None => (name, None),
        };
        if primary.is_empty() {
            return Err(invalid("empty primary"));
        }

        let instance = match instance {
            Some("") => return Err(invalid("empty instance")),
            Some(HOST_PLACEHOLDER) if hostname.is_empty() => {
                return Err(invalid("_HOST used but hostname is empty"));
            }
            Some(HOST_PLACEHOLDER) => Some(hostname.to_lowercase()),
            Some(other) if other.contains('/') => return Err(invalid("too many components")),
            Some(other) => Some(other.to_string()),
            None => None,
        };

        Ok(Self {
            primary: primary.to_string(),
            instance,
            realm: realm.to_string(),
        })
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{}/{}@{}", self.primary, instance, self.realm),
            None => write!(f, "{}@{}", self.primary, self.realm),
        }
    }
}

/// Established credentials. Dropping the session stops ticket renewal.
#[derive(Debug)]
pub struct AuthSession {
    service_name: &'static str,
    principal: String,
    renewal: Option<JoinHandle<()>>,
}

impl AuthSession {
    /// A session with no background renewal.
    pub fn without_renewal(service_name: &'static str, principal: impl Into<String>) -> Self {
        Self {
            service_name,
            principal: principal.into(),
            renewal: None,
        }
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn is_renewing(&self) -> bool {
        self.renewal.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        if let Some(task) = self.renewal.take() {
            task.abort();
        }
    }
}

/// Identity bootstrap performed before any listener opens.
pub trait Authenticator {
    fn authenticate(
        &self,
        service_name: &'static str,
        config: &ProcessConfig,
    ) -> impl Future<Output = Result<AuthSession, AuthError>>;
}

/// Obtains tickets by running `kinit` against the configured keytab.
#[derive(Debug, Clone)]
pub struct KinitAuthenticator {
    program: PathBuf,
}

impl KinitAuthenticator {
    pub fn new() -> Self {
        Self::with_program("kinit")
    }

    /// Use a different kinit binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for KinitAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for KinitAuthenticator {
    async fn authenticate(
        &self,
        service_name: &'static str,
        config: &ProcessConfig,
    ) -> Result<AuthSession, AuthError> {
        let principal = Principal::parse(&config.principal, &config.hostname)?.to_string();
        let keytab = PathBuf::from(&config.keytab_file);
        let ccname = PathBuf::from(&config.krb5_ccname);

        let metadata = tokio::fs::metadata(&keytab)
            .await
            .map_err(|source| AuthError::Keytab {
                path: keytab.clone(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(AuthError::Keytab {
                path: keytab,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        run_kinit(&self.program, &keytab, &ccname, &principal).await?;

        tracing::info!(
            service = service_name,
            principal = %principal,
            ccache = %ccname.display(),
            "Kerberos ticket acquired"
        );

        let interval = renewal_interval(config.kerberos_reinit_interval_mins);
        let renewal = tokio::spawn(renew_periodically(
            self.program.clone(),
            keytab,
            ccname,
            principal.clone(),
            interval,
        ));

        Ok(AuthSession {
            service_name,
            principal,
            renewal: Some(renewal),
        })
    }
}

/// Point the process at the configured credential cache.
///
/// Must run before the async runtime starts worker threads.
pub fn export_credential_cache(config: &ProcessConfig) {
    if config.kerberos_enabled() {
        std::env::set_var("KRB5CCNAME", &config.krb5_ccname);
    }
}

fn renewal_interval(mins: u64) -> Duration {
    Duration::from_secs(mins.clamp(1, MAX_REINIT_INTERVAL_MINS) * 60)
}

async fn run_kinit(
    program: &Path,
    keytab: &Path,
    ccname: &Path,
    principal: &str,
) -> Result<(), AuthError> {
    let output = Command::new(program)
        .arg("-k")
        .arg("-t")
        .arg(keytab)
        .arg("-c")
        .arg(ccname)
        .arg(principal)
        .env("KRB5CCNAME", ccname)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| AuthError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(AuthError::Kinit {
            principal: principal.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

async fn renew_periodically(
    program: PathBuf,
    keytab: PathBuf,
    ccname: PathBuf,
    principal: String,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; the ticket was just acquired.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match run_kinit(&program, &keytab, &ccname, &principal).await {
            Ok(()) => tracing::debug!(principal = %principal, "Kerberos ticket renewed"),
            Err(e) => tracing::warn!(principal = %principal, error = %e, "Kerberos ticket renewal failed"),
        }
    }
}
