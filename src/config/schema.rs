//! Configuration schema definitions.
//!
//! [`ProcessConfig`] is the fully resolved, immutable configuration of the
//! daemon. [`ConfigOverrides`] is the partial form shared by the config file
//! and the command line: every field is optional so that "explicitly given"
//! can be told apart from "left at its default".

use clap::Args;
use serde::{Deserialize, Serialize};

/// Default port of the state store API.
pub const DEFAULT_STATE_STORE_PORT: u16 = 24000;

/// Default port of the diagnostic webserver for this daemon.
pub const DEFAULT_WEBSERVER_PORT: u16 = 25010;

/// Root configuration for the state store daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Port the state store API listens on.
    pub state_store_port: u16,

    /// Port of the diagnostic webserver.
    pub webserver_port: u16,

    /// Interface the diagnostic webserver binds to.
    pub webserver_interface: String,

    /// Whether to start the diagnostic webserver at all.
    pub enable_webserver: bool,

    /// Kerberos principal. Empty disables authentication.
    pub principal: String,

    /// Keytab used to obtain tickets for `principal`.
    pub keytab_file: String,

    /// Credential cache that kinit writes to.
    pub krb5_ccname: String,

    /// Minutes between ticket re-initializations.
    pub kerberos_reinit_interval_mins: u64,

    /// Hostname this daemon reports. Defaults to the system hostname.
    pub hostname: String,

    /// Default tracing filter (overridden by `RUST_LOG`).
    pub log_filter: String,

    /// Number of log lines kept in memory for the `/logs` page.
    pub log_buffer_lines: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            state_store_port: DEFAULT_STATE_STORE_PORT,
            webserver_port: DEFAULT_WEBSERVER_PORT,
            webserver_interface: "0.0.0.0".to_string(),
            enable_webserver: true,
            principal: String::new(),
            keytab_file: String::new(),
            krb5_ccname: "/tmp/krb5cc_statestore".to_string(),
            kerberos_reinit_interval_mins: 60,
            hostname: String::new(),
            log_filter: "info".to_string(),
            log_buffer_lines: 1024,
        }
    }
}

impl ProcessConfig {
    /// Whether a principal was configured.
    pub fn kerberos_enabled(&self) -> bool {
        !self.principal.is_empty()
    }

    /// Address the diagnostic webserver binds to.
    pub fn webserver_address(&self) -> String {
        format!("{}:{}", self.webserver_interface, self.webserver_port)
    }
}

/// Partial configuration from the config file or the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Args)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Port the state store API listens on.
    #[arg(long = "state_store_port", value_name = "PORT")]
    pub state_store_port: Option<u16>,

    /// Port of the diagnostic webserver.
    #[arg(long = "webserver_port", value_name = "PORT")]
    pub webserver_port: Option<u16>,

    /// Interface the diagnostic webserver binds to.
    #[arg(long = "webserver_interface", value_name = "ADDR")]
    pub webserver_interface: Option<String>,

    /// Start the diagnostic webserver (`--enable_webserver=false` to disable).
    #[arg(
        long = "enable_webserver",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub enable_webserver: Option<bool>,

    /// Kerberos principal; empty disables authentication.
    #[arg(long = "principal")]
    pub principal: Option<String>,

    /// Keytab file for the principal.
    #[arg(long = "keytab_file", value_name = "PATH")]
    pub keytab_file: Option<String>,

    /// Kerberos credential cache.
    #[arg(long = "krb5_ccname", value_name = "PATH")]
    pub krb5_ccname: Option<String>,

    /// Minutes between Kerberos ticket re-initializations.
    #[arg(long = "kerberos_reinit_interval_mins", value_name = "MINUTES")]
    pub kerberos_reinit_interval_mins: Option<u64>,

    /// Hostname to report instead of the system hostname.
    #[arg(long = "hostname")]
    pub hostname: Option<String>,

    /// Default log filter, e.g. `info` or `statestored=debug`.
    #[arg(long = "log_filter", value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Log lines kept in memory for the diagnostic `/logs` page.
    #[arg(long = "log_buffer_lines", value_name = "LINES")]
    pub log_buffer_lines: Option<usize>,
}

impl ConfigOverrides {
    /// Apply every explicitly given value on top of `config`.
    pub fn apply(self, config: &mut ProcessConfig) {
        if let Some(v) = self.state_store_port {
            config.state_store_port = v;
        }
        if let Some(v) = self.webserver_port {
            config.webserver_port = v;
        }
        if let Some(v) = self.webserver_interface {
            config.webserver_interface = v;
        }
        if let Some(v) = self.enable_webserver {
            config.enable_webserver = v;
        }
        if let Some(v) = self.principal {
            config.principal = v;
        }
        if let Some(v) = self.keytab_file {
            config.keytab_file = v;
        }
        if let Some(v) = self.krb5_ccname {
            config.krb5_ccname = v;
        }
        if let Some(v) = self.kerberos_reinit_interval_mins {
            config.kerberos_reinit_interval_mins = v;
        }
        if let Some(v) = self.hostname {
            config.hostname = v;
        }
        if let Some(v) = self.log_filter {
            config.log_filter = v;
        }
        if let Some(v) = self.log_buffer_lines {
            config.log_buffer_lines = v;
        }
    }
}
