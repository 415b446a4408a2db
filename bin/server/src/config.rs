//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from an optional configuration file
//! layered under environment variables.
//!
//! Nested keys use `__` as the separator in environment variables, e.g.
//! `OIDC__CLIENT_ID` or `AUTHZ__ROLES__ADMIN`.
//!
//! See [`OidcConfig`] for OIDC authentication configuration and
//! [`TaxonomyConfig`] for the role taxonomy.

use chrono::Duration;
use groupgate_access::{OidcConfig, SessionPolicy, TaxonomyConfig};
use groupgate_membership::DEFAULT_GRAPH_BASE_URL;
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the optional configuration file.
pub const CONFIG_FILE_ENV: &str = "GROUPGATE_CONFIG";

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_DURATION_MINUTES: i64 = 366 * 24 * 60;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection URL. Sessions are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// OIDC authentication configuration.
    pub oidc: OidcConfig,

    /// Microsoft Graph configuration.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Role taxonomy.
    #[serde(default)]
    pub authz: TaxonomyConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session duration in minutes.
    #[serde(default = "default_session_duration_minutes")]
    pub duration_minutes: i64,

    /// Interval between session cleanup runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Maximum age of resolved roles before the user must log in again.
    /// Zero disables the check.
    #[serde(default)]
    pub role_refresh_interval_seconds: u64,

    /// Maximum time between requests before the session goes stale.
    /// Zero disables the check.
    #[serde(default)]
    pub max_idle_seconds: u64,

    /// Keep raw group ids on the session and show them on `/me`.
    #[serde(default)]
    pub expose_group_ids: bool,
}

fn default_session_duration_minutes() -> i64 {
    480
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_secure_cookies() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_session_duration_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            secure_cookies: default_secure_cookies(),
            role_refresh_interval_seconds: 0,
            max_idle_seconds: 0,
            expose_group_ids: false,
        }
    }
}

impl SessionConfig {
    /// Returns the absolute session lifetime.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::try_minutes(self.duration_minutes).unwrap_or(Duration::MAX)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !(1..=MAX_SESSION_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(config::ConfigError::Message(format!(
                "session.duration_minutes must be between 1 and {MAX_SESSION_DURATION_MINUTES}, got {}",
                self.duration_minutes
            )));
        }
        Ok(())
    }

    /// Returns the staleness policy applied to existing sessions.
    #[must_use]
    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy::from_seconds(self.role_refresh_interval_seconds, self.max_idle_seconds)
    }
}

/// Microsoft Graph configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Graph API root.
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,

    /// Timeout for a single membership-check request, in seconds.
    #[serde(default = "default_graph_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Timeout for resolving membership across all chunks, in seconds.
    #[serde(default = "default_resolution_timeout_seconds")]
    pub resolution_timeout_seconds: u64,
}

fn default_graph_base_url() -> String {
    DEFAULT_GRAPH_BASE_URL.to_string()
}

fn default_graph_timeout_seconds() -> u64 {
    20
}

fn default_resolution_timeout_seconds() -> u64 {
    30
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_graph_base_url(),
            timeout_seconds: default_graph_timeout_seconds(),
            resolution_timeout_seconds: default_resolution_timeout_seconds(),
        }
    }
}

impl GraphConfig {
    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }

    /// Returns the overall resolution timeout.
    #[must_use]
    pub fn resolution_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.resolution_timeout_seconds)
    }
}

impl ServerConfig {
    /// Loads configuration from the optional file named by
    /// `GROUPGATE_CONFIG` (default `groupgate`) and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let file =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| "groupgate".to_string());

        config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Loads configuration from a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or invalid.
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    fn validated(self) -> Result<Self, config::ConfigError> {
        self.session.validate()?;
        if !self.oidc.has_specific_tenant() {
            return Err(config::ConfigError::Message(format!(
                "oidc.tenant_id must name a specific tenant, got '{}'",
                self.oidc.tenant_id()
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupgate_access::RoleTaxonomy;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    const MINIMAL: &str = r#"
        [oidc]
        tenant_id = "contoso"
        client_id = "client"
        client_secret = "secret"
        redirect_uri = "http://localhost:3000/auth/callback"
    "#;

    #[test]
    fn session_config_has_correct_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.duration_minutes, 480);
        assert_eq!(config.cleanup_interval_seconds, 300);
        assert!(config.secure_cookies);
        assert!(!config.expose_group_ids);
        assert_eq!(config.policy(), SessionPolicy::default());
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let file = write_config(MINIMAL);
        let config = ServerConfig::from_file(file.path()).expect("load config");

        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert!(config.database_url.is_none());
        assert_eq!(config.graph.base_url, DEFAULT_GRAPH_BASE_URL);
        assert_eq!(config.graph.timeout(), std::time::Duration::from_secs(20));
        assert_eq!(
            config.graph.resolution_timeout(),
            std::time::Duration::from_secs(30)
        );
        assert_eq!(config.session.duration(), Duration::minutes(480));
        assert_eq!(
            config.oidc.issuer_url(),
            "https://login.microsoftonline.com/contoso/v2.0"
        );
    }

    #[test]
    fn full_file_loads_taxonomy() {
        let file = write_config(&format!(
            r#"
            bind_addr = "0.0.0.0:8080"

            [session]
            max_idle_seconds = 900
            expose_group_ids = true

            [graph]
            resolution_timeout_seconds = 10

            [authz]
            required_roles = ["admin"]

            [authz.roles]
            admin = ["11111111-1111-4111-8111-111111111111"]
            support = "22222222-2222-4222-8222-222222222222,33333333-3333-4333-8333-333333333333"

            [authz.inherits]
            admin = ["support"]

            {MINIMAL}
            "#
        ));
        let config = ServerConfig::from_file(file.path()).expect("load config");

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.session.expose_group_ids);
        assert_eq!(
            config.session.policy().max_idle(),
            Some(Duration::seconds(900))
        );
        assert_eq!(config.session.policy().role_refresh_interval(), None);
        assert_eq!(config.graph.resolution_timeout_seconds, 10);

        let taxonomy = RoleTaxonomy::load(&config.authz).expect("valid taxonomy");
        assert_eq!(taxonomy.watched_groups().len(), 3);
        assert_eq!(taxonomy.role_groups().len(), 2);
    }

    #[test]
    fn out_of_range_session_duration_is_rejected() {
        for minutes in ["0", "-5", "9223372036854775807"] {
            let file = write_config(&format!(
                "[session]\nduration_minutes = {minutes}\n{MINIMAL}"
            ));
            let err = ServerConfig::from_file(file.path()).unwrap_err();
            assert!(
                err.to_string().contains("session.duration_minutes"),
                "unexpected error for {minutes}: {err}"
            );
        }
    }

    #[test]
    fn year_long_session_duration_is_accepted() {
        let file = write_config(&format!(
            "[session]\nduration_minutes = {MAX_SESSION_DURATION_MINUTES}\n{MINIMAL}"
        ));
        let config = ServerConfig::from_file(file.path()).expect("load config");
        assert_eq!(config.session.duration(), Duration::days(366));
    }

    #[test]
    fn multi_tenant_alias_is_rejected() {
        let file = write_config(&MINIMAL.replace("contoso", "common"));
        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("oidc.tenant_id"), "{err}");
    }

    #[test]
    fn missing_oidc_section_is_an_error() {
        let file = write_config("bind_addr = \"127.0.0.1:3000\"\n");
        assert!(ServerConfig::from_file(file.path()).is_err());
    }
}
