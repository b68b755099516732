//! CLI error types with miette diagnostics.
//!
//! Maps `arubafi_api::Error` and `ConfigError` into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use arubafi_api::Error as ApiError;
use arubafi_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach {endpoint}")]
    #[diagnostic(
        code(arubafi::connection_failed),
        help("Check the host name, port and proxy settings of the profile.")
    )]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(arubafi::tls_error),
        help(
            "For a self-signed certificate use --insecure (-k),\n\
             or set ca_cert in your profile."
        )
    )]
    TlsError { reason: String },

    #[error("Request to {endpoint} timed out")]
    #[diagnostic(
        code(arubafi::timeout),
        help("Increase the timeout with --timeout or check the server's responsiveness.")
    )]
    Timeout { endpoint: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed (HTTP {status})")]
    #[diagnostic(
        code(arubafi::auth_failed),
        help("Verify the username and password, or the API token.\nServer said: {detail}")
    )]
    AuthFailed { status: u16, detail: String },

    #[error("{message}")]
    #[diagnostic(
        code(arubafi::session),
        help("Run the command again to log in with a fresh session.")
    )]
    Session { message: String },

    // ── Upstream ─────────────────────────────────────────────────────
    #[error("{endpoint} failed ({status}): {message}")]
    #[diagnostic(code(arubafi::api_error))]
    Api {
        endpoint: String,
        status: i64,
        message: String,
    },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(arubafi::malformed), help("Response started with: {excerpt}"))]
    Malformed { message: String, excerpt: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(arubafi::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(arubafi::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Config file: {path}"
        )
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error("Profile '{profile}' is a {configured} profile, not {requested}")]
    #[diagnostic(
        code(arubafi::backend_mismatch),
        help("Pick a {requested} profile with --profile.")
    )]
    BackendMismatch {
        profile: String,
        configured: String,
        requested: String,
    },

    #[error(transparent)]
    #[diagnostic(code(arubafi::config))]
    Config(#[from] ConfigError),

    #[error("{0}")]
    #[diagnostic(code(arubafi::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(arubafi::json), help("Check the JSON payload and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::Session { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::BackendMismatch { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── arubafi_api::Error → CliError mapping ────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport { endpoint, source } if source.is_timeout() => CliError::Timeout { endpoint },

            ApiError::Transport { endpoint, source } => CliError::ConnectionFailed {
                endpoint,
                source: Box::new(source),
            },

            ApiError::Tls(reason) => CliError::TlsError { reason },

            ApiError::Authentication { status, body } => CliError::AuthFailed { status, detail: body },

            err @ (ApiError::SessionExpired { .. } | ApiError::NoSession) => CliError::Session {
                message: err.to_string(),
            },

            ApiError::Upstream {
                endpoint,
                status,
                message,
            } => CliError::Api {
                endpoint,
                status,
                message,
            },

            ApiError::MalformedResponse { message, excerpt } => CliError::Malformed { message, excerpt },

            ApiError::Configuration { message } => CliError::Validation {
                field: "connection".into(),
                reason: message,
            },

            ApiError::InvalidUrl(e) => CliError::Validation {
                field: "host".into(),
                reason: e.to_string(),
            },

            ApiError::InvalidFilter { reason } => CliError::Validation {
                field: "filter".into(),
                reason,
            },

            other => CliError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_exit_codes() {
        let auth: CliError = ApiError::Authentication {
            status: 401,
            body: "denied".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let expired: CliError = ApiError::NoSession.into();
        assert_eq!(expired.exit_code(), exit_code::AUTH);

        let filter: CliError = ApiError::InvalidFilter {
            reason: "unbalanced".into(),
        }
        .into();
        assert_eq!(filter.exit_code(), exit_code::USAGE);

        let upstream: CliError = ApiError::Upstream {
            endpoint: "configuration/object/ap_group".into(),
            status: 1,
            message: "bad".into(),
        }
        .into();
        assert_eq!(upstream.exit_code(), exit_code::GENERAL);
    }
}
