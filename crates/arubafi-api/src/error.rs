use thiserror::Error;

/// Top-level error type for the `arubafi-api` crate.
///
/// Covers every failure mode across the three backends: credential
/// resolution, session handshakes, transport, and response normalization.
/// Upstream text is carried verbatim after secret redaction.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// A required connection attribute is missing or invalid, and could
    /// not be obtained from the prompter.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup failed (bad CA bundle, unreadable file).
    #[error("TLS error: {0}")]
    Tls(String),

    /// A filter expression is structurally unusable.
    #[error("Invalid filter expression: {reason}")]
    InvalidFilter { reason: String },

    // ── Authentication ──────────────────────────────────────────────
    /// The login handshake was rejected.
    #[error("Authentication failed (HTTP {status}): {body}")]
    Authentication { status: u16, body: String },

    /// The upstream rejected the cached session (401/403) or the handle
    /// outlived its known expiry. The handle has been discarded; the
    /// caller must establish a new session explicitly.
    #[error("Session expired on {endpoint} -- establish a new session")]
    SessionExpired { status: Option<u16>, endpoint: String },

    /// A data call was issued before any session was established.
    #[error("No session established -- call comms() or establish() first")]
    NoSession,

    // ── Transport ───────────────────────────────────────────────────
    /// Connection, TLS handshake or timeout failure. The source error
    /// has its URL stripped so query-borne tokens cannot leak.
    #[error("HTTP transport error on {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    // ── Responses ───────────────────────────────────────────────────
    /// The body could not be parsed in its detected format.
    #[error("Malformed response: {message} (excerpt: {excerpt:?})")]
    MalformedResponse { message: String, excerpt: String },

    /// The upstream answered, but reported a failure: a non-success HTTP
    /// status or a nonzero envelope status.
    #[error("Upstream error on {endpoint} (status {status}): {message}")]
    Upstream {
        endpoint: String,
        status: i64,
        message: String,
    },

    // ── Instances ───────────────────────────────────────────────────
    /// A second live instance of a single-instance backend was requested.
    #[error("An {backend} client is already live in this process")]
    DuplicateInstance { backend: &'static str },
}

impl Error {
    /// Returns `true` if the cached session is no longer usable and the
    /// caller should run `establish()` again.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. } | Self::NoSession)
    }

    /// Returns `true` for errors that are likely transient (network
    /// blips, timeouts, 5xx answers).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            Self::Upstream { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Attach the endpoint to errors raised below the client layer,
    /// where the endpoint is not yet known.
    pub(crate) fn with_endpoint(self, endpoint: &str) -> Self {
        match self {
            Self::Upstream {
                endpoint: e,
                status,
                message,
            } if e.is_empty() => Self::Upstream {
                endpoint: endpoint.to_owned(),
                status,
                message,
            },
            Self::MalformedResponse { message, excerpt } => Self::MalformedResponse {
                message: format!("{endpoint}: {message}"),
                excerpt,
            },
            other => other,
        }
    }
}
