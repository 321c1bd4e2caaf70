use std::error::Error;
use std::fmt;

/// Failure taxonomy for adapter operations.
///
/// Every variant except per-event stream decode problems (which are logged
/// and skipped inside the SSE decoder) aborts the current operation. Nothing
/// is retried at this layer; retry policy belongs to the caller.
#[derive(Debug)]
pub enum GatewayError {
    /// The requested platform id is not in the registry. Raised before any
    /// network I/O happens.
    UnknownPlatform { id: String, available: Vec<String> },
    /// The upstream could not be reached or the connection failed mid-call.
    Transport(reqwest::Error),
    /// The upstream answered with a non-success HTTP status. `body` is the
    /// raw response text, captured best-effort.
    Upstream { status: u16, body: String },
    /// The upstream answered 2xx but the body was not valid JSON where JSON
    /// was expected.
    MalformedResponse(serde_json::Error),
    /// The upstream answered with valid JSON that is missing a structural
    /// field a specific operation requires (see `run_workflow`).
    UnexpectedResponseShape(String),
}

impl GatewayError {
    pub fn shape(detail: impl Into<String>) -> Self {
        GatewayError::UnexpectedResponseShape(detail.into())
    }

    /// HTTP status carried by an `Upstream` error, if that is what this is.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GatewayError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::UnknownPlatform { id, available } => {
                write!(
                    f,
                    "unknown platform '{id}'; available platforms: {}",
                    available.join(", ")
                )
            }
            GatewayError::Transport(err) => write!(f, "upstream transport failure: {err}"),
            GatewayError::Upstream { status, body } => {
                match upstream_error_summary(body) {
                    Some(summary) => write!(f, "upstream returned status {status}: {summary}"),
                    None if body.trim().is_empty() => {
                        write!(f, "upstream returned status {status} with an empty body")
                    }
                    None => write!(f, "upstream returned status {status}: {}", body.trim()),
                }
            }
            GatewayError::MalformedResponse(err) => {
                write!(f, "upstream response was not valid JSON: {err}")
            }
            GatewayError::UnexpectedResponseShape(detail) => {
                write!(f, "upstream response shape unexpected: {detail}")
            }
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GatewayError::Transport(err) => Some(err),
            GatewayError::MalformedResponse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err)
    }
}

/// Pull a one-line human summary out of common upstream error bodies:
/// `{"message": "..."}`, `{"error": "..."}` or `{"error": {"message": "..."}}`.
pub(crate) fn upstream_error_summary(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body.trim()).ok()?;

    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        })?;

    let collapsed = summary.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
