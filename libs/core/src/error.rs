use serde_json::Value;

/// Unified error type for the client and the webhook pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The Graph API answered with an error envelope (HTTP >= 400).
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Webhook authentication failed (signature or challenge handshake).
    #[error(transparent)]
    Verification(#[from] VerificationError),
    /// The request could not be carried out at the HTTP level.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The webhook body (or an API response) was not valid JSON.
    #[error("malformed JSON body: {0}")]
    Decode(#[from] serde_json::Error),
    /// A delivery status entry violated the payload contract.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Typed rendition of the Graph API error envelope.
///
/// Construction is total: a malformed or empty envelope falls back to
/// `error_code = 0`, `error_type = "unknown"`, `message = "Unknown error"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{error_code}] ({error_type}) {message}")]
pub struct ApiError {
    pub status_code: u16,
    pub error_code: i64,
    pub error_type: String,
    pub message: String,
    pub error_subcode: Option<i64>,
    pub fbtrace_id: Option<String>,
    pub details: Option<String>,
}

impl ApiError {
    /// Builds an `ApiError` from an HTTP status and the raw response body.
    pub fn from_response(status_code: u16, body: &Value) -> Self {
        let error = body.get("error");
        let field = |key: &str| {
            error
                .and_then(|e| e.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        Self {
            status_code,
            error_code: error
                .and_then(|e| e.get("code"))
                .and_then(Value::as_i64)
                .unwrap_or(0),
            error_type: field("type").unwrap_or_else(|| "unknown".into()),
            message: field("message").unwrap_or_else(|| "Unknown error".into()),
            error_subcode: error.and_then(|e| e.get("error_subcode")).and_then(Value::as_i64),
            fbtrace_id: field("fbtrace_id"),
            details: error
                .and_then(|e| e.get("error_data"))
                .and_then(|d| d.get("details"))
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }
}

/// Why an inbound webhook request failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("invalid signature format: missing 'sha256=' prefix")]
    MalformedSignature,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("unexpected mode: {0}")]
    UnexpectedMode(String),
    #[error("verify token mismatch")]
    TokenMismatch,
}

/// A delivery status entry was missing one of its contractually required
/// fields. Every other part of webhook parsing is deliberately lenient;
/// this is the one hard failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status entry missing required field `{field}`")]
pub struct ParseError {
    pub field: &'static str,
}

impl ParseError {
    pub(crate) fn missing(field: &'static str) -> Self {
        Self { field }
    }
}
