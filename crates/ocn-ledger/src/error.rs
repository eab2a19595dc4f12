use std::fmt;

// ---------------------------------------------------------------------------
// Read-side errors
// ---------------------------------------------------------------------------

/// Errors a [`LedgerReader`](crate::LedgerReader) implementation may return.
///
/// The engine never retries these; the next scheduled pass does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// Network or transport failure (includes timeouts).
    Transport(String),
    /// The ledger gateway returned an application-level error.
    Api { status: Option<u16>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// The queried entity does not exist and the gateway reports that as an error.
    NotFound(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Transport(msg) => write!(f, "transport error: {msg}"),
            LedgerError::Api {
                status: Some(s),
                message,
            } => write!(f, "ledger api error status={s}: {message}"),
            LedgerError::Api {
                status: None,
                message,
            } => write!(f, "ledger api error: {message}"),
            LedgerError::Decode(msg) => write!(f, "decode error: {msg}"),
            LedgerError::NotFound(what) => write!(f, "not found: {what}"),
        }
    }
}

impl std::error::Error for LedgerError {}

// ---------------------------------------------------------------------------
// Write-side errors
// ---------------------------------------------------------------------------

/// Whether a failed submission is worth another attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitErrorKind {
    /// Timeout, connection reset, rate limit, gateway 5xx. The request may or
    /// may not have landed.
    Transient,
    /// The ledger (or the local policy) refused the request. Retrying the same
    /// message will not help.
    Rejected,
}

/// A failed mutating request.
///
/// A submission error does NOT mean the ledger is unchanged: a broadcast can
/// time out after it was accepted. `tx_hash` is carried whenever the client
/// learned one so operators can look the transaction up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub message: String,
    pub tx_hash: Option<String>,
}

impl SubmitError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SubmitErrorKind::Transient,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: SubmitErrorKind::Rejected,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind == SubmitErrorKind::Transient
    }

    /// Tx hash for log fields; empty when unknown.
    pub fn tx_hash_or_empty(&self) -> &str {
        self.tx_hash.as_deref().unwrap_or("")
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SubmitErrorKind::Transient => "transient",
            SubmitErrorKind::Rejected => "rejected",
        };
        match &self.tx_hash {
            Some(h) => write!(f, "submit {kind} (tx_hash={h}): {}", self.message),
            None => write!(f, "submit {kind}: {}", self.message),
        }
    }
}

impl std::error::Error for SubmitError {}
