use std::fmt;

use crate::response::{PkiFailureInfo, PkiStatus};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TspErrorKind {
    /// Invalid or missing argument.
    #[error("invalid input")]
    InvalidInput,

    /// Digest algorithm outside the supported set.
    #[error("unsupported digest algorithm")]
    UnsupportedAlgorithm,

    /// TSA address scheme is neither http, https nor tcp.
    #[error("unsupported TSA address scheme")]
    UnsupportedScheme,

    /// IO Error.
    #[error("i/o error")]
    IoError,

    /// Connection, TLS or HTTP failure while talking to the TSA.
    #[error("transport error")]
    TransportError,

    /// Request could not be DER encoded.
    #[error("encoding error")]
    EncodingError,

    /// Malformed TimeStampResp.
    #[error("invalid time-stamp response")]
    InvalidResponse,

    /// Malformed or inconsistent TimeStampToken.
    #[error("invalid time-stamp token")]
    InvalidToken,

    /// Successful status without a token.
    #[error("missing time-stamp token (status {0})")]
    MissingToken(PkiStatus),

    /// Token nonce differs from the request nonce.
    #[error("nonce mismatch (status {0})")]
    NonceMismatch(PkiStatus),

    /// Token policy differs from the requested policy.
    #[error("policy mismatch (status {0})")]
    PolicyMismatch(PkiStatus),

    /// Token message imprint differs from the request imprint.
    #[error("message imprint mismatch (status {0})")]
    ImprintMismatch(PkiStatus),

    /// TSA answered with a non-granting status.
    #[error("request rejected by TSA (status {status})")]
    RejectedStatus {
        status: PkiStatus,
        status_string: Option<String>,
        failure_info: Option<PkiFailureInfo>,
    },
}

#[derive(Debug)]
pub struct TspError {
    pub kind: TspErrorKind,
    pub message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl TspError {
    pub fn new(kind: TspErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(kind: TspErrorKind, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// PKI status reported by the TSA, for protocol-level failures.
    pub fn pki_status(&self) -> Option<PkiStatus> {
        match &self.kind {
            TspErrorKind::MissingToken(status)
            | TspErrorKind::NonceMismatch(status)
            | TspErrorKind::PolicyMismatch(status)
            | TspErrorKind::ImprintMismatch(status)
            | TspErrorKind::RejectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_protocol_error(&self) -> bool {
        self.pki_status().is_some()
    }
}

impl fmt::Display for TspError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for TspError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|err| err.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<TspErrorKind> for TspError {
    fn from(kind: TspErrorKind) -> Self {
        Self::new(kind, "")
    }
}

pub type Result<T> = std::result::Result<T, TspError>;

pub trait TspResult<T> {
    fn map_app_err(self: Self, kind: TspErrorKind) -> Result<T>;
}

impl<T, E> TspResult<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn map_app_err(self: Self, kind: TspErrorKind) -> Result<T> {
        self.map_err(|err| TspError::with_source(kind, err))
    }
}
