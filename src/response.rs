use std::fmt::Display;

use der::{asn1::BitString, Enumerated};

use crate::{
    errors::{Result, TspError, TspErrorKind},
    request::Request,
    token::TimestampToken,
    utils::{strip_leading_zeros, to_hex_str},
};

/// ```text
/// PKIStatus ::= INTEGER {
///   granted                (0),
///   grantedWithMods        (1),
///   rejection              (2),
///   waiting                (3),
///   revocationWarning      (4),
///   revocationNotification (5) }
/// ```
#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, Enumerated)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
#[allow(missing_docs)]
pub enum PkiStatus {
    Granted = 0,
    GrantedWithMods = 1,
    Rejection = 2,
    Waiting = 3,
    RevocationWarning = 4,
    RevocationNotification = 5,
}

impl PkiStatus {
    /// Only these two statuses come with a time-stamp token.
    pub fn is_granted(self: &Self) -> bool {
        matches!(self, Self::Granted | Self::GrantedWithMods)
    }
}

impl Display for PkiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Granted => "granted",
            Self::GrantedWithMods => "grantedWithMods",
            Self::Rejection => "rejection",
            Self::Waiting => "waiting",
            Self::RevocationWarning => "revocationWarning",
            Self::RevocationNotification => "revocationNotification",
        };
        write!(f, "{}", name)
    }
}

/// Failure reason of a rejected request. Discriminants are the RFC 3161 bit
/// positions.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(i32)]
pub enum PkiFailureInfo {
    BadAlg = 0,
    BadRequest = 2,
    BadDataFormat = 5,
    TimeNotAvailable = 14,
    UnacceptedPolicy = 15,
    UnacceptedExtension = 16,
    AddInfoNotAvailable = 17,
    SystemFailure = 25,
    Unknown = -1,
}

impl PkiFailureInfo {
    const KNOWN: [PkiFailureInfo; 8] = [
        Self::BadAlg,
        Self::BadRequest,
        Self::BadDataFormat,
        Self::TimeNotAvailable,
        Self::UnacceptedPolicy,
        Self::UnacceptedExtension,
        Self::AddInfoNotAvailable,
        Self::SystemFailure,
    ];

    pub fn from_bit(bit: usize) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|info| *info as i32 as usize == bit)
            .unwrap_or(Self::Unknown)
    }

    /// Maps the `failInfo` BIT STRING. A single set bit naming a known reason
    /// gives that reason; no bits, several bits or an unassigned bit give
    /// `Unknown`.
    pub fn from_bit_string(bits: &BitString) -> Self {
        let set: Vec<usize> = bits
            .bits()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .map(|(pos, _)| pos)
            .collect();

        match set[..] {
            [bit] => Self::from_bit(bit),
            _ => Self::Unknown,
        }
    }
}

impl Display for PkiFailureInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BadAlg => "badAlg",
            Self::BadRequest => "badRequest",
            Self::BadDataFormat => "badDataFormat",
            Self::TimeNotAvailable => "timeNotAvailable",
            Self::UnacceptedPolicy => "unacceptedPolicy",
            Self::UnacceptedExtension => "unacceptedExtension",
            Self::AddInfoNotAvailable => "addInfoNotAvailable",
            Self::SystemFailure => "systemFailure",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A decoded `TimeStampResp`. Lives only between decoding and validation.
#[derive(Clone, Debug)]
pub struct Response {
    pub pki_status: PkiStatus,
    pub pki_status_string: Option<String>,
    pub pki_failure_info: Option<PkiFailureInfo>,
    pub token: Option<TimestampToken>,
}

/// Checks `response` against the request it answers and hands back the token.
///
/// Checks run in a fixed order: status, token presence, nonce, policy,
/// message imprint. The first failing check decides the error.
pub fn validate(request: &Request, response: Response) -> Result<TimestampToken> {
    let status = response.pki_status;

    if !status.is_granted() {
        tracing::warn!(
            status = %status,
            status_string = ?response.pki_status_string,
            failure_info = ?response.pki_failure_info,
            "time-stamp request rejected"
        );
        let message = response.pki_status_string.clone().unwrap_or_default();
        return Err(TspError::new(
            TspErrorKind::RejectedStatus {
                status,
                status_string: response.pki_status_string,
                failure_info: response.pki_failure_info,
            },
            message,
        ));
    }

    let token = response.token.ok_or_else(|| {
        tracing::warn!(status = %status, "granted response without a token");
        TspError::new(TspErrorKind::MissingToken(status), "")
    })?;

    let expected_nonce = request.nonce().map(strip_leading_zeros);
    let actual_nonce = token.nonce();
    // request nonces are positive
    if expected_nonce != actual_nonce || token.nonce_is_negative() {
        tracing::warn!(
            expected = ?expected_nonce.map(to_hex_str),
            actual = ?actual_nonce.map(to_hex_str),
            "nonce mismatch"
        );
        return Err(TspError::new(
            TspErrorKind::NonceMismatch(status),
            format!(
                "expected {}, got {}",
                expected_nonce.map(to_hex_str).unwrap_or_else(|| "none".to_owned()),
                actual_nonce.map(to_hex_str).unwrap_or_else(|| "none".to_owned()),
            ),
        ));
    }

    if let Some(policy) = request.req_policy().filter(|policy| !policy.is_empty()) {
        if policy != token.policy_oid() {
            tracing::warn!(expected = policy, actual = token.policy_oid(), "policy mismatch");
            return Err(TspError::new(
                TspErrorKind::PolicyMismatch(status),
                format!("expected {}, got {}", policy, token.policy_oid()),
            ));
        }
    }

    if token.message_imprint() != request.message_imprint() {
        tracing::warn!(
            expected_algorithm = %request.message_imprint().algorithm_oid(),
            actual_algorithm = %token.message_imprint().algorithm_oid(),
            expected = %to_hex_str(request.message_imprint().hashed_message()),
            actual = %to_hex_str(token.message_imprint().hashed_message()),
            "message imprint mismatch"
        );
        return Err(TspError::new(
            TspErrorKind::ImprintMismatch(status),
            format!(
                "expected {} {}, got {} {}",
                request.message_imprint().algorithm_oid(),
                to_hex_str(request.message_imprint().hashed_message()),
                token.message_imprint().algorithm_oid(),
                to_hex_str(token.message_imprint().hashed_message()),
            ),
        ));
    }

    tracing::info!(
        status = %status,
        serial_number = %to_hex_str(token.serial_number()),
        gen_time = %token.gen_time(),
        "time-stamp token accepted"
    );

    Ok(token)
}
