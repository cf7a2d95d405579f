use std::time::Duration;

use chrono::{DateTime, Utc};
use cms::content_info::ContentInfo;
use der::{Decode, Encode};

use crate::{
    asn1_types,
    codec::token_from_content_info,
    errors::{Result, TspErrorKind, TspResult},
    request::MessageImprint,
    utils::strip_leading_zeros,
};

/// Identifies the TSA that signed a token.
///
/// The identity is taken from the CMS signer identifier and, when the TSA
/// embedded it, the matching certificate. Nothing here has been checked
/// against a trust anchor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TsaIdentity {
    /// Issuer of the signing certificate; empty when the signer is named by
    /// key identifier only and no certificate was embedded.
    pub issuer_name: String,
    pub serial_number: Vec<u8>,
    pub subject_key_identifier: Option<Vec<u8>>,
    pub certificate: Option<x509_cert::Certificate>,
}

/// Declared deviation of `genTime` from UTC.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Accuracy {
    pub seconds: u64,
    pub millis: u16,
    pub micros: u16,
}

impl Accuracy {
    pub fn to_duration(self: &Self) -> Duration {
        Duration::from_secs(self.seconds)
            + Duration::from_millis(self.millis as u64)
            + Duration::from_micros(self.micros as u64)
    }
}

impl From<asn1_types::Accuracy> for Accuracy {
    fn from(value: asn1_types::Accuracy) -> Self {
        Self {
            seconds: value.seconds.unwrap_or_default(),
            millis: value.millis.unwrap_or_default(),
            micros: value.micros.unwrap_or_default(),
        }
    }
}

/// A validated, granted time-stamp.
///
/// Only produced after the response it came in passed every check against
/// its request. The original `ContentInfo` is kept so the token can be
/// stored byte for byte as the TSA sent it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimestampToken {
    pub(crate) serial_number: Vec<u8>,
    pub(crate) gen_time: DateTime<Utc>,
    pub(crate) message_imprint: MessageImprint,
    pub(crate) policy_oid: String,
    /// Content octets of the nonce INTEGER (two's complement).
    pub(crate) nonce: Option<Vec<u8>>,
    pub(crate) tsa_identity: TsaIdentity,
    pub(crate) tsa_name: Option<String>,
    pub(crate) accuracy: Option<Accuracy>,
    pub(crate) ordering: bool,
    pub(crate) inner: ContentInfo,
}

impl TimestampToken {
    pub fn serial_number(self: &Self) -> &[u8] {
        &self.serial_number
    }

    pub fn gen_time(self: &Self) -> DateTime<Utc> {
        self.gen_time
    }

    pub fn message_imprint(self: &Self) -> &MessageImprint {
        &self.message_imprint
    }

    pub fn policy_oid(self: &Self) -> &str {
        &self.policy_oid
    }

    /// The nonce as a big-endian unsigned integer without leading zeros.
    ///
    /// A negative nonce is returned in two's complement; see
    /// [`TimestampToken::nonce_is_negative`].
    pub fn nonce(self: &Self) -> Option<&[u8]> {
        self.nonce.as_deref().map(strip_leading_zeros)
    }

    pub fn nonce_is_negative(self: &Self) -> bool {
        self.nonce
            .as_deref()
            .and_then(|nonce| nonce.first())
            .is_some_and(|first| first & 0x80 != 0)
    }

    pub fn tsa_identity(self: &Self) -> &TsaIdentity {
        &self.tsa_identity
    }

    /// Directory name the TSA put in `TSTInfo.tsa`, if any.
    pub fn tsa_name(self: &Self) -> Option<&str> {
        self.tsa_name.as_deref()
    }

    pub fn accuracy(self: &Self) -> Option<Accuracy> {
        self.accuracy
    }

    pub fn ordering(self: &Self) -> bool {
        self.ordering
    }

    /// DER encoding of the token (`ContentInfo` wrapping CMS SignedData).
    pub fn to_bytes(self: &Self) -> Result<Vec<u8>> {
        self.inner.to_der().map_app_err(TspErrorKind::EncodingError)
    }

    /// Reloads a token saved with [`TimestampToken::to_bytes`].
    ///
    /// The same structural checks as for a fresh response apply, but there is
    /// no request to validate against.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let content_info = ContentInfo::from_der(bytes).map_app_err(TspErrorKind::InvalidToken)?;

        token_from_content_info(content_info)
    }
}

impl der::Encode for TimestampToken {
    fn encoded_len(&self) -> der::Result<der::Length> {
        self.inner.encoded_len()
    }

    fn encode(&self, encoder: &mut impl der::Writer) -> der::Result<()> {
        self.inner.encode(encoder)
    }
}

impl<'a> der::Decode<'a> for TimestampToken {
    fn decode<R: der::Reader<'a>>(decoder: &mut R) -> der::Result<Self> {
        let content_info = ContentInfo::decode(decoder)?;

        token_from_content_info(content_info)
            .map_err(|_| der::Error::new(der::ErrorKind::Failed, der::Length::ZERO))
    }
}

impl der::pem::PemLabel for TimestampToken {
    const PEM_LABEL: &'static str = "PKCS7";
}
