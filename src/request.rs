use der::{
    asn1::{OctetString, Uint},
    oid::ObjectIdentifier,
    Any, Decode, Encode, Tag,
};
use x509_cert::spki::AlgorithmIdentifierOwned;

use crate::{
    asn1_types::{self, TimeStampReq, TspVersion},
    errors::{Result, TspError, TspErrorKind, TspResult},
    hash::DigestAlgorithm,
    utils::{strip_leading_zeros, to_hex_str},
};

/// The (hash algorithm, digest) pair being time-stamped.
///
/// Two imprints are equal when their algorithm identifiers are the same and
/// the digests match byte for byte. Imprints read from a token may name an
/// algorithm outside [`DigestAlgorithm`]; they never equal a request imprint.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MessageImprint {
    algorithm: ObjectIdentifier,
    hashed_message: Vec<u8>,
}

impl MessageImprint {
    pub fn new(algorithm: DigestAlgorithm, hashed_message: impl Into<Vec<u8>>) -> Self {
        Self::from_oid(algorithm.oid(), hashed_message)
    }

    pub(crate) fn from_oid(algorithm: ObjectIdentifier, hashed_message: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            hashed_message: hashed_message.into(),
        }
    }

    /// `None` when the algorithm is not one requests can be built with.
    pub fn algorithm(self: &Self) -> Option<DigestAlgorithm> {
        DigestAlgorithm::from_oid(&self.algorithm).ok()
    }

    pub fn algorithm_oid(self: &Self) -> ObjectIdentifier {
        self.algorithm
    }

    /// Dotted object identifier of the hash algorithm.
    pub fn hash_algorithm_oid(self: &Self) -> String {
        self.algorithm.to_string()
    }

    pub fn hashed_message(self: &Self) -> &[u8] {
        &self.hashed_message
    }

    pub(crate) fn to_asn1(self: &Self) -> Result<asn1_types::MessageImprint> {
        // hash AlgorithmIdentifiers carry an explicit NULL parameter
        let parameters =
            Any::new(Tag::Null, Vec::<u8>::new()).map_app_err(TspErrorKind::EncodingError)?;

        Ok(asn1_types::MessageImprint {
            hash_algorithm: AlgorithmIdentifierOwned {
                oid: self.algorithm,
                parameters: Some(parameters),
            },
            hashed_message: OctetString::new(self.hashed_message.clone())
                .map_app_err(TspErrorKind::EncodingError)?,
        })
    }
}

impl From<asn1_types::MessageImprint> for MessageImprint {
    fn from(value: asn1_types::MessageImprint) -> Self {
        Self::from_oid(value.hash_algorithm.oid, value.hashed_message.as_bytes())
    }
}

/// A time-stamp request, built once per exchange and never mutated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    message_imprint: MessageImprint,
    nonce: Option<Vec<u8>>,
    req_policy: Option<String>,
    cert_req: bool,
}

impl Request {
    /// Request without nonce or policy, not asking for the TSA certificate.
    pub fn new(digest: &[u8], algorithm: DigestAlgorithm) -> Result<Self> {
        Self::build(digest, algorithm, None, None, false)
    }

    /// Builds a request.
    ///
    /// The nonce is a big-endian unsigned integer; leading zero bytes are not
    /// significant and are dropped. An empty policy is the same as no policy.
    pub fn build(
        digest: &[u8],
        algorithm: DigestAlgorithm,
        nonce: Option<&[u8]>,
        req_policy: Option<&str>,
        cert_req: bool,
    ) -> Result<Self> {
        if digest.is_empty() {
            return Err(TspError::new(TspErrorKind::InvalidInput, "digest is empty"));
        }
        if digest.len() != algorithm.output_size() {
            tracing::warn!(
                algorithm = %algorithm,
                len = digest.len(),
                "digest length does not match the algorithm output size"
            );
        }

        let nonce = match nonce {
            Some([]) => {
                return Err(TspError::new(TspErrorKind::InvalidInput, "nonce is empty"));
            }
            Some(nonce) => Some(strip_leading_zeros(nonce).to_vec()),
            None => None,
        };

        let req_policy = match req_policy.map(str::trim) {
            Some("") | None => None,
            Some(policy) => Some(
                ObjectIdentifier::new(policy)
                    .map_err(|err| {
                        TspError::new(
                            TspErrorKind::InvalidInput,
                            format!("policy {:?}: {}", policy, err),
                        )
                    })?
                    .to_string(),
            ),
        };

        Ok(Self {
            message_imprint: MessageImprint::new(algorithm, digest),
            nonce,
            req_policy,
            cert_req,
        })
    }

    pub fn message_imprint(self: &Self) -> &MessageImprint {
        &self.message_imprint
    }

    pub fn nonce(self: &Self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }

    pub fn req_policy(self: &Self) -> Option<&str> {
        self.req_policy.as_deref()
    }

    pub fn cert_req(self: &Self) -> bool {
        self.cert_req
    }

    /// DER encoding of the `TimeStampReq`.
    pub fn to_der(self: &Self) -> Result<Vec<u8>> {
        let req_policy = match &self.req_policy {
            Some(policy) => {
                Some(ObjectIdentifier::new(policy).map_app_err(TspErrorKind::EncodingError)?)
            }
            None => None,
        };
        let nonce = match &self.nonce {
            Some(nonce) => Some(Uint::new(nonce).map_app_err(TspErrorKind::EncodingError)?),
            None => None,
        };

        let req = TimeStampReq {
            version: TspVersion::V1,
            message_imprint: self.message_imprint.to_asn1()?,
            req_policy,
            nonce,
            cert_req: self.cert_req,
            extensions: None,
        };

        let der = req.to_der().map_app_err(TspErrorKind::EncodingError)?;
        tracing::debug!(
            len = der.len(),
            algorithm = %self.message_imprint.algorithm,
            nonce = ?self.nonce.as_ref().map(to_hex_str),
            "encoded time-stamp request"
        );

        Ok(der)
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let req = TimeStampReq::from_der(bytes).map_app_err(TspErrorKind::InvalidInput)?;

        let message_imprint = MessageImprint::from(req.message_imprint);
        // requests are only ever built for the supported set
        DigestAlgorithm::from_oid(&message_imprint.algorithm)?;

        Ok(Self {
            message_imprint,
            nonce: req.nonce.map(|nonce| nonce.as_bytes().to_vec()),
            req_policy: req.req_policy.map(|oid| oid.to_string()),
            cert_req: req.cert_req,
        })
    }
}
