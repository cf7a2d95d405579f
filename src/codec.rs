use cms::{
    cert::CertificateChoices,
    content_info::ContentInfo,
    signed_data::{SignedData, SignerIdentifier, SignerInfo},
};
use der::{
    asn1::OctetString,
    oid::{
        db::{
            rfc5911::ID_SIGNED_DATA,
            rfc5912::{ID_SHA_224, ID_SHA_384},
        },
        AssociatedOid, ObjectIdentifier,
    },
    Decode,
};
use digest::DynDigest;
use x509_cert::{
    ext::pkix::{name::GeneralName, SubjectKeyIdentifier},
    Certificate,
};

use crate::{
    asn1_types::{TimeStampResp, TstInfo, ID_CT_TST_INFO},
    errors::{Result, TspError, TspErrorKind, TspResult},
    hash::DigestAlgorithm,
    name::{name_to_string, RdnSequence},
    request::MessageImprint,
    response::{PkiFailureInfo, Response},
    token::{Accuracy, TimestampToken, TsaIdentity},
    utils::{strip_leading_zeros, to_hex_str},
};

const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// Decoding side of the protocol: wire bytes in, typed values out.
pub trait TspCodec {
    /// Decodes a DER `TimeStampResp`.
    fn decode_response(&self, bytes: &[u8]) -> Result<Response>;

    /// Decodes a DER `TimeStampToken` (a `ContentInfo` holding SignedData).
    fn decode_token(&self, bytes: &[u8]) -> Result<TimestampToken>;
}

/// [`TspCodec`] backed by the `der`/`cms` crates.
///
/// Structural checks only: the content must be SignedData carrying a TSTInfo,
/// and the signer's `messageDigest` attribute must match that TSTInfo. The
/// CMS signature and the signing certificate are not verified.
#[derive(Clone, Copy, Debug, Default)]
pub struct DerCodec;

impl TspCodec for DerCodec {
    fn decode_response(&self, bytes: &[u8]) -> Result<Response> {
        let resp = TimeStampResp::from_der(bytes).map_app_err(TspErrorKind::InvalidResponse)?;
        let status = resp.status.status;

        let pki_status_string = resp
            .status
            .status_string
            .map(|strings| strings.join("; "))
            .filter(|s| !s.is_empty());
        let pki_failure_info = resp
            .status
            .fail_info
            .as_ref()
            .map(PkiFailureInfo::from_bit_string);

        let token = match resp.time_stamp_token {
            Some(content_info) if status.is_granted() => {
                Some(token_from_content_info(content_info)?)
            }
            Some(_) => {
                tracing::debug!(status = %status, "ignoring token attached to a non-granted status");
                None
            }
            None => None,
        };

        tracing::debug!(
            status = %status,
            failure_info = ?pki_failure_info,
            has_token = token.is_some(),
            "decoded time-stamp response"
        );

        Ok(Response {
            pki_status: status,
            pki_status_string,
            pki_failure_info,
            token,
        })
    }

    fn decode_token(&self, bytes: &[u8]) -> Result<TimestampToken> {
        TimestampToken::from_bytes(bytes)
    }
}

pub(crate) fn token_from_content_info(content_info: ContentInfo) -> Result<TimestampToken> {
    if content_info.content_type != ID_SIGNED_DATA {
        return Err(TspError::new(
            TspErrorKind::InvalidToken,
            format!("content type {} is not signedData", content_info.content_type),
        ));
    }

    let signed_data = content_info
        .content
        .decode_as::<SignedData>()
        .map_app_err(TspErrorKind::InvalidToken)?;

    let encap_content_info = &signed_data.encap_content_info;
    if encap_content_info.econtent_type != ID_CT_TST_INFO {
        return Err(TspError::new(
            TspErrorKind::InvalidToken,
            format!(
                "encapsulated content type {} is not TSTInfo",
                encap_content_info.econtent_type
            ),
        ));
    }
    let econtent = encap_content_info
        .econtent
        .as_ref()
        .ok_or_else(|| TspError::new(TspErrorKind::InvalidToken, "no encapsulated TSTInfo"))?
        .decode_as::<OctetString>()
        .map_app_err(TspErrorKind::InvalidToken)?;
    let tst_info = TstInfo::from_der(econtent.as_bytes()).map_app_err(TspErrorKind::InvalidToken)?;

    let signer_info = signed_data
        .signer_infos
        .0
        .get(0)
        .ok_or_else(|| TspError::new(TspErrorKind::InvalidToken, "no signer info"))?;
    check_message_digest(signer_info, econtent.as_bytes())?;
    let tsa_identity = signer_identity(&signed_data, signer_info);

    let tsa_name = match &tst_info.tsa {
        Some(GeneralName::DirectoryName(name)) => Some(name_to_string(name)),
        Some(GeneralName::DnsName(name)) => Some(name.to_string()),
        Some(GeneralName::UniformResourceIdentifier(uri)) => Some(uri.to_string()),
        Some(GeneralName::Rfc822Name(email)) => Some(email.to_string()),
        Some(_) | None => None,
    };

    let token = TimestampToken {
        serial_number: strip_leading_zeros(tst_info.serial_number.as_bytes()).to_vec(),
        gen_time: tst_info.gen_time.to_datetime(),
        message_imprint: MessageImprint::from(tst_info.message_imprint),
        policy_oid: tst_info.policy.to_string(),
        nonce: tst_info.nonce.map(|nonce| nonce.as_bytes().to_vec()),
        tsa_identity,
        tsa_name,
        accuracy: tst_info.accuracy.map(Accuracy::from),
        ordering: tst_info.ordering,
        inner: content_info,
    };

    tracing::debug!(
        serial_number = %to_hex_str(&token.serial_number),
        gen_time = %token.gen_time,
        policy = %token.policy_oid,
        signer = %token.tsa_identity.issuer_name,
        "decoded time-stamp token"
    );

    Ok(token)
}

/// Digest functions a CMS signer may use for `messageDigest`. Wider than
/// [`DigestAlgorithm`], which only covers what requests can be built with.
fn content_digest(oid: &ObjectIdentifier) -> Option<Box<dyn DynDigest>> {
    if let Ok(algorithm) = DigestAlgorithm::from_oid(oid) {
        Some(algorithm.new_digest())
    } else if *oid == ID_SHA_224 {
        Some(Box::new(<sha2::Sha224 as digest::Digest>::new()))
    } else if *oid == ID_SHA_384 {
        Some(Box::new(<sha2::Sha384 as digest::Digest>::new()))
    } else {
        None
    }
}

fn check_message_digest(signer_info: &SignerInfo, content: &[u8]) -> Result<()> {
    // without signed attributes the signature covers the content directly
    let Some(signed_attrs) = &signer_info.signed_attrs else {
        return Ok(());
    };

    let message_digest = signed_attrs
        .iter()
        .find(|attr| attr.oid == ID_MESSAGE_DIGEST)
        .and_then(|attr| attr.values.get(0))
        .ok_or_else(|| {
            TspError::new(
                TspErrorKind::InvalidToken,
                "signed attributes carry no messageDigest",
            )
        })?
        .decode_as::<OctetString>()
        .map_app_err(TspErrorKind::InvalidToken)?;

    let Some(mut hasher) = content_digest(&signer_info.digest_alg.oid) else {
        tracing::warn!(
            algorithm = %signer_info.digest_alg.oid,
            "unknown signer digest algorithm, messageDigest not checked"
        );
        return Ok(());
    };
    hasher.update(content);
    let hashed = hasher.finalize();

    if hashed.as_ref() != message_digest.as_bytes() {
        return Err(TspError::new(
            TspErrorKind::InvalidToken,
            format!(
                "messageDigest {} does not match TSTInfo digest {}",
                to_hex_str(message_digest.as_bytes()),
                to_hex_str(hashed.as_ref())
            ),
        ));
    }

    Ok(())
}

fn subject_key_identifier(cert: &Certificate) -> Option<Vec<u8>> {
    cert.tbs_certificate
        .extensions
        .as_ref()?
        .iter()
        .find(|ext| ext.extn_id == SubjectKeyIdentifier::OID)
        .and_then(|ext| SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes()).ok())
        .map(|ski| ski.0.as_bytes().to_vec())
}

fn signer_identity(signed_data: &SignedData, signer_info: &SignerInfo) -> TsaIdentity {
    let mut certificates = signed_data
        .certificates
        .iter()
        .flat_map(|set| set.0.iter())
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(cert) => Some(cert),
            _ => None,
        });

    match &signer_info.sid {
        SignerIdentifier::IssuerAndSerialNumber(sid) => {
            let signer_issuer = RdnSequence::from(&sid.issuer);
            let certificate = certificates
                .find(|cert| {
                    cert.tbs_certificate.serial_number == sid.serial_number
                        && RdnSequence::from(&cert.tbs_certificate.issuer) == signer_issuer
                })
                .cloned();

            TsaIdentity {
                issuer_name: signer_issuer.to_string(),
                serial_number: strip_leading_zeros(sid.serial_number.as_bytes()).to_vec(),
                subject_key_identifier: certificate.as_ref().and_then(subject_key_identifier),
                certificate,
            }
        }
        SignerIdentifier::SubjectKeyIdentifier(sid) => {
            let key_id = sid.0.as_bytes().to_vec();
            let certificate = certificates
                .find(|cert| subject_key_identifier(cert).as_deref() == Some(&key_id[..]))
                .cloned();

            match certificate {
                Some(cert) => TsaIdentity {
                    issuer_name: name_to_string(&cert.tbs_certificate.issuer),
                    serial_number: strip_leading_zeros(cert.tbs_certificate.serial_number.as_bytes())
                        .to_vec(),
                    subject_key_identifier: Some(key_id),
                    certificate: Some(cert),
                },
                None => TsaIdentity {
                    issuer_name: String::new(),
                    serial_number: Vec::new(),
                    subject_key_identifier: Some(key_id),
                    certificate: None,
                },
            }
        }
    }
}
