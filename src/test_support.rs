//! Synthetic TSA responses for unit tests.
//!
//! Tokens built here are structurally valid (SignedData over a TSTInfo with a
//! correct `messageDigest` attribute) but carry a dummy signature.

use std::time::Duration;

use cms::{
    cert::{CertificateChoices, IssuerAndSerialNumber},
    content_info::{CmsVersion, ContentInfo},
    signed_data::{
        CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo,
        SignerInfos,
    },
};
use der::{
    asn1::{BitString, Int, OctetString, SetOfVec, UtcTime},
    oid::{
        db::{
            rfc5911::ID_SIGNED_DATA,
            rfc5912::{ECDSA_WITH_SHA_256, ID_EC_PUBLIC_KEY, ID_SHA_256},
        },
        AssociatedOid, ObjectIdentifier,
    },
    Any, Decode, Encode, Tag,
};
use x509_cert::{
    attr::Attribute,
    certificate::{TbsCertificate, Version},
    ext::{
        pkix::{name::GeneralName, SubjectKeyIdentifier},
        Extension,
    },
    name::Name,
    serial_number::SerialNumber,
    spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned},
    time::{Time, Validity},
    Certificate,
};

use crate::{
    asn1_types::{
        Accuracy, GenTime, PkiStatusInfo, TimeStampResp, TspVersion, TstInfo, ID_CT_TST_INFO,
    },
    hash::{digest_bytes, DigestAlgorithm},
    request::MessageImprint,
    response::PkiStatus,
};

pub(crate) const TSA_NAME: &str = "C=US, ST=Some-State, O=Test, CN=Test TSA";
pub(crate) const TSA_SERIAL: [u8; 4] = [0x12, 0x34, 0x56, 0x78];
pub(crate) const TSA_KEY_ID: [u8; 20] = [0x2f; 20];

const TSA_NAME_DER: &str = concat!(
    "3044310B30090603550406130255533113301106035504080C0A536F6D652D5374617465",
    "310D300B060355040A0C04546573743111300F06035504030C085465737420545341",
);

const ID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

pub(crate) fn tsa_name() -> Name {
    Name::from_der(&hex::decode(TSA_NAME_DER).unwrap()).unwrap()
}

fn algorithm(oid: ObjectIdentifier) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid,
        parameters: None,
    }
}

/// Self-issued certificate for the test TSA with a subject key identifier.
pub(crate) fn tsa_certificate(serial: &[u8]) -> Certificate {
    let ski = SubjectKeyIdentifier(OctetString::new(TSA_KEY_ID.to_vec()).unwrap());
    let not_before = UtcTime::from_unix_duration(Duration::from_secs(1_600_000_000)).unwrap();
    let not_after = UtcTime::from_unix_duration(Duration::from_secs(1_900_000_000)).unwrap();

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(serial).unwrap(),
        signature: algorithm(ECDSA_WITH_SHA_256),
        issuer: tsa_name(),
        validity: Validity {
            not_before: Time::UtcTime(not_before),
            not_after: Time::UtcTime(not_after),
        },
        subject: tsa_name(),
        subject_public_key_info: SubjectPublicKeyInfoOwned {
            algorithm: algorithm(ID_EC_PUBLIC_KEY),
            subject_public_key: BitString::from_bytes(&[0x04; 65]).unwrap(),
        },
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(vec![Extension {
            extn_id: SubjectKeyIdentifier::OID,
            critical: false,
            extn_value: OctetString::new(ski.to_der().unwrap()).unwrap(),
        }]),
    };

    Certificate {
        tbs_certificate,
        signature_algorithm: algorithm(ECDSA_WITH_SHA_256),
        signature: BitString::from_bytes(&[0u8; 64]).unwrap(),
    }
}

/// Builds the DER of a time-stamp token with chosen TSTInfo fields.
#[derive(Clone, Debug)]
pub(crate) struct TokenBuilder {
    imprint: MessageImprint,
    imprint_oid: Option<ObjectIdentifier>,
    // INTEGER content octets
    nonce: Option<Vec<u8>>,
    signer_serial: Vec<u8>,
    policy: String,
    gen_time: String,
    accuracy: Option<Accuracy>,
    ordering: bool,
    embed_certificate: bool,
    signer_by_key_id: bool,
    corrupt_message_digest: bool,
    econtent_type: ObjectIdentifier,
}

impl TokenBuilder {
    pub(crate) fn new(imprint: MessageImprint) -> Self {
        Self {
            imprint,
            imprint_oid: None,
            nonce: None,
            signer_serial: TSA_SERIAL.to_vec(),
            policy: "1.2.3.4.1".to_owned(),
            gen_time: "20240315123045Z".to_owned(),
            accuracy: None,
            ordering: false,
            embed_certificate: false,
            signer_by_key_id: false,
            corrupt_message_digest: false,
            econtent_type: ID_CT_TST_INFO,
        }
    }

    /// Unsigned big-endian nonce.
    pub(crate) fn nonce(mut self, nonce: &[u8]) -> Self {
        let mut content: Vec<u8> = nonce.iter().copied().skip_while(|b| *b == 0).collect();
        if content.first().map_or(true, |b| b & 0x80 != 0) {
            content.insert(0, 0x00);
        }
        self.nonce = Some(content);
        self
    }

    /// Nonce given as two's complement INTEGER content, e.g. `[0xff]` for -1.
    pub(crate) fn signed_nonce(mut self, content: &[u8]) -> Self {
        self.nonce = Some(content.to_vec());
        self
    }

    /// Serial number of the signing certificate, as DER INTEGER content.
    pub(crate) fn signer_serial(mut self, serial: &[u8]) -> Self {
        self.signer_serial = serial.to_vec();
        self
    }

    pub(crate) fn policy(mut self, policy: &str) -> Self {
        self.policy = policy.to_owned();
        self
    }

    pub(crate) fn gen_time(mut self, gen_time: &str) -> Self {
        self.gen_time = gen_time.to_owned();
        self
    }

    pub(crate) fn accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub(crate) fn imprint_oid(mut self, oid: ObjectIdentifier) -> Self {
        self.imprint_oid = Some(oid);
        self
    }

    pub(crate) fn embed_certificate(mut self) -> Self {
        self.embed_certificate = true;
        self
    }

    pub(crate) fn signer_by_key_id(mut self) -> Self {
        self.signer_by_key_id = true;
        self
    }

    pub(crate) fn corrupt_message_digest(mut self) -> Self {
        self.corrupt_message_digest = true;
        self
    }

    pub(crate) fn econtent_type(mut self, oid: ObjectIdentifier) -> Self {
        self.econtent_type = oid;
        self
    }

    pub(crate) fn tst_info_der(&self) -> Vec<u8> {
        let mut message_imprint = self.imprint.to_asn1().unwrap();
        if let Some(oid) = self.imprint_oid {
            message_imprint.hash_algorithm.oid = oid;
        }

        TstInfo {
            version: TspVersion::V1,
            policy: ObjectIdentifier::new(&self.policy).unwrap(),
            message_imprint,
            serial_number: Int::new(&[0x01, 0x02, 0x03]).unwrap(),
            gen_time: GenTime::parse(&self.gen_time).unwrap(),
            accuracy: self.accuracy,
            ordering: self.ordering,
            nonce: self.nonce.as_ref().map(|nonce| Int::new(nonce).unwrap()),
            tsa: Some(GeneralName::DirectoryName(tsa_name())),
            extensions: None,
        }
        .to_der()
        .unwrap()
    }

    fn signer_info(&self, tst_der: &[u8]) -> SignerInfo {
        let mut message_digest = digest_bytes(tst_der, DigestAlgorithm::Sha256).unwrap();
        if self.corrupt_message_digest {
            message_digest[0] ^= 0xff;
        }

        let content_type = Attribute {
            oid: ID_CONTENT_TYPE,
            values: SetOfVec::try_from(vec![Any::encode_from(&ID_CT_TST_INFO).unwrap()]).unwrap(),
        };
        let message_digest = Attribute {
            oid: ID_MESSAGE_DIGEST,
            values: SetOfVec::try_from(vec![
                Any::new(Tag::OctetString, message_digest).unwrap()
            ])
            .unwrap(),
        };

        let (version, sid) = if self.signer_by_key_id {
            (
                CmsVersion::V3,
                SignerIdentifier::SubjectKeyIdentifier(SubjectKeyIdentifier(
                    OctetString::new(TSA_KEY_ID.to_vec()).unwrap(),
                )),
            )
        } else {
            (
                CmsVersion::V1,
                SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                    issuer: tsa_name(),
                    serial_number: SerialNumber::new(&self.signer_serial).unwrap(),
                }),
            )
        };

        SignerInfo {
            version,
            sid,
            digest_alg: algorithm(ID_SHA_256),
            signed_attrs: Some(SetOfVec::try_from(vec![content_type, message_digest]).unwrap()),
            signature_algorithm: algorithm(ECDSA_WITH_SHA_256),
            signature: OctetString::new(vec![0u8; 64]).unwrap(),
            unsigned_attrs: None,
        }
    }

    pub(crate) fn content_info(&self) -> ContentInfo {
        let tst_der = self.tst_info_der();
        let signer_info = self.signer_info(&tst_der);

        let certificates = self.embed_certificate.then(|| {
            CertificateSet(
                SetOfVec::try_from(vec![CertificateChoices::Certificate(tsa_certificate(
                    &self.signer_serial,
                ))])
                .unwrap(),
            )
        });

        let signed_data = SignedData {
            version: CmsVersion::V3,
            digest_algorithms: SetOfVec::try_from(vec![algorithm(ID_SHA_256)]).unwrap(),
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: self.econtent_type,
                econtent: Some(Any::new(Tag::OctetString, tst_der).unwrap()),
            },
            certificates,
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info]).unwrap()),
        };

        ContentInfo {
            content_type: ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data).unwrap(),
        }
    }

    pub(crate) fn token_der(&self) -> Vec<u8> {
        self.content_info().to_der().unwrap()
    }
}

fn fail_info(bit: usize) -> BitString {
    let mut bytes = vec![0u8; bit / 8 + 1];
    bytes[bit / 8] = 0x80 >> (bit % 8);

    BitString::new((7 - bit % 8) as u8, bytes).unwrap()
}

/// DER `TimeStampResp` with the given status fields and optional token.
pub(crate) fn response_der(
    status: PkiStatus,
    status_string: Option<&str>,
    fail_bit: Option<usize>,
    token: Option<&TokenBuilder>,
) -> Vec<u8> {
    TimeStampResp {
        status: PkiStatusInfo {
            status,
            status_string: status_string.map(|s| vec![s.to_owned()]),
            fail_info: fail_bit.map(fail_info),
        },
        time_stamp_token: token.map(TokenBuilder::content_info),
    }
    .to_der()
    .unwrap()
}
