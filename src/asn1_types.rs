use chrono::{DateTime, NaiveDateTime, Utc};
use cms::content_info::ContentInfo;
use der::{
    asn1::{BitString, Int, OctetString, Uint},
    oid::ObjectIdentifier,
    DecodeValue, EncodeValue, Enumerated, FixedTag, Header, Length, Reader, Sequence, Tag,
    Writer,
};
use x509_cert::{
    ext::{pkix::name::GeneralName, Extensions},
    spki::AlgorithmIdentifierOwned,
};

use crate::response::PkiStatus;

pub const ID_CT_TST_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

#[derive(Clone, Debug, Copy, PartialEq, Eq, PartialOrd, Ord, Enumerated)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
#[allow(missing_docs)]
pub enum TspVersion {
    V1 = 1,
}

/// ```text
/// MessageImprint ::= SEQUENCE {
///   hashAlgorithm  AlgorithmIdentifier,
///   hashedMessage  OCTET STRING }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MessageImprint {
    pub hash_algorithm: AlgorithmIdentifierOwned,
    pub hashed_message: OctetString,
}

/// ```text
/// TimeStampReq ::= SEQUENCE {
///   version        INTEGER { v1(1) },
///   messageImprint MessageImprint,
///   reqPolicy      TSAPolicyId     OPTIONAL,
///   nonce          INTEGER         OPTIONAL,
///   certReq        BOOLEAN         DEFAULT FALSE,
///   extensions     [0] IMPLICIT Extensions OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampReq {
    pub version: TspVersion,
    pub message_imprint: MessageImprint,
    #[asn1(optional = "true")]
    pub req_policy: Option<ObjectIdentifier>,
    #[asn1(optional = "true")]
    pub nonce: Option<Uint>,
    #[asn1(default = "Default::default")]
    pub cert_req: bool,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub extensions: Option<Extensions>,
}

/// ```text
/// PKIStatusInfo ::= SEQUENCE {
///   status        PKIStatus,
///   statusString  PKIFreeText     OPTIONAL,
///   failInfo      PKIFailureInfo  OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PkiStatusInfo {
    pub status: PkiStatus,
    #[asn1(optional = "true")]
    pub status_string: Option<Vec<String>>,
    #[asn1(optional = "true")]
    pub fail_info: Option<BitString>,
}

/// ```text
/// TimeStampResp ::= SEQUENCE {
///   status          PKIStatusInfo,
///   timeStampToken  TimeStampToken  OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TimeStampResp {
    pub status: PkiStatusInfo,
    #[asn1(optional = "true")]
    pub time_stamp_token: Option<ContentInfo>,
}

/// ```text
/// Accuracy ::= SEQUENCE {
///   seconds        INTEGER              OPTIONAL,
///   millis     [0] INTEGER  (1..999)    OPTIONAL,
///   micros     [1] INTEGER  (1..999)    OPTIONAL }
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Sequence)]
pub struct Accuracy {
    #[asn1(optional = "true")]
    pub seconds: Option<u64>,
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub millis: Option<u16>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub micros: Option<u16>,
}

/// ```text
/// TSTInfo ::= SEQUENCE {
///   version        INTEGER  { v1(1) },
///   policy         TSAPolicyId,
///   messageImprint MessageImprint,
///   serialNumber   INTEGER,
///   genTime        GeneralizedTime,
///   accuracy       Accuracy              OPTIONAL,
///   ordering       BOOLEAN               DEFAULT FALSE,
///   nonce          INTEGER               OPTIONAL,
///   tsa            [0] GeneralName       OPTIONAL,
///   extensions     [1] IMPLICIT Extensions OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TstInfo {
    pub version: TspVersion,
    pub policy: ObjectIdentifier,
    pub message_imprint: MessageImprint,
    pub serial_number: Int,
    pub gen_time: GenTime,
    #[asn1(optional = "true")]
    pub accuracy: Option<Accuracy>,
    #[asn1(default = "Default::default")]
    pub ordering: bool,
    // signed: a non-conforming TSA may echo a negative value
    #[asn1(optional = "true")]
    pub nonce: Option<Int>,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub tsa: Option<GeneralName>,
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub extensions: Option<Extensions>,
}

/// GeneralizedTime as sent by TSAs, which may carry fractional seconds
/// (`YYYYMMDDHHMMSS[.f*]Z`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GenTime {
    raw: String,
    time: DateTime<Utc>,
}

impl GenTime {
    pub fn parse(raw: &str) -> Option<Self> {
        let body = raw.strip_suffix('Z')?;
        let (whole, fraction) = match body.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (body, None),
        };

        if whole.len() != 14 || !whole.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let mut naive = NaiveDateTime::parse_from_str(whole, "%Y%m%d%H%M%S").ok()?;

        if let Some(fraction) = fraction {
            if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            // nanosecond precision, extra digits truncated
            let digits: String = fraction.chars().chain("000000000".chars()).take(9).collect();
            let nanos: i64 = digits.parse().ok()?;
            naive += chrono::Duration::nanoseconds(nanos);
        }

        Some(Self {
            raw: raw.to_owned(),
            time: naive.and_utc(),
        })
    }

    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self {
            raw: time.format("%Y%m%d%H%M%SZ").to_string(),
            time,
        }
    }

    pub fn to_datetime(self: &Self) -> DateTime<Utc> {
        self.time
    }

    pub fn as_str(self: &Self) -> &str {
        &self.raw
    }
}

impl FixedTag for GenTime {
    const TAG: Tag = Tag::GeneralizedTime;
}

impl<'a> DecodeValue<'a> for GenTime {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        let bytes = reader.read_vec(header.length)?;
        let raw = std::str::from_utf8(&bytes).map_err(|_| Self::TAG.value_error())?;

        Self::parse(raw).ok_or_else(|| Self::TAG.value_error())
    }
}

impl EncodeValue for GenTime {
    fn value_len(&self) -> der::Result<Length> {
        Length::try_from(self.raw.len())
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        writer.write(self.raw.as_bytes())
    }
}
