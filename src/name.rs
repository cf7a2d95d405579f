use der::{
    asn1::{BmpString, Ia5StringRef, PrintableStringRef, TeletexStringRef, Utf8StringRef},
    oid::{db::DB, ObjectIdentifier},
    Any, Decode, Encode, Tag, Tagged,
};
use std::fmt::Display;

use crate::utils::to_hex_str;

/// Printable X.500 name, one entry per RDN in encoding order.
#[derive(Clone, Debug, Default)]
pub struct RdnSequence(pub Vec<RelativeDistinguishedName>);

// attribute order inside a set is not significant
impl PartialEq for RdnSequence {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|rdn| other.0.contains(rdn))
    }
}

impl Eq for RdnSequence {}

impl Display for RdnSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rdn = self
            .0
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}", rdn)
    }
}

impl From<&x509_cert::name::Name> for RdnSequence {
    fn from(value: &x509_cert::name::Name) -> Self {
        Self(value.0.iter().map(RelativeDistinguishedName::from).collect())
    }
}

#[derive(Clone, Debug)]
pub struct RelativeDistinguishedName(pub Vec<String>);

impl PartialEq for RelativeDistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|atv| other.0.contains(atv))
    }
}

impl Eq for RelativeDistinguishedName {}

impl Display for RelativeDistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

impl From<&x509_cert::name::RelativeDistinguishedName> for RelativeDistinguishedName {
    fn from(value: &x509_cert::name::RelativeDistinguishedName) -> Self {
        Self(
            value
                .0
                .iter()
                .map(|tv| {
                    let value = match string_value(&tv.value) {
                        Some(val) => escape(&val),
                        // unprintable values are shown as #hex of their DER
                        None => format!("#{}", to_hex_str(&tv.value.to_der().unwrap_or_default())),
                    };

                    format!("{}={}", attribute_key(tv.oid), value)
                })
                .collect(),
        )
    }
}

/// Renders a name the way it is shown in `TsaIdentity`, e.g. `C=DE, O=Example, CN=TSA`.
pub fn name_to_string(name: &x509_cert::name::Name) -> String {
    RdnSequence::from(name).to_string()
}

fn string_value(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::PrintableString => PrintableStringRef::try_from(value)
            .ok()
            .map(|s| s.to_string()),
        Tag::Utf8String => Utf8StringRef::try_from(value).ok().map(|s| s.to_string()),
        Tag::Ia5String => Ia5StringRef::try_from(value).ok().map(|s| s.to_string()),
        Tag::TeletexString => TeletexStringRef::try_from(value)
            .ok()
            .map(|s| s.to_string()),
        // UTF-16
        Tag::BmpString => value
            .to_der()
            .ok()
            .and_then(|der| BmpString::from_der(&der).ok())
            .map(|s| s.to_string()),
        _ => None,
    }
}

// shortest registered name, upper-cased; dotted form otherwise
fn attribute_key(oid: ObjectIdentifier) -> String {
    DB.find_names_for_oid(oid)
        .min_by_key(|name| name.len())
        .map(|name| name.to_ascii_uppercase())
        .unwrap_or_else(|| oid.to_string())
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut iter = value.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        match c {
            '#' if i == 0 => escaped.push_str("\\#"),
            ' ' if i == 0 || iter.peek().is_none() => escaped.push_str("\\ "),
            '"' | '+' | ',' | ';' | '<' | '>' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\x00'..='\x1f' | '\x7f' => escaped.push_str(&format!("\\{:02x}", c as u8)),
            _ => escaped.push(c),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use der::Decode;

    use super::*;
    use crate::utils::parse_hex;

    #[test]
    fn test_rdns_eq() {
        let a = RdnSequence(vec![RelativeDistinguishedName(vec![
            "O=test".to_owned(),
            "CN=test".to_owned(),
        ])]);
        let b = RdnSequence(vec![RelativeDistinguishedName(vec![
            "CN=test".to_owned(),
            "O=test".to_owned(),
        ])]);
        let c = RdnSequence(vec![RelativeDistinguishedName(vec!["CN=test".to_owned()])]);

        assert_eq!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn test_utf16_rdn() {
        let der_rdn = x509_cert::name::RelativeDistinguishedName::from_der(
            b"\x31\x0d\x30\x0b\x06\x03\x55\x04\x03\x1e\x04\x66\x53\x7f\xbd",
        )
        .unwrap();

        assert_eq!(RelativeDistinguishedName::from(&der_rdn).to_string(), "CN=晓羽");
    }

    #[test]
    fn test_unknown_rdn_oid() {
        let der_rdn = x509_cert::name::RelativeDistinguishedName::from_der(
            b"\x31\x13\x30\x11\x06\x0b\x2b\x06\x01\x04\x01\x82\x37\x3c\x02\x01\x03\x13\x02\x43\x4e",
        )
        .unwrap();

        assert_eq!(
            RelativeDistinguishedName::from(&der_rdn).to_string(),
            "1.3.6.1.4.1.311.60.2.1.3=CN"
        );
    }

    #[test]
    fn test_tsa_name() {
        let der = parse_hex(concat!(
            "3044310B30090603550406130255533113301106035504080C0A536F6D652D5374617465",
            "310D300B060355040A0C04546573743111300F06035504030C085465737420545341",
        ))
        .unwrap();
        let name = x509_cert::name::Name::from_der(&der).unwrap();

        assert_eq!(name_to_string(&name), "C=US, ST=Some-State, O=Test, CN=Test TSA");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape(" lead"), "\\ lead");
        assert_eq!(escape("#x"), "\\#x");
        assert_eq!(escape("a+b"), "a\\+b");
        assert_eq!(escape("tab\t"), "tab\\09");
    }
}
