use crate::errors::{Result, TspError, TspErrorKind, TspResult};

pub fn to_hex_str<T>(bytes: &T) -> String
where
    T: AsRef<[u8]> + ?Sized,
{
    hex::encode(bytes.as_ref())
}

/// Parses a hex string such as `1234567890ABCDEF` into bytes.
///
/// Odd-length input is read as if it had a leading `0`.
pub fn parse_hex(value: &str) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Err(TspError::new(TspErrorKind::InvalidInput, "empty hex string"));
    }

    if value.len() % 2 != 0 {
        hex::decode(format!("0{}", value)).map_app_err(TspErrorKind::InvalidInput)
    } else {
        hex::decode(value).map_app_err(TspErrorKind::InvalidInput)
    }
}

/// Minimal big-endian unsigned form: leading zero bytes removed, at least one byte kept.
pub fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| *b != 0) {
        Some(pos) => &bytes[pos..],
        None if bytes.is_empty() => bytes,
        None => &bytes[bytes.len() - 1..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let bytes = parse_hex("1234567890ABCDEF").unwrap();

        assert_eq!(bytes, vec![0x12, 0x34, 0x56, 0x78, 0x90, 0xab, 0xcd, 0xef]);
        assert_eq!(to_hex_str(&bytes), "1234567890abcdef");
    }

    #[test]
    fn odd_length_hex_is_left_padded() {
        assert_eq!(parse_hex("abc").unwrap(), vec![0x0a, 0xbc]);
    }

    #[test]
    fn non_hex_rejected() {
        let err = parse_hex("12zz").unwrap_err();
        assert_eq!(err.kind, TspErrorKind::InvalidInput);
        assert!(std::error::Error::source(&err).is_some());

        // odd length with a bad digit
        assert_eq!(parse_hex("1g2").unwrap_err().kind, TspErrorKind::InvalidInput);

        assert!(parse_hex("").is_err());
    }

    #[test]
    fn leading_zeros() {
        assert_eq!(strip_leading_zeros(&[0, 0, 1, 0]), &[1, 0]);
        assert_eq!(strip_leading_zeros(&[0, 0]), &[0]);
        assert_eq!(strip_leading_zeros(&[0x80]), &[0x80]);
        assert_eq!(strip_leading_zeros(&[]), &[] as &[u8]);
    }
}
