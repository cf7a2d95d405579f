use std::{
    fmt::Display,
    fs::File,
    io::{ErrorKind, Read},
    path::Path,
    str::FromStr,
};

use der::oid::{
    db::rfc5912::{ID_SHA_1, ID_SHA_256, ID_SHA_512},
    ObjectIdentifier,
};
use digest::{Digest, DynDigest};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::errors::{Result, TspError, TspErrorKind, TspResult};

pub const ID_MD5: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.5");

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Message digest algorithms a time-stamp request can be built for.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    #[default]
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    pub const fn oid(self: Self) -> ObjectIdentifier {
        match self {
            Self::Md5 => ID_MD5,
            Self::Sha1 => ID_SHA_1,
            Self::Sha256 => ID_SHA_256,
            Self::Sha512 => ID_SHA_512,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.oid() == *oid)
            .ok_or_else(|| TspError::new(TspErrorKind::UnsupportedAlgorithm, oid.to_string()))
    }

    /// Looks an algorithm up by its dotted object identifier string.
    pub fn from_oid_str(oid: &str) -> Result<Self> {
        let oid = ObjectIdentifier::new(oid)
            .map_err(|_| TspError::new(TspErrorKind::UnsupportedAlgorithm, oid))?;
        Self::from_oid(&oid)
    }

    /// `md5`, `sha1`, `sha256` or `sha512`, case-insensitive.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            _ => Err(TspError::new(TspErrorKind::UnsupportedAlgorithm, name)),
        }
    }

    pub const fn name(self: Self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the digest in bytes.
    pub const fn output_size(self: Self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    pub fn new_digest(self: Self) -> Box<dyn DynDigest> {
        match self {
            Self::Md5 => Box::new(Md5::new()),
            Self::Sha1 => Box::new(Sha1::new()),
            Self::Sha256 => Box::new(Sha256::new()),
            Self::Sha512 => Box::new(Sha512::new()),
        }
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TspError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Digests everything `source` yields, reading it incrementally.
pub fn digest_reader<R: Read>(mut source: R, algorithm: DigestAlgorithm) -> Result<Vec<u8>> {
    let mut hasher = algorithm.new_digest();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TspError::with_source(TspErrorKind::IoError, err)),
        }
    }

    Ok(hasher.finalize().into_vec())
}

pub fn digest_bytes(data: &[u8], algorithm: DigestAlgorithm) -> Result<Vec<u8>> {
    digest_reader(data, algorithm)
}

pub fn digest_file<P: AsRef<Path>>(path: P, algorithm: DigestAlgorithm) -> Result<Vec<u8>> {
    let file = File::open(path.as_ref()).map_app_err(TspErrorKind::IoError)?;

    digest_reader(file, algorithm)
}
