//! RFC 3161 Time-Stamp Protocol client.
//!
//! Builds a `TimeStampReq` for a message digest, sends it to a Time-Stamping
//! Authority over `http://`, `https://` or `tcp://`, and checks the returned
//! token against the request before handing it back:
//!
//! ```no_run
//! use tsclient::{request_timestamp_for_bytes, DigestAlgorithm};
//!
//! let token = request_timestamp_for_bytes(
//!     "http://timestamp.example.com/tsr",
//!     b"hello",
//!     Some(DigestAlgorithm::Sha256),
//!     None,
//! )?;
//! println!("{} {}", token.gen_time(), token.policy_oid());
//! # Ok::<(), tsclient::TspError>(())
//! ```
//!
//! A returned token matches the request (status, nonce, policy and message
//! imprint) and its encapsulated TSTInfo matches the signed `messageDigest`.
//! The CMS signature itself is NOT verified and the TSA certificate is NOT
//! validated against any trust anchor. Callers that need either must do it on
//! [`TimestampToken::to_bytes`].

pub mod asn1_types;
pub mod client;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod hash;
pub mod name;
pub mod nonce;
pub mod request;
pub mod response;
pub mod token;
pub mod transport;
pub mod utils;
pub use der;

#[cfg(test)]
mod test_support;

pub use client::{
    exchange, request_timestamp, request_timestamp_for_bytes, request_timestamp_for_path,
    request_timestamp_for_reader, TimeStampClient,
};
pub use codec::{DerCodec, TspCodec};
pub use config::ClientConfig;
pub use credentials::{ClientIdentity, HttpCredentials, UserCredentials};
pub use errors::{Result, TspError, TspErrorKind};
pub use hash::{digest_bytes, digest_file, digest_reader, DigestAlgorithm};
pub use request::{MessageImprint, Request};
pub use response::{PkiFailureInfo, PkiStatus};
pub use token::{Accuracy, TimestampToken, TsaIdentity};
pub use transport::Transport;
