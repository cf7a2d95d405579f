use std::{fs::File, io::Read, path::Path};

use crate::{
    codec::{DerCodec, TspCodec},
    config::ClientConfig,
    credentials::UserCredentials,
    errors::{Result, TspErrorKind, TspResult},
    hash::{digest_reader, DigestAlgorithm},
    request::Request,
    response::validate,
    token::TimestampToken,
    transport::{transport_for, Transport},
};

/// Sends `request` over `transport` and validates what comes back.
pub fn exchange(
    transport: &dyn Transport,
    codec: &dyn TspCodec,
    request: &Request,
) -> Result<TimestampToken> {
    let request_der = request.to_der()?;
    let response_der = transport.send(&request_der)?;
    let response = codec.decode_response(&response_der)?;

    validate(request, response)
}

/// A TSA endpoint together with how to reach it.
#[derive(Clone, Debug)]
pub struct TimeStampClient {
    tsa_uri: String,
    credentials: Option<UserCredentials>,
    config: ClientConfig,
}

impl TimeStampClient {
    pub fn new(tsa_uri: impl Into<String>) -> Self {
        Self {
            tsa_uri: tsa_uri.into(),
            credentials: None,
            config: ClientConfig::default(),
        }
    }

    pub fn with_credentials(mut self: Self, credentials: UserCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_config(mut self: Self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tsa_uri(self: &Self) -> &str {
        &self.tsa_uri
    }

    /// Runs one request/response exchange and returns the validated token.
    pub fn request(self: &Self, request: &Request) -> Result<TimestampToken> {
        let transport = transport_for(&self.tsa_uri, self.credentials.as_ref(), &self.config)?;

        tracing::debug!(
            tsa = %self.tsa_uri,
            algorithm = %request.message_imprint().algorithm_oid(),
            nonce = request.nonce().is_some(),
            cert_req = request.cert_req(),
            "requesting time-stamp"
        );

        exchange(transport.as_ref(), &DerCodec, request).map_err(|err| {
            tracing::warn!(tsa = %self.tsa_uri, error = %err, "time-stamp request failed");
            err
        })
    }

    /// Digests `source` (SHA-256 unless told otherwise) and time-stamps the digest.
    pub fn request_for_reader<R: Read>(
        self: &Self,
        source: R,
        algorithm: Option<DigestAlgorithm>,
    ) -> Result<TimestampToken> {
        let algorithm = algorithm.unwrap_or_default();
        let digest = digest_reader(source, algorithm)?;

        self.request(&Request::new(&digest, algorithm)?)
    }
}

/// Time-stamps an already built request.
pub fn request_timestamp(
    tsa_uri: &str,
    request: &Request,
    credentials: Option<&UserCredentials>,
) -> Result<TimestampToken> {
    let mut client = TimeStampClient::new(tsa_uri);
    if let Some(credentials) = credentials {
        client = client.with_credentials(credentials.clone());
    }

    client.request(request)
}

pub fn request_timestamp_for_reader<R: Read>(
    tsa_uri: &str,
    source: R,
    algorithm: Option<DigestAlgorithm>,
    credentials: Option<&UserCredentials>,
) -> Result<TimestampToken> {
    let mut client = TimeStampClient::new(tsa_uri);
    if let Some(credentials) = credentials {
        client = client.with_credentials(credentials.clone());
    }

    client.request_for_reader(source, algorithm)
}

pub fn request_timestamp_for_bytes(
    tsa_uri: &str,
    data: &[u8],
    algorithm: Option<DigestAlgorithm>,
    credentials: Option<&UserCredentials>,
) -> Result<TimestampToken> {
    request_timestamp_for_reader(tsa_uri, data, algorithm, credentials)
}

pub fn request_timestamp_for_path<P: AsRef<Path>>(
    tsa_uri: &str,
    path: P,
    algorithm: Option<DigestAlgorithm>,
    credentials: Option<&UserCredentials>,
) -> Result<TimestampToken> {
    let file = File::open(path.as_ref()).map_app_err(TspErrorKind::IoError)?;

    request_timestamp_for_reader(tsa_uri, file, algorithm, credentials)
}
