//! Delivery of encoded requests to a TSA.

use url::Url;

use crate::{
    config::ClientConfig,
    credentials::UserCredentials,
    errors::{Result, TspError, TspErrorKind},
};

pub mod http;
pub mod tcp;

pub use http::HttpTransport;
pub use tcp::TcpTransport;

/// One request out, one response back. No retries.
pub trait Transport {
    fn send(&self, request: &[u8]) -> Result<Vec<u8>>;
}

/// Picks the transport for a TSA address by its scheme: `http`, `https` or
/// `tcp`.
pub fn transport_for(
    tsa_uri: &str,
    credentials: Option<&UserCredentials>,
    config: &ClientConfig,
) -> Result<Box<dyn Transport>> {
    let url = Url::parse(tsa_uri.trim()).map_err(|err| {
        TspError::new(
            TspErrorKind::InvalidInput,
            format!("TSA address {:?}: {}", tsa_uri, err),
        )
    })?;

    match url.scheme() {
        "http" | "https" => Ok(Box::new(HttpTransport::new(url, credentials, config)?)),
        "tcp" => {
            if credentials.is_some_and(|credentials| !credentials.is_empty()) {
                tracing::debug!(tsa = %url, "credentials are not used over raw TCP");
            }
            Ok(Box::new(TcpTransport::from_url(&url, config)?))
        }
        scheme => Err(TspError::new(TspErrorKind::UnsupportedScheme, scheme)),
    }
}
