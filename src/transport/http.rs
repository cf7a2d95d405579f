use reqwest::{
    blocking::Client,
    header::CONTENT_TYPE,
    Identity,
};
use url::Url;

use super::Transport;
use crate::{
    config::ClientConfig,
    credentials::{HttpCredentials, UserCredentials},
    errors::{Result, TspErrorKind, TspResult},
};

pub const TIMESTAMP_QUERY: &str = "application/timestamp-query";

/// RFC 3161 over HTTP(S): the DER request is POSTed, the body of the reply is
/// the DER response.
#[derive(Debug)]
pub struct HttpTransport {
    url: Url,
    client: Client,
    http: Option<HttpCredentials>,
}

impl HttpTransport {
    pub fn new(
        url: Url,
        credentials: Option<&UserCredentials>,
        config: &ClientConfig,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout);
        if let Some(timeout) = config.timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(identity) = credentials.and_then(|c| c.client_identity.as_ref()) {
            let identity = Identity::from_pkcs12_der(&identity.pkcs12_der, &identity.password)
                .map_app_err(TspErrorKind::InvalidInput)?;
            builder = builder.identity(identity);
        }

        let client = builder.build().map_app_err(TspErrorKind::TransportError)?;

        Ok(Self {
            url,
            client,
            http: credentials.and_then(|c| c.http.clone()),
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &[u8]) -> Result<Vec<u8>> {
        tracing::debug!(tsa = %self.url, len = request.len(), "sending time-stamp query");

        let mut builder = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, TIMESTAMP_QUERY)
            .body(request.to_vec());
        if let Some(http) = &self.http {
            builder = builder.basic_auth(&http.username, Some(&http.password));
        }

        let response = builder
            .send()
            .map_app_err(TspErrorKind::TransportError)?
            .error_for_status()
            .map_app_err(TspErrorKind::TransportError)?;
        let status = response.status();
        let body = response.bytes().map_app_err(TspErrorKind::TransportError)?;

        tracing::debug!(tsa = %self.url, status = %status, len = body.len(), "received time-stamp reply");

        Ok(body.to_vec())
    }
}
