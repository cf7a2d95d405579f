use std::{fmt, fs, path::Path};

use crate::errors::{Result, TspErrorKind, TspResult};

/// PKCS#12 bundle presented as the TLS client certificate.
#[derive(Clone, Eq, PartialEq)]
pub struct ClientIdentity {
    pub pkcs12_der: Vec<u8>,
    pub password: String,
}

impl ClientIdentity {
    pub fn new(pkcs12_der: impl Into<Vec<u8>>, password: impl Into<String>) -> Self {
        Self {
            pkcs12_der: pkcs12_der.into(),
            password: password.into(),
        }
    }

    /// Reads a `.p12`/`.pfx` file.
    pub fn from_file<P: AsRef<Path>>(path: P, password: impl Into<String>) -> Result<Self> {
        let pkcs12_der = fs::read(path.as_ref()).map_app_err(TspErrorKind::IoError)?;

        Ok(Self::new(pkcs12_der, password))
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("pkcs12_der", &format_args!("<{} bytes>", self.pkcs12_der.len()))
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP basic authentication.
#[derive(Clone, Eq, PartialEq)]
pub struct HttpCredentials {
    pub username: String,
    pub password: String,
}

impl HttpCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for HttpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the client authenticates to the TSA with. Both parts are optional and
/// can be combined; neither applies to raw TCP.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserCredentials {
    pub client_identity: Option<ClientIdentity>,
    pub http: Option<HttpCredentials>,
}

impl UserCredentials {
    pub fn with_client_identity(mut self: Self, identity: ClientIdentity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    pub fn with_http(mut self: Self, http: HttpCredentials) -> Self {
        self.http = Some(http);
        self
    }

    pub fn is_empty(self: &Self) -> bool {
        self.client_identity.is_none() && self.http.is_none()
    }
}
