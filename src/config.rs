use std::time::Duration;

/// Crate version, fixed at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Knobs shared by every transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientConfig {
    /// Applies to connect, read and write. `None` blocks for as long as the
    /// TSA takes.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl ClientConfig {
    /// IANA `pkix-timestamp`, used for `tcp://` addresses without a port.
    pub const DEFAULT_TCP_PORT: u16 = 318;

    pub fn with_timeout(mut self: Self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self: Self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: format!("tsclient/{}", VERSION),
        }
    }
}
