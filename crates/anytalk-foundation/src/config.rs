//! Configuration snapshot taken at context init and never mutated after.

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_RESOURCE_ID: &str = "volc.seedasr.sauc.duration";
pub const DEFAULT_HOST: &str = "openspeech.bytedance.com";
pub const DEFAULT_PORT: u16 = 443;

/// Recognition mode. Selects the service endpoint path and tweaks the
/// initial request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Bidi,
    BidiAsync,
    Nostream,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Bidi => "bidi",
            Mode::BidiAsync => "bidi_async",
            Mode::Nostream => "nostream",
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::BidiAsync
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bidi" => Ok(Mode::Bidi),
            "bidi_async" => Ok(Mode::BidiAsync),
            "nostream" => Ok(Mode::Nostream),
            other => Err(format!("unknown mode: {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain TCP. Used by loopback test servers.
    Ws,
    /// TCP + TLS with hostname verification against the platform trust store.
    Wss,
}

/// Where to dial. The path is derived from [`Mode`], not stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            scheme: Scheme::Wss,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    /// Loopback endpoint without TLS, for integration tests.
    pub fn loopback(port: u16) -> Self {
        Self {
            scheme: Scheme::Ws,
            host: "127.0.0.1".to_string(),
            port,
        }
    }
}

/// Immutable per-context configuration.
#[derive(Debug, Clone)]
pub struct AsrConfig {
    pub app_id: String,
    pub access_token: String,
    pub resource_id: String,
    pub mode: Mode,
    pub endpoint: Endpoint,
}

impl AsrConfig {
    pub fn new(app_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            access_token: access_token.into(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            mode: Mode::default(),
            endpoint: Endpoint::default(),
        }
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = resource_id.into();
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_str() {
        for mode in [Mode::Bidi, Mode::BidiAsync, Mode::Nostream] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!("turbo".parse::<Mode>().is_err());
    }

    #[test]
    fn defaults_match_service_contract() {
        let cfg = AsrConfig::new("app", "token");
        assert_eq!(cfg.resource_id, DEFAULT_RESOURCE_ID);
        assert_eq!(cfg.mode, Mode::BidiAsync);
        assert_eq!(cfg.endpoint.host, DEFAULT_HOST);
        assert_eq!(cfg.endpoint.port, 443);
        assert_eq!(cfg.endpoint.scheme, Scheme::Wss);
    }
}
