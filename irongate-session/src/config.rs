//! Session configuration.

use crate::error::{Result, SessionError};
use irongate_codec::{CodecConfig, ResyncPolicy};
use irongate_transport::TcpClientConfig;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Settings key for the peer host.
pub const HOST: &str = "host";
/// Settings key for the peer port (or listen port on the server side).
pub const PORT: &str = "port";
/// Settings key for the login timeout in milliseconds.
pub const LOGIN_TIMEOUT_MS: &str = "login_timeout_ms";
/// Settings key for the heartbeat interval in milliseconds.
pub const HEARTBEAT_TIMEOUT_MS: &str = "heartbeat_timeout_ms";
/// Settings key for the number of silent intervals before the session is closed.
pub const MAX_MISSED_HEARTBEATS: &str = "max_missed_heartbeats";
/// Settings key for sending Logon right after connecting.
pub const DO_LOGON_ON_START: &str = "do_logon_on_start";
/// Settings key for the heartbeat strategy.
pub const HEARTBEAT_STRATEGY: &str = "heartbeat_strategy";
/// Settings key for the logon user (CompID).
pub const USERNAME: &str = "username";
/// Settings key for the logon password.
pub const PASSWORD: &str = "password";
/// Settings key for the codec resync policy.
pub const RESYNC_POLICY: &str = "resync_policy";
/// Settings key for the connect timeout in milliseconds.
pub const CONNECT_TIMEOUT_MS: &str = "connect_timeout_ms";

/// When heartbeats are exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeartbeatStrategy {
    /// Only while logged in.
    #[default]
    LoggedIn,
    /// As soon as the transport is open.
    Connected,
}

impl FromStr for HeartbeatStrategy {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "logged_in" | "loggedin" => Ok(Self::LoggedIn),
            "connected" => Ok(Self::Connected),
            _ => Err(SessionError::invalid_setting(HEARTBEAT_STRATEGY, s)),
        }
    }
}

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Peer host (client) or bind host (server).
    pub host: String,
    /// Peer port (client) or listen port (server).
    pub port: u16,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Time allowed between Logon and its outcome.
    pub login_timeout: Duration,
    /// Heartbeat interval.
    pub heartbeat_timeout: Duration,
    /// Silent intervals tolerated before the session is force-closed.
    pub max_missed_heartbeats: u32,
    /// Send Logon right after connecting.
    pub do_logon_on_start: bool,
    /// When heartbeats are exchanged.
    pub heartbeat_strategy: HeartbeatStrategy,
    /// Logon user (client) or expected user (server, empty accepts anyone).
    pub username: String,
    /// Logon password (client) or expected password (server).
    pub password: String,
    /// Codec resync policy.
    pub resync_policy: ResyncPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            connect_timeout: Duration::from_secs(5),
            login_timeout: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(3),
            max_missed_heartbeats: 5,
            do_logon_on_start: true,
            heartbeat_strategy: HeartbeatStrategy::LoggedIn,
            username: String::new(),
            password: String::new(),
            resync_policy: ResyncPolicy::Disconnect,
        }
    }
}

impl SessionConfig {
    /// Creates a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a descriptor's settings map. Absent keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidSetting`] for unparseable values.
    pub fn from_settings(settings: &BTreeMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(host) = settings.get(HOST) {
            config.host.clone_from(host);
        }
        if let Some(port) = parse(settings, PORT)? {
            config.port = port;
        }
        if let Some(ms) = parse(settings, CONNECT_TIMEOUT_MS)? {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(settings, LOGIN_TIMEOUT_MS)? {
            config.login_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(settings, HEARTBEAT_TIMEOUT_MS)? {
            config.heartbeat_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = parse(settings, MAX_MISSED_HEARTBEATS)? {
            config.max_missed_heartbeats = max;
        }
        if let Some(flag) = parse(settings, DO_LOGON_ON_START)? {
            config.do_logon_on_start = flag;
        }
        if let Some(strategy) = settings.get(HEARTBEAT_STRATEGY) {
            config.heartbeat_strategy = strategy.parse()?;
        }
        if let Some(username) = settings.get(USERNAME) {
            config.username.clone_from(username);
        }
        if let Some(password) = settings.get(PASSWORD) {
            config.password.clone_from(password);
        }
        if let Some(policy) = settings.get(RESYNC_POLICY) {
            config.resync_policy = policy
                .parse()
                .map_err(|_| SessionError::invalid_setting(RESYNC_POLICY, policy.as_str()))?;
        }
        if config.heartbeat_timeout.is_zero() {
            return Err(SessionError::invalid_setting(HEARTBEAT_TIMEOUT_MS, "0"));
        }
        Ok(config)
    }

    /// Sets the peer address.
    #[must_use]
    pub fn peer(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Sets the login timeout.
    #[must_use]
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Sets the heartbeat interval and the tolerated number of silent intervals.
    #[must_use]
    pub fn heartbeat(mut self, interval: Duration, max_missed: u32) -> Self {
        self.heartbeat_timeout = interval;
        self.max_missed_heartbeats = max_missed;
        self
    }

    /// Sets the heartbeat strategy.
    #[must_use]
    pub fn heartbeat_strategy(mut self, strategy: HeartbeatStrategy) -> Self {
        self.heartbeat_strategy = strategy;
        self
    }

    /// Enables or disables logon right after connecting.
    #[must_use]
    pub fn do_logon_on_start(mut self, enabled: bool) -> Self {
        self.do_logon_on_start = enabled;
        self
    }

    /// Sets the logon credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the codec resync policy.
    #[must_use]
    pub fn resync_policy(mut self, policy: ResyncPolicy) -> Self {
        self.resync_policy = policy;
        self
    }

    /// Returns the codec configuration derived from this session configuration.
    #[must_use]
    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig::default().resync_policy(self.resync_policy)
    }

    /// Returns the TCP connector configuration for the peer.
    #[must_use]
    pub fn tcp_client_config(&self) -> TcpClientConfig {
        TcpClientConfig::new(self.host.clone(), self.port).connect_timeout(self.connect_timeout)
    }
}

fn parse<T: FromStr>(settings: &BTreeMap<String, String>, key: &str) -> Result<Option<T>> {
    settings
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| SessionError::invalid_setting(key, raw.as_str()))
        })
        .transpose()
}
