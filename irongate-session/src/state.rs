//! Session states.

/// Lifecycle state of a session.
///
/// `SessionClosed` is both the initial and the terminal state; how the session
/// got there is carried by [`SessionStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No transport.
    #[default]
    SessionClosed,
    /// Transport open, not logged in.
    SessionCreated,
    /// Logon sent (client) or received (server), waiting for the outcome.
    LoggingIn,
    /// Logged in; heartbeats armed.
    LoggedIn,
    /// Logged out; transport still open.
    LoggedOut,
}

impl SessionState {
    /// Returns true while a transport is attached.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        !matches!(self, Self::SessionClosed)
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SessionClosed => "SessionClosed",
            Self::SessionCreated => "SessionCreated",
            Self::LoggingIn => "LoggingIn",
            Self::LoggedIn => "LoggedIn",
            Self::LoggedOut => "LoggedOut",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// Open, or closed cleanly and reusable.
    #[default]
    Active,
    /// Closed on request.
    Closed,
    /// Closed because of a failure (logon reject or timeout, heartbeat expiry,
    /// transport error).
    Error,
    /// Disposed; the session is never reopened.
    Disposed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Active => "Active",
            Self::Closed => "Closed",
            Self::Error => "Error",
            Self::Disposed => "Disposed",
        };
        f.write_str(name)
    }
}

/// State and status observed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    /// Lifecycle state.
    pub state: SessionState,
    /// Health.
    pub status: SessionStatus,
}

impl SessionSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(state: SessionState, status: SessionStatus) -> Self {
        Self { state, status }
    }
}

/// Which end of the connection a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Connects out and sends Logon.
    Client,
    /// Accepts a stream and answers Logon.
    Server,
}
