//! Session state machine.
//!
//! A [`Session`] owns one transport at a time, the codec bound to its
//! protocol dictionary and a heartbeat monitor. Two background tasks run per
//! connection: the reader, which feeds inbound messages through the state
//! machine, and the heartbeat task. Both stop when the connection's
//! cancellation token fires.
//!
//! Every outbound write goes through the writer lock and re-checks the state
//! under it. Closing takes the same lock before moving to `SessionClosed`, so
//! once a session is closed nothing else is written.

use crate::config::{HEARTBEAT_TIMEOUT_MS, HeartbeatStrategy, SessionConfig};
use crate::error::{Result, SessionError};
use crate::heartbeat::{HeartbeatAction, HeartbeatMonitor};
use crate::listener::SessionListener;
use crate::protocol::{AdminMessage, LogonOutcome, SessionProtocol};
use crate::state::{SessionRole, SessionSnapshot, SessionState, SessionStatus};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use irongate_codec::Codec;
use irongate_core::Message;
use irongate_transport::{BoxedStream, Connector, FrameCodec, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

type Writer = FramedWrite<WriteHalf<BoxedStream>, FrameCodec>;
type Reader = FramedRead<ReadHalf<BoxedStream>, FrameCodec>;

/// Upper bound for flushing and shutting down the write half on close.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Builder for [`Session`].
pub struct SessionBuilder {
    name: String,
    role: SessionRole,
    config: SessionConfig,
    protocol: Arc<dyn SessionProtocol>,
    connector: Option<Arc<dyn Connector>>,
    listener: Option<Arc<dyn SessionListener>>,
}

impl SessionBuilder {
    /// Creates a builder for a client session with default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, protocol: Arc<dyn SessionProtocol>) -> Self {
        Self {
            name: name.into(),
            role: SessionRole::Client,
            config: SessionConfig::default(),
            protocol,
            connector: None,
            listener: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the role.
    #[must_use]
    pub fn role(mut self, role: SessionRole) -> Self {
        self.role = role;
        self
    }

    /// Sets the connector used by [`Session::connect`].
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the event listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Builds the session and its codec.
    ///
    /// # Errors
    /// Returns [`SessionError::Schema`] if the protocol dictionary is
    /// inconsistent, [`SessionError::NoConnector`] for a client without a
    /// connector, or [`SessionError::InvalidSetting`] for a zero heartbeat
    /// interval.
    pub fn build(self) -> Result<Session> {
        if self.role == SessionRole::Client && self.connector.is_none() {
            return Err(SessionError::NoConnector { name: self.name });
        }
        if self.config.heartbeat_timeout.is_zero() {
            return Err(SessionError::invalid_setting(HEARTBEAT_TIMEOUT_MS, "0"));
        }
        let dictionary = self.protocol.dictionary();
        let codec = Codec::from_dictionary(dictionary.as_ref(), self.config.codec_config())?;
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        let heartbeat = HeartbeatMonitor::new(self.config.max_missed_heartbeats);

        Ok(Session {
            inner: Arc::new(Inner {
                name: self.name,
                role: self.role,
                config: self.config,
                protocol: self.protocol,
                frame_codec: FrameCodec::new(Arc::new(codec)),
                connector: self.connector,
                listener: self.listener,
                snapshot,
                writer: tokio::sync::Mutex::new(None),
                heartbeat,
                connection: Mutex::new(Connection::default()),
                last_error: Mutex::new(None),
            }),
        })
    }
}

/// Handle to a session. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    role: SessionRole,
    config: SessionConfig,
    protocol: Arc<dyn SessionProtocol>,
    frame_codec: FrameCodec,
    connector: Option<Arc<dyn Connector>>,
    listener: Option<Arc<dyn SessionListener>>,
    snapshot: watch::Sender<SessionSnapshot>,
    writer: tokio::sync::Mutex<Option<Writer>>,
    heartbeat: HeartbeatMonitor,
    connection: Mutex<Connection>,
    last_error: Mutex<Option<String>>,
}

/// Identity of the current transport; tasks of older transports carry a stale id.
struct Connection {
    id: u64,
    cancel: CancellationToken,
}

impl Default for Connection {
    fn default() -> Self {
        let cancel = CancellationToken::new();
        cancel.cancel();
        Self { id: 0, cancel }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.inner.name)
            .field("role", &self.inner.role)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl Session {
    /// Starts a builder.
    #[must_use]
    pub fn builder(name: impl Into<String>, protocol: Arc<dyn SessionProtocol>) -> SessionBuilder {
        SessionBuilder::new(name, protocol)
    }

    /// Returns the session name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the role.
    #[must_use]
    pub fn role(&self) -> SessionRole {
        self.inner.role
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Returns the codec bound to the protocol dictionary.
    #[must_use]
    pub fn codec(&self) -> &Arc<Codec> {
        self.inner.frame_codec.codec()
    }

    /// Returns the current state and status.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        *self.inner.snapshot.borrow()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.snapshot().state
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.snapshot().status
    }

    /// Returns true while a transport is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns true while logged in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.state() == SessionState::LoggedIn
    }

    /// Returns the reason of the last failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    /// Returns the number of consecutive silent heartbeat intervals.
    #[must_use]
    pub fn missed_heartbeats(&self) -> u32 {
        self.inner.heartbeat.missed_count()
    }

    /// Returns when inbound traffic was last seen.
    #[must_use]
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.inner.heartbeat.last_activity()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Waits until the session reaches `state`, up to `timeout`.
    ///
    /// Returns false on timeout.
    pub async fn wait_for_state(&self, state: SessionState, timeout: Duration) -> bool {
        let mut rx = self.subscribe();
        tokio::time::timeout(timeout, rx.wait_for(|s| s.state == state))
            .await
            .is_ok_and(|r| r.is_ok())
    }

    /// Opens the transport through the connector and, if configured, logs on.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidState`] unless the session is closed and
    /// not disposed, a transport error if the peer cannot be reached, or a
    /// logon error.
    pub async fn connect(&self) -> Result<()> {
        let connector = self
            .inner
            .connector
            .clone()
            .ok_or_else(|| SessionError::NoConnector {
                name: self.inner.name.clone(),
            })?;
        self.ensure_reopenable("connect")?;

        tracing::info!(session = %self.inner.name, peer = %connector.peer(), "connecting");
        let stream = match connector.connect().await {
            Ok(stream) => stream,
            Err(err) => {
                self.mark_failed(err.to_string());
                return Err(err.into());
            }
        };
        self.attach(stream).await?;

        if self.inner.config.do_logon_on_start {
            self.login().await?;
        }
        Ok(())
    }

    /// Attaches an already open stream.
    ///
    /// Server sessions then wait for Logon and close with an error if none
    /// arrives within the login timeout.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidState`] unless the session is closed and
    /// not disposed.
    pub async fn attach(&self, stream: BoxedStream) -> Result<()> {
        let (read_half, write_half) = tokio::io::split(stream);

        let mut writer = self.inner.writer.lock().await;
        let opened = self.transition(|s| {
            (s.state == SessionState::SessionClosed && s.status != SessionStatus::Disposed)
                .then_some(SessionSnapshot::new(SessionState::SessionCreated, SessionStatus::Active))
        });
        if opened.is_none() {
            return Err(SessionError::invalid_state(self.state(), "attach"));
        }
        *writer = Some(FramedWrite::new(write_half, self.inner.frame_codec.clone()));
        let (id, cancel) = {
            let mut connection = self.inner.connection.lock();
            connection.id += 1;
            connection.cancel = CancellationToken::new();
            (connection.id, connection.cancel.clone())
        };
        drop(writer);

        *self.inner.last_error.lock() = None;
        self.inner.heartbeat.reset();

        let reader = FramedRead::new(read_half, self.inner.frame_codec.clone());
        tokio::spawn(self.clone().read_loop(reader, id, cancel.clone()));
        tokio::spawn(self.clone().heartbeat_loop(id, cancel.clone()));
        if self.inner.role == SessionRole::Server {
            tokio::spawn(self.clone().logon_watchdog(id, cancel));
        }
        Ok(())
    }

    /// Sends Logon and waits for the outcome.
    ///
    /// # Errors
    /// Returns [`SessionError::LogonRejected`] if the peer rejects (the session
    /// is then closed with status `Error`), [`SessionError::LoginTimeout`] if
    /// no reply arrives in time (same), or [`SessionError::InvalidState`]
    /// unless the session is `SessionCreated` or `LoggedOut`.
    pub async fn login(&self) -> Result<()> {
        if self.inner.role != SessionRole::Client {
            return Err(SessionError::invalid_state(self.state(), "login"));
        }
        let mut rx = self.subscribe();
        let logon = self.inner.protocol.logon(&self.inner.config);
        let id = self.connection_id();

        {
            let mut writer = self.inner.writer.lock().await;
            let entered = self.transition(|s| {
                matches!(s.state, SessionState::SessionCreated | SessionState::LoggedOut)
                    .then_some(SessionSnapshot::new(SessionState::LoggingIn, SessionStatus::Active))
            });
            if entered.is_none() {
                return Err(SessionError::invalid_state(self.state(), "login"));
            }
            if let Err(err) = Self::write(&mut writer, &logon).await {
                drop(writer);
                self.close_connection(Some(id), SessionStatus::Error, Some(err.to_string()))
                    .await;
                return Err(err);
            }
        }
        tracing::info!(session = %self.inner.name, "logon sent");

        let timeout = self.inner.config.login_timeout;
        let settled = tokio::time::timeout(timeout, async {
            rx.wait_for(|s| s.state != SessionState::LoggingIn)
                .await
                .map(|s| *s)
        })
        .await;

        match settled {
            Ok(Ok(snapshot)) if snapshot.state == SessionState::LoggedIn => Ok(()),
            Ok(_) => Err(SessionError::LogonRejected {
                reason: self
                    .last_error()
                    .unwrap_or_else(|| "session closed during logon".to_string()),
            }),
            Err(_) => {
                if self.is_logged_in() {
                    return Ok(());
                }
                tracing::warn!(session = %self.inner.name, ?timeout, "logon timed out");
                self.close_connection(Some(id), SessionStatus::Error, Some("login timeout".to_string()))
                    .await;
                Err(SessionError::LoginTimeout { timeout })
            }
        }
    }

    /// Sends Logout and moves to `LoggedOut`. The transport stays open.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidState`] unless logged in.
    pub async fn logout(&self, reason: Option<&str>) -> Result<()> {
        let message = self.inner.protocol.logout(reason);
        let id = self.connection_id();
        let mut writer = self.inner.writer.lock().await;
        let state = self.state();
        if state != SessionState::LoggedIn {
            return Err(SessionError::invalid_state(state, "logout"));
        }
        if let Err(err) = Self::write(&mut writer, &message).await {
            drop(writer);
            self.fail_on_transport(id, &err).await;
            return Err(err);
        }
        self.transition(|s| {
            (s.state == SessionState::LoggedIn)
                .then_some(SessionSnapshot::new(SessionState::LoggedOut, SessionStatus::Active))
        });
        Ok(())
    }

    /// Sends a message on the open transport.
    ///
    /// # Errors
    /// Returns [`SessionError::NotConnected`] when closed, or the codec or
    /// transport error.
    pub async fn send(&self, message: &Message) -> Result<()> {
        let id = self.connection_id();
        let mut writer = self.inner.writer.lock().await;
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        if let Err(err) = Self::write(&mut writer, message).await {
            drop(writer);
            self.fail_on_transport(id, &err).await;
            return Err(err);
        }
        Ok(())
    }

    /// Closes the transport. The session can be connected again afterwards.
    pub async fn close(&self) {
        self.close_connection(None, SessionStatus::Closed, None).await;
    }

    /// Logs out if logged in, closes the transport and marks the session disposed.
    pub async fn dispose(&self) {
        if self.is_logged_in()
            && let Err(err) = self.logout(Some("session disposed")).await
        {
            tracing::debug!(session = %self.inner.name, error = %err, "logout on dispose failed");
        }
        self.close_connection(None, SessionStatus::Disposed, None).await;
    }

    fn ensure_reopenable(&self, operation: &'static str) -> Result<()> {
        let current = self.snapshot();
        if current.state != SessionState::SessionClosed || current.status == SessionStatus::Disposed {
            return Err(SessionError::invalid_state(current.state, operation));
        }
        Ok(())
    }

    fn connection_id(&self) -> u64 {
        self.inner.connection.lock().id
    }

    /// Applies `next` atomically and notifies on change.
    fn transition(
        &self,
        next: impl FnOnce(SessionSnapshot) -> Option<SessionSnapshot>,
    ) -> Option<SessionSnapshot> {
        let mut applied = None;
        self.inner.snapshot.send_if_modified(|current| match next(*current) {
            Some(snapshot) if snapshot != *current => {
                *current = snapshot;
                applied = Some(snapshot);
                true
            }
            _ => false,
        });
        if let Some(snapshot) = applied {
            tracing::info!(
                session = %self.inner.name,
                state = %snapshot.state,
                status = %snapshot.status,
                "session state changed"
            );
            if let Some(listener) = &self.inner.listener {
                listener.on_state_change(&self.inner.name, snapshot);
            }
        }
        applied
    }

    fn mark_failed(&self, reason: String) {
        tracing::error!(session = %self.inner.name, %reason, "session failed");
        *self.inner.last_error.lock() = Some(reason);
        self.transition(|s| {
            (s.state == SessionState::SessionClosed && s.status != SessionStatus::Disposed)
                .then_some(SessionSnapshot::new(SessionState::SessionClosed, SessionStatus::Error))
        });
    }

    async fn write(writer: &mut Option<Writer>, message: &Message) -> Result<()> {
        let writer = writer.as_mut().ok_or(SessionError::NotConnected)?;
        writer.send(message).await.map_err(|err| match err {
            TransportError::Codec(err) => SessionError::Codec(err),
            other => SessionError::Transport(other),
        })
    }

    async fn fail_on_transport(&self, id: u64, err: &SessionError) {
        if matches!(err, SessionError::Transport(_)) {
            self.close_connection(Some(id), SessionStatus::Error, Some(err.to_string()))
                .await;
        }
    }

    /// Closes the transport identified by `id` (any transport for `None`).
    ///
    /// Returns true if this call moved the session to `SessionClosed`.
    async fn close_connection(
        &self,
        id: Option<u64>,
        status: SessionStatus,
        reason: Option<String>,
    ) -> bool {
        let mut writer = self.inner.writer.lock().await;
        let cancel = {
            let connection = self.inner.connection.lock();
            if id.is_some_and(|id| id != connection.id) {
                return false;
            }
            connection.cancel.clone()
        };
        if self.state() != SessionState::SessionClosed
            && let Some(reason) = reason
        {
            *self.inner.last_error.lock() = Some(reason);
        }
        let closed = self.transition(|s| {
            if s.state != SessionState::SessionClosed {
                Some(SessionSnapshot::new(SessionState::SessionClosed, status))
            } else if status == SessionStatus::Disposed {
                Some(SessionSnapshot::new(SessionState::SessionClosed, SessionStatus::Disposed))
            } else {
                None
            }
        });
        let open = writer.take();
        drop(writer);
        cancel.cancel();

        if let Some(mut open) = open {
            match tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, SinkExt::<Message>::close(&mut open)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::debug!(session = %self.inner.name, error = %err, "error closing transport");
                }
                Err(_) => tracing::debug!(session = %self.inner.name, "transport close timed out"),
            }
        }
        closed.is_some_and(|s| s.state == SessionState::SessionClosed)
    }

    async fn read_loop(self, mut reader: Reader, id: u64, cancel: CancellationToken) {
        loop {
            let item = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                item = reader.next() => item,
            };
            match item {
                Some(Ok(Ok(message))) => self.on_inbound(message, id).await,
                Some(Ok(Err(err))) => {
                    tracing::warn!(session = %self.inner.name, error = %err, "dropped inbound frame");
                    if let Some(listener) = &self.inner.listener {
                        listener.on_protocol_error(&self.inner.name, &err);
                    }
                }
                Some(Err(err)) => {
                    tracing::error!(session = %self.inner.name, error = %err, "transport failed");
                    self.close_connection(Some(id), SessionStatus::Error, Some(err.to_string()))
                        .await;
                    return;
                }
                None => {
                    let status = if self.state() == SessionState::LoggedOut {
                        SessionStatus::Closed
                    } else {
                        SessionStatus::Error
                    };
                    tracing::info!(session = %self.inner.name, "connection closed by peer");
                    self.close_connection(Some(id), status, Some("connection closed by peer".to_string()))
                        .await;
                    return;
                }
            }
        }
    }

    async fn on_inbound(&self, message: Message, id: u64) {
        self.inner.heartbeat.on_inbound();
        tracing::debug!(session = %self.inner.name, message = message.name(), "received");
        if let Some(listener) = &self.inner.listener {
            listener.on_message(&self.inner.name, &message);
        }

        match (self.inner.role, self.inner.protocol.classify(&message)) {
            (SessionRole::Client, AdminMessage::LogonReply(outcome)) => {
                self.on_logon_reply(outcome, id).await;
            }
            (SessionRole::Server, AdminMessage::Logon) => self.on_logon(&message, id).await,
            (_, AdminMessage::Logout) => self.on_logout(id).await,
            _ => {}
        }
    }

    async fn on_logon_reply(&self, outcome: LogonOutcome, id: u64) {
        match outcome {
            LogonOutcome::Accepted => {
                let entered = self.transition(|s| {
                    (s.state == SessionState::LoggingIn)
                        .then_some(SessionSnapshot::new(SessionState::LoggedIn, SessionStatus::Active))
                });
                if entered.is_none() {
                    tracing::warn!(session = %self.inner.name, state = %self.state(), "unexpected logon reply");
                }
            }
            LogonOutcome::Rejected { code, reason } => {
                tracing::warn!(session = %self.inner.name, code, %reason, "logon rejected");
                if self.state() == SessionState::LoggingIn {
                    self.close_connection(Some(id), SessionStatus::Error, Some(reason))
                        .await;
                }
            }
        }
    }

    async fn on_logon(&self, logon: &Message, id: u64) {
        let mut writer = self.inner.writer.lock().await;
        let entered = self.transition(|s| {
            matches!(s.state, SessionState::SessionCreated | SessionState::LoggedOut)
                .then_some(SessionSnapshot::new(SessionState::LoggingIn, SessionStatus::Active))
        });
        if entered.is_none() {
            tracing::warn!(session = %self.inner.name, state = %self.state(), "unexpected logon");
            return;
        }

        let outcome = self.inner.protocol.authenticate(logon, &self.inner.config);
        let reply = self.inner.protocol.logon_reply(&outcome);
        if let Err(err) = Self::write(&mut writer, &reply).await {
            drop(writer);
            self.close_connection(Some(id), SessionStatus::Error, Some(err.to_string()))
                .await;
            return;
        }

        match outcome {
            LogonOutcome::Accepted => {
                self.transition(|s| {
                    (s.state == SessionState::LoggingIn)
                        .then_some(SessionSnapshot::new(SessionState::LoggedIn, SessionStatus::Active))
                });
            }
            LogonOutcome::Rejected { code, reason } => {
                drop(writer);
                tracing::warn!(session = %self.inner.name, code, %reason, "rejected logon");
                self.close_connection(Some(id), SessionStatus::Error, Some(reason))
                    .await;
            }
        }
    }

    async fn on_logout(&self, id: u64) {
        let mut writer = self.inner.writer.lock().await;
        if self.state() != SessionState::LoggedIn {
            return;
        }
        if self.inner.role == SessionRole::Server {
            let reply = self.inner.protocol.logout(None);
            if let Err(err) = Self::write(&mut writer, &reply).await {
                drop(writer);
                self.fail_on_transport(id, &err).await;
                return;
            }
        }
        self.transition(|s| {
            (s.state == SessionState::LoggedIn)
                .then_some(SessionSnapshot::new(SessionState::LoggedOut, SessionStatus::Active))
        });
    }

    fn heartbeat_armed(&self, state: SessionState) -> bool {
        match self.inner.config.heartbeat_strategy {
            HeartbeatStrategy::LoggedIn => state == SessionState::LoggedIn,
            HeartbeatStrategy::Connected => state.is_connected(),
        }
    }

    async fn heartbeat_loop(self, id: u64, cancel: CancellationToken) {
        let period = self.inner.config.heartbeat_timeout;
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            if !self.heartbeat_armed(self.state()) {
                self.inner.heartbeat.reset();
                continue;
            }

            match self.inner.heartbeat.on_tick() {
                HeartbeatAction::Idle => {}
                HeartbeatAction::Send => {
                    let heartbeat = self.inner.protocol.heartbeat();
                    let mut writer = self.inner.writer.lock().await;
                    if !self.heartbeat_armed(self.state()) {
                        continue;
                    }
                    if let Err(err) = Self::write(&mut writer, &heartbeat).await {
                        drop(writer);
                        tracing::debug!(session = %self.inner.name, error = %err, "heartbeat not sent");
                        self.fail_on_transport(id, &err).await;
                    }
                }
                HeartbeatAction::Expire => {
                    let missed = self.inner.heartbeat.missed_count();
                    tracing::warn!(session = %self.inner.name, missed, "heartbeat timeout, closing session");
                    self.close_connection(
                        Some(id),
                        SessionStatus::Error,
                        Some(format!("no inbound traffic for {missed} heartbeat intervals")),
                    )
                    .await;
                    return;
                }
            }
        }
    }

    async fn logon_watchdog(self, id: u64, cancel: CancellationToken) {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(self.inner.config.login_timeout) => {}
        }
        if matches!(self.state(), SessionState::SessionCreated | SessionState::LoggingIn) {
            tracing::warn!(session = %self.inner.name, "no logon within login timeout");
            self.close_connection(Some(id), SessionStatus::Error, Some("no logon received".to_string()))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntg::NtgProtocol;
    use crate::ntg::dictionary::{HEARTBEAT, LOGON, LOGON_REPLY, LOGOUT, NAMESPACE, fields};
    use async_trait::async_trait;
    use irongate_codec::CodecConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::DuplexStream;

    /// Hands out one pre-opened stream.
    struct OneShotConnector(Mutex<Option<DuplexStream>>);

    #[async_trait]
    impl Connector for OneShotConnector {
        async fn connect(&self) -> std::result::Result<BoxedStream, TransportError> {
            let stream = self.0.lock().take().ok_or(TransportError::ConnectionClosed)?;
            Ok(Box::new(stream))
        }

        fn peer(&self) -> String {
            "duplex".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        states: Mutex<Vec<SessionSnapshot>>,
        messages: Mutex<Vec<String>>,
    }

    impl SessionListener for RecordingListener {
        fn on_state_change(&self, _session: &str, snapshot: SessionSnapshot) {
            self.states.lock().push(snapshot);
        }

        fn on_message(&self, _session: &str, message: &Message) {
            self.messages.lock().push(message.name().to_string());
        }
    }

    #[derive(Clone, Copy)]
    enum PeerMode {
        Accept,
        Reject,
        Silent,
    }

    fn frame_codec() -> FrameCodec {
        let protocol = NtgProtocol::new().unwrap();
        let codec =
            Codec::from_dictionary(protocol.dictionary().as_ref(), CodecConfig::default()).unwrap();
        FrameCodec::new(Arc::new(codec))
    }

    /// Minimal exchange side: answers Logon and Logout, counts heartbeats.
    fn spawn_peer(stream: DuplexStream, mode: PeerMode, heartbeats: Arc<AtomicUsize>) {
        tokio::spawn(async move {
            let (read_half, write_half) = tokio::io::split(stream);
            let mut reader = FramedRead::new(read_half, frame_codec());
            let mut writer = FramedWrite::new(write_half, frame_codec());
            while let Some(Ok(Ok(message))) = reader.next().await {
                let reply = match (message.name(), mode) {
                    (LOGON, PeerMode::Accept) => {
                        Some(Message::new(LOGON_REPLY, NAMESPACE).with(fields::REJECT_CODE, 0))
                    }
                    (LOGON, PeerMode::Reject) => {
                        Some(Message::new(LOGON_REPLY, NAMESPACE).with(fields::REJECT_CODE, 1))
                    }
                    (LOGOUT, _) => Some(Message::new(LOGOUT, NAMESPACE)),
                    (HEARTBEAT, _) => {
                        heartbeats.fetch_add(1, Ordering::SeqCst);
                        None
                    }
                    _ => None,
                };
                if let Some(reply) = reply {
                    let _ = writer.send(reply).await;
                }
            }
        });
    }

    /// Exchange side that answers Logon and then sends a Heartbeat every
    /// `every` on its own.
    fn spawn_chatty_peer(stream: DuplexStream, every: Duration, heartbeats: Arc<AtomicUsize>) {
        tokio::spawn(async move {
            let (read_half, write_half) = tokio::io::split(stream);
            let mut reader = FramedRead::new(read_half, frame_codec());
            let mut writer = FramedWrite::new(write_half, frame_codec());
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            let mut logged_in = false;
            loop {
                tokio::select! {
                    frame = reader.next() => {
                        let Some(Ok(Ok(message))) = frame else { return };
                        match message.name() {
                            LOGON => {
                                logged_in = true;
                                let reply = Message::new(LOGON_REPLY, NAMESPACE).with(fields::REJECT_CODE, 0);
                                let _ = writer.send(reply).await;
                            }
                            HEARTBEAT => {
                                heartbeats.fetch_add(1, Ordering::SeqCst);
                            }
                            _ => {}
                        }
                    }
                    _ = ticker.tick(), if logged_in => {
                        let _ = writer.send(Message::new(HEARTBEAT, NAMESPACE)).await;
                    }
                }
            }
        });
    }

    fn client(config: SessionConfig, stream: DuplexStream) -> (Session, Arc<RecordingListener>) {
        let listener = Arc::new(RecordingListener::default());
        let session = Session::builder("client", Arc::new(NtgProtocol::new().unwrap()))
            .config(config.credentials("TRADER1", "secret"))
            .connector(Arc::new(OneShotConnector(Mutex::new(Some(stream)))))
            .listener(listener.clone())
            .build()
            .unwrap();
        (session, listener)
    }

    #[test]
    fn test_client_requires_connector() {
        let err = Session::builder("c", Arc::new(NtgProtocol::new().unwrap()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::NoConnector { .. }));
    }

    #[tokio::test]
    async fn test_logon_accepted_then_logout() {
        let (local, remote) = tokio::io::duplex(4096);
        spawn_peer(remote, PeerMode::Accept, Arc::default());
        let (session, listener) = client(SessionConfig::default(), local);

        assert_eq!(session.state(), SessionState::SessionClosed);
        session.connect().await.unwrap();
        assert!(session.is_logged_in());
        assert_eq!(session.status(), SessionStatus::Active);

        session.logout(Some("done")).await.unwrap();
        assert_eq!(session.state(), SessionState::LoggedOut);
        assert!(session.is_connected());

        session.close().await;
        assert_eq!(
            session.snapshot(),
            SessionSnapshot::new(SessionState::SessionClosed, SessionStatus::Closed)
        );

        let states: Vec<_> = listener.states.lock().iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![
                SessionState::SessionCreated,
                SessionState::LoggingIn,
                SessionState::LoggedIn,
                SessionState::LoggedOut,
                SessionState::SessionClosed,
            ]
        );
        assert_eq!(listener.messages.lock().first().map(String::as_str), Some(LOGON_REPLY));
    }

    #[tokio::test]
    async fn test_logon_rejected_closes_with_error() {
        let (local, remote) = tokio::io::duplex(4096);
        spawn_peer(remote, PeerMode::Reject, Arc::default());
        let (session, _) = client(SessionConfig::default(), local);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::LogonRejected { .. }));
        assert_eq!(session.state(), SessionState::SessionClosed);
        assert_eq!(session.status(), SessionStatus::Error);
        assert!(!session.is_connected());
        assert_eq!(
            session.last_error().as_deref(),
            Some(NtgProtocol::reject_reason(1))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_timeout() {
        let (local, remote) = tokio::io::duplex(4096);
        spawn_peer(remote, PeerMode::Silent, Arc::default());
        let config = SessionConfig::default().login_timeout(Duration::from_secs(2));
        let (session, _) = client(config, local);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::LoginTimeout { .. }));
        assert_eq!(session.status(), SessionStatus::Error);
        assert!(!session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_expiry_after_silent_peer() {
        let (local, remote) = tokio::io::duplex(4096);
        let heartbeats = Arc::new(AtomicUsize::new(0));
        spawn_peer(remote, PeerMode::Accept, heartbeats.clone());
        let config = SessionConfig::default().heartbeat(Duration::from_millis(500), 5);
        let (session, _) = client(config, local);

        session.connect().await.unwrap();
        assert!(session.is_logged_in());

        // The logon reply counts as traffic for the first interval.
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(session.is_logged_in());
        assert_eq!(heartbeats.load(Ordering::SeqCst), 4);
        assert_eq!(session.missed_heartbeats(), 4);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            session.snapshot(),
            SessionSnapshot::new(SessionState::SessionClosed, SessionStatus::Error)
        );

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(heartbeats.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_heartbeat_while_peer_is_talking() {
        let (local, remote) = tokio::io::duplex(4096);
        let heartbeats = Arc::new(AtomicUsize::new(0));
        spawn_chatty_peer(remote, Duration::from_millis(250), heartbeats.clone());
        let config = SessionConfig::default().heartbeat(Duration::from_millis(500), 1);
        let (session, _) = client(config, local);

        session.connect().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(session.is_logged_in());
        assert_eq!(session.missed_heartbeats(), 0);
        assert_eq!(heartbeats.load(Ordering::SeqCst), 0);
        assert!(session.last_activity().is_some());
    }

    #[test]
    fn test_zero_heartbeat_interval_is_rejected() {
        let (local, _remote) = tokio::io::duplex(64);
        let err = Session::builder("c", Arc::new(NtgProtocol::new().unwrap()))
            .config(SessionConfig::default().heartbeat(Duration::ZERO, 3))
            .connector(Arc::new(OneShotConnector(Mutex::new(Some(local)))))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidSetting { ref key, .. } if key == HEARTBEAT_TIMEOUT_MS
        ));
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let (local, _remote) = tokio::io::duplex(4096);
        let (session, _) = client(SessionConfig::default(), local);
        let err = session
            .send(&Message::new(HEARTBEAT, NAMESPACE))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }

    #[tokio::test]
    async fn test_dispose_is_terminal() {
        let (local, remote) = tokio::io::duplex(4096);
        spawn_peer(remote, PeerMode::Accept, Arc::default());
        let (session, _) = client(SessionConfig::default(), local);
        session.connect().await.unwrap();

        session.dispose().await;
        assert_eq!(
            session.snapshot(),
            SessionSnapshot::new(SessionState::SessionClosed, SessionStatus::Disposed)
        );
        assert!(matches!(
            session.connect().await,
            Err(SessionError::InvalidState { .. })
        ));
    }

    fn server(credentials: (&str, &str), login_timeout: Duration) -> Session {
        Session::builder("server", Arc::new(NtgProtocol::new().unwrap()))
            .role(SessionRole::Server)
            .config(
                SessionConfig::default()
                    .credentials(credentials.0, credentials.1)
                    .login_timeout(login_timeout),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_server_accepts_logon_and_logout() {
        let (local, remote) = tokio::io::duplex(4096);
        let server = server(("TRADER1", "secret"), Duration::from_secs(5));
        server.attach(Box::new(remote)).await.unwrap();
        let (client, _) = client(SessionConfig::default(), local);

        client.connect().await.unwrap();
        assert!(server.wait_for_state(SessionState::LoggedIn, Duration::from_secs(1)).await);

        client.logout(None).await.unwrap();
        assert!(server.wait_for_state(SessionState::LoggedOut, Duration::from_secs(1)).await);

        client.close().await;
        assert!(
            server
                .wait_for_state(SessionState::SessionClosed, Duration::from_secs(1))
                .await
        );
        assert_eq!(server.status(), SessionStatus::Closed);
    }

    #[tokio::test]
    async fn test_server_rejects_bad_password() {
        let (local, remote) = tokio::io::duplex(4096);
        let server = server(("TRADER1", "other"), Duration::from_secs(5));
        server.attach(Box::new(remote)).await.unwrap();
        let (client, _) = client(SessionConfig::default(), local);

        assert!(matches!(
            client.connect().await,
            Err(SessionError::LogonRejected { .. })
        ));
        assert!(
            server
                .wait_for_state(SessionState::SessionClosed, Duration::from_secs(1))
                .await
        );
        assert_eq!(server.status(), SessionStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_closes_without_logon() {
        let (_local, remote) = tokio::io::duplex(4096);
        let server = server(("", ""), Duration::from_secs(3));
        server.attach(Box::new(remote)).await.unwrap();
        assert_eq!(server.state(), SessionState::SessionCreated);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(
            server.snapshot(),
            SessionSnapshot::new(SessionState::SessionClosed, SessionStatus::Error)
        );
    }

    #[tokio::test]
    async fn test_attach_twice_is_rejected() {
        let (_a, b) = tokio::io::duplex(64);
        let (_c, d) = tokio::io::duplex(64);
        let server = server(("", ""), Duration::from_secs(5));
        server.attach(Box::new(b)).await.unwrap();
        assert!(matches!(
            server.attach(Box::new(d)).await,
            Err(SessionError::InvalidState { .. })
        ));
    }
}
