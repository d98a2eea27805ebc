// src/connection/client.rs

//! Defines `Connection`, an authenticated session to a cluster.

use super::session::{LinkState, Principal, SessionState};
use crate::config::{ClientConfig, Credentials, parse_host};
use crate::core::AdminError;
use crate::core::commands::{AdminCommand, CommandId};
use crate::core::errors::ResultCode;
use crate::core::protocol::{AdminFrame, AdminFrameCodec, FieldId};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// A live link to one node.
struct Link {
    framed: Framed<TcpStream, AdminFrameCodec>,
    addr: SocketAddr,
}

/// An authenticated session to a cluster.
///
/// Requests are strictly request/response: the link sits behind a mutex, so
/// concurrent callers are served one at a time. A transport failure or timeout
/// drops the link; the next call reconnects through the seed list and replays the
/// login. `close` is terminal and aborts any in-flight request.
pub struct Connection {
    config: ClientConfig,
    link: Mutex<Option<Link>>,
    session: RwLock<SessionState>,
    closed: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("hosts", &self.config.hosts)
            .field("state", &self.state())
            .finish()
    }
}

impl Connection {
    /// Opens a session using the first reachable seed host.
    ///
    /// Explicit `credentials` take precedence over the ones in `config`.
    pub async fn connect(
        config: ClientConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, AdminError> {
        if config.hosts.is_empty() {
            return Err(AdminError::Param(
                "hosts must be a non-empty list".to_string(),
            ));
        }
        let credentials = credentials.or_else(|| config.credentials());
        let (shutdown_tx, _) = broadcast::channel(1);

        let connection = Self {
            config,
            link: Mutex::new(None),
            session: RwLock::new(SessionState::new(credentials)),
            closed: AtomicBool::new(false),
            shutdown_tx,
        };

        {
            let mut link = connection.link.lock().await;
            *link = Some(connection.establish().await?);
        }
        Ok(connection)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> LinkState {
        if self.closed.load(Ordering::Acquire) {
            return LinkState::Closed;
        }
        match self.link.try_lock() {
            Ok(link) if link.is_some() => LinkState::Connected,
            Ok(_) => LinkState::Disconnected,
            // Someone holds the link for a request in flight.
            Err(_) => LinkState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// A snapshot of the session state.
    pub fn session(&self) -> SessionState {
        self.session.read().clone()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.session.read().principal.clone()
    }

    /// The timeout applied when a call's policy carries none.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.config.default_timeout()
    }

    /// Fails fast with `RoleViolation` when the logged-in user cannot manage users.
    ///
    /// Roles cached at login are trusted only when they allow the call. A denial is
    /// rechecked against the user's current record, since roles may have been
    /// granted after login. Sessions without a principal defer to the node.
    pub async fn require_user_admin(&self) -> Result<(), AdminError> {
        self.ensure_open()?;
        let user = match &self.session.read().principal {
            Some(p) if !p.can_manage_users() => p.user.clone(),
            _ => return Ok(()),
        };
        match self.refresh_principal(&user).await {
            Ok(principal) if principal.can_manage_users() => Ok(()),
            Ok(_) => Err(AdminError::RoleViolation),
            Err(e @ AdminError::Client(_)) => Err(e),
            Err(e) => {
                debug!("Could not refresh roles of '{user}': {e}");
                Err(AdminError::RoleViolation)
            }
        }
    }

    /// Re-reads the logged-in user's roles from the node and caches them.
    async fn refresh_principal(&self, user: &str) -> Result<Principal, AdminError> {
        let command = AdminCommand::QueryUsers {
            user: Some(user.to_string()),
        };
        let frames = self.execute(command, self.default_timeout()).await?;
        let frame = frames.first().ok_or(AdminError::InvalidUser)?;
        let roles = match frame.field(FieldId::Roles) {
            Some(field) => field.as_roles()?,
            None => Vec::new(),
        };
        let principal = Principal::from_reported(user.to_string(), &roles);

        let mut session = self.session.write();
        if session.principal.as_ref().is_some_and(|p| p.user == user) {
            session.principal = Some(principal.clone());
        }
        Ok(principal)
    }

    /// Replaces the password replayed on reconnect, after a successful password change.
    pub(crate) fn update_password(&self, user: &str, password: &str) {
        let mut session = self.session.write();
        if let Some(creds) = session.credentials.as_mut()
            && creds.user == user
        {
            creds.password = password.to_string();
        }
    }

    fn ensure_open(&self) -> Result<(), AdminError> {
        if self.closed.load(Ordering::Acquire) {
            Err(AdminError::closed())
        } else {
            Ok(())
        }
    }

    /// Closes the session. Idempotent; aborts an in-flight request.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Nobody may be listening; that is fine.
        let _ = self.shutdown_tx.send(());

        let mut link = self.link.lock().await;
        if let Some(mut live) = link.take() {
            if let Err(e) = live.framed.close().await {
                debug!("Error while closing link to {}: {}", live.addr, e);
            }
            info!("Connection to {} closed.", live.addr);
        }
        self.session.write().peer = None;
    }

    /// Sends one command and collects its reply frames.
    ///
    /// Single-reply commands yield one frame; `QueryUsers` yields one frame per
    /// record. A node-reported error code is returned as the matching `AdminError`.
    pub async fn execute(
        &self,
        command: AdminCommand,
        timeout: Option<Duration>,
    ) -> Result<Vec<AdminFrame>, AdminError> {
        // Subscribe before checking the flag so a concurrent close is never missed.
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        self.ensure_open()?;

        let name = command.name();
        let streamed = command.id() == CommandId::QueryUsers;
        let frame = command.into_frame()?;

        let mut link = self.link.lock().await;
        self.ensure_open()?;

        let result = {
            let exchange = self.exchange(&mut link, frame, streamed);
            let bounded = async {
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, exchange).await {
                        Ok(res) => res,
                        Err(_) => Err(AdminError::Timeout),
                    },
                    None => exchange.await,
                }
            };
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => Err(AdminError::closed()),
                res = bounded => res,
            }
        };

        match &result {
            Err(e) if e.breaks_link() => {
                if let Some(dropped) = link.take() {
                    warn!(
                        "Dropping link to {} after failed {}: {}",
                        dropped.addr, name, e
                    );
                }
                self.session.write().peer = None;
            }
            Err(e) => debug!("{} rejected: {} ({})", name, e, e.code()),
            Ok(frames) => debug!("{} completed with {} reply frame(s)", name, frames.len()),
        }
        result
    }

    /// Runs one request/response exchange, reconnecting first if needed.
    async fn exchange(
        &self,
        link: &mut Option<Link>,
        frame: AdminFrame,
        streamed: bool,
    ) -> Result<Vec<AdminFrame>, AdminError> {
        if link.is_none() {
            *link = Some(self.establish().await?);
        }
        let live = link.as_mut().ok_or_else(AdminError::closed)?;

        let command = frame.command;
        live.framed.send(frame).await?;

        let mut replies = Vec::new();
        loop {
            let reply = match live.framed.next().await {
                Some(Ok(reply)) => reply,
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(AdminError::Io(std::sync::Arc::new(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed by peer",
                    ))));
                }
            };
            if reply.command != command {
                return Err(AdminError::protocol(format!(
                    "reply for command {} while waiting for {}",
                    reply.command, command
                )));
            }
            if streamed && reply.result_code == ResultCode::QueryEnd as u8 {
                return Ok(replies);
            }
            if let Some(err) = AdminError::from_result_code(reply.result_code) {
                return Err(err);
            }
            replies.push(reply);
            if !streamed {
                return Ok(replies);
            }
        }
    }

    /// Connects to the first reachable seed and logs in if credentials are set.
    async fn establish(&self) -> Result<Link, AdminError> {
        let credentials = self.session.read().credentials.clone();
        let mut last_error: Option<AdminError> = None;

        for host in &self.config.hosts {
            let (name, port) =
                parse_host(host).map_err(|e| AdminError::Param(format!("{e:#}")))?;

            let stream = match self.dial(&name, port).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!("Seed {host} unreachable: {e}");
                    last_error = Some(e);
                    continue;
                }
            };
            let addr = stream.peer_addr()?;
            let mut framed = Framed::new(stream, AdminFrameCodec);

            let principal = match &credentials {
                Some(creds) => match login(&mut framed, creds, self.config.connect_timeout).await {
                    Ok(principal) => Some(principal),
                    // An unsecured cluster ignores credentials.
                    Err(AdminError::SecurityNotEnabled) => {
                        debug!("Security is not enabled on {addr}; continuing without login.");
                        None
                    }
                    // Credential failures are the same on every seed.
                    Err(e) if !e.breaks_link() => return Err(e),
                    Err(e) => {
                        debug!("Login on {addr} failed: {e}");
                        last_error = Some(e);
                        continue;
                    }
                },
                None => None,
            };

            info!(
                "Connected to {} as {}",
                addr,
                principal.as_ref().map_or("<anonymous>", |p| p.user.as_str())
            );
            let mut session = self.session.write();
            session.principal = principal;
            session.peer = Some(addr);
            return Ok(Link { framed, addr });
        }

        Err(AdminError::Unreachable(format!(
            "no reachable seed among {:?}{}",
            self.config.hosts,
            last_error.map(|e| format!(": {e}")).unwrap_or_default()
        )))
    }

    async fn dial(&self, host: &str, port: u16) -> Result<TcpStream, AdminError> {
        let limit = self.config.connect_timeout;
        let stream = tokio::time::timeout(limit, TcpStream::connect((host, port))).await??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Authenticates a fresh link and returns the principal the node reports.
async fn login(
    framed: &mut Framed<TcpStream, AdminFrameCodec>,
    credentials: &Credentials,
    limit: Duration,
) -> Result<Principal, AdminError> {
    let request = AdminCommand::Login {
        user: credentials.user.clone(),
        password: credentials.password.clone(),
    }
    .into_frame()?;

    let exchange = async {
        framed.send(request).await?;
        match framed.next().await {
            Some(reply) => reply,
            None => Err(AdminError::Io(std::sync::Arc::new(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed during login",
            )))),
        }
    };
    let reply = tokio::time::timeout(limit, exchange).await??;

    if let Some(err) = AdminError::from_result_code(reply.result_code) {
        return Err(err);
    }
    let roles = match reply.field(FieldId::Roles) {
        Some(field) => field.as_roles()?,
        None => Vec::new(),
    };
    Ok(Principal::from_reported(credentials.user.clone(), &roles))
}
