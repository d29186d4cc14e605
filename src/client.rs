//! Client handle and connect flow.
//!
//! [`RconClient`] is a cheaply cloneable handle around the connection task.
//! The usual sequence:
//! 1. `RconClient::new(config)` validates the configuration.
//! 2. `subscribe()` before connecting, to observe the lifecycle events.
//! 3. `connect().await` opens the socket and resolves once authenticated.
//! 4. `send` / `send_with_reply` issue commands; both resolve their first
//!    stage when the packet is on the wire, not when the reply arrives.
//!
//! Commands submitted while the handshake is still in flight are queued and
//! written in submission order once the connection is `Ready`.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::time::timeout;

use crate::config::RconConfig;
use crate::connection::{Connection, ConnectionState, Op};
use crate::error::{RconError, Result};
use crate::event::RconEvent;

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the op channel into the connection task.
const OP_CHANNEL_CAPACITY: usize = 64;

/// Handle to the reply of a single command.
///
/// Produced by [`RconClient::send_with_reply`] after the write-ack; resolves
/// separately, when (and if) the matching response arrives.
pub struct ReplyHandle {
    rx: oneshot::Receiver<String>,
}

impl ReplyHandle {
    /// Wait for the response body.
    ///
    /// Fails with [`RconError::ConnectionClosed`] when the connection goes
    /// down before the reply arrives.
    pub async fn recv(self) -> Result<String> {
        self.rx.await.map_err(|_| RconError::ConnectionClosed)
    }
}

/// A client for one RCON server.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct RconClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: RconConfig,
    events: broadcast::Sender<RconEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    /// Sender into the current connection task, if one was started.
    ops: Mutex<Option<mpsc::Sender<Op>>>,
}

impl RconClient {
    /// Create a disconnected client. Fails with
    /// [`RconError::InvalidArgument`] on a bad host, port or timeout.
    pub fn new(config: RconConfig) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                events,
                state: Arc::new(state),
                ops: Mutex::new(None),
            }),
        })
    }

    /// Subscribe to lifecycle and unsolicited-response notifications.
    ///
    /// Only events emitted after the subscription are delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<RconEvent> {
        self.inner.events.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Check whether the connection is authenticated and accepting commands.
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Connect and authenticate.
    ///
    /// Resolves once the handshake succeeds. Connect-phase failures
    /// (`ConnectError`, `ConnectTimeout`) and handshake failures
    /// (`AuthFailed`, `AuthTimeout`) reject this call and also surface as an
    /// [`RconEvent::Error`]; either way the client is back in
    /// `Disconnected` and may connect again.
    pub async fn connect(&self) -> Result<()> {
        let mut ops_slot = self.inner.ops.lock().await;
        if self.state() != ConnectionState::Disconnected {
            return Err(RconError::InvalidArgument(
                "already connected or connecting".to_string(),
            ));
        }
        self.inner.state.send_replace(ConnectionState::Connecting);

        let stream = match self.open_socket().await {
            Ok(stream) => stream,
            Err(e) => {
                self.inner.state.send_replace(ConnectionState::Disconnected);
                let _ = self.inner.events.send(RconEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        self.inner.state.send_replace(ConnectionState::Connected);

        let (ops_tx, ops_rx) = mpsc::channel(OP_CHANNEL_CAPACITY);
        let (handshake_tx, handshake_rx) = oneshot::channel();

        let (reader, writer) = stream.into_split();
        let connection = Connection::new(
            writer,
            self.inner.events.clone(),
            self.inner.state.clone(),
            self.inner.config.password.clone(),
            self.inner.config.timeout,
            handshake_tx,
        );

        *ops_slot = Some(ops_tx);
        drop(ops_slot);

        // Emit before spawning so `Connected` always precedes
        // `Authenticated`, and commands may be queued as soon as the event
        // is observed.
        let _ = self.inner.events.send(RconEvent::Connected);
        tokio::spawn(connection.run(reader, ops_rx));

        match handshake_rx.await {
            Ok(result) => result,
            Err(_) => Err(RconError::ConnectionClosed),
        }
    }

    async fn open_socket(&self) -> Result<TcpStream> {
        let config = &self.inner.config;
        tracing::debug!(host = %config.host, port = config.port, "connecting");

        let connect = TcpStream::connect((config.host.as_str(), config.port));
        let stream = timeout(config.timeout, connect)
            .await
            .map_err(|_| RconError::ConnectTimeout)?
            .map_err(RconError::ConnectError)?;

        socket2::SockRef::from(&stream)
            .set_keepalive(true)
            .map_err(RconError::ConnectError)?;
        Ok(stream)
    }

    /// Send a command; resolves once the packet has been written to the
    /// socket. Any response becomes an [`RconEvent::Response`].
    ///
    /// Submitted before `Ready`, the command waits in the queue; submitted
    /// while disconnected, this fails with [`RconError::NotReady`].
    pub async fn send(&self, command: &str) -> Result<()> {
        self.submit(command, None).await
    }

    /// Send a command and register for its reply.
    ///
    /// Resolves with a [`ReplyHandle`] once the packet has been written;
    /// the handle resolves separately with the response body. The write-ack
    /// and the reply are distinct signals: a command can be durably sent
    /// while its reply is still outstanding.
    pub async fn send_with_reply(&self, command: &str) -> Result<ReplyHandle> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(command, Some(reply_tx)).await?;
        Ok(ReplyHandle { rx: reply_rx })
    }

    async fn submit(&self, command: &str, reply: Option<oneshot::Sender<String>>) -> Result<()> {
        let ops = match self.inner.ops.lock().await.clone() {
            Some(ops) => ops,
            None => return Err(RconError::NotReady),
        };
        if matches!(
            self.state(),
            ConnectionState::Disconnected | ConnectionState::Closing
        ) {
            return Err(RconError::NotReady);
        }

        let (written_tx, written_rx) = oneshot::channel();
        ops.send(Op::Send {
            body: command.to_string(),
            reply,
            written: written_tx,
        })
        .await
        .map_err(|_| RconError::NotReady)?;

        written_rx.await.map_err(|_| RconError::ConnectionClosed)?
    }

    /// Disconnect and abandon everything outstanding.
    ///
    /// Idempotent. Queued commands and pending replies fail with
    /// [`RconError::ConnectionClosed`]; the teardown emits
    /// [`RconEvent::Disconnected`]. Returns once the connection task has
    /// finished tearing down.
    pub async fn disconnect(&self) {
        let ops = self.inner.ops.lock().await.take();
        let Some(ops) = ops else { return };

        if ops.send(Op::Disconnect).await.is_ok() {
            let mut state = self.inner.state.subscribe();
            let _ = state
                .wait_for(|s| *s == ConnectionState::Disconnected)
                .await;
        }
    }
}
