//! Connection task: handshake, dispatch and response correlation.
//!
//! One task per connection owns the socket halves, the inbound
//! [`FrameBuffer`], the outbound queue and the pending-reply table; every
//! packet is processed in arrival order by that single task, so none of the
//! three needs a lock. Callers reach the task through an mpsc channel of
//! [`Op`] values, which is the only serialization point.
//!
//! Lifecycle inside the task:
//! 1. Send the Auth packet, arm the auth deadline (`Authenticating`).
//! 2. On a matching AuthResponse, go `Ready`, drain the queued commands.
//! 3. Serve reads and ops until an error, EOF or an explicit disconnect.
//! 4. Tear down: fail every outstanding handle, drop the pending table,
//!    emit `Disconnected`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep_until, Duration, Instant};

use crate::error::{RconError, Result};
use crate::event::RconEvent;
use crate::protocol::packet::{
    self, Packet, AUTH_FAILURE_ID, TYPE_AUTH, TYPE_AUTH_RESPONSE, TYPE_COMMAND,
    TYPE_COMMAND_RESPONSE,
};
use crate::protocol::FrameBuffer;

/// Socket read buffer size.
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Connection state as observed through [`RconClient::state`](crate::RconClient::state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection, or a previous connection has been torn down.
    Disconnected,
    /// The transport connect is in flight.
    Connecting,
    /// The transport is up; the handshake has not started yet.
    Connected,
    /// The Auth packet is out, awaiting the server's verdict.
    Authenticating,
    /// Authenticated; commands flow.
    Ready,
    /// Teardown in progress.
    Closing,
}

/// An operation submitted to the connection task.
pub(crate) enum Op {
    /// Enqueue a command for transmission.
    Send {
        body: String,
        reply: Option<oneshot::Sender<String>>,
        written: oneshot::Sender<Result<()>>,
    },
    /// Tear the connection down.
    Disconnect,
}

/// A command accepted into the outbound queue, not yet written.
struct QueuedCommand {
    id: i32,
    frame: Bytes,
    reply: Option<oneshot::Sender<String>>,
    written: oneshot::Sender<Result<()>>,
}

/// State owned by the connection task.
pub(crate) struct Connection {
    writer: OwnedWriteHalf,
    events: broadcast::Sender<RconEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    password: String,
    timeout: Duration,
    buffer: FrameBuffer,
    queue: VecDeque<QueuedCommand>,
    pending: HashMap<i32, oneshot::Sender<String>>,
    next_id: i32,
    auth_id: i32,
    handshake: Option<oneshot::Sender<Result<()>>>,
}

impl Connection {
    pub(crate) fn new(
        writer: OwnedWriteHalf,
        events: broadcast::Sender<RconEvent>,
        state: Arc<watch::Sender<ConnectionState>>,
        password: String,
        timeout: Duration,
        handshake: oneshot::Sender<Result<()>>,
    ) -> Self {
        Self {
            writer,
            events,
            state,
            password,
            timeout,
            buffer: FrameBuffer::new(),
            queue: VecDeque::new(),
            pending: HashMap::new(),
            next_id: 0,
            auth_id: 0,
            handshake: Some(handshake),
        }
    }

    /// Run the connection to completion, then tear down.
    pub(crate) async fn run(mut self, reader: OwnedReadHalf, ops: mpsc::Receiver<Op>) {
        let outcome = self.serve(reader, ops).await;
        self.teardown(outcome).await;
    }

    async fn serve(
        &mut self,
        mut reader: OwnedReadHalf,
        mut ops: mpsc::Receiver<Op>,
    ) -> Result<()> {
        self.set_state(ConnectionState::Authenticating);
        self.auth_id = self.alloc_id();
        let auth_frame = packet::encode(self.auth_id, TYPE_AUTH, self.password.as_bytes())?;
        self.writer
            .write_all(&auth_frame)
            .await
            .map_err(RconError::Write)?;
        tracing::debug!(id = self.auth_id, "sent auth packet");

        let auth_deadline = Instant::now() + self.timeout;
        let mut read_buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            tokio::select! {
                _ = sleep_until(auth_deadline), if !self.is_ready() => {
                    return Err(RconError::AuthTimeout);
                }
                read = reader.read(&mut read_buf) => {
                    let n = read?;
                    if n == 0 {
                        tracing::debug!("server closed the connection");
                        return Ok(());
                    }
                    for pkt in self.buffer.push(&read_buf[..n])? {
                        self.route(pkt).await?;
                    }
                }
                op = ops.recv() => {
                    match op {
                        Some(Op::Send { body, reply, written }) => {
                            self.enqueue(body, reply, written).await?;
                        }
                        // A None means every client handle was dropped;
                        // treat it like an explicit disconnect.
                        Some(Op::Disconnect) | None => return Ok(()),
                    }
                }
            }
        }
    }

    /// Route one inbound packet according to the connection phase.
    ///
    /// The type value `2` means AuthResponse before `Ready` and would mean
    /// Command after it; dispatch is gated on phase, never on the value
    /// alone.
    async fn route(&mut self, pkt: Packet) -> Result<()> {
        if !self.is_ready() {
            match pkt.ptype {
                TYPE_AUTH_RESPONSE => {
                    if pkt.id == AUTH_FAILURE_ID {
                        return Err(RconError::AuthFailed);
                    }
                    if pkt.id == self.auth_id {
                        self.set_state(ConnectionState::Ready);
                        self.emit(RconEvent::Authenticated);
                        if let Some(tx) = self.handshake.take() {
                            let _ = tx.send(Ok(()));
                        }
                        self.drain_queue().await?;
                    } else {
                        tracing::warn!(
                            id = pkt.id,
                            expected = self.auth_id,
                            "auth response with unexpected id"
                        );
                    }
                }
                TYPE_COMMAND_RESPONSE => {
                    // Minecraft sends an empty response before the real
                    // auth reply; it carries no information.
                    tracing::debug!(id = pkt.id, "discarding pre-auth command response");
                }
                other => {
                    tracing::warn!(ptype = other, "unexpected packet type during handshake");
                }
            }
            return Ok(());
        }

        match pkt.ptype {
            TYPE_COMMAND_RESPONSE => {
                let body = pkt.body_utf8();
                match self.pending.remove(&pkt.id) {
                    Some(tx) => {
                        // Receiver may have been dropped; that is not an error.
                        let _ = tx.send(body);
                    }
                    None => {
                        tracing::debug!(id = pkt.id, "unsolicited response");
                        self.emit(RconEvent::Response(body));
                    }
                }
            }
            other => {
                // Auth traffic after Ready is out-of-protocol.
                tracing::debug!(ptype = other, id = pkt.id, "ignoring out-of-phase packet");
            }
        }
        Ok(())
    }

    /// Accept a command into the outbound queue and drain if `Ready`.
    async fn enqueue(
        &mut self,
        body: String,
        reply: Option<oneshot::Sender<String>>,
        written: oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        let id = self.alloc_id();
        let frame = match packet::encode(id, TYPE_COMMAND, body.as_bytes()) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = written.send(Err(e));
                return Ok(());
            }
        };

        self.queue.push_back(QueuedCommand {
            id,
            frame,
            reply,
            written,
        });

        if self.is_ready() {
            self.drain_queue().await?;
        }
        Ok(())
    }

    /// Write every queued command to the socket in submission order.
    async fn drain_queue(&mut self) -> Result<()> {
        while let Some(cmd) = self.queue.pop_front() {
            match self.writer.write_all(&cmd.frame).await {
                Ok(()) => {
                    tracing::debug!(id = cmd.id, "wrote command frame");
                    if let Some(reply) = cmd.reply {
                        self.pending.insert(cmd.id, reply);
                    }
                    let _ = cmd.written.send(Ok(()));
                }
                Err(e) => {
                    // io::Error is not Clone; the write-ack handle gets the
                    // original, the connection dies on the kind.
                    let kind = e.kind();
                    let _ = cmd.written.send(Err(RconError::Write(e)));
                    return Err(RconError::Write(kind.into()));
                }
            }
        }
        Ok(())
    }

    /// Fail everything outstanding and close the socket.
    async fn teardown(mut self, outcome: Result<()>) {
        self.set_state(ConnectionState::Closing);

        let error = outcome.err();
        if let Some(e) = &error {
            tracing::warn!(error = %e, "connection terminated");
            self.emit(RconEvent::Error(e.to_string()));
        }

        for cmd in self.queue.drain(..) {
            let _ = cmd.written.send(Err(RconError::ConnectionClosed));
        }
        // Dropping the reply senders fails every outstanding ReplyHandle.
        self.pending.clear();
        self.buffer.clear();

        let _ = self.writer.shutdown().await;

        self.set_state(ConnectionState::Disconnected);
        self.emit(RconEvent::Disconnected);

        // Resolved last so a failed `connect` never observes the connection
        // in any state but `Disconnected`.
        if let Some(tx) = self.handshake.take() {
            let _ = tx.send(Err(error.unwrap_or(RconError::ConnectionClosed)));
        }
    }

    /// Allocate the next correlation id. Monotonic per connection; the
    /// first id goes to the auth packet.
    fn alloc_id(&mut self) -> i32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    fn is_ready(&self) -> bool {
        *self.state.borrow() == ConnectionState::Ready
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: RconEvent) {
        // Send fails only when nobody subscribes, which is fine.
        let _ = self.events.send(event);
    }
}
