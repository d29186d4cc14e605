//! Lifecycle and traffic notifications.
//!
//! Events are delivered over a [`tokio::sync::broadcast`] channel obtained
//! from [`RconClient::subscribe`](crate::RconClient::subscribe). Subscribe
//! before calling `connect` to observe the `Connected` and `Authenticated`
//! edges.

/// A notification emitted by the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RconEvent {
    /// The TCP connection was established.
    Connected,
    /// The authentication handshake succeeded.
    Authenticated,
    /// A response with no matching pending request, typically output from
    /// another client or the server console.
    Response(String),
    /// A connection-scoped failure. The connection is torn down afterwards
    /// where the cause is fatal.
    Error(String),
    /// The connection was closed, either explicitly or by the server.
    Disconnected,
}
