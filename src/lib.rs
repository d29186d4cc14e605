//! # rcon-client
//!
//! Tokio client for the Source RCON remote-console protocol, as spoken by
//! Minecraft servers: binary length-prefixed packets over a persistent TCP
//! connection, one authentication handshake, then request/response command
//! traffic correlated by id.
//!
//! ## Architecture
//!
//! - **protocol**: packet codec and fragmentation-transparent reassembly
//! - **connection**: one task per connection owning the socket, the queue
//!   and the pending-reply table
//! - **client**: cloneable handle exposing connect/send/disconnect and a
//!   typed event channel
//!
//! ## Example
//!
//! ```ignore
//! use rcon_client::{RconClient, RconConfig};
//!
//! #[tokio::main]
//! async fn main() -> rcon_client::Result<()> {
//!     let client = RconClient::new(RconConfig::new("127.0.0.1", "secret"))?;
//!     let mut events = client.subscribe();
//!     client.connect().await?;
//!
//!     let reply = client.send_with_reply("list").await?;
//!     println!("{}", reply.recv().await?);
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod protocol;

mod client;
mod connection;

pub use client::{ReplyHandle, RconClient};
pub use config::{RconConfig, DEFAULT_RCON_PORT, DEFAULT_TIMEOUT};
pub use connection::ConnectionState;
pub use error::{RconError, Result};
pub use event::RconEvent;
