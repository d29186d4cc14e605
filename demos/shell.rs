//! Interactive RCON shell.
//!
//! ```text
//! cargo run --example shell -- <host> [port] [password]
//! ```
//!
//! The password may also come from the `RCON_PASSWORD` environment
//! variable. Type commands at the prompt; `quit` or `exit` leaves.

use std::env;

use rcon_client::{RconClient, RconConfig, RconEvent, DEFAULT_RCON_PORT};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_RCON_PORT);
    let password = args
        .next()
        .or_else(|| env::var("RCON_PASSWORD").ok())
        .unwrap_or_default();

    let client = RconClient::new(RconConfig::new(host.clone(), password).port(port))?;
    let mut events = client.subscribe();

    println!("Connecting to {host}:{port}");
    client.connect().await?;

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RconEvent::Connected => println!("Connected"),
                RconEvent::Authenticated => println!("Authenticated"),
                RconEvent::Response(body) => println!("{body}"),
                RconEvent::Error(cause) => eprintln!("error: {cause}"),
                RconEvent::Disconnected => {
                    println!("Socket closed");
                    std::process::exit(0);
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        if !client.is_ready() {
            println!("Not connected to RCON server.");
            continue;
        }

        match client.send_with_reply(line).await {
            Ok(reply) => match reply.recv().await {
                Ok(body) => println!("{body}"),
                Err(e) => eprintln!("error: {e}"),
            },
            Err(e) => eprintln!("error: {e}"),
        }
    }

    client.disconnect().await;
    Ok(())
}
