//! Irori terminal chat client.
//!
//! Joins a room and sends lines from stdin as chat messages; `/ai <text>` submits a
//! request to the room's AI queue. Automatically reconnects on disconnection
//! (max 5 attempts with 5 second interval). Exits with status 1 if the room is full.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin irori-client -- --username alice --room r1
//! cargo run --bin irori-client -- -n bob -r r1 -u ws://127.0.0.1:3000/ws
//! ```

use clap::Parser;

use irori_client::{ClientOptions, run_client};
use irori_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "irori-client")]
#[command(about = "Terminal client for Irori group chat with a shared AI", long_about = None)]
struct Args {
    /// Display name in the room
    #[arg(short = 'n', long)]
    username: String,

    /// Room to join (a guest room is created when omitted)
    #[arg(short = 'r', long)]
    room: Option<String>,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:3000/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let options = ClientOptions {
        url: args.url,
        username: args.username,
        room: args.room,
    };
    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
