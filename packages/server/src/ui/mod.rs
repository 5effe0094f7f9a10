//! WebSocket / HTTP の入口
//!
//! axum の Router を組み立て、受け取ったイベントを UseCase に渡します。

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;
