//! Irori group chat server.
//!
//! Serves the WebSocket endpoint `/ws` and the HTTP API (`/health`, `/api/rooms`).
//!
//! Run with:
//! ```not_rust
//! AI_API_KEY=hf_xxx cargo run --bin irori-server
//! cargo run --bin irori-server -- --provider openai --api-key sk-xxx --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;
use irori_server::{
    config::Args,
    infrastructure::{
        message_pusher::WebSocketMessagePusher, provider::build_generator,
        repository::InMemoryRoomRepository,
    },
    ui::{AppState, Server},
    usecase::{
        AiQueueUseCase, ConnectClientUseCase, DisconnectClientUseCase, GetRoomDetailUseCase,
        GetRoomsUseCase, JoinRoomUseCase, RoomBroadcaster, SendChatUseCase,
    },
};
use irori_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize dependencies in order:
    // 1. Repository
    // 2. MessagePusher
    // 3. TextGenerator
    // 4. UseCases
    // 5. AppState / Server

    // 1. Create Repository (in-memory room registry)
    let repository = Arc::new(InMemoryRoomRepository::new());

    // 2. Create MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. Create TextGenerator for the configured provider
    let generator = match build_generator(&config.provider) {
        Ok(generator) => generator,
        Err(e) => {
            tracing::error!("Failed to create HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        "AI provider: {} (model: {})",
        config.provider.kind,
        config.provider.model
    );

    // 4. Create UseCases
    let broadcaster = RoomBroadcaster::new(repository.clone(), message_pusher.clone());
    let app_state = AppState {
        connect_client_usecase: Arc::new(ConnectClientUseCase::new(message_pusher.clone())),
        disconnect_client_usecase: Arc::new(DisconnectClientUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            broadcaster.clone(),
        )),
        join_room_usecase: Arc::new(JoinRoomUseCase::new(
            repository.clone(),
            broadcaster.clone(),
        )),
        send_chat_usecase: Arc::new(SendChatUseCase::new(
            repository.clone(),
            broadcaster.clone(),
        )),
        ai_queue_usecase: Arc::new(AiQueueUseCase::new(
            repository.clone(),
            broadcaster.clone(),
            generator,
            config.queue.clone(),
        )),
        get_rooms_usecase: Arc::new(GetRoomsUseCase::new(repository.clone())),
        get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(repository.clone())),
        broadcaster,
        model: config.provider.model.clone(),
    };

    // 5. Create and run the server
    let server = Server::new(app_state);
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
