//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitStream, StreamExt},
};
use irori_shared::protocol::{
    ClientEvent, ErrorPayload, JoinRoomRequest, JoinRoomResult, MessageRequest, ServerEvent,
};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, RoomId},
    infrastructure::dto::conversion::member_infos,
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// Everything addressed to this connection (room broadcasts and direct replies) flows
/// through this channel, so the frames leave in the order they were pushed.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();

    // Create a channel for this client to receive messages
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = state.connect_client_usecase.execute(tx).await;
    tracing::info!("Client '{}' connected", connection_id);

    let mut send_task = pusher_loop(rx, sender);
    let mut recv_task = tokio::spawn(receive_loop(
        receiver,
        state.clone(),
        connection_id.clone(),
    ));

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    let rooms = state
        .disconnect_client_usecase
        .execute(&connection_id)
        .await;
    tracing::info!(
        "Client '{}' disconnected (left {} room(s))",
        connection_id,
        rooms.len()
    );
}

/// 1 接続分のハンドラ状態
struct Session {
    state: Arc<AppState>,
    connection_id: ConnectionId,
    /// 最後に参加した Room
    current_room: Option<RoomId>,
}

async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    connection_id: ConnectionId,
) {
    let mut session = Session {
        state,
        connection_id,
        current_room: None,
    };

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => match ClientEvent::from_json(&text) {
                Ok(event) => session.handle(event).await,
                Err(e) => {
                    tracing::warn!(
                        "Malformed frame from '{}': {}",
                        session.connection_id,
                        e
                    );
                    session
                        .reply_error(format!("Malformed event: {}", e))
                        .await;
                }
            },
            Message::Ping(_) => {
                tracing::debug!("Received ping");
            }
            Message::Close(_) => {
                tracing::info!("Client '{}' requested close", session.connection_id);
                break;
            }
            _ => {}
        }
    }
}

impl Session {
    async fn handle(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom(request) => self.join_room(request).await,
            ClientEvent::ChatMessage(request) => self.send_chat(request).await,
            ClientEvent::AiMessage(request) => self.send_to_ai(request).await,
        }
    }

    async fn join_room(&mut self, request: JoinRoomRequest) {
        let usecase = &self.state.join_room_usecase;
        let joined = match &self.current_room {
            // 参加中の Room からの移動（移動先が満員なら参加中の Room に留まる）
            Some(from) => {
                usecase
                    .switch(
                        self.connection_id.clone(),
                        from,
                        request.room_id,
                        request.username,
                    )
                    .await
            }
            None => {
                usecase
                    .execute(
                        self.connection_id.clone(),
                        request.room_id,
                        request.username,
                    )
                    .await
            }
        };

        let result = match joined {
            Ok(room) => {
                tracing::info!("Client '{}' joined room '{}'", self.connection_id, room.id);
                let members = member_infos(&room);
                self.current_room = Some(room.id.clone());
                JoinRoomResult::joined(room.id.into_string(), members)
            }
            Err(e) => {
                tracing::warn!("Join rejected for '{}': {}", self.connection_id, e);
                JoinRoomResult::rejected(e.client_message())
            }
        };

        self.reply(&ServerEvent::JoinRoomResult(result)).await;
    }

    async fn send_chat(&self, request: MessageRequest) {
        let Some(room_id) = self.target_room(request.room_id).await else {
            return;
        };
        if let Err(e) = self
            .state
            .send_chat_usecase
            .execute(&room_id, request.username, request.message)
            .await
        {
            tracing::warn!("Chat from '{}' rejected: {}", self.connection_id, e);
            self.reply_error(e.to_string()).await;
        }
    }

    async fn send_to_ai(&self, request: MessageRequest) {
        let Some(room_id) = self.target_room(request.room_id).await else {
            return;
        };
        match self
            .state
            .ai_queue_usecase
            .enqueue(
                self.connection_id.clone(),
                &room_id,
                request.username,
                request.message,
            )
            .await
        {
            Ok(outcome) => tracing::info!(
                "AI request from '{}' queued in room '{}' (position {})",
                self.connection_id,
                room_id,
                outcome.positions.len()
            ),
            Err(e) => {
                tracing::warn!("AI request from '{}' rejected: {}", self.connection_id, e);
                self.reply_error(e.to_string()).await;
            }
        }
    }

    /// 宛先の Room（明示されていなければ参加中の Room）
    async fn target_room(&self, requested: Option<String>) -> Option<RoomId> {
        let requested = requested.filter(|id| !id.trim().is_empty());
        let resolved = match requested {
            Some(id) => RoomId::new(id).ok(),
            None => self.current_room.clone(),
        };
        if resolved.is_none() {
            self.reply_error("Join a room first".to_string()).await;
        }
        resolved
    }

    async fn reply(&self, event: &ServerEvent) {
        if let Err(e) = self
            .state
            .broadcaster
            .to_client(&self.connection_id, event)
            .await
        {
            tracing::warn!("Failed to reply to '{}': {}", self.connection_id, e);
        }
    }

    async fn reply_error(&self, message: String) {
        self.reply(&ServerEvent::Error(ErrorPayload { message }))
            .await;
    }
}
