//! In-process test server and WebSocket helpers.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use irori_server::{
    domain::{GenerationRequest, ProviderError, TextGenerator},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository,
    },
    ui::{AppState, Server},
    usecase::{
        AiQueueSettings, AiQueueUseCase, ConnectClientUseCase, DisconnectClientUseCase,
        GetRoomDetailUseCase, GetRoomsUseCase, JoinRoomUseCase, RoomBroadcaster,
        SendChatUseCase,
    },
};
use irori_shared::protocol::{
    ClientEvent, JoinRoomRequest, JoinRoomResult, MessageRequest, ServerEvent,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_MODEL: &str = "echo-model";

/// 少し待ってから `echo: {prompt}` を返す TextGenerator
pub struct EchoGenerator {
    pub delay: Duration,
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    fn name(&self) -> &'static str {
        "Echo"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("echo: {}", request.prompt))
    }
}

/// 常に失敗する TextGenerator
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    fn name(&self) -> &'static str {
        "Failing"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Status {
            provider: "HF",
            status: 503,
            body: "model loading".to_string(),
        })
    }
}

pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::with_generator(Arc::new(EchoGenerator {
            delay: Duration::from_millis(20),
        }))
        .await
    }

    pub async fn with_generator(generator: Arc<dyn TextGenerator>) -> Self {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let message_pusher = Arc::new(WebSocketMessagePusher::new());
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
                AiQueueSettings {
                    history_size: 6,
                    drain_delay: Duration::from_millis(10),
                },
            )),
            get_rooms_usecase: Arc::new(GetRoomsUseCase::new(repository.clone())),
            get_room_detail_usecase: Arc::new(GetRoomDetailUseCase::new(repository)),
            broadcaster,
            model: TEST_MODEL.to_string(),
        };

        let router = Server::new(app_state).router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn ws_connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("WebSocket connect");
    ws
}

pub async fn ws_send(ws: &mut Ws, event: &ClientEvent) {
    ws.send(Message::Text(event.to_json().unwrap().into()))
        .await
        .unwrap();
}

pub async fn ws_send_raw(ws: &mut Ws, text: &str) {
    ws.send(Message::Text(text.to_string().into())).await.unwrap();
}

/// 次の ServerEvent を読む（5 秒でタイムアウト）
pub async fn ws_read_event(ws: &mut Ws) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for server event")
            .expect("stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return ServerEvent::from_json(text.as_str()).expect("server event JSON");
        }
    }
}

/// 条件に合う ServerEvent まで読み進める
pub async fn ws_read_until(ws: &mut Ws, pred: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
    loop {
        let event = ws_read_event(ws).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Room に参加し、joinRoomResult を返す（先に届く updateMembers は読み飛ばす）
pub async fn ws_join(ws: &mut Ws, room_id: &str, username: &str) -> JoinRoomResult {
    ws_send(
        ws,
        &ClientEvent::JoinRoom(JoinRoomRequest {
            room_id: Some(room_id.to_string()),
            username: username.to_string(),
        }),
    )
    .await;
    match ws_read_until(ws, |e| matches!(e, ServerEvent::JoinRoomResult(_))).await {
        ServerEvent::JoinRoomResult(result) => result,
        other => panic!("Expected JoinRoomResult, got: {other:?}"),
    }
}

pub fn message(room_id: &str, username: &str, text: &str) -> MessageRequest {
    MessageRequest {
        room_id: Some(room_id.to_string()),
        username: username.to_string(),
        message: text.to_string(),
    }
}
