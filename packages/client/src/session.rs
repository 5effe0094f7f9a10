//! WebSocket client session management.

use futures_util::{SinkExt, StreamExt};
use irori_shared::{
    protocol::{ClientEvent, JoinRoomRequest, MessageRequest, ServerEvent},
    time::now_millis,
};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use crate::{
    command::{HELP_TEXT, InputCommand, parse_input},
    domain::join_rejection,
    error::ClientError,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Run one WebSocket session
///
/// `room` is the room to join. After a successful join it holds the room actually
/// joined (a generated guest room when none was given), so a reconnect joins the same room.
///
/// Returns `Ok(())` when the user quits, `Err` when the join is rejected or the
/// connection is lost.
pub async fn run_client_session(
    url: &str,
    username: &str,
    room: &mut Option<String>,
    input_rx: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (mut ws, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    tracing::info!("Connected to chat server!");

    send(
        &mut ws,
        &ClientEvent::JoinRoom(JoinRoomRequest {
            room_id: room.clone(),
            username: username.to_string(),
        }),
    )
    .await?;

    // updateMembers arrives before joinRoomResult
    let joined = loop {
        match read_event(&mut ws).await? {
            ServerEvent::JoinRoomResult(result) if result.success => break result,
            ServerEvent::JoinRoomResult(result) => {
                return Err(join_rejection(room.as_deref(), result.message));
            }
            _ => {}
        }
    };
    let room_id = joined.room_id.unwrap_or_default();
    print!(
        "{}",
        MessageFormatter::format_joined(&room_id, &joined.members.unwrap_or_default(), username)
    );
    println!(
        "\nYou are '{}'. Type messages and press Enter to send. /ai <text> asks the AI, /help lists commands.\n",
        username
    );
    redisplay_prompt(username);
    *room = Some(room_id.clone());

    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        print!("{}", render(text.as_str(), username));
                        redisplay_prompt(username);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Server closed the connection");
                        return Err(ClientError::ConnectionError("Connection lost".to_string()));
                    }
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        return Err(ClientError::ConnectionError(e.to_string()));
                    }
                    Some(Ok(_)) => {}
                }
            }
            line = input_rx.recv() => {
                // Readline ended (Ctrl+C / Ctrl+D)
                let Some(line) = line else {
                    write.send(Message::Close(None)).await.ok();
                    return Ok(());
                };

                let event = match parse_input(&line) {
                    InputCommand::Chat(text) => ClientEvent::ChatMessage(MessageRequest {
                        room_id: Some(room_id.clone()),
                        username: username.to_string(),
                        message: text,
                    }),
                    InputCommand::Ai(text) => ClientEvent::AiMessage(MessageRequest {
                        room_id: Some(room_id.clone()),
                        username: username.to_string(),
                        message: text,
                    }),
                    InputCommand::Help => {
                        print!("\n{}", HELP_TEXT);
                        redisplay_prompt(username);
                        continue;
                    }
                    InputCommand::Quit => {
                        write.send(Message::Close(None)).await.ok();
                        return Ok(());
                    }
                    InputCommand::Invalid(hint) => {
                        print!("{}", MessageFormatter::format_error(&hint));
                        redisplay_prompt(username);
                        continue;
                    }
                };

                let json = event
                    .to_json()
                    .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::warn!("Failed to send message: {}", e);
                    return Err(ClientError::ConnectionError(e.to_string()));
                }
            }
        }
    }
}

/// Format one incoming frame for display
fn render(text: &str, username: &str) -> String {
    match ServerEvent::from_json(text) {
        Ok(ServerEvent::ChatMessage(chat)) => {
            MessageFormatter::format_chat_message(&chat, now_millis())
        }
        Ok(ServerEvent::UpdateMembers(members)) => {
            MessageFormatter::format_members(&members, username)
        }
        Ok(ServerEvent::AiQueueUpdate(positions)) => MessageFormatter::format_queue(&positions),
        Ok(ServerEvent::AiTyping(typing)) => MessageFormatter::format_typing(typing),
        Ok(ServerEvent::Error(error)) => MessageFormatter::format_error(&error.message),
        Ok(ServerEvent::JoinRoomResult(_)) | Err(_) => MessageFormatter::format_raw_message(text),
    }
}

async fn send(ws: &mut Ws, event: &ClientEvent) -> Result<(), ClientError> {
    let json = event
        .to_json()
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    ws.send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))
}

async fn read_event(ws: &mut Ws) -> Result<ServerEvent, ClientError> {
    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => match ServerEvent::from_json(text.as_str()) {
                Ok(event) => return Ok(event),
                Err(e) => tracing::warn!("Unparseable server frame: {}", e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
        }
    }
    Err(ClientError::ConnectionError(
        "Connection closed before joining".to_string(),
    ))
}
