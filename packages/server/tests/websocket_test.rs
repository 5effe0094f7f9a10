//! Integration tests: the server runs in-process on an ephemeral port and is driven
//! over real WebSocket / HTTP connections.

#[allow(dead_code)]
mod common;

use std::sync::Arc;

use irori_server::infrastructure::dto::http::{HealthDto, RoomDetailDto, RoomSummaryDto};
use irori_shared::protocol::{
    AI_USERNAME, ChatBroadcast, ClientEvent, MessageRequest, ROOM_FULL_MESSAGE, ServerEvent,
};

use common::{
    FailingGenerator, TEST_MODEL, TestServer, message, ws_connect, ws_join, ws_read_event,
    ws_read_until, ws_send, ws_send_raw,
};

fn ai_reply(text: &str, reply_to: &str) -> ServerEvent {
    ServerEvent::ChatMessage(ChatBroadcast {
        username: AI_USERNAME.to_string(),
        message: text.to_string(),
        reply_to: Some(reply_to.to_string()),
    })
}

#[tokio::test]
async fn test_fifth_member_is_rejected() {
    // テスト項目: A, B, C, D は参加でき、E は "Room full" で拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(ws_connect(&server.ws_url()).await);
    }

    // when (操作):
    let mut results = Vec::new();
    for (ws, name) in clients.iter_mut().zip(["A", "B", "C", "D", "E"]) {
        results.push(ws_join(ws, "r1", name).await);
    }

    // then (期待する結果):
    for result in &results[..4] {
        assert!(result.success);
        assert_eq!(result.room_id.as_deref(), Some("r1"));
    }
    let names: Vec<String> = results[3]
        .members
        .as_ref()
        .unwrap()
        .iter()
        .map(|m| m.username.clone())
        .collect();
    assert_eq!(names, vec!["A", "B", "C", "D"]);
    assert!(!results[4].success);
    assert_eq!(results[4].message.as_deref(), Some(ROOM_FULL_MESSAGE));

    let detail: RoomDetailDto = reqwest::get(format!("{}/api/rooms/r1", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.members.len(), 4);
    assert_eq!(detail.capacity, 4);
}

#[tokio::test]
async fn test_rejected_room_switch_keeps_current_room() {
    // テスト項目: 参加中の接続が満員の Room に参加しようとして拒否されても、元の Room に留まる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut x = ws_connect(&server.ws_url()).await;
    assert!(ws_join(&mut x, "r2", "X").await.success);
    let mut fillers = Vec::new();
    for name in ["A", "B", "C", "D"] {
        let mut ws = ws_connect(&server.ws_url()).await;
        assert!(ws_join(&mut ws, "r1", name).await.success);
        fillers.push(ws);
    }

    // when (操作):
    let result = ws_join(&mut x, "r1", "X").await;

    // then (期待する結果):
    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some(ROOM_FULL_MESSAGE));
    let r2: RoomDetailDto = reqwest::get(format!("{}/api/rooms/r2", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = r2.members.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["X"]);

    // roomId を省略したチャットは引き続き r2 に届く
    ws_send(
        &mut x,
        &ClientEvent::ChatMessage(MessageRequest {
            room_id: None,
            username: "X".to_string(),
            message: "still here".to_string(),
        }),
    )
    .await;
    let echoed = ws_read_until(&mut x, |e| matches!(e, ServerEvent::ChatMessage(_))).await;
    assert_eq!(
        echoed,
        ServerEvent::ChatMessage(ChatBroadcast {
            username: "X".to_string(),
            message: "still here".to_string(),
            reply_to: None,
        })
    );
}

#[tokio::test]
async fn test_room_switch_moves_member() {
    // テスト項目: 参加中の接続が別の Room に参加すると、元の Room の参加者に退出が通知される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = ws_connect(&server.ws_url()).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, "r1", "Alice").await;
    ws_join(&mut bob, "r1", "Bob").await;
    ws_read_until(&mut alice, |e| {
        matches!(e, ServerEvent::UpdateMembers(members) if members.len() == 2)
    })
    .await;

    // when (操作):
    let result = ws_join(&mut alice, "r2", "Alice").await;

    // then (期待する結果):
    assert!(result.success);
    assert_eq!(result.room_id.as_deref(), Some("r2"));
    let update = ws_read_until(&mut bob, |e| {
        matches!(e, ServerEvent::UpdateMembers(members) if members.len() == 1)
    })
    .await;
    let ServerEvent::UpdateMembers(members) = update else {
        unreachable!()
    };
    assert_eq!(members[0].username, "Bob");
}

#[tokio::test]
async fn test_chat_message_reaches_sender_and_room() {
    // テスト項目: チャットメッセージは送信者自身を含む Room の全員に届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = ws_connect(&server.ws_url()).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, "r1", "Alice").await;
    ws_join(&mut bob, "r1", "Bob").await;

    // when (操作):
    ws_send(&mut alice, &ClientEvent::ChatMessage(message("r1", "Alice", "hi"))).await;

    // then (期待する結果):
    let expected = ServerEvent::ChatMessage(ChatBroadcast {
        username: "Alice".to_string(),
        message: "hi".to_string(),
        reply_to: None,
    });
    let is_chat = |e: &ServerEvent| matches!(e, ServerEvent::ChatMessage(_));
    assert_eq!(ws_read_until(&mut alice, is_chat).await, expected);
    assert_eq!(ws_read_until(&mut bob, is_chat).await, expected);
}

#[tokio::test]
async fn test_ai_message_event_sequence() {
    // テスト項目: aiMessage で [1] → [] → typing true → AI の回答 → typing false が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, "r1", "Alice").await;

    // when (操作):
    ws_send(&mut alice, &ClientEvent::AiMessage(message("r1", "Alice", "hello"))).await;

    // then (期待する結果):
    let mut events = Vec::new();
    for _ in 0..5 {
        events.push(ws_read_event(&mut alice).await);
    }
    assert_eq!(
        events,
        vec![
            ServerEvent::AiQueueUpdate(vec![1]),
            ServerEvent::AiQueueUpdate(vec![]),
            ServerEvent::AiTyping(true),
            ai_reply("echo: hello", "Alice"),
            ServerEvent::AiTyping(false),
        ]
    );
}

#[tokio::test]
async fn test_two_requesters_are_answered_in_order() {
    // テスト項目: 2 人のリクエストは到着順に 1 件ずつ回答される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = ws_connect(&server.ws_url()).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, "r1", "Alice").await;
    ws_join(&mut bob, "r1", "Bob").await;

    // when (操作): Alice のリクエストの処理開始を待ってから Bob が送る
    ws_send(&mut alice, &ClientEvent::AiMessage(message("r1", "Alice", "first"))).await;
    ws_read_until(&mut bob, |e| *e == ServerEvent::AiTyping(true)).await;
    ws_send(&mut bob, &ClientEvent::AiMessage(message("r1", "Bob", "second"))).await;

    // then (期待する結果):
    let mut typing = Vec::new();
    let mut replies = Vec::new();
    while replies.len() < 2 {
        match ws_read_event(&mut alice).await {
            ServerEvent::AiTyping(on) => typing.push(on),
            event @ ServerEvent::ChatMessage(_) => replies.push(event),
            _ => {}
        }
    }
    assert_eq!(
        replies,
        vec![ai_reply("echo: first", "Alice"), ai_reply("echo: second", "Bob")]
    );
    // 2 件目の typing true は 1 件目の typing false の後にしか来ない
    assert_eq!(typing, vec![true, false, true]);
}

#[tokio::test]
async fn test_provider_error_is_shown_as_ai_message() {
    // テスト項目: プロバイダのエラーは "AI" のチャットメッセージとして表示される
    // given (前提条件):
    let server = TestServer::with_generator(Arc::new(FailingGenerator)).await;
    let mut alice = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, "r1", "Alice").await;

    // when (操作):
    ws_send(&mut alice, &ClientEvent::AiMessage(message("r1", "Alice", "hello"))).await;

    // then (期待する結果):
    let reply = ws_read_until(&mut alice, |e| matches!(e, ServerEvent::ChatMessage(_))).await;
    assert_eq!(reply, ai_reply("HF API Error (503): model loading", "Alice"));
    assert_eq!(ws_read_event(&mut alice).await, ServerEvent::AiTyping(false));
}

#[tokio::test]
async fn test_disconnect_updates_members() {
    // テスト項目: 切断すると残りの参加者に新しい参加者リストが届き、Room は残る
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = ws_connect(&server.ws_url()).await;
    let mut bob = ws_connect(&server.ws_url()).await;
    ws_join(&mut alice, "r1", "Alice").await;
    ws_join(&mut bob, "r1", "Bob").await;
    // Bob の参加による updateMembers を読み飛ばす
    ws_read_until(&mut alice, |e| {
        matches!(e, ServerEvent::UpdateMembers(members) if members.len() == 2)
    })
    .await;

    // when (操作):
    drop(bob);

    // then (期待する結果):
    let event = ws_read_until(&mut alice, |e| matches!(e, ServerEvent::UpdateMembers(_))).await;
    match event {
        ServerEvent::UpdateMembers(members) => {
            let names: Vec<&str> = members.iter().map(|m| m.username.as_str()).collect();
            assert_eq!(names, vec!["Alice"]);
        }
        other => panic!("Expected UpdateMembers, got: {other:?}"),
    }

    drop(alice);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let rooms: Vec<RoomSummaryDto> = reqwest::get(format!("{}/api/rooms", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms.len(), 1);
    assert!(rooms[0].members.is_empty());
}

#[tokio::test]
async fn test_malformed_frame_gets_error_event() {
    // テスト項目: 不正なフレームには error イベントが返り、接続は維持される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = ws_connect(&server.ws_url()).await;

    // when (操作):
    ws_send_raw(&mut alice, "this is not json").await;

    // then (期待する結果):
    assert!(matches!(
        ws_read_event(&mut alice).await,
        ServerEvent::Error(_)
    ));
    assert!(ws_join(&mut alice, "r1", "Alice").await.success);
}

#[tokio::test]
async fn test_health_and_unknown_room() {
    // テスト項目: /health はモデル名を返し、存在しない Room の詳細は 404
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let health: HealthDto = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let missing = reqwest::get(format!("{}/api/rooms/nowhere", server.base_url()))
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(
        health,
        HealthDto {
            ok: true,
            model: TEST_MODEL.to_string(),
        }
    );
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
