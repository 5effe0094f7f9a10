//! UseCase: AI リクエストキュー
//!
//! Room ごとの FIFO キューに AI へのリクエストを積み、1 つのワーカーが 1 件ずつ処理します。
//!
//! ## ドレインの流れ
//!
//! 1. `begin_drain`（busy フラグの確認・設定と先頭の取り出しを原子的に行う）
//! 2. 残りの順番リストを aiQueueUpdate で通知
//! 3. aiTyping = true
//! 4. TextGenerator を呼び出す（失敗・panic も "AI" のチャットメッセージとして通知）
//! 5. aiTyping = false
//! 6. `finish_drain`（busy フラグを下ろす）。キューが残っていれば `drain_delay` 待って 1 に戻る
//!
//! 1〜3 と 4 の回答の通知〜6 は、それぞれ `RoomBroadcaster::lock()` のガードを保持して行う。
//! TextGenerator の呼び出し中はガードを保持しない。
//!
//! ## テスト実装の作業記録
//!
//! ### どのような状況を想定しているか
//! - 正常系：1 件のリクエストのイベント順序、複数リクエストの到着順処理
//! - 異常系：プロバイダのエラー・panic（busy フラグが下り、次のリクエストが処理される）
//! - エッジケース：処理中に届いたリクエストは追加のみ（2 つ目のワーカーは起動しない）、
//!   複数タスクからの同時追加（aiQueueUpdate がキューの変化順に届く）

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures_util::FutureExt;
use irori_shared::{
    protocol::{AI_USERNAME, ChatBroadcast, ServerEvent},
    time::{Clock, SystemClock},
};
use tokio::task::JoinHandle;

use crate::domain::{
    ChatLine, ConnectionId, DrainStart, GenerationRequest, MessageText, ProviderError, QueueEntry,
    RepositoryError, RoomId, RoomRepository, TextGenerator, Timestamp, Username,
};

use super::{broadcast::RoomBroadcaster, error::EnqueueError};

/// キューの動作設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiQueueSettings {
    /// プロバイダに渡す直近のチャット履歴の件数
    pub history_size: usize,
    /// 1 件処理した後、次のリクエストを取り出すまでの待ち時間
    pub drain_delay: Duration,
}

impl Default for AiQueueSettings {
    fn default() -> Self {
        Self {
            history_size: 6,
            drain_delay: Duration::from_millis(200),
        }
    }
}

/// キュー追加の結果
#[derive(Debug)]
pub struct EnqueueOutcome {
    /// 追加後の順番リスト
    pub positions: Vec<usize>,
    /// この追加でドレインを開始した場合、そのワーカー
    pub worker: Option<JoinHandle<()>>,
}

/// AI リクエストキューのユースケース
pub struct AiQueueUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    broadcaster: RoomBroadcaster,
    /// TextGenerator（外部テキスト生成 API の抽象化）
    generator: Arc<dyn TextGenerator>,
    settings: AiQueueSettings,
    clock: Arc<dyn Clock>,
}

impl AiQueueUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        broadcaster: RoomBroadcaster,
        generator: Arc<dyn TextGenerator>,
        settings: AiQueueSettings,
    ) -> Self {
        Self {
            repository,
            broadcaster,
            generator,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    /// リクエストをキューに追加
    ///
    /// 追加後の順番リストを Room に通知し、ドレインが動いていなければワーカーを起動する。
    /// 存在しない Room へのリクエストは何も通知せずに拒否する。
    pub async fn enqueue(
        self: &Arc<Self>,
        connection_id: ConnectionId,
        room_id: &RoomId,
        username: String,
        text: String,
    ) -> Result<EnqueueOutcome, EnqueueError> {
        let username = Username::new(username).map_err(EnqueueError::InvalidInput)?;
        let text = MessageText::new(text).map_err(EnqueueError::InvalidInput)?;
        let entry = QueueEntry::new(
            connection_id,
            username,
            text,
            Timestamp::new(self.clock.now_millis()),
        );

        let guard = self.broadcaster.lock().await;
        let positions = self
            .repository
            .enqueue(room_id, entry)
            .await
            .map_err(|e| match e {
                RepositoryError::RoomNotFound(id) => EnqueueError::RoomNotFound(id),
                RepositoryError::RoomFull => EnqueueError::RoomNotFound(room_id.to_string()),
            })?;
        tracing::debug!("AI queue of room '{}': {:?}", room_id, positions);

        self.notify(room_id, &ServerEvent::AiQueueUpdate(positions.clone()))
            .await;
        let start = self.begin_next(room_id).await;
        drop(guard);

        let worker = start.map(|entry| {
            let this = Arc::clone(self);
            let room_id = room_id.clone();
            tokio::spawn(async move { this.drain(room_id, entry).await })
        });

        Ok(EnqueueOutcome { positions, worker })
    }

    /// キューが空になるまで 1 件ずつ処理する
    async fn drain(self: Arc<Self>, room_id: RoomId, mut entry: QueueEntry) {
        tracing::debug!("Drain started for room '{}'", room_id);
        loop {
            if !self.process(&room_id, entry).await {
                break;
            }
            tokio::time::sleep(self.settings.drain_delay).await;

            // 待機中に別のワーカーが起動していれば、そちらに任せる
            let next = {
                let _guard = self.broadcaster.lock().await;
                self.begin_next(&room_id).await
            };
            match next {
                Some(next) => entry = next,
                None => break,
            }
        }
        tracing::debug!("Drain finished for room '{}'", room_id);
    }

    /// ドレインを開始し、残りの順番リストと aiTyping = true を通知する
    ///
    /// 呼び出し側は `broadcaster.lock()` のガードを保持していること。
    async fn begin_next(&self, room_id: &RoomId) -> Option<QueueEntry> {
        let DrainStart { entry, remaining } = self.repository.begin_drain(room_id).await?;
        self.notify(room_id, &ServerEvent::AiQueueUpdate(remaining))
            .await;
        self.notify(room_id, &ServerEvent::AiTyping(true)).await;
        Some(entry)
    }

    /// 1 件のリクエストを処理し、busy フラグを下ろす
    ///
    /// 未処理のリクエストが残っていれば true。
    async fn process(&self, room_id: &RoomId, entry: QueueEntry) -> bool {
        let history = self
            .repository
            .recent_history(room_id, self.settings.history_size)
            .await;
        let request = GenerationRequest::new(entry.text.as_str()).with_history(history);

        tracing::info!(
            "Sending AI request from '{}' in room '{}' to {}",
            entry.username,
            room_id,
            self.generator.name()
        );
        let result = AssertUnwindSafe(async { self.generator.generate(&request).await })
            .catch_unwind()
            .await
            .unwrap_or(Err(ProviderError::Panicked));

        let _guard = self.broadcaster.lock().await;
        let message = match result {
            Ok(answer) => {
                for line in [
                    ChatLine::new(entry.username.as_str(), entry.text.as_str()),
                    ChatLine::new(AI_USERNAME, answer.as_str()),
                ] {
                    if let Err(e) = self.repository.record_line(room_id, line).await {
                        tracing::debug!("History not recorded: {}", e);
                    }
                }
                answer
            }
            Err(e) => {
                tracing::error!(
                    "{} failed for room '{}': {}",
                    self.generator.name(),
                    room_id,
                    e
                );
                e.to_string()
            }
        };

        let event = ServerEvent::ChatMessage(ChatBroadcast {
            username: AI_USERNAME.to_string(),
            message,
            reply_to: Some(entry.username.into_string()),
        });
        self.notify(room_id, &event).await;
        self.notify(room_id, &ServerEvent::AiTyping(false)).await;
        self.repository.finish_drain(room_id).await
    }

    /// Room にブロードキャスト（失敗はログのみ。ドレインは止めない）
    async fn notify(&self, room_id: &RoomId, event: &ServerEvent) {
        if let Err(e) = self.broadcaster.to_room(room_id, event).await {
            tracing::warn!("Failed to broadcast to room '{}': {}", room_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::MockTextGenerator,
        usecase::test_support::{GatedGenerator, Harness, conn, received, room_id},
    };

    fn settings() -> AiQueueSettings {
        AiQueueSettings {
            history_size: 6,
            drain_delay: Duration::from_millis(10),
        }
    }

    fn usecase(harness: &Harness, generator: Arc<dyn TextGenerator>) -> Arc<AiQueueUseCase> {
        Arc::new(AiQueueUseCase::new(
            harness.repository.clone(),
            harness.broadcaster.clone(),
            generator,
            settings(),
        ))
    }

    fn ai_says(message: &str, reply_to: &str) -> ServerEvent {
        ServerEvent::ChatMessage(ChatBroadcast {
            username: AI_USERNAME.to_string(),
            message: message.to_string(),
            reply_to: Some(reply_to.to_string()),
        })
    }

    fn ai_messages(events: &[ServerEvent]) -> Vec<ServerEvent> {
        events
            .iter()
            .filter(|e| matches!(e, ServerEvent::ChatMessage(_)))
            .cloned()
            .collect()
    }

    /// 同時実行数を記録し、少し待ってから応答するテスト用の TextGenerator
    #[derive(Default)]
    struct SlowGenerator {
        active: AtomicUsize,
        max_active: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        fn name(&self) -> &'static str {
            "Slow"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt.clone());
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("re: {}", request.prompt))
        }
    }

    /// "explode" を受け取ると panic する TextGenerator
    struct PanickingGenerator;

    #[async_trait]
    impl TextGenerator for PanickingGenerator {
        fn name(&self) -> &'static str {
            "Panicking"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            if request.prompt == "explode" {
                panic!("provider blew up");
            }
            Ok("still alive".to_string())
        }
    }

    #[tokio::test]
    async fn test_single_request_event_order() {
        // テスト項目: 1 件のリクエストで [1] → [] → typing true → AI の回答 → typing false の順に届く
        // given (前提条件):
        let harness = Harness::new();
        harness.seat("r1", "alice", "Alice").await;
        let (alice, mut alice_rx) = harness.connect("alice").await;
        let mut generator = MockTextGenerator::new();
        generator.expect_name().return_const("Mock");
        generator
            .expect_generate()
            .withf(|request| request.prompt == "hello ai")
            .times(1)
            .returning(|_| Ok("hello human".to_string()));
        let usecase = usecase(&harness, Arc::new(generator));

        // when (操作):
        let outcome = usecase
            .enqueue(alice, &room_id("r1"), "Alice".to_string(), "hello ai".to_string())
            .await
            .unwrap();
        outcome.worker.unwrap().await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome.positions, vec![1]);
        assert_eq!(
            received(&mut alice_rx),
            vec![
                ServerEvent::AiQueueUpdate(vec![1]),
                ServerEvent::AiQueueUpdate(vec![]),
                ServerEvent::AiTyping(true),
                ai_says("hello human", "Alice"),
                ServerEvent::AiTyping(false),
            ]
        );
        let room = harness.repository.get_room(&room_id("r1")).await.unwrap();
        assert!(!room.busy);
        assert!(room.queue.is_empty());
    }

    #[tokio::test]
    async fn test_requests_are_processed_in_arrival_order_one_at_a_time() {
        // テスト項目: 2 人のリクエストが到着順に 1 件ずつ処理される
        // given (前提条件):
        let harness = Harness::new();
        harness.seat("r1", "alice", "Alice").await;
        harness.seat("r1", "bob", "Bob").await;
        let (_alice, mut alice_rx) = harness.connect("alice").await;
        let generator = Arc::new(SlowGenerator::default());
        let usecase = usecase(&harness, generator.clone());

        // when (操作):
        let first = usecase
            .enqueue(conn("alice"), &room_id("r1"), "Alice".to_string(), "first".to_string())
            .await
            .unwrap();
        let second = usecase
            .enqueue(conn("bob"), &room_id("r1"), "Bob".to_string(), "second".to_string())
            .await
            .unwrap();
        let third = usecase
            .enqueue(conn("alice"), &room_id("r1"), "Alice".to_string(), "third".to_string())
            .await
            .unwrap();
        first.worker.unwrap().await.unwrap();

        // then (期待する結果):
        assert!(second.worker.is_none());
        assert!(third.worker.is_none());
        assert_eq!(second.positions, vec![1]);
        assert_eq!(third.positions, vec![1, 2]);
        assert_eq!(
            *generator.prompts.lock().unwrap(),
            vec!["first", "second", "third"]
        );
        assert_eq!(generator.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(
            ai_messages(&received(&mut alice_rx)),
            vec![
                ai_says("re: first", "Alice"),
                ai_says("re: second", "Bob"),
                ai_says("re: third", "Alice"),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enqueues_broadcast_queue_in_state_order() {
        // テスト項目: 複数のタスクから同時に追加しても aiQueueUpdate はキューの状態の変化順に届き、
        //             最後の通知が実際のキューと一致する
        // given (前提条件):
        let harness = Harness::new();
        harness.seat("r1", "watcher", "Watcher").await;
        let (_watcher, mut watcher_rx) = harness.connect("watcher").await;
        let generator = Arc::new(GatedGenerator::new());
        let usecase = usecase(&harness, generator.clone());
        const REQUESTS: usize = 8;

        // when (操作):
        let tasks: Vec<_> = (0..REQUESTS)
            .map(|i| {
                let usecase = usecase.clone();
                tokio::spawn(async move {
                    usecase
                        .enqueue(
                            conn(&format!("c{}", i)),
                            &room_id("r1"),
                            format!("user{}", i),
                            format!("question {}", i),
                        )
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut workers = Vec::new();
        for task in tasks {
            workers.extend(task.await.unwrap().worker);
        }

        // then (期待する結果): [1] → []（ドレイン開始）→ [1] → [1, 2] → ... の順
        let lengths: Vec<usize> = received(&mut watcher_rx)
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::AiQueueUpdate(positions) => Some(positions.len()),
                _ => None,
            })
            .collect();
        let mut expected = vec![1, 0];
        expected.extend(1..REQUESTS);
        assert_eq!(lengths, expected);
        let room = harness.repository.get_room(&room_id("r1")).await.unwrap();
        assert_eq!(room.queue.len(), REQUESTS - 1);
        assert!(room.busy);
        assert_eq!(workers.len(), 1);

        for worker in workers {
            worker.abort();
        }
    }

    #[tokio::test]
    async fn test_provider_failure_clears_busy_and_continues() {
        // テスト項目: プロバイダのエラーは "AI" のメッセージとして通知され、次のリクエストも処理される
        // given (前提条件):
        let harness = Harness::new();
        harness.seat("r1", "alice", "Alice").await;
        let (_alice, mut alice_rx) = harness.connect("alice").await;
        let mut generator = MockTextGenerator::new();
        generator.expect_name().return_const("Mock");
        generator.expect_generate().times(2).returning(|request| {
            if request.prompt == "bad" {
                Err(ProviderError::Network("connection refused".to_string()))
            } else {
                Ok("fine".to_string())
            }
        });
        let usecase = usecase(&harness, Arc::new(generator));

        // when (操作):
        let first = usecase
            .enqueue(conn("alice"), &room_id("r1"), "Alice".to_string(), "bad".to_string())
            .await
            .unwrap();
        usecase
            .enqueue(conn("alice"), &room_id("r1"), "Alice".to_string(), "good".to_string())
            .await
            .unwrap();
        first.worker.unwrap().await.unwrap();

        // then (期待する結果):
        assert_eq!(
            ai_messages(&received(&mut alice_rx)),
            vec![
                ai_says("Error: AI failed to respond (connection refused)", "Alice"),
                ai_says("fine", "Alice"),
            ]
        );
        let room = harness.repository.get_room(&room_id("r1")).await.unwrap();
        assert!(!room.busy);
    }

    #[tokio::test]
    async fn test_provider_panic_is_reported_and_queue_continues() {
        // テスト項目: プロバイダ内の panic でもドレインは止まらず、busy フラグが下りる
        // given (前提条件):
        let harness = Harness::new();
        harness.seat("r1", "alice", "Alice").await;
        let (_alice, mut alice_rx) = harness.connect("alice").await;
        let usecase = usecase(&harness, Arc::new(PanickingGenerator));

        // when (操作):
        let first = usecase
            .enqueue(conn("alice"), &room_id("r1"), "Alice".to_string(), "explode".to_string())
            .await
            .unwrap();
        usecase
            .enqueue(conn("alice"), &room_id("r1"), "Alice".to_string(), "again".to_string())
            .await
            .unwrap();
        first.worker.unwrap().await.unwrap();

        // then (期待する結果):
        assert_eq!(
            ai_messages(&received(&mut alice_rx)),
            vec![
                ai_says(&ProviderError::Panicked.to_string(), "Alice"),
                ai_says("still alive", "Alice"),
            ]
        );
        let room = harness.repository.get_room(&room_id("r1")).await.unwrap();
        assert!(!room.busy);
    }

    #[tokio::test]
    async fn test_recent_history_is_passed_to_provider() {
        // テスト項目: 直近のチャット履歴がプロバイダに渡され、回答も履歴に記録される
        // given (前提条件):
        let harness = Harness::new();
        harness.seat("r1", "alice", "Alice").await;
        let r1 = room_id("r1");
        harness
            .repository
            .record_line(&r1, ChatLine::new("Alice", "earlier"))
            .await
            .unwrap();
        let mut generator = MockTextGenerator::new();
        generator.expect_name().return_const("Mock");
        generator
            .expect_generate()
            .withf(|request| request.history == vec![ChatLine::new("Alice", "earlier")])
            .times(1)
            .returning(|_| Ok("noted".to_string()));
        let usecase = usecase(&harness, Arc::new(generator));

        // when (操作):
        let outcome = usecase
            .enqueue(conn("alice"), &r1, "Alice".to_string(), "remember?".to_string())
            .await
            .unwrap();
        outcome.worker.unwrap().await.unwrap();

        // then (期待する結果):
        assert_eq!(
            harness.repository.recent_history(&r1, 10).await,
            vec![
                ChatLine::new("Alice", "earlier"),
                ChatLine::new("Alice", "remember?"),
                ChatLine::new(AI_USERNAME, "noted"),
            ]
        );
    }

    #[tokio::test]
    async fn test_enqueue_to_unknown_room_is_rejected() {
        // テスト項目: 存在しない Room へのリクエストは拒否され、プロバイダは呼ばれない
        // given (前提条件):
        let harness = Harness::new();
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().times(0);
        let usecase = usecase(&harness, Arc::new(generator));

        // when (操作):
        let result = usecase
            .enqueue(conn("alice"), &room_id("ghost"), "Alice".to_string(), "hi".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(EnqueueError::RoomNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_enqueue_empty_text_is_rejected() {
        // テスト項目: 空のメッセージはキューに追加されない
        // given (前提条件):
        let harness = Harness::new();
        harness.seat("r1", "alice", "Alice").await;
        let usecase = usecase(&harness, Arc::new(SlowGenerator::default()));

        // when (操作):
        let result = usecase
            .enqueue(conn("alice"), &room_id("r1"), "Alice".to_string(), " ".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(EnqueueError::InvalidInput(_))));
        let room = harness.repository.get_room(&room_id("r1")).await.unwrap();
        assert!(room.queue.is_empty());
    }
}
