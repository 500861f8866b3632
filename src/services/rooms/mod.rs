/*!
 * 班级房间实时广播服务
 *
 * 每个班级对应一个逻辑房间。客户端进入班级视图时 join，离开时
 * leave；一个连接可以同时订阅多个房间。每当生命周期操作提交一次
 * 班级可见的变更，就向对应房间广播一条事件。
 *
 * ## 使用方法
 *
 * 客户端通过以下 URL 连接：
 * ```text
 * ws://host/api/v1/ws?token=<access_token>
 * ```
 *
 * ## 消息格式
 *
 * ### 客户端请求
 * ```json
 * {"type": "join", "class_id": 1}
 * {"type": "leave", "class_id": 1}
 * {"type": "ping"}
 * ```
 *
 * ### 服务端推送
 * ```json
 * {
 *     "type": "event",
 *     "payload": {
 *         "event": "submission-updated",
 *         "class_id": 1,
 *         "entity_id": 42,
 *         "entity": { ... 完整实体，而不是差量 ... }
 *     }
 * }
 * ```
 *
 * ## 投递语义
 *
 * 至少一次投递；跨事件类型不保证全局顺序，但对同一实体的两次
 * 更新按提交顺序到达（事件总是在数据库写入成功之后、由执行提交
 * 的同一代码路径同步发出）。客户端按实体 ID 幂等应用（upsert），
 * 重复投递无害。广播失败从不影响已提交的变更：数据库始终是
 * 唯一事实来源。
 */

pub mod view;

use actix_ws::Message;
use dashmap::DashMap;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::services::authz::{self, AccessTier};
use crate::storage::Storage;

/// 房间事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomEventKind {
    AssignmentCreated,
    AssignmentUpdated,
    AssignmentDeleted,
    SubmissionUpdated,
    SectionCreated,
    SectionUpdated,
    SectionDeleted,
    MemberUpdated,
    MemberDeleted,
    AnnouncementCreated,
    AttendanceUpdated,
}

impl RoomEventKind {
    /// 删除类事件：客户端按 ID 移除而不是 upsert
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            RoomEventKind::AssignmentDeleted
                | RoomEventKind::SectionDeleted
                | RoomEventKind::MemberDeleted
        )
    }
}

/// 房间事件，携带完整实体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEvent {
    pub event: RoomEventKind,
    pub class_id: i64,
    pub entity_id: i64,
    pub entity: serde_json::Value,
}

/// WebSocket 消息类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// 订阅班级房间
    Join { class_id: i64 },
    /// 退订班级房间
    Leave { class_id: i64 },
    /// 订阅确认
    Joined { class_id: i64 },
    /// 退订确认
    Left { class_id: i64 },
    /// 房间事件
    Event { payload: RoomEvent },
    /// 心跳请求
    Ping,
    /// 心跳响应
    Pong,
    /// 连接成功
    Connected { user_id: i64 },
    /// 错误消息
    Error { message: String },
}

/// 房间注册表
///
/// 每进程构造一次并注入处理器（通过 `web::Data`），不用全局单例。
/// 按班级分条目加锁，众多互不相干的班级可以并发广播。
pub struct RoomRegistry {
    /// 班级 ID -> 广播发送器
    rooms: DashMap<i64, broadcast::Sender<RoomEvent>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// 订阅班级房间
    pub fn join(&self, class_id: i64) -> broadcast::Receiver<RoomEvent> {
        let entry = self.rooms.entry(class_id).or_insert_with(|| {
            let (tx, _) = broadcast::channel(256);
            tx
        });
        entry.subscribe()
    }

    /// 回收空房间
    ///
    /// 接收端在转发任务结束时随之析构；这里只在没有订阅者时
    /// 移除房间条目，避免陈旧的扇出目标堆积。
    pub fn leave(&self, class_id: i64) {
        if let Some(entry) = self.rooms.get(&class_id)
            && entry.receiver_count() == 0
        {
            drop(entry);
            self.rooms.remove_if(&class_id, |_, tx| tx.receiver_count() == 0);
        }
    }

    /// 向房间广播一条已提交的事件，返回接收者数量
    ///
    /// 必须且只能从执行数据库提交的代码路径调用，且在写入成功
    /// 之后同步调用，以保证同一实体的事件按提交顺序到达。
    pub fn emit(&self, event: RoomEvent) -> usize {
        let class_id = event.class_id;
        let Some(sender) = self.rooms.get(&class_id) else {
            return 0;
        };
        match sender.send(event) {
            Ok(count) => count,
            // 没有订阅者；顺手回收空房间条目。转发任务 abort 后
            // 接收端才析构，单靠 leave 时的计数检查会漏掉这种条目。
            Err(_) => {
                drop(sender);
                self.rooms
                    .remove_if(&class_id, |_, tx| tx.receiver_count() == 0);
                0
            }
        }
    }

    /// 房间当前订阅者数量
    pub fn subscriber_count(&self, class_id: i64) -> usize {
        self.rooms
            .get(&class_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// 当前活跃房间数
    pub fn room_count(&self) -> usize {
        self.rooms.iter().filter(|e| e.receiver_count() > 0).count()
    }
}

/// WebSocket 会话服务
pub struct RoomSession;

impl RoomSession {
    /// 处理一条 WebSocket 连接
    ///
    /// 每个已加入的房间起一个转发任务，把广播事件汇入会话自己的
    /// mpsc 通道；连接断开时中止全部转发任务，房间成员资格随
    /// 连接一起回收（不依赖独立的心跳清道夫）。
    pub async fn handle_connection(
        user_id: i64,
        registry: Arc<RoomRegistry>,
        storage: Arc<dyn Storage>,
        mut session: actix_ws::Session,
        mut stream: actix_ws::MessageStream,
    ) {
        info!("Room session connected for user: {}", user_id);

        let (event_tx, mut event_rx) = mpsc::channel::<RoomEvent>(256);
        // 班级 ID -> 转发任务
        let mut joined: HashMap<i64, tokio::task::JoinHandle<()>> = HashMap::new();

        // 发送连接成功消息
        let connected_msg = WsMessage::Connected { user_id };
        if let Ok(json) = serde_json::to_string(&connected_msg) {
            let _ = session.text(json).await;
        }

        // 心跳间隔
        let heartbeat_interval = std::time::Duration::from_secs(30);
        let mut heartbeat = tokio::time::interval(heartbeat_interval);

        loop {
            tokio::select! {
                // 处理来自客户端的消息
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let Ok(ws_msg) = serde_json::from_str::<WsMessage>(&text) else {
                                continue;
                            };
                            match ws_msg {
                                WsMessage::Join { class_id } => {
                                    let reply = Self::handle_join(
                                        user_id,
                                        class_id,
                                        &registry,
                                        &storage,
                                        &event_tx,
                                        &mut joined,
                                    )
                                    .await;
                                    if Self::send(&mut session, &reply).await.is_err() {
                                        break;
                                    }
                                }
                                WsMessage::Leave { class_id } => {
                                    if let Some(task) = joined.remove(&class_id) {
                                        task.abort();
                                        registry.leave(class_id);
                                    }
                                    let reply = WsMessage::Left { class_id };
                                    if Self::send(&mut session, &reply).await.is_err() {
                                        break;
                                    }
                                }
                                WsMessage::Ping => {
                                    if Self::send(&mut session, &WsMessage::Pong).await.is_err() {
                                        break;
                                    }
                                }
                                _ => {
                                    debug!("Received message from user {}: {:?}", user_id, ws_msg);
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if session.pong(&data).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Room session closed for user: {}", user_id);
                            break;
                        }
                        Some(Err(e)) => {
                            warn!("Room session error for user {}: {:?}", user_id, e);
                            break;
                        }
                        _ => {}
                    }
                }

                // 处理来自已订阅房间的事件
                event = event_rx.recv() => {
                    match event {
                        Some(room_event) => {
                            let msg = WsMessage::Event { payload: room_event };
                            if Self::send(&mut session, &msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                // 心跳
                _ = heartbeat.tick() => {
                    if session.ping(b"").await.is_err() {
                        break;
                    }
                }
            }
        }

        // 清理连接：中止转发任务并回收空房间
        for (class_id, task) in joined.drain() {
            task.abort();
            registry.leave(class_id);
        }
        info!("Room session disconnected for user: {}", user_id);
    }

    /// 处理 join：先过权限门（班级成员即可），再订阅房间
    async fn handle_join(
        user_id: i64,
        class_id: i64,
        registry: &Arc<RoomRegistry>,
        storage: &Arc<dyn Storage>,
        event_tx: &mpsc::Sender<RoomEvent>,
        joined: &mut HashMap<i64, tokio::task::JoinHandle<()>>,
    ) -> WsMessage {
        if joined.contains_key(&class_id) {
            return WsMessage::Joined { class_id };
        }

        match authz::check(storage, user_id, class_id, AccessTier::ClassMember).await {
            Ok(decision) if decision.is_allowed() => {}
            Ok(_) | Err(_) => {
                // 统一按"不存在"处理，不泄露班级存在性
                return WsMessage::Error {
                    message: format!("class {class_id} not found"),
                };
            }
        }

        let mut rx = registry.join(class_id);
        let tx = event_tx.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Room {} subscriber lagged by {} events", class_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        joined.insert(class_id, task);

        WsMessage::Joined { class_id }
    }

    async fn send(session: &mut actix_ws::Session, msg: &WsMessage) -> Result<(), ()> {
        let json = serde_json::to_string(msg).map_err(|_| ())?;
        session.text(json).await.map_err(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(class_id: i64, entity_id: i64) -> RoomEvent {
        RoomEvent {
            event: RoomEventKind::SubmissionUpdated,
            class_id,
            entity_id,
            entity: serde_json::json!({"id": entity_id, "submitted": true}),
        }
    }

    #[tokio::test]
    async fn test_join_receives_emitted_event() {
        let registry = RoomRegistry::new();
        let mut rx = registry.join(1);

        let delivered = registry.emit(event(1, 42));
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.entity_id, 42);
        assert_eq!(received.event, RoomEventKind::SubmissionUpdated);
    }

    #[tokio::test]
    async fn test_emit_does_not_leak_across_rooms() {
        let registry = RoomRegistry::new();
        let mut rx_a = registry.join(1);
        let mut rx_b = registry.join(2);

        registry.emit(event(1, 7));

        assert_eq!(rx_a.recv().await.unwrap().class_id, 1);
        // 房间 2 没有收到任何事件
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_two_subscribers_each_receive_once() {
        let registry = RoomRegistry::new();
        let mut rx_a = registry.join(1);
        let mut rx_b = registry.join(1);

        let delivered = registry.emit(event(1, 9));
        assert_eq!(delivered, 2);

        assert_eq!(rx_a.recv().await.unwrap().entity_id, 9);
        assert_eq!(rx_b.recv().await.unwrap().entity_id, 9);
        assert!(matches!(
            rx_a.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_per_entity_commit_order_preserved() {
        let registry = RoomRegistry::new();
        let mut rx = registry.join(1);

        registry.emit(RoomEvent {
            entity: serde_json::json!({"id": 5, "submitted": true}),
            ..event(1, 5)
        });
        registry.emit(RoomEvent {
            entity: serde_json::json!({"id": 5, "submitted": false}),
            ..event(1, 5)
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.entity["submitted"], serde_json::json!(true));
        assert_eq!(second.entity["submitted"], serde_json::json!(false));
    }

    #[tokio::test]
    async fn test_emit_to_empty_room_is_noop() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.emit(event(99, 1)), 0);
    }

    #[tokio::test]
    async fn test_leave_garbage_collects_room() {
        let registry = RoomRegistry::new();
        let rx = registry.join(1);
        assert_eq!(registry.subscriber_count(1), 1);

        drop(rx);
        registry.leave(1);
        assert_eq!(registry.subscriber_count(1), 0);
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_emit_reaps_stale_room_entry() {
        let registry = RoomRegistry::new();
        let rx = registry.join(1);

        // 接收端析构但没人调用 leave（转发任务被 abort 的时序）
        drop(rx);
        assert!(registry.rooms.contains_key(&1));

        assert_eq!(registry.emit(event(1, 7)), 0);
        assert!(!registry.rooms.contains_key(&1));
    }
}
