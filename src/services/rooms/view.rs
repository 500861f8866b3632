//! 房间事件的客户端应用模型
//!
//! 事件携带完整实体，按实体 ID 幂等应用：upsert 或按 ID 删除。
//! 至少一次投递下重复事件无害，服务端也用它做回放验证。

use std::collections::BTreeMap;

use super::RoomEvent;

/// 按实体 ID 维护的物化视图
///
/// 同一实体的重复事件收敛到最后一次的状态。
#[derive(Debug, Default)]
pub struct RoomView {
    entities: BTreeMap<i64, serde_json::Value>,
}

impl RoomView {
    pub fn new() -> Self {
        Self::default()
    }

    /// 幂等应用一条事件
    pub fn apply(&mut self, event: &RoomEvent) {
        if event.event.is_deletion() {
            self.entities.remove(&event.entity_id);
        } else {
            self.entities.insert(event.entity_id, event.entity.clone());
        }
    }

    pub fn get(&self, entity_id: i64) -> Option<&serde_json::Value> {
        self.entities.get(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rooms::RoomEventKind;

    fn upsert(entity_id: i64, payload: serde_json::Value) -> RoomEvent {
        RoomEvent {
            event: RoomEventKind::SubmissionUpdated,
            class_id: 1,
            entity_id,
            entity: payload,
        }
    }

    fn deletion(entity_id: i64) -> RoomEvent {
        RoomEvent {
            event: RoomEventKind::AssignmentDeleted,
            class_id: 1,
            entity_id,
            entity: serde_json::json!({"id": entity_id}),
        }
    }

    #[test]
    fn test_duplicate_delivery_is_idempotent() {
        let mut view = RoomView::new();
        let ev = upsert(3, serde_json::json!({"id": 3, "grade": 80.0}));

        view.apply(&ev);
        view.apply(&ev);

        assert_eq!(view.len(), 1);
        assert_eq!(view.get(3).unwrap()["grade"], serde_json::json!(80.0));
    }

    #[test]
    fn test_later_event_wins() {
        let mut view = RoomView::new();
        view.apply(&upsert(3, serde_json::json!({"id": 3, "submitted": false})));
        view.apply(&upsert(3, serde_json::json!({"id": 3, "submitted": true})));

        assert_eq!(view.get(3).unwrap()["submitted"], serde_json::json!(true));
    }

    #[test]
    fn test_deletion_removes_and_repeats_harmlessly() {
        let mut view = RoomView::new();
        view.apply(&upsert(5, serde_json::json!({"id": 5})));
        view.apply(&deletion(5));
        view.apply(&deletion(5));

        assert!(view.get(5).is_none());
        assert!(view.is_empty());
    }
}
