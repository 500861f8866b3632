use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{SubmissionService, assemble_submission_response};
use crate::config::AppConfig;
use crate::errors::{ClassroomError, Result};
use crate::middlewares::RequireJWT;
use crate::models::submissions::responses::SubmissionResponse;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::authz::{self, AccessTier};
use crate::services::rooms::{RoomEvent, RoomEventKind, RoomRegistry};
use crate::storage::Storage;

/// 切换提交状态
///
/// 只有提交所属学生本人可以走这条路径。每次切换（包括取消提交）
/// 都重新盖章 submitted_at，迟交判定以最近一次切换时刻为准；
/// preserve_first_instant 打开时改为保留首次提交时刻。退回中的
/// 提交对学生只读，切换请求报 Conflict。
///
/// 同一学生并发的两次切换不做去重，后写者胜。
pub async fn toggle_submit(
    storage: &Arc<dyn Storage>,
    rooms: &Arc<RoomRegistry>,
    actor: &User,
    submission_id: i64,
    preserve_first_instant: bool,
) -> Result<SubmissionResponse> {
    let submission = storage
        .get_submission_by_id(submission_id)
        .await?
        .ok_or_else(|| ClassroomError::not_found(format!("submission {submission_id} not found")))?;
    let assignment = storage
        .get_assignment_by_id(submission.assignment_id)
        .await?
        .ok_or_else(|| ClassroomError::not_found(format!("submission {submission_id} not found")))?;

    authz::require(
        storage,
        actor.id,
        assignment.class_id,
        AccessTier::ClassMember,
        &format!("submission {submission_id}"),
    )
    .await?;
    if actor.id != submission.student_id {
        return Err(ClassroomError::authorization("只能切换自己的提交"));
    }

    let updated = match storage
        .toggle_submitted(submission_id, preserve_first_instant)
        .await?
    {
        Some(updated) => updated,
        // 原子 UPDATE 没碰到行：要么已退回，要么刚被删掉
        None => {
            return match storage.get_submission_by_id(submission_id).await? {
                Some(_) => Err(ClassroomError::conflict(
                    "提交已被退回，请等待教师解除退回后再操作",
                )),
                None => Err(ClassroomError::not_found(format!(
                    "submission {submission_id} not found"
                ))),
            };
        }
    };

    let class_id = assignment.class_id;
    let response = assemble_submission_response(storage, updated, &assignment).await?;
    rooms.emit(RoomEvent {
        event: RoomEventKind::SubmissionUpdated,
        class_id,
        entity_id: submission_id,
        entity: serde_json::to_value(&response)?,
    });
    Ok(response)
}

/// POST /api/v1/submissions/{submission_id}/submit
pub async fn handle_submit(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
) -> ActixResult<HttpResponse> {
    let actor = match RequireJWT::extract_user_claims(request) {
        Some(user) => user,
        None => {
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
        }
    };

    let storage = service.get_storage(request);
    let rooms = service.get_rooms(request);
    let preserve = AppConfig::get().submission.preserve_first_submission_instant;

    match toggle_submit(&storage, &rooms, &actor, submission_id, preserve).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "操作成功"))),
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}
