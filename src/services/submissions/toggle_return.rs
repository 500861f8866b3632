use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{SubmissionService, assemble_submission_response};
use crate::errors::{ClassroomError, Result};
use crate::middlewares::RequireJWT;
use crate::models::submissions::responses::SubmissionResponse;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::authz::{self, AccessTier};
use crate::services::rooms::{RoomEvent, RoomEventKind, RoomRegistry};
use crate::storage::Storage;

/// 切换退回状态（教师操作）
///
/// 只翻转 returned，不触碰 submitted 与 submitted_at；
/// 解除退回后学生可继续切换提交。
pub async fn toggle_return(
    storage: &Arc<dyn Storage>,
    rooms: &Arc<RoomRegistry>,
    actor: &User,
    submission_id: i64,
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
        AccessTier::ClassTeacher,
        &format!("submission {submission_id}"),
    )
    .await?;

    let updated = storage
        .toggle_returned(submission_id)
        .await?
        .ok_or_else(|| ClassroomError::not_found(format!("submission {submission_id} not found")))?;

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

/// POST /api/v1/submissions/{submission_id}/return
pub async fn handle_return(
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

    match toggle_return(&storage, &rooms, &actor, submission_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "操作成功"))),
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}
