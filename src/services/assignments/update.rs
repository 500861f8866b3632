use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{AssignmentService, assemble_assignment_response};
use crate::errors::{ClassroomError, Result};
use crate::middlewares::RequireJWT;
use crate::models::assignments::requests::UpdateAssignmentRequest;
use crate::models::assignments::responses::AssignmentResponse;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::authz::{self, AccessTier};
use crate::services::rooms::{RoomEvent, RoomEventKind, RoomRegistry};
use crate::storage::Storage;

/// 更新作业。只有所属教师（或机构管理员）可以修改。
pub async fn update_assignment(
    storage: &Arc<dyn Storage>,
    rooms: &Arc<RoomRegistry>,
    actor: &User,
    assignment_id: i64,
    req: UpdateAssignmentRequest,
) -> Result<AssignmentResponse> {
    let assignment = storage
        .get_assignment_by_id(assignment_id)
        .await?
        .ok_or_else(|| ClassroomError::not_found(format!("assignment {assignment_id} not found")))?;

    let tier = authz::require(
        storage,
        actor.id,
        assignment.class_id,
        AccessTier::ClassTeacher,
        &format!("assignment {assignment_id}"),
    )
    .await?;
    if tier != AccessTier::InstitutionAdmin && actor.id != assignment.teacher_id {
        return Err(ClassroomError::authorization("只有作业所属教师可以修改此作业"));
    }

    if req.max_grade.is_some_and(|g| g <= 0.0) {
        return Err(ClassroomError::validation("最高分数必须为正数"));
    }

    let updated = storage
        .update_assignment(assignment_id, &req)
        .await?
        .ok_or_else(|| ClassroomError::not_found(format!("assignment {assignment_id} not found")))?;

    let class_id = updated.class_id;
    let response = assemble_assignment_response(storage, updated).await?;
    rooms.emit(RoomEvent {
        event: RoomEventKind::AssignmentUpdated,
        class_id,
        entity_id: assignment_id,
        entity: serde_json::to_value(&response)?,
    });
    Ok(response)
}

/// PUT /api/v1/assignments/{assignment_id}
pub async fn handle_update(
    service: &AssignmentService,
    request: &HttpRequest,
    assignment_id: i64,
    req: UpdateAssignmentRequest,
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

    match update_assignment(&storage, &rooms, &actor, assignment_id, req).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "作业更新成功"))),
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}
