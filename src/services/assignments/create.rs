use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{AssignmentService, assemble_assignment_response};
use crate::errors::{ClassroomError, Result};
use crate::middlewares::RequireJWT;
use crate::models::assignments::requests::CreateAssignmentRequest;
use crate::models::assignments::responses::AssignmentResponse;
use crate::models::files::entities::FileOwnerKind;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::authz::{self, AccessTier};
use crate::services::rooms::{RoomEvent, RoomEventKind, RoomRegistry};
use crate::storage::Storage;

/// 创建作业
///
/// 创建瞬间为每个在册学生建一条空白提交记录；之后的选课变动
/// 不会回头补建提交，这是刻意为之的快照语义。预先注册的文件
/// 在此一并挂为作业附件。
pub async fn create_assignment(
    storage: &Arc<dyn Storage>,
    rooms: &Arc<RoomRegistry>,
    actor: &User,
    class_id: i64,
    req: CreateAssignmentRequest,
) -> Result<AssignmentResponse> {
    if storage.get_class_by_id(class_id).await?.is_none() {
        return Err(ClassroomError::not_found(format!("class {class_id} not found")));
    }
    authz::require(
        storage,
        actor.id,
        class_id,
        AccessTier::ClassTeacher,
        &format!("class {class_id}"),
    )
    .await?;

    if req.title.trim().is_empty() {
        return Err(ClassroomError::validation("作业标题不能为空"));
    }
    if req.max_grade.is_some_and(|g| g <= 0.0) {
        return Err(ClassroomError::validation("最高分数必须为正数"));
    }

    let assignment = storage.create_assignment(class_id, actor.id, &req).await?;

    // 当前在册学生的快照，每人一条空白提交
    let student_ids = storage.list_class_student_ids(class_id).await?;
    if !student_ids.is_empty() {
        storage
            .create_submissions_for_students(assignment.id, &student_ids)
            .await?;
    }

    // 挂接预先注册的附件；无归属校验在 attach_file 内完成
    if let Some(file_ids) = &req.attachments {
        for &file_id in file_ids {
            if storage
                .attach_file(file_id, FileOwnerKind::AssignmentAttachment, assignment.id)
                .await?
                .is_none()
            {
                tracing::warn!(
                    "Skipped attaching unknown file {} to assignment {}",
                    file_id,
                    assignment.id
                );
            }
        }
    }

    let response = assemble_assignment_response(storage, assignment).await?;
    rooms.emit(RoomEvent {
        event: RoomEventKind::AssignmentCreated,
        class_id,
        entity_id: response.assignment.id,
        entity: serde_json::to_value(&response)?,
    });
    Ok(response)
}

/// POST /api/v1/classes/{class_id}/assignments
pub async fn handle_create(
    service: &AssignmentService,
    request: &HttpRequest,
    class_id: i64,
    req: CreateAssignmentRequest,
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

    match create_assignment(&storage, &rooms, &actor, class_id, req).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "作业创建成功"))),
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}
