use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::AssignmentService;
use crate::errors::{ClassroomError, Result};
use crate::middlewares::RequireJWT;
use crate::models::files::entities::FileOwnerKind;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::authz::{self, AccessTier};
use crate::services::files::register;
use crate::services::rooms::{RoomEvent, RoomEventKind, RoomRegistry};
use crate::storage::Storage;
use crate::storage::blob::BlobStore;

/// 删除作业，级联清理全部子提交与可达文件
///
/// 字节回收先于数据库删除：悬空的数据库行比孤儿文件更糟。
/// 单个文件的字节删除失败只记警告，级联照常推进。
pub async fn delete_assignment(
    storage: &Arc<dyn Storage>,
    blob: &Arc<dyn BlobStore>,
    rooms: &Arc<RoomRegistry>,
    actor: &User,
    assignment_id: i64,
) -> Result<()> {
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
        return Err(ClassroomError::authorization("只有作业所属教师可以删除此作业"));
    }

    // 收集作业本身和全部子提交可达的文件
    let submissions = storage.list_submissions_by_assignment(assignment_id).await?;
    let submission_ids: Vec<i64> = submissions.iter().map(|s| s.id).collect();

    let mut files = storage
        .list_files_by_owner(FileOwnerKind::AssignmentAttachment, assignment_id)
        .await?;
    if !submission_ids.is_empty() {
        files.extend(
            storage
                .list_files_by_owners(
                    &[
                        FileOwnerKind::SubmissionAttachment,
                        FileOwnerKind::SubmissionAnnotation,
                    ],
                    &submission_ids,
                )
                .await?,
        );
    }

    // 字节（含元数据行）先清理，再删作业和提交的数据库行
    let results = futures_util::future::join_all(
        files
            .iter()
            .map(|file| register::discard_file(storage, blob, file)),
    )
    .await;
    for result in results {
        if let Err(e) = result {
            tracing::warn!("Cascade file cleanup failed: {}", e);
        }
    }

    storage.delete_assignment_rows(assignment_id).await?;

    rooms.emit(RoomEvent {
        event: RoomEventKind::AssignmentDeleted,
        class_id: assignment.class_id,
        entity_id: assignment_id,
        entity: serde_json::to_value(&assignment)?,
    });
    Ok(())
}

/// DELETE /api/v1/assignments/{assignment_id}
pub async fn handle_delete(
    service: &AssignmentService,
    request: &HttpRequest,
    assignment_id: i64,
) -> ActixResult<HttpResponse> {
    let actor = match RequireJWT::extract_user_claims(request) {
        Some(user) => user,
        None => {
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
        }
    };

    let storage = service.get_storage(request);
    let blob = service.get_blob(request);
    let rooms = service.get_rooms(request);

    match delete_assignment(&storage, &blob, &rooms, &actor, assignment_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty("作业已删除"))),
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}
