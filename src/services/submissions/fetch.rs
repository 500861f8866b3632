use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{SubmissionService, assemble_submission_response};
use crate::errors::{ClassroomError, Result};
use crate::middlewares::RequireJWT;
use crate::models::submissions::responses::SubmissionResponse;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::authz::{self, AccessTier};
use crate::storage::Storage;

/// 获取提交记录
///
/// 学生首次访问自己的提交时按需创建，重复访问幂等地返回同一条
/// 记录。查看他人的提交需要班级教师层级，且只读取已存在的记录，
/// 不会替学生创建。
pub async fn get_or_create_submission(
    storage: &Arc<dyn Storage>,
    actor: &User,
    assignment_id: i64,
    student_id: i64,
) -> Result<SubmissionResponse> {
    let assignment = storage
        .get_assignment_by_id(assignment_id)
        .await?
        .ok_or_else(|| ClassroomError::not_found(format!("assignment {assignment_id} not found")))?;

    let submission = if actor.id == student_id {
        authz::require(
            storage,
            actor.id,
            assignment.class_id,
            AccessTier::ClassMember,
            &format!("assignment {assignment_id}"),
        )
        .await?;
        storage
            .get_or_create_submission(assignment_id, student_id)
            .await?
    } else {
        // 身份约束：看别人的提交需要教师层级
        authz::require(
            storage,
            actor.id,
            assignment.class_id,
            AccessTier::ClassTeacher,
            &format!("assignment {assignment_id}"),
        )
        .await?;
        storage
            .find_submission(assignment_id, student_id)
            .await?
            .ok_or_else(|| {
                ClassroomError::not_found(format!(
                    "submission for assignment {assignment_id} not found"
                ))
            })?
    };

    assemble_submission_response(storage, submission, &assignment).await
}

/// GET /api/v1/assignments/{assignment_id}/submissions/{student_id}
pub async fn handle_fetch(
    service: &SubmissionService,
    request: &HttpRequest,
    assignment_id: i64,
    student_id: i64,
) -> ActixResult<HttpResponse> {
    let actor = match RequireJWT::extract_user_claims(request) {
        Some(user) => user,
        None => {
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
        }
    };

    let storage = service.get_storage(request);

    match get_or_create_submission(&storage, &actor, assignment_id, student_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "查询成功"))),
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}
