use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use super::{SubmissionService, assemble_submission_response};
use crate::errors::{ClassroomError, Result};
use crate::middlewares::RequireJWT;
use crate::models::submissions::requests::SetGradeRequest;
use crate::models::submissions::responses::SubmissionResponse;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::authz::{self, AccessTier};
use crate::services::rooms::{RoomEvent, RoomEventKind, RoomRegistry};
use crate::storage::Storage;

/// 越界成绩截断到边界，不拒绝
pub fn clamp_grade(value: f64, max_grade: f64) -> f64 {
    value.max(0.0).min(max_grade)
}

/// 评分（教师操作）
///
/// 与 submitted / returned 完全正交：教师可以在学生提交之前评分。
/// 成绩截断到 [0, max_grade]。
pub async fn set_grade(
    storage: &Arc<dyn Storage>,
    rooms: &Arc<RoomRegistry>,
    actor: &User,
    submission_id: i64,
    req: SetGradeRequest,
) -> Result<SubmissionResponse> {
    if !req.value.is_finite() {
        return Err(ClassroomError::validation("成绩必须是有限数值"));
    }

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

    let value = clamp_grade(req.value, assignment.max_grade);
    let updated = storage
        .set_grade(submission_id, value)
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

/// PUT /api/v1/submissions/{submission_id}/grade
pub async fn handle_grade(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
    req: SetGradeRequest,
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

    match set_grade(&storage, &rooms, &actor, submission_id, req).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response, "评分成功"))),
        Err(e) => Ok(crate::services::error_to_response(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::clamp_grade;

    #[test]
    fn test_clamp_above_max() {
        assert_eq!(clamp_grade(150.0, 100.0), 100.0);
    }

    #[test]
    fn test_clamp_below_zero() {
        assert_eq!(clamp_grade(-5.0, 100.0), 0.0);
    }

    #[test]
    fn test_in_range_unchanged() {
        assert_eq!(clamp_grade(87.5, 100.0), 87.5);
    }
}
