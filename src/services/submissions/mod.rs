/*!
 * 提交生命周期服务
 *
 * 状态机是环状且宽容的：除了权限门拦下错误的操作者之外，
 * 没有任何转移因"顺序不对"被拒绝（教师可以在学生提交之前
 * 评分），每个状态都能经由合法转移到达任何其他状态。
 */

pub mod fetch;
pub mod grade;
pub mod submit;
pub mod toggle_return;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::Result;
use crate::models::assignments::entities::Assignment;
use crate::models::files::entities::FileOwnerKind;
use crate::models::submissions::entities::Submission;
use crate::models::submissions::requests::SetGradeRequest;
use crate::models::submissions::responses::SubmissionResponse;
use crate::services::rooms::RoomRegistry;
use crate::storage::Storage;

pub struct SubmissionService {
    storage: Option<Arc<dyn Storage>>,
}

impl SubmissionService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub(crate) fn get_rooms(&self, request: &HttpRequest) -> Arc<RoomRegistry> {
        request
            .app_data::<actix_web::web::Data<Arc<RoomRegistry>>>()
            .expect("Room registry not found in app data")
            .get_ref()
            .clone()
    }

    pub async fn get_submission(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        student_id: i64,
    ) -> ActixResult<HttpResponse> {
        fetch::handle_fetch(self, request, assignment_id, student_id).await
    }

    pub async fn toggle_submit(
        &self,
        request: &HttpRequest,
        submission_id: i64,
    ) -> ActixResult<HttpResponse> {
        submit::handle_submit(self, request, submission_id).await
    }

    pub async fn toggle_return(
        &self,
        request: &HttpRequest,
        submission_id: i64,
    ) -> ActixResult<HttpResponse> {
        toggle_return::handle_return(self, request, submission_id).await
    }

    pub async fn set_grade(
        &self,
        request: &HttpRequest,
        submission_id: i64,
        req: SetGradeRequest,
    ) -> ActixResult<HttpResponse> {
        grade::handle_grade(self, request, submission_id, req).await
    }
}

/// 组装提交响应
///
/// `late` 与 `state` 都是读取时投影；附件与批注两个集合独立拉取。
pub async fn assemble_submission_response(
    storage: &Arc<dyn Storage>,
    submission: Submission,
    assignment: &Assignment,
) -> Result<SubmissionResponse> {
    let attachments = storage
        .list_files_by_owner(FileOwnerKind::SubmissionAttachment, submission.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let annotations = storage
        .list_files_by_owner(FileOwnerKind::SubmissionAnnotation, submission.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let now = chrono::Utc::now();
    Ok(SubmissionResponse {
        state: submission.state(),
        late: submission.is_late(assignment.due_date, now),
        submission,
        attachments,
        annotations,
    })
}
