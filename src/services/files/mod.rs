/*!
 * 附件注册表服务
 *
 * 文件（附件/批注）的注册、挂接与摘除。每个文件恰好属于一个
 * 归属集合（作业附件、提交附件、提交批注），挂接操作先解析
 * 归属链（文件 → 提交 → 作业 → 班级）再过权限门，因此跨班级
 * 引用不可能出现。
 */

pub mod attach;
pub mod register;
pub mod remove;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::{ClassroomError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::files::entities::FileOwnerKind;
use crate::models::files::requests::RemoveFilesRequest;
use crate::models::submissions::entities::Submission;
use crate::models::users::entities::User;
use crate::services::authz::{self, AccessTier};
use crate::services::rooms::{RoomEvent, RoomEventKind, RoomRegistry};
use crate::storage::Storage;
use crate::storage::blob::BlobStore;

pub struct FileService {
    storage: Option<Arc<dyn Storage>>,
}

impl FileService {
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

    pub(crate) fn get_blob(&self, request: &HttpRequest) -> Arc<dyn BlobStore> {
        request
            .app_data::<actix_web::web::Data<Arc<dyn BlobStore>>>()
            .expect("Blob store not found in app data")
            .get_ref()
            .clone()
    }

    pub(crate) fn get_rooms(&self, request: &HttpRequest) -> Arc<RoomRegistry> {
        request
            .app_data::<actix_web::web::Data<Arc<RoomRegistry>>>()
            .expect("Room registry not found in app data")
            .get_ref()
            .clone()
    }

    // Handle bulk attach (multipart upload)
    pub async fn handle_attach(
        &self,
        request: &HttpRequest,
        owner_kind: FileOwnerKind,
        owner_id: i64,
        payload: Multipart,
    ) -> ActixResult<HttpResponse> {
        attach::handle_attach(self, request, owner_kind, owner_id, payload).await
    }

    // Handle bulk detach
    pub async fn handle_remove(
        &self,
        request: &HttpRequest,
        owner_kind: FileOwnerKind,
        owner_id: i64,
        req: RemoveFilesRequest,
    ) -> ActixResult<HttpResponse> {
        remove::handle_remove(self, request, owner_kind, owner_id, req).await
    }
}

/// 已解析的归属链
///
/// 从归属集合一路解析到班级，权限检查和事件广播都以它为准。
pub struct OwnerChain {
    pub kind: FileOwnerKind,
    pub owner_id: i64,
    pub class_id: i64,
    pub assignment: Assignment,
    /// 归属是提交集合时为 Some
    pub submission: Option<Submission>,
}

/// 解析归属链并施加权限检查
///
/// 教师写入的集合（作业附件、提交批注）要求班级教师层级；
/// 提交附件允许提交所属学生本人（仍须是班级成员）或班级教师。
/// 不可见的归属实体统一报 NOT FOUND。
pub async fn authorize_owner(
    storage: &Arc<dyn Storage>,
    actor: &User,
    owner_kind: FileOwnerKind,
    owner_id: i64,
) -> Result<OwnerChain> {
    let (assignment, submission) = match owner_kind {
        FileOwnerKind::AssignmentAttachment => {
            let assignment = storage
                .get_assignment_by_id(owner_id)
                .await?
                .ok_or_else(|| ClassroomError::not_found(format!("assignment {owner_id} not found")))?;
            (assignment, None)
        }
        FileOwnerKind::SubmissionAttachment | FileOwnerKind::SubmissionAnnotation => {
            let submission = storage
                .get_submission_by_id(owner_id)
                .await?
                .ok_or_else(|| ClassroomError::not_found(format!("submission {owner_id} not found")))?;
            let assignment = storage
                .get_assignment_by_id(submission.assignment_id)
                .await?
                .ok_or_else(|| {
                    ClassroomError::not_found(format!("submission {owner_id} not found"))
                })?;
            (assignment, Some(submission))
        }
    };

    let class_id = assignment.class_id;
    let what = match owner_kind {
        FileOwnerKind::AssignmentAttachment => format!("assignment {owner_id}"),
        _ => format!("submission {owner_id}"),
    };

    let required = if owner_kind.written_by_teacher() {
        AccessTier::ClassTeacher
    } else if submission
        .as_ref()
        .is_some_and(|s| s.student_id == actor.id)
    {
        // 提交所属学生操作自己的作答文件
        AccessTier::ClassMember
    } else {
        // 别人的提交附件只有教师能动
        AccessTier::ClassTeacher
    };
    let tier = authz::require(storage, actor.id, class_id, required, &what).await?;

    // 作业附件只有所属教师可动，同班其他教师不行
    if owner_kind == FileOwnerKind::AssignmentAttachment
        && tier != AccessTier::InstitutionAdmin
        && actor.id != assignment.teacher_id
    {
        return Err(ClassroomError::authorization(
            "只有作业所属教师可以修改作业附件",
        ));
    }

    Ok(OwnerChain {
        kind: owner_kind,
        owner_id,
        class_id,
        assignment,
        submission,
    })
}

/// 归属实体变更后向班级房间广播完整实体
///
/// 在数据库写入全部完成之后同步调用，保证同一实体按提交顺序到达。
pub(crate) async fn emit_owner_changed(
    storage: &Arc<dyn Storage>,
    rooms: &Arc<RoomRegistry>,
    chain: &OwnerChain,
) -> Result<()> {
    match &chain.submission {
        Some(submission) => {
            let payload = crate::services::submissions::assemble_submission_response(
                storage,
                submission.clone(),
                &chain.assignment,
            )
            .await?;
            rooms.emit(RoomEvent {
                event: RoomEventKind::SubmissionUpdated,
                class_id: chain.class_id,
                entity_id: submission.id,
                entity: serde_json::to_value(&payload)?,
            });
        }
        None => {
            let payload = crate::services::assignments::assemble_assignment_response(
                storage,
                chain.assignment.clone(),
            )
            .await?;
            rooms.emit(RoomEvent {
                event: RoomEventKind::AssignmentUpdated,
                class_id: chain.class_id,
                entity_id: chain.assignment.id,
                entity: serde_json::to_value(&payload)?,
            });
        }
    }
    Ok(())
}
