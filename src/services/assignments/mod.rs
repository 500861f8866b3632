pub mod create;
pub mod delete;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::Result;
use crate::models::assignments::entities::Assignment;
use crate::models::assignments::requests::{CreateAssignmentRequest, UpdateAssignmentRequest};
use crate::models::assignments::responses::AssignmentResponse;
use crate::models::files::entities::FileOwnerKind;
use crate::services::rooms::RoomRegistry;
use crate::storage::Storage;
use crate::storage::blob::BlobStore;

pub struct AssignmentService {
    storage: Option<Arc<dyn Storage>>,
}

impl AssignmentService {
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

    pub async fn create_assignment(
        &self,
        request: &HttpRequest,
        class_id: i64,
        req: CreateAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        create::handle_create(self, request, class_id, req).await
    }

    pub async fn update_assignment(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
        req: UpdateAssignmentRequest,
    ) -> ActixResult<HttpResponse> {
        update::handle_update(self, request, assignment_id, req).await
    }

    pub async fn delete_assignment(
        &self,
        request: &HttpRequest,
        assignment_id: i64,
    ) -> ActixResult<HttpResponse> {
        delete::handle_delete(self, request, assignment_id).await
    }
}

/// 组装作业响应（附件列表随查随取）
pub async fn assemble_assignment_response(
    storage: &Arc<dyn Storage>,
    assignment: Assignment,
) -> Result<AssignmentResponse> {
    let attachments = storage
        .list_files_by_owner(FileOwnerKind::AssignmentAttachment, assignment.id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(AssignmentResponse {
        assignment,
        attachments,
    })
}
