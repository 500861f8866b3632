use actix_web::HttpResponse;

use crate::errors::ClassroomError;
use crate::models::{ApiResponse, ErrorCode};

pub mod assignments;
pub mod authz;
pub mod files;
pub mod rooms;
pub mod submissions;

pub use assignments::AssignmentService;
pub use files::FileService;
pub use rooms::{RoomRegistry, RoomSession};
pub use submissions::SubmissionService;

/// 业务错误到 HTTP 响应的统一映射
///
/// 权限和存在性失败都在各操作边界被兜住并走这里，绝不穿透到
/// 协调层之外。
pub(crate) fn error_to_response(err: &ClassroomError) -> HttpResponse {
    match err {
        ClassroomError::NotFound(_) => HttpResponse::NotFound()
            .json(ApiResponse::error_empty(ErrorCode::NotFound, err.message())),
        ClassroomError::Authorization(_) => HttpResponse::Forbidden().json(
            ApiResponse::error_empty(ErrorCode::Forbidden, err.message()),
        ),
        ClassroomError::Authentication(_) => HttpResponse::Unauthorized().json(
            ApiResponse::error_empty(ErrorCode::Unauthorized, err.message()),
        ),
        ClassroomError::Validation(_) => HttpResponse::BadRequest().json(
            ApiResponse::error_empty(ErrorCode::BadRequest, err.message()),
        ),
        ClassroomError::Conflict(_) => HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::Conflict,
            err.message(),
        )),
        ClassroomError::StorageFailure(_) => HttpResponse::InternalServerError().json(
            ApiResponse::error_empty(ErrorCode::FileUploadFailed, err.message()),
        ),
        _ => HttpResponse::InternalServerError().json(ApiResponse::error_empty(
            ErrorCode::InternalServerError,
            err.message(),
        )),
    }
}
