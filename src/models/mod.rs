//! 业务数据模型
//!
//! 与 entity 模块的数据库实体分离，按领域划分子模块。

pub mod assignments;
pub mod class_users;
pub mod classes;
pub mod common;
pub mod files;
pub mod submissions;
pub mod users;

pub use common::response::ApiResponse;

/// 统一错误码
///
/// 前两位对应 HTTP 状态码语义，后三位为领域内编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 40000,
    FileTypeNotAllowed = 40001,
    FileSizeExceeded = 40002,

    Unauthorized = 40100,

    Forbidden = 40300,
    ClassPermissionDenied = 40301,

    NotFound = 40400,
    ClassNotFound = 40401,
    AssignmentNotFound = 40402,
    SubmissionNotFound = 40403,
    FileNotFound = 40404,

    Conflict = 40900,

    InternalServerError = 50000,
    FileUploadFailed = 50001,
}

/// 程序启动时间（用于运行时长统计）
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}
