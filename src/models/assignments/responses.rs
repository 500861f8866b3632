use serde::Serialize;
use ts_rs::TS;

use crate::models::assignments::entities::Assignment;
use crate::models::files::responses::FileInfo;

/// 作业响应（含附件）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct AssignmentResponse {
    #[serde(flatten)]
    #[ts(flatten)]
    pub assignment: Assignment,
    pub attachments: Vec<FileInfo>,
}
