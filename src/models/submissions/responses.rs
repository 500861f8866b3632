use serde::Serialize;
use ts_rs::TS;

use crate::models::files::responses::FileInfo;
use crate::models::submissions::entities::{Submission, SubmissionState};

/// 提交响应（含附件、批注与派生字段）
///
/// `late` 与 `state` 在组装响应时计算，数据库中不存在对应列。
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct SubmissionResponse {
    #[serde(flatten)]
    #[ts(flatten)]
    pub submission: Submission,
    pub state: SubmissionState,
    pub late: bool,
    pub attachments: Vec<FileInfo>,
    pub annotations: Vec<FileInfo>,
}
