use serde::Deserialize;
use ts_rs::TS;

/// 批量移除文件请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/file.ts")]
pub struct RemoveFilesRequest {
    pub file_ids: Vec<i64>,
}
