use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::files::entities::File;

/// 文件信息（响应投影）
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/file.ts")]
pub struct FileInfo {
    pub id: i64,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub has_thumbnail: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<File> for FileInfo {
    fn from(f: File) -> Self {
        Self {
            id: f.id,
            file_name: f.file_name,
            mime_type: f.mime_type,
            file_size: f.file_size,
            has_thumbnail: f.thumbnail_id.is_some(),
            created_at: f.created_at,
        }
    }
}

/// 批量附加结果（逐文件独立，部分失败不影响其余文件）
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/file.ts")]
pub struct AttachFilesResponse {
    pub attached: Vec<FileInfo>,
    pub failed: Vec<String>,
}
