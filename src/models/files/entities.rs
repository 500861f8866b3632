use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 文件归属集合
//
// 每个文件恰好属于一个集合。附件与批注结构相同，
// 但语义不同且可独立增删，因此在这里区分。
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/file.ts")]
pub enum FileOwnerKind {
    AssignmentAttachment, // 作业附件（教师上传的题目材料）
    SubmissionAttachment, // 提交附件（学生作答文件）
    SubmissionAnnotation, // 提交批注（教师反馈文件）
}

impl<'de> Deserialize<'de> for FileOwnerKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for FileOwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOwnerKind::AssignmentAttachment => write!(f, "assignment_attachment"),
            FileOwnerKind::SubmissionAttachment => write!(f, "submission_attachment"),
            FileOwnerKind::SubmissionAnnotation => write!(f, "submission_annotation"),
        }
    }
}

impl std::str::FromStr for FileOwnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignment_attachment" => Ok(FileOwnerKind::AssignmentAttachment),
            "submission_attachment" => Ok(FileOwnerKind::SubmissionAttachment),
            "submission_annotation" => Ok(FileOwnerKind::SubmissionAnnotation),
            _ => Err(format!("Invalid file owner kind: {s}")),
        }
    }
}

impl FileOwnerKind {
    /// 该集合是否由班级教师写入（否则由提交所属学生写入）
    pub fn written_by_teacher(&self) -> bool {
        matches!(
            self,
            FileOwnerKind::AssignmentAttachment | FileOwnerKind::SubmissionAnnotation
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/file.ts")]
pub struct File {
    // 唯一 ID
    pub id: i64,
    // 归属集合（注册后、挂接前为 None）
    pub owner_kind: Option<FileOwnerKind>,
    // 归属实体 ID（作业或提交）
    pub owner_id: Option<i64>,
    // 原始文件名
    pub file_name: String,
    // MIME 类型
    pub mime_type: String,
    // 存储路径（以文件 ID 为键，并发上传不会冲突）
    pub storage_path: String,
    // 文件大小（字节）
    pub file_size: i64,
    // 缩略图文件 ID（缩略图本身也是一条文件记录）
    pub thumbnail_id: Option<i64>,
    // 上传者 ID
    pub uploaded_by: i64,
    // 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
}
