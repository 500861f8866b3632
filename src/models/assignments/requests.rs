use chrono::{DateTime, Utc};
use serde::Deserialize;
use ts_rs::TS;

/// 创建作业请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub instructions: Option<String>,
    pub due_date: Option<DateTime<Utc>>, // ISO 8601 格式，如 "2026-02-15T12:00:00Z"
    pub graded: Option<bool>,
    pub max_grade: Option<f64>,
    pub weight: Option<f64>,
    pub section_id: Option<i64>,
    pub attachments: Option<Vec<i64>>, // 预先注册的文件 ID 列表
}

/// 更新作业请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub due_date: Option<DateTime<Utc>>, // ISO 8601 格式
    pub graded: Option<bool>,
    pub max_grade: Option<f64>,
    pub weight: Option<f64>,
    pub section_id: Option<i64>,
}
