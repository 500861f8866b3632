use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/assignment.ts")]
pub struct Assignment {
    // 唯一 ID
    pub id: i64,
    // 所属班级 ID
    pub class_id: i64,
    // 所属教师 ID（创建者，唯一可变更者）
    pub teacher_id: i64,
    // 可选的班级分区 ID
    pub section_id: Option<i64>,
    // 作业标题
    pub title: String,
    // 作业说明
    pub instructions: Option<String>,
    // 截止时间
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    // 是否计分
    pub graded: bool,
    // 最高分数
    pub max_grade: f64,
    // 成绩权重
    pub weight: f64,
    // 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
    // 更新时间
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
