use serde::Deserialize;
use ts_rs::TS;

/// 评分请求
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct SetGradeRequest {
    pub value: f64,
}
