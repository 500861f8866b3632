use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 班级内角色
#[derive(Debug, Clone, Copy, Serialize, PartialEq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/class-user.ts")]
pub enum ClassUserRole {
    Student, // 学生
    Teacher, // 教师
}

impl<'de> Deserialize<'de> for ClassUserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "student" => Ok(ClassUserRole::Student),
            "teacher" => Ok(ClassUserRole::Teacher),
            _ => Err(serde::de::Error::custom(format!(
                "无效的班级用户角色: '{s}'. 支持的角色: student, teacher"
            ))),
        }
    }
}

impl std::fmt::Display for ClassUserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassUserRole::Student => write!(f, "student"),
            ClassUserRole::Teacher => write!(f, "teacher"),
        }
    }
}

impl std::str::FromStr for ClassUserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(ClassUserRole::Student),
            "teacher" => Ok(ClassUserRole::Teacher),
            _ => Err(format!("Invalid class user role: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/class-user.ts")]
pub struct ClassUser {
    pub id: i64,
    pub class_id: i64,
    pub user_id: i64,
    pub role: ClassUserRole,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}
