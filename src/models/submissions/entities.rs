use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 提交状态（由 submitted / returned 两个标志派生，不单独存储）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub enum SubmissionState {
    Draft,
    Submitted,
    Returned,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/submission.ts")]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub submitted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub returned: bool,
    pub grade: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// 派生提交状态。returned 优先，submitted 的旧值保留在字段里。
    pub fn state(&self) -> SubmissionState {
        if self.returned {
            SubmissionState::Returned
        } else if self.submitted {
            SubmissionState::Submitted
        } else {
            SubmissionState::Draft
        }
    }

    /// 是否迟交，见 [`is_late`]。
    pub fn is_late(&self, due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        is_late(self.submitted_at, due_date, now)
    }
}

/// 迟交判定：读取时投影，永不落库。
///
/// 取 `submitted_at`（未提交时取当前时间）与截止时间比较，
/// 两者都截断到 UTC 日期，按天粒度比较。没有截止时间则永不迟交。
pub fn is_late(
    submitted_at: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match due_date {
        Some(due) => submitted_at.unwrap_or(now).date_naive() > due.date_naive(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_late_after_due_date() {
        let due = utc(2026, 3, 1, 23);
        assert!(is_late(Some(utc(2026, 3, 2, 0)), Some(due), utc(2026, 3, 5, 0)));
    }

    #[test]
    fn test_same_day_is_not_late() {
        // 按天粒度比较：截止当天深夜提交不算迟交
        let due = utc(2026, 3, 1, 8);
        assert!(!is_late(
            Some(utc(2026, 3, 1, 23)),
            Some(due),
            utc(2026, 3, 5, 0)
        ));
    }

    #[test]
    fn test_unsubmitted_uses_now() {
        let due = utc(2026, 3, 1, 12);
        assert!(!is_late(None, Some(due), utc(2026, 3, 1, 13)));
        assert!(is_late(None, Some(due), utc(2026, 3, 2, 1)));
    }

    #[test]
    fn test_no_due_date_never_late() {
        assert!(!is_late(Some(utc(2026, 3, 2, 0)), None, utc(2026, 3, 5, 0)));
        assert!(!is_late(None, None, utc(2026, 3, 5, 0)));
    }

    #[test]
    fn test_state_derivation() {
        let mut sub = Submission {
            id: 1,
            assignment_id: 1,
            student_id: 1,
            submitted: false,
            submitted_at: None,
            returned: false,
            grade: None,
            created_at: utc(2026, 3, 1, 0),
            updated_at: utc(2026, 3, 1, 0),
        };
        assert_eq!(sub.state(), SubmissionState::Draft);

        sub.submitted = true;
        assert_eq!(sub.state(), SubmissionState::Submitted);

        // returned 优先于 submitted
        sub.returned = true;
        assert_eq!(sub.state(), SubmissionState::Returned);

        sub.returned = false;
        assert_eq!(sub.state(), SubmissionState::Submitted);
    }
}
