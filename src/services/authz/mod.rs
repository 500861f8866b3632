/*!
 * 分层权限门
 *
 * 每一个读写操作在执行前都要经过这里的能力检查，权限层级严格有序：
 *
 * ```text
 * unauthenticated < classMember < classTeacher < institutionAdmin
 * ```
 *
 * 门是一个纯查询函数：每次调用只做一次成员关系查询，绝不信任
 * 客户端自带的角色声明，也绝不跨请求缓存结果（成员关系随时可能
 * 变化）。身份约束（例如"学生只能读自己的提交"）由各操作在
 * 层级检查之上自行施加。
 *
 * 对调用方不可见的资源统一表现为 NOT FOUND，不泄露存在性；
 * 这一策略在所有操作中一致应用。
 */

use std::sync::Arc;

use crate::errors::{ClassroomError, Result};
use crate::models::class_users::entities::ClassUserRole;
use crate::models::users::entities::UserRole;
use crate::storage::Storage;

/// 权限层级，按特权严格排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessTier {
    ClassMember,
    ClassTeacher,
    InstitutionAdmin,
}

impl ClassUserRole {
    /// 班级内角色对应的权限层级
    pub fn tier(&self) -> AccessTier {
        match self {
            ClassUserRole::Student => AccessTier::ClassMember,
            ClassUserRole::Teacher => AccessTier::ClassTeacher,
        }
    }
}

/// 检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// 放行，附带实际达到的层级
    Allow { tier: AccessTier },
    /// 拒绝，附带原因（仅用于日志，不回传存在性信息）。
    /// `member` 标记调用方是否是班级成员：成员层级不足按权限
    /// 拒绝，非成员统一按 NOT FOUND 隐藏存在性。
    Deny { reason: &'static str, member: bool },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow { .. })
    }
}

/// 能力检查的便捷封装：拒绝时直接换算成统一错误
///
/// `what` 是对外可见的资源名（如 "class 3"），用在 NOT FOUND 消息里。
pub async fn require(
    storage: &Arc<dyn Storage>,
    user_id: i64,
    class_id: i64,
    required: AccessTier,
    what: &str,
) -> Result<AccessTier> {
    match check(storage, user_id, class_id, required).await? {
        AccessDecision::Allow { tier } => Ok(tier),
        AccessDecision::Deny { reason, member: true } => {
            Err(ClassroomError::authorization(reason))
        }
        AccessDecision::Deny { member: false, .. } => {
            Err(ClassroomError::not_found(format!("{what} not found")))
        }
    }
}

/// 能力检查：`(user_id, class_id, required) -> Allow | Deny`
///
/// 机构管理员越过所有班级级别的检查（单调性：高层级放行
/// 蕴含低层级放行）。
pub async fn check(
    storage: &Arc<dyn Storage>,
    user_id: i64,
    class_id: i64,
    required: AccessTier,
) -> Result<AccessDecision> {
    // 要求机构管理员时只看全局角色，不看班级成员关系
    if required == AccessTier::InstitutionAdmin {
        return match storage.get_user_by_id(user_id).await? {
            Some(user) if user.role == UserRole::Admin => Ok(AccessDecision::Allow {
                tier: AccessTier::InstitutionAdmin,
            }),
            Some(_) => Ok(AccessDecision::Deny {
                reason: "institution admin required",
                member: false,
            }),
            None => Ok(AccessDecision::Deny {
                reason: "unknown user",
                member: false,
            }),
        };
    }

    // 班级级别的检查先查成员关系
    let mut member = false;
    if let Some(class_user) = storage.get_class_user(user_id, class_id).await? {
        member = true;
        let tier = class_user.role.tier();
        if tier >= required {
            return Ok(AccessDecision::Allow { tier });
        }
    }

    // 非成员或层级不足时，机构管理员仍然放行
    if let Some(user) = storage.get_user_by_id(user_id).await?
        && user.role == UserRole::Admin
    {
        return Ok(AccessDecision::Allow {
            tier: AccessTier::InstitutionAdmin,
        });
    }

    Ok(AccessDecision::Deny {
        reason: "insufficient class role",
        member,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(AccessTier::ClassMember < AccessTier::ClassTeacher);
        assert!(AccessTier::ClassTeacher < AccessTier::InstitutionAdmin);
    }

    #[test]
    fn test_class_role_tiers() {
        assert_eq!(ClassUserRole::Student.tier(), AccessTier::ClassMember);
        assert_eq!(ClassUserRole::Teacher.tier(), AccessTier::ClassTeacher);
    }
}
