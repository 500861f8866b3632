use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::assignments::requests::{CreateAssignmentRequest, UpdateAssignmentRequest};
use crate::services::{AssignmentService, SubmissionService};

// 懒加载的全局服务实例
static ASSIGNMENT_SERVICE: Lazy<AssignmentService> = Lazy::new(AssignmentService::new_lazy);
static SUBMISSION_SERVICE: Lazy<SubmissionService> = Lazy::new(SubmissionService::new_lazy);

// 创建作业（含在册学生的空白提交）
pub async fn create_assignment(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<CreateAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE
        .create_assignment(&req, path.into_inner(), body.into_inner())
        .await
}

// 更新作业
pub async fn update_assignment(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE
        .update_assignment(&req, path.into_inner(), body.into_inner())
        .await
}

// 删除作业（级联清理提交与文件）
pub async fn delete_assignment(req: HttpRequest, path: web::Path<i64>) -> ActixResult<HttpResponse> {
    ASSIGNMENT_SERVICE
        .delete_assignment(&req, path.into_inner())
        .await
}

// 获取（或首次创建）某学生的提交
pub async fn get_submission(
    req: HttpRequest,
    path: web::Path<(i64, i64)>,
) -> ActixResult<HttpResponse> {
    let (assignment_id, student_id) = path.into_inner();
    SUBMISSION_SERVICE
        .get_submission(&req, assignment_id, student_id)
        .await
}

// 配置路由
pub fn configure_assignments_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/classes/{class_id}/assignments")
            .wrap(middlewares::RequireJWT)
            // 创建作业 - 班级教师（权限门在业务层）
            .service(web::resource("").route(web::post().to(create_assignment))),
    );
    cfg.service(
        web::scope("/api/v1/assignments")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("/{id}")
                    // 更新/删除 - 作业所属教师（权限门在业务层）
                    .route(web::put().to(update_assignment))
                    .route(web::delete().to(delete_assignment)),
            )
            // 提交记录按 (作业, 学生) 定位；身份约束在业务层
            .service(
                web::resource("/{id}/submissions/{student_id}")
                    .route(web::get().to(get_submission)),
            ),
    );
}
