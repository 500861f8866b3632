use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::submissions::requests::SetGradeRequest;
use crate::services::SubmissionService;

// 懒加载的全局 SubmissionService 实例
static SUBMISSION_SERVICE: Lazy<SubmissionService> = Lazy::new(SubmissionService::new_lazy);

// 切换提交状态（学生）
pub async fn toggle_submit(req: HttpRequest, path: web::Path<i64>) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .toggle_submit(&req, path.into_inner())
        .await
}

// 切换退回状态（教师）
pub async fn toggle_return(req: HttpRequest, path: web::Path<i64>) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .toggle_return(&req, path.into_inner())
        .await
}

// 评分（教师）
pub async fn set_grade(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<SetGradeRequest>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .set_grade(&req, path.into_inner(), body.into_inner())
        .await
}

// 配置路由
pub fn configure_submissions_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/submissions")
            .wrap(middlewares::RequireJWT)
            // 操作者约束都在业务层权限门检查
            .service(web::resource("/{id}/submit").route(web::post().to(toggle_submit)))
            .service(web::resource("/{id}/return").route(web::post().to(toggle_return)))
            .service(web::resource("/{id}/grade").route(web::put().to(set_grade))),
    );
}
