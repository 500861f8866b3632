use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::files::entities::FileOwnerKind;
use crate::models::files::requests::RemoveFilesRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::FileService;

// 懒加载的全局 FileService 实例
static FILE_SERVICE: Lazy<FileService> = Lazy::new(FileService::new_lazy);

fn parse_owner_kind(raw: &str) -> Result<FileOwnerKind, HttpResponse> {
    raw.parse().map_err(|_| {
        HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            format!("未知的文件归属类型: {raw}"),
        ))
    })
}

// 批量上传并挂接文件
pub async fn attach_files(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    payload: Multipart,
) -> ActixResult<HttpResponse> {
    let (raw_kind, owner_id) = path.into_inner();
    let owner_kind = match parse_owner_kind(&raw_kind) {
        Ok(kind) => kind,
        Err(resp) => return Ok(resp),
    };
    FILE_SERVICE
        .handle_attach(&req, owner_kind, owner_id, payload)
        .await
}

// 批量摘除文件
pub async fn remove_files(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    body: web::Json<RemoveFilesRequest>,
) -> ActixResult<HttpResponse> {
    let (raw_kind, owner_id) = path.into_inner();
    let owner_kind = match parse_owner_kind(&raw_kind) {
        Ok(kind) => kind,
        Err(resp) => return Ok(resp),
    };
    FILE_SERVICE
        .handle_remove(&req, owner_kind, owner_id, body.into_inner())
        .await
}

// 配置路由
pub fn configure_file_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/files")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("/{owner_kind}/{owner_id}")
                    .route(web::post().to(attach_files))
                    .route(web::delete().to(remove_files)),
            ),
    );
}
