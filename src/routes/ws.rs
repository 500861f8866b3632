use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::{ApiResponse, ErrorCode};
use crate::services::rooms::{RoomRegistry, RoomSession};
use crate::storage::Storage;
use crate::utils::jwt::JwtUtils;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

// 建立 WebSocket 连接
//
// 浏览器无法为 WebSocket 握手设置请求头，令牌放在查询参数里。
pub async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsAuthQuery>,
) -> ActixResult<HttpResponse> {
    let claims = match JwtUtils::verify_access_token(&query.token) {
        Ok(claims) => claims,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
                ErrorCode::Unauthorized,
                "无效的访问令牌",
            )));
        }
    };
    let Ok(user_id) = claims.sub.parse::<i64>() else {
        return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "无效的访问令牌",
        )));
    };

    let storage = req
        .app_data::<web::Data<Arc<dyn Storage>>>()
        .expect("Storage not found in app data")
        .get_ref()
        .clone();
    let rooms = req
        .app_data::<web::Data<Arc<RoomRegistry>>>()
        .expect("Room registry not found in app data")
        .get_ref()
        .clone();

    // 令牌有效但用户可能已被删除
    match storage.get_user_by_id(user_id).await {
        Ok(Some(_)) => {}
        _ => {
            return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
                ErrorCode::Unauthorized,
                "用户不存在",
            )));
        }
    }

    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;
    actix_web::rt::spawn(RoomSession::handle_connection(
        user_id, rooms, storage, session, msg_stream,
    ));
    Ok(response)
}

// 配置路由
pub fn configure_ws_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/v1/ws").route(web::get().to(ws_connect)));
}
