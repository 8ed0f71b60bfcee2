use actix_web::{get, HttpResponse, Responder};

#[utoipa::path(
    get,
    path = "/health-check",
    responses(
        (status = 200, description = "서버 동작 확인", body = String)
    ),
    tag = "health",
)]
#[get("/health-check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("ok")
}