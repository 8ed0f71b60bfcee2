use actix_cors::Cors;
use actix_web::{App, HttpServer};
use actix_web::http::header;
use actix_web::web::{scope, Data};
use dotenv::dotenv;
use tracing_log::log::info;
use subshift::api;
use subshift::auth::AuthMiddleware;
use subshift::db::init_db;
use subshift::migration::{Migrator, MigratorTrait};
use subshift::telemetry::{get_subscriber, init_subscriber};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber(
        "subshift".into(),
        "info,sqlx=debug".into(),
        std::io::stdout
    );
    init_subscriber(subscriber);

    info!("애플리케이션 시작 중...");

    dotenv().ok();
    info!("환경 변수 로드 완료");

    let db = init_db().await?;
    info!("데이터베이스 마이그레이션 실행 중...");
    Migrator::up(&db, None).await?;
    info!("마이그레이션 완료");

    let db_data = Data::new(db);

    info!("서버 시작 중: http://127.0.0.1:8080");
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(db_data.clone())
            .service(api::health_check::health_check)
            .service(api::register)
            .service(api::login)
            .service(api::refresh_token)
            .service(
                scope("/api")
                    .wrap(AuthMiddleware)
                    .service(api::get_me)
                    .service(api::create_shift)
                    .service(api::list_shifts)
                    .service(api::get_shift)
                    .service(api::update_shift)
                    .service(api::delete_shift)
                    .service(api::create_substitute_request)
                    .service(api::list_substitute_requests)
                    .service(api::get_substitute_request)
                    .service(api::decide_substitute_request)
                    .service(api::delete_substitute_request)
                    .service(api::batch_create_shifts)
                    .service(api::batch_delete_shifts))
    })
        .bind(("127.0.0.1", 8080))?
        .run()
        .await?;

    Ok(())
}
