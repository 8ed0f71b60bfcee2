use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::env;
use std::time::Duration;
use tracing::{info, instrument};

#[instrument]
pub async fn init_db() -> anyhow::Result<DatabaseConnection> {
    let database_url =
        env::var("DATABASE_URL").context("DATABASE_URL이 설정되어 있지 않습니다")?;

    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true);

    let db = Database::connect(options).await?;
    info!("데이터베이스 연결 완료");

    Ok(db)
}
