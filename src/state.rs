use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn, create_pool},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}

impl AppState {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = create_pool(config).await?;
        let orm = create_orm_conn(config).await?;
        Ok(Self { pool, orm })
    }
}
