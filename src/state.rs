use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_lazy_pool, create_pool, orm_from_pool},
    invalidation::Invalidation,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    /// Privileged connection, only for user administration.
    pub admin_orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub invalidation: Invalidation,
}

impl AppState {
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let pool = create_pool(&config.database_url).await?;
        let admin_orm = if config.admin_database_url == config.database_url {
            orm_from_pool(pool.clone())
        } else {
            orm_from_pool(create_pool(&config.admin_database_url).await?)
        };
        Ok(Self::from_parts(pool, admin_orm, config))
    }

    /// Build a state whose pools connect on first use.
    pub fn lazy(config: AppConfig) -> anyhow::Result<Self> {
        let pool = create_lazy_pool(&config.database_url)?;
        let admin_orm = orm_from_pool(create_lazy_pool(&config.admin_database_url)?);
        Ok(Self::from_parts(pool, admin_orm, config))
    }

    fn from_parts(pool: DbPool, admin_orm: OrmConn, config: AppConfig) -> Self {
        Self {
            orm: orm_from_pool(pool.clone()),
            pool,
            admin_orm,
            config: Arc::new(config),
            invalidation: Invalidation::new(),
        }
    }
}
