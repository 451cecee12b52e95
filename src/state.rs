use crate::config::AppConfig;
use crate::db;
use crate::users::repo::{MongoUserStore, UserStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = db::connect(&config.mongo).await?;
        let store = MongoUserStore::new(&db);
        store.ensure_indexes().await?;

        Ok(Self::from_parts(Arc::new(store), config))
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::with_store(Arc::new(crate::users::memory::InMemoryUserStore::new()))
    }

    #[cfg(test)]
    pub fn with_store(store: Arc<dyn UserStore>) -> Self {
        use crate::config::{Environment, MongoConfig};

        let config = Arc::new(AppConfig {
            environment: Environment::Test,
            host: "127.0.0.1".into(),
            port: 5001,
            mongo: MongoConfig {
                uri: "mongodb://localhost:27017/crud_database_test".into(),
                database: None,
            },
            cors_origin: "*".into(),
        });
        Self::from_parts(store, config)
    }
}
