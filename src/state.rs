use std::sync::Arc;

use anyhow::Context;

use crate::config::{AppConfig, StoreBackend};
use crate::email::{self, Mailer};
use crate::payments::gateway::{PaymentGateway, YookassaClient};
use crate::store::{MemoryStore, PgStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn Store> = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is not set")?;
                let pg = PgStore::connect(url).await?;

                // Run migrations if present
                if let Err(e) = sqlx::migrate!("./migrations").run(pg.pool()).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg)
            }
            StoreBackend::Memory => {
                tracing::warn!("using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let gateway = Arc::new(YookassaClient::new(&config.yookassa)) as Arc<dyn PaymentGateway>;
        let mailer = email::create_mailer(config.smtp.as_ref())?;

        Ok(Self::from_parts(store, config, gateway, mailer))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            config,
            gateway,
            mailer,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        crate::testing::TestHarness::new().state
    }
}
