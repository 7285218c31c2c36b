use crate::{
    app_config::AppConfig,
    db::{Database, PersistenceError},
    purchase_service::PurchaseService,
};

/// Process-wide state shared by every request handler
///
/// Owns the single database handle; it is opened in [`AppState::new`] and
/// released by [`AppState::close`].
#[derive(Debug)]
pub struct AppState {
    config: AppConfig,
    database: Database,
    purchases: PurchaseService,
}

impl AppState {
    /// Open the database, apply migrations and seed the sample events
    pub async fn new(config: AppConfig) -> Result<Self, PersistenceError> {
        let database = Database::new(&config.database).await?;

        if config.database.seed_on_startup {
            let seeded = database.seed_events_if_empty().await?;
            if seeded == 0 {
                log::info!("Events already present, skipping seed");
            }
        }

        Ok(Self::with_database(config, database))
    }

    /// Build the state around an already opened database
    pub fn with_database(config: AppConfig, database: Database) -> Self {
        let purchases = PurchaseService::new(database.clone());
        Self {
            config,
            database,
            purchases,
        }
    }

    /// Create a seeded in-memory instance for testing
    pub async fn new_test() -> Result<Self, PersistenceError> {
        let database = Database::new_test().await?;
        database.seed_events_if_empty().await?;
        Ok(Self::with_database(AppConfig::default(), database))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the inventory store
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the purchase coordinator
    pub fn purchases(&self) -> &PurchaseService {
        &self.purchases
    }

    /// Close the database pool
    pub async fn close(&self) {
        self.database.pool().close().await;
    }
}
