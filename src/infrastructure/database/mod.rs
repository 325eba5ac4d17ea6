pub mod entities;
pub mod migrator;
pub mod repositories;

pub use repositories::SeaOrmRepositoryProvider;

use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::DatabaseSettings;
use crate::shared::errors::InfraError;
use migrator::Migrator;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Primary database URL (e.g., "sqlite://./shoppingcart.db?mode=rwc")
    pub url: String,
    /// Read replica for reporting queries
    pub replica_url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseSettings::default().into()
    }
}

impl From<&DatabaseSettings> for DatabaseConfig {
    fn from(settings: &DatabaseSettings) -> Self {
        Self {
            url: settings.url.clone(),
            replica_url: settings.replica_url.clone(),
        }
    }
}

impl From<DatabaseSettings> for DatabaseConfig {
    fn from(settings: DatabaseSettings) -> Self {
        Self::from(&settings)
    }
}

impl DatabaseConfig {
    /// Create config for SQLite
    pub fn sqlite(path: &str) -> Self {
        Self {
            url: format!("sqlite://{}?mode=rwc", path),
            replica_url: None,
        }
    }
}

/// Initialize the primary database connection
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, InfraError> {
    info!("Connecting to database: {}", config.url);
    let db = Database::connect(&config.url).await?;
    info!("Database connected successfully");
    Ok(db)
}

/// Connect the reporting replica, if one is configured
pub async fn init_replica(config: &DatabaseConfig) -> Result<Option<DatabaseConnection>, InfraError> {
    let Some(url) = &config.replica_url else {
        return Ok(None);
    };
    info!("Connecting to reporting replica: {}", url);
    Ok(Some(Database::connect(url).await?))
}

/// Apply pending migrations to the primary database
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), InfraError> {
    Migrator::up(db, None).await?;
    info!("Migrations applied");
    Ok(())
}

/// Connect, migrate and wire the SeaORM repositories
pub async fn connect_repositories(config: &DatabaseConfig) -> Result<SeaOrmRepositoryProvider, InfraError> {
    let primary = init_database(config).await?;
    run_migrations(&primary).await?;
    let replica = init_replica(config).await?;
    Ok(SeaOrmRepositoryProvider::new(primary, replica))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_follows_settings() {
        let settings = DatabaseSettings {
            url: "sqlite::memory:".into(),
            replica_url: Some("sqlite::memory:".into()),
        };
        let config = DatabaseConfig::from(&settings);
        assert_eq!(config.url, "sqlite::memory:");
        assert!(config.replica_url.is_some());
        assert!(DatabaseConfig::sqlite("./shop.db").url.ends_with("?mode=rwc"));
    }

    #[tokio::test]
    async fn connects_and_migrates_without_replica() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".into(),
            replica_url: None,
        };
        let db = init_database(&config).await.unwrap();
        run_migrations(&db).await.unwrap();
        assert!(init_replica(&config).await.unwrap().is_none());
    }
}
