//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod coupon_repository;
pub mod order_item_repository;
pub mod order_repository;
pub mod registration_code_repository;
pub mod reporting_repository;
pub mod repository_provider;

pub use repository_provider::SeaOrmRepositoryProvider;

use sea_orm::{DbErr, SqlErr};

use crate::domain::DomainError;

pub(crate) fn db_err(e: DbErr) -> DomainError {
    DomainError::Storage(format!("Database error: {}", e))
}

pub(crate) fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// A stored enum column held a value this build does not know
pub(crate) fn corrupt(column: &str, value: &str) -> DomainError {
    DomainError::Storage(format!("Unexpected {} value in database: {}", column, value))
}

#[cfg(test)]
pub(crate) mod test_db {
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use crate::infrastructure::database::migrator::Migrator;

    /// Fresh migrated in-memory SQLite database.
    ///
    /// One pooled connection, otherwise every connection sees its own empty
    /// database.
    pub async fn connect() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }
}
