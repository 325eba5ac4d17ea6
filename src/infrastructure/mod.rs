//! Infrastructure layer - storage backends

pub mod database;
pub mod storage;

pub use database::{connect_repositories, init_database, run_migrations, DatabaseConfig, SeaOrmRepositoryProvider};
pub use storage::InMemoryRepositoryProvider;
