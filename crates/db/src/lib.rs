use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub mod entities;
pub mod models;
pub mod types;

pub use sea_orm::DbErr;

#[derive(Clone)]
pub struct DBService {
    pub pool: DatabaseConnection,
}

impl DBService {
    /// Connects to `database_url` and brings the schema up to date.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let pool = Database::connect(database_url).await?;
        tracing::debug!("Running database migrations");
        db_migration::Migrator::up(&pool, None).await?;
        Ok(DBService { pool })
    }
}
