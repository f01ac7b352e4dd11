//! SeaORM migrations for multi-database support
//!
//! Migrations are database-agnostic across SQLite and PostgreSQL;
//! backend-specific column types are selected per migration.

use sea_orm_migration::prelude::*;

pub mod m20260105_000001_initial_schema;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260105_000001_initial_schema::Migration)]
    }
}
