pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_accounts_tables;
mod m20250301_000002_create_blog_tables;
mod m20250301_000003_create_board_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_accounts_tables::Migration),
            Box::new(m20250301_000002_create_blog_tables::Migration),
            Box::new(m20250301_000003_create_board_tables::Migration),
        ]
    }
}
