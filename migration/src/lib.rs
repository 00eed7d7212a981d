pub use sea_orm_migration::prelude::*;

mod m0000010_create_short_code;
mod m0000020_create_product;
mod m0000030_create_cve;
mod m0000040_create_affected_product;
mod m0000050_create_advisory;
mod m0000060_create_advisory_joins;
mod m0000070_create_task_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m0000010_create_short_code::Migration),
            Box::new(m0000020_create_product::Migration),
            Box::new(m0000030_create_cve::Migration),
            Box::new(m0000040_create_affected_product::Migration),
            Box::new(m0000050_create_advisory::Migration),
            Box::new(m0000060_create_advisory_joins::Migration),
            Box::new(m0000070_create_task_status::Migration),
        ]
    }
}

pub struct Now;

impl Iden for Now {
    fn unquoted(&self, s: &mut dyn Write) {
        write!(s, "now").unwrap()
    }
}
