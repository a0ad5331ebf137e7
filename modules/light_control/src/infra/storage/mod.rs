pub mod entity;
pub mod migrations;
mod sea_orm_repo;

pub use sea_orm_repo::{SeaOrmLightReadingsRepository, SeaOrmUsersRepository};
