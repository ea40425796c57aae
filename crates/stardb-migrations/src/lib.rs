//! Database migrations for the static StarDB catalog tables
//!
//! Per-datatype value tables (`dat_<name>`) are not managed here; they are
//! created and dropped at runtime by the datatype registry.

pub use sea_orm_migration::prelude::*;

mod migration;
pub use migration::Migrator;
