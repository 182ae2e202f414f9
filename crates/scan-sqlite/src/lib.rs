//! SQLite store for normalized scan records with idempotent, per-statement inserts.

mod error;
mod insert;
mod models;
mod open;
mod plan;
mod query;
mod schema;

pub use error::StoreError;
pub use models::*;
pub use open::Db;
pub use plan::{plan, Insert};
pub use schema::SCHEMA_VERSION;
