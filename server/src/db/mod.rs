// storefront_server/src/db/mod.rs

//! PostgreSQL persistence and catalog seeding.

pub mod pg_gateway;
pub mod rows;
pub mod seed;

pub use pg_gateway::PgGateway;
pub use seed::seed_catalog;
