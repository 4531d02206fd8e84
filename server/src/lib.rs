// storefront_server/src/lib.rs

//! HTTP surface and PostgreSQL persistence for the storefront engine.

pub mod config;
pub mod db;
pub mod errors;
pub mod state;
pub mod web;
