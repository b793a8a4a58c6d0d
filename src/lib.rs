pub mod api;
pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod router;
pub mod store;
