pub mod alerts;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod migrator;
pub mod notifications;
pub mod store;
pub mod telemetry;

pub use sea_orm;
