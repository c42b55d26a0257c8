pub mod config;
pub mod contracts;
pub mod db;
pub mod health;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod repos;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod store;
pub mod units;
pub mod validation;

pub use routes::fleet_router;
pub use scheduler::start_maintenance_alert_scheduler;
