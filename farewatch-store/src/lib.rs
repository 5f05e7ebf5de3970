pub mod alert_repo;
pub mod app_config;
pub mod database;
pub mod events;
pub mod mailer;
pub mod notification_repo;
pub mod provider_client;
pub mod run_repo;
pub mod search_request_repo;
pub mod trip_repo;
pub mod user_repo;

pub use database::DbClient;
pub use events::EventProducer;
