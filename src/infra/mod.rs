pub mod app;
pub mod config;
pub mod db;
pub mod gocardless_billing_adapter;
pub mod gocardless_client;
pub mod setup;
pub mod user_directory;
