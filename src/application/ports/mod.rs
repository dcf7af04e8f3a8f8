pub mod billing_provider;
pub mod user_directory;
