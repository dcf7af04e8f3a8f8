use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::infra::gocardless_client::GoCardlessEnvironment;

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub gocardless_access_token: SecretString,
    /// Shared secret the processor signs webhook bodies with. An empty value
    /// rejects every delivery rather than accepting unsigned ones.
    pub gocardless_webhook_secret: SecretString,
    pub gocardless_environment: GoCardlessEnvironment,
    /// Base URL of the authentication service that owns user accounts.
    pub user_directory_url: Url,
    pub basic_price_pence: i32,
    pub premium_price_pence: i32,
    pub premium_threshold_pence: i32,
    pub plan_currency: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");

        let gocardless_access_token: SecretString =
            SecretString::new(get_env::<String>("GOCARDLESS_ACCESS_TOKEN").into());
        let gocardless_webhook_secret: SecretString =
            SecretString::new(get_env::<String>("GOCARDLESS_WEBHOOK_SECRET").into());
        let gocardless_environment: GoCardlessEnvironment =
            match get_env_default("GOCARDLESS_ENVIRONMENT", String::from("sandbox")).as_str() {
                "live" => GoCardlessEnvironment::Live,
                _ => GoCardlessEnvironment::Sandbox,
            };

        let user_directory_url: Url = get_env("USER_DIRECTORY_URL");

        let basic_price_pence: i32 = get_env_default("BASIC_PRICE_PENCE", 999);
        let premium_price_pence: i32 = get_env_default("PREMIUM_PRICE_PENCE", 1999);
        let premium_threshold_pence: i32 = get_env_default("PREMIUM_THRESHOLD_PENCE", 1699);
        let plan_currency: String = get_env_default("PLAN_CURRENCY", "GBP".to_string());

        Self {
            jwt_secret,
            app_origin,
            cors_origin,
            bind_addr,
            database_url,
            gocardless_access_token,
            gocardless_webhook_secret,
            gocardless_environment,
            user_directory_url,
            basic_price_pence,
            premium_price_pence,
            premium_threshold_pence,
            plan_currency,
        }
    }
}
