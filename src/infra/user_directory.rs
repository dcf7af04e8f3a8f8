//! HTTP client for the authentication service that owns user accounts.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::user_directory::{UserContact, UserDirectoryPort},
};

#[derive(Clone)]
pub struct HttpUserDirectory {
    client: Client,
    base_url: Url,
}

impl HttpUserDirectory {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct UserResponse {
    id: Uuid,
    email: String,
}

#[async_trait]
impl UserDirectoryPort for HttpUserDirectory {
    async fn get_contact(&self, user_id: Uuid) -> AppResult<Option<UserContact>> {
        let url = self
            .base_url
            .join(&format!("users/{}", user_id))
            .map_err(|e| AppError::Internal(format!("Bad directory URL: {}", e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("User directory request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "User directory returned {}",
                response.status()
            )));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid user directory response: {}", e)))?;

        Ok(Some(UserContact {
            user_id: user.id,
            email: user.email,
        }))
    }
}
