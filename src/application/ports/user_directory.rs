use async_trait::async_trait;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Contact identity for an authenticated user, as held by the authentication
/// collaborator.
#[derive(Debug, Clone)]
pub struct UserContact {
    pub user_id: Uuid,
    pub email: String,
}

/// Looks up a user's contact identity. The billing engine does not own user
/// accounts; it only needs an email to prefill the hosted authorization page.
#[async_trait]
pub trait UserDirectoryPort: Send + Sync {
    async fn get_contact(&self, user_id: Uuid) -> AppResult<Option<UserContact>>;
}
