//! Read-side queries over the subscription record.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    app_error::AppResult, application::use_cases::reconcile::SubscriptionRepo,
    domain::entities::subscription::Subscription,
};

#[derive(Clone)]
pub struct SubscriptionStatusUseCases {
    repo: Arc<dyn SubscriptionRepo>,
}

impl SubscriptionStatusUseCases {
    pub fn new(repo: Arc<dyn SubscriptionRepo>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        self.repo.get_by_user(user_id).await
    }

    /// Entitlement gate. A missing record means no entitlement; only an
    /// `active` record grants access.
    pub async fn is_active(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self
            .repo
            .get_by_user(user_id)
            .await?
            .is_some_and(|s| s.status.is_active()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::entities::subscription::SubscriptionStatus;
    use crate::test_utils::{InMemorySubscriptionRepo, create_test_subscription};

    #[tokio::test]
    async fn missing_record_means_inactive() {
        let uc = SubscriptionStatusUseCases::new(Arc::new(InMemorySubscriptionRepo::new()));
        assert!(!uc.is_active(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn only_active_status_grants_access() {
        for (status, expected) in [
            (SubscriptionStatus::Active, true),
            (SubscriptionStatus::Pending, false),
            (SubscriptionStatus::PastDue, false),
            (SubscriptionStatus::Cancelled, false),
            (SubscriptionStatus::Expired, false),
        ] {
            let record = create_test_subscription(|s| s.status = status);
            let user_id = record.user_id;
            let repo = Arc::new(InMemorySubscriptionRepo::with_subscriptions(vec![record]));
            let uc = SubscriptionStatusUseCases::new(repo);

            assert_eq!(uc.is_active(user_id).await.unwrap(), expected, "{status:?}");
        }
    }

    #[tokio::test]
    async fn get_returns_record_for_owner_only() {
        let record = create_test_subscription(|_| {});
        let user_id = record.user_id;
        let repo = Arc::new(InMemorySubscriptionRepo::with_subscriptions(vec![record]));
        let uc = SubscriptionStatusUseCases::new(repo);

        assert!(uc.get(user_id).await.unwrap().is_some());
        assert!(uc.get(Uuid::new_v4()).await.unwrap().is_none());
    }
}
