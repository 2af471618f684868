//! Storage seam for push subscriptions.

use crate::{error::BoxError, PushSubscription, UserId};
use async_trait::async_trait;
use http::Uri;
use std::{collections::HashMap, sync::RwLock};

/// Where subscriptions live between enrollment and delivery.
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// All subscriptions owned by `user_id`.
    async fn list(&self, user_id: &UserId) -> Result<Vec<PushSubscription>, BoxError>;

    /// Removes every subscription registered for any of `endpoints`.
    async fn delete_by_endpoints(&self, endpoints: &[Uri]) -> Result<(), BoxError>;

    /// Inserts `subscription`, replacing the one with the same owner and
    /// endpoint.
    async fn upsert(&self, subscription: PushSubscription) -> Result<(), BoxError>;
}

/// Process-local registry, mostly useful for tests and single-node setups.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    subscriptions: RwLock<HashMap<UserId, Vec<PushSubscription>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> BoxError {
        "subscription registry lock poisoned".into()
    }
}

#[async_trait]
impl SubscriptionRegistry for MemoryRegistry {
    async fn list(&self, user_id: &UserId) -> Result<Vec<PushSubscription>, BoxError> {
        let subscriptions = self.subscriptions.read().map_err(|_| Self::poisoned())?;
        Ok(subscriptions.get(user_id).cloned().unwrap_or_default())
    }

    async fn delete_by_endpoints(&self, endpoints: &[Uri]) -> Result<(), BoxError> {
        let mut subscriptions = self.subscriptions.write().map_err(|_| Self::poisoned())?;
        for owned in subscriptions.values_mut() {
            owned.retain(|it| !endpoints.contains(&it.endpoint));
        }
        subscriptions.retain(|_, owned| !owned.is_empty());
        Ok(())
    }

    async fn upsert(&self, subscription: PushSubscription) -> Result<(), BoxError> {
        let mut subscriptions = self.subscriptions.write().map_err(|_| Self::poisoned())?;
        let owned = subscriptions
            .entry(subscription.owner_user_id.clone())
            .or_default();

        match owned
            .iter_mut()
            .find(|it| it.endpoint == subscription.endpoint)
        {
            Some(existing) => *existing = subscription,
            None => owned.push(subscription),
        }
        Ok(())
    }
}
