//! Fan-out of one notification to every subscription of a user.
//!
//! Deliveries run concurrently up to a fixed bound. Their outcomes are
//! collected first; subscriptions reported as gone are then removed from the
//! registry in one batch. Dropping a dispatch before it completes cancels the
//! in-flight requests and prunes nothing.


use crate::{
    audience,
    error::Result,
    guard,
    registry::SubscriptionRegistry,
    transport::PushTransport,
    Error, NotificationPayload, PushSubscription, Urgency, UserId, VapidAssertion, VapidIdentity,
    WebPushBuilder, DEFAULT_TTL,
};
use futures::stream::{self, StreamExt};
use http::{Request, StatusCode, Uri};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tracing::{debug, error, info, warn};

/// Concurrent deliveries per dispatch when not configured otherwise
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Result of one delivery attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The push service accepted the message
    Delivered,
    /// The subscription has expired or was revoked and should be forgotten
    Gone,
    /// Anything else, including requests that could not be built or sent
    TransientFailure,
}

impl DispatchOutcome {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            200 | 201 => DispatchOutcome::Delivered,
            404 | 410 => DispatchOutcome::Gone,
            _ => DispatchOutcome::TransientFailure,
        }
    }
}

/// Aggregate counts of one dispatch, the only result reported to callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub sent: usize,
    pub total: usize,
    pub cleaned: usize,
}

/// Per-dispatch VAPID assertions, signed once per push service origin.
struct AssertionCache<'a> {
    identity: &'a VapidIdentity,
    by_audience: Mutex<HashMap<String, VapidAssertion>>,
}

impl<'a> AssertionCache<'a> {
    fn new(identity: &'a VapidIdentity) -> Self {
        Self {
            identity,
            by_audience: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, audience: &str) -> Result<VapidAssertion> {
        let mut by_audience = self
            .by_audience
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(assertion) = by_audience.get(audience) {
            return Ok(assertion.clone());
        }

        let assertion = self.identity.sign(audience)?;
        by_audience.insert(audience.to_string(), assertion.clone());
        Ok(assertion)
    }
}

/// Sends notifications to all subscriptions of a user.
#[derive(Clone)]
pub struct Dispatcher {
    identity: Arc<VapidIdentity>,
    registry: Arc<dyn SubscriptionRegistry>,
    transport: Arc<dyn PushTransport>,
    concurrency: usize,
    ttl: Duration,
    urgency: Urgency,
}

impl Dispatcher {
    pub fn new(
        identity: VapidIdentity,
        registry: Arc<dyn SubscriptionRegistry>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        Self {
            identity: Arc::new(identity),
            registry,
            transport,
            concurrency: DEFAULT_CONCURRENCY,
            ttl: DEFAULT_TTL,
            urgency: Urgency::High,
        }
    }

    pub fn with_concurrency(self, concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            ..self
        }
    }

    pub fn identity(&self) -> &VapidIdentity {
        &self.identity
    }

    /// Checks that `caller` may notify `target`, then dispatches.
    pub async fn send_notification(
        &self,
        caller: Option<&UserId>,
        target: &UserId,
        message: &NotificationPayload,
    ) -> Result<DispatchSummary> {
        guard::check_caller(caller, target)?;
        self.dispatch(target, message).await
    }

    /// Delivers `message` to every subscription of `user_id`.
    ///
    /// Only an oversized payload or a failing registry read abort the call;
    /// per-subscription failures are reflected in the summary alone.
    pub async fn dispatch(
        &self,
        user_id: &UserId,
        message: &NotificationPayload,
    ) -> Result<DispatchSummary> {
        let body = message.to_bytes()?;

        let subscriptions = self
            .registry
            .list(user_id)
            .await
            .map_err(Error::Registry)?;
        if subscriptions.is_empty() {
            debug!(user = %user_id, "no push subscriptions");
            return Ok(DispatchSummary::default());
        }

        let total = subscriptions.len();
        let assertions = AssertionCache::new(&self.identity);

        let outcomes: Vec<(Uri, DispatchOutcome)> = stream::iter(subscriptions)
            .map(|subscription| {
                let (body, assertions) = (&body, &assertions);
                async move {
                    let outcome = self.deliver(&subscription, body, assertions).await;
                    (subscription.endpoint, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let sent = outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == DispatchOutcome::Delivered)
            .count();
        let gone: Vec<Uri> = outcomes
            .into_iter()
            .filter(|(_, outcome)| *outcome == DispatchOutcome::Gone)
            .map(|(endpoint, _)| endpoint)
            .collect();

        if !gone.is_empty() {
            match self.registry.delete_by_endpoints(&gone).await {
                Ok(()) => info!(user = %user_id, count = gone.len(), "pruned gone push subscriptions"),
                Err(e) => error!(user = %user_id, error = %e, "could not prune gone push subscriptions"),
            }
        }

        let summary = DispatchSummary {
            sent,
            total,
            cleaned: gone.len(),
        };
        debug!(user = %user_id, ?summary, "dispatch finished");
        Ok(summary)
    }

    async fn deliver(
        &self,
        subscription: &PushSubscription,
        body: &[u8],
        assertions: &AssertionCache<'_>,
    ) -> DispatchOutcome {
        let endpoint = &subscription.endpoint;

        let request = match self.build_request(subscription, body, assertions) {
            Ok(request) => request,
            Err(e) => {
                warn!(%endpoint, error = %e, "could not prepare push request");
                return DispatchOutcome::TransientFailure;
            }
        };

        match self.transport.send(request).await {
            Ok(status) => {
                let outcome = DispatchOutcome::from_status(status);
                match outcome {
                    DispatchOutcome::Delivered => debug!(%endpoint, %status, "push delivered"),
                    DispatchOutcome::Gone => info!(%endpoint, %status, "push subscription gone"),
                    DispatchOutcome::TransientFailure => {
                        warn!(%endpoint, %status, "push service did not accept message")
                    }
                }
                outcome
            }
            Err(e) => {
                warn!(%endpoint, error = %e, "push request failed");
                DispatchOutcome::TransientFailure
            }
        }
    }

    fn build_request(
        &self,
        subscription: &PushSubscription,
        body: &[u8],
        assertions: &AssertionCache<'_>,
    ) -> Result<Request<Vec<u8>>> {
        let assertion = assertions.get(&audience(&subscription.endpoint)?)?;

        WebPushBuilder::for_subscription(subscription)
            .with_ttl(self.ttl)
            .with_urgency(self.urgency)
            .with_vapid(&assertion)
            .build(body)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("identity", &self.identity)
            .field("concurrency", &self.concurrency)
            .field("ttl", &self.ttl)
            .field("urgency", &self.urgency)
            .finish_non_exhaustive()
    }
}
