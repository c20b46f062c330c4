//! Event subscribers.

use std::{borrow::Cow, future::Future, sync::Arc};

use crate::stream::StreamEvent;

/// Subscriber can be registered on a [`Monitor`](crate::Monitor) to process
/// business events.
#[async_trait::async_trait]
pub trait Subscriber: Send + Sync {
    /// subscriber name, used in dispatch logs
    fn name(&self) -> Cow<'static, str>;

    /// callback executed for every event that passes the subscriber's filter
    async fn on_event(self: Arc<Self>, event: Arc<StreamEvent>);
}

#[async_trait::async_trait]
impl<F, Fut> Subscriber for F
where
    F: Fn(Arc<StreamEvent>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    fn name(&self) -> Cow<'static, str> {
        "anonymous fn subscriber".into()
    }

    async fn on_event(self: Arc<Self>, event: Arc<StreamEvent>) {
        self(event).await
    }
}
