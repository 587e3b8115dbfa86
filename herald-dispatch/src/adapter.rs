//! The channel adapter seam.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use herald_common::{Channel, DeliveryStatus, Recipient};
use herald_registry::RenderedContent;

use crate::error::AdapterError;
use crate::types::DeliveryRequest;

/// Transport for one channel.
///
/// Adapters see only the recipient and the rendered content: no event keys,
/// no priorities, no retry counts. Their single responsibility beyond
/// transport is to classify a failure as transient or permanent; backoff
/// and bookkeeping stay in the pipeline.
#[async_trait]
pub trait ChannelAdapter: Send + Sync + Debug {
    async fn send(
        &self,
        recipient: &Recipient,
        content: &RenderedContent,
    ) -> Result<(), AdapterError>;
}

/// Callback fired once per request when it reaches a terminal status.
///
/// Runs on the delivery worker, so implementations must return quickly and
/// never block.
pub trait CompletionHook: Send + Sync + Debug {
    fn on_complete(&self, request: &DeliveryRequest, status: &DeliveryStatus);
}

/// The adapters registered for one engine instance, at most one per
/// channel.
#[derive(Debug, Clone, Default)]
pub struct AdapterSet {
    adapters: HashMap<Channel, Arc<dyn ChannelAdapter>>,
}

impl AdapterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the adapter for a channel.
    pub fn register(&mut self, channel: Channel, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(channel, adapter);
    }

    /// Builder-style [`Self::register`].
    #[must_use]
    pub fn with(mut self, channel: Channel, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.register(channel, adapter);
        self
    }

    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn ChannelAdapter>> {
        self.adapters.get(&channel)
    }

    #[must_use]
    pub fn contains(&self, channel: Channel) -> bool {
        self.adapters.contains_key(&channel)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Channels with a registered adapter, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = Channel> {
        self.adapters.keys().copied()
    }
}
