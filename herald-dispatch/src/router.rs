//! Channel routing: override, preference, default.

use std::fmt::Debug;
use std::sync::Arc;

use dashmap::DashMap;

use herald_common::{ChannelSet, Recipient};
use herald_registry::NotificationEvent;

use crate::error::InvalidChannelError;

/// Source of per-recipient channel preferences.
///
/// Lookups happen on the synchronous admission path, so implementations
/// must answer from memory. Anything slower belongs in a cache refreshed
/// outside the engine.
pub trait ChannelPreferences: Send + Sync + Debug {
    /// The recipient's preferred channels, or `None` when the recipient
    /// never expressed one.
    fn channels_for(&self, recipient: &Recipient) -> Option<ChannelSet>;
}

/// In-memory preference store.
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences {
    preferences: Arc<DashMap<Recipient, ChannelSet>>,
}

impl StaticPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a recipient's preferred channels.
    pub fn set(&self, recipient: impl Into<Recipient>, channels: impl Into<ChannelSet>) {
        self.preferences.insert(recipient.into(), channels.into());
    }

    /// Forget a recipient's preference, restoring the event default.
    pub fn clear(&self, recipient: &Recipient) {
        self.preferences.remove(recipient);
    }
}

impl ChannelPreferences for StaticPreferences {
    fn channels_for(&self, recipient: &Recipient) -> Option<ChannelSet> {
        self.preferences
            .get(recipient)
            .map(|entry| entry.value().clone())
    }
}

/// Decide the effective channels for one event and recipient.
///
/// Precedence: a validated override wins outright and ignores preferences;
/// otherwise a recipient preference is intersected with the event's allowed
/// channels; otherwise the full allowed set applies. The result keeps the
/// event's declaration order and is never empty: when a preference filters
/// everything out, the event's first-declared channel is used so the
/// notification still reaches the recipient somewhere.
pub fn resolve(
    event: &NotificationEvent,
    channel_override: Option<&ChannelSet>,
    preference: Option<&ChannelSet>,
) -> Result<ChannelSet, InvalidChannelError> {
    let allowed = &event.allowed_channels;

    if let Some(requested) = channel_override {
        if requested.is_empty() || !requested.is_subset_of(allowed) {
            return Err(InvalidChannelError {
                requested: requested.clone(),
                allowed: allowed.clone(),
            });
        }
        return Ok(requested.clone());
    }

    if let Some(preferred) = preference {
        let effective = allowed.intersect(preferred);
        if effective.is_empty() {
            let mut fallback = ChannelSet::new();
            if let Some(first) = allowed.first() {
                fallback.insert(first);
            }
            return Ok(fallback);
        }
        return Ok(effective);
    }

    Ok(allowed.clone())
}
