//! The immutable event registry.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use herald_common::{Channel, EventKey};

use crate::event::NotificationEvent;

/// Error for a lookup of an unregistered event key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no notification event registered for key `{0}`")]
pub struct UnknownEventError(pub EventKey);

/// Validation errors raised while building a registry.
///
/// Validation is fail-fast at startup so that a malformed event can never
/// reach the delivery path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate event key `{0}`")]
    DuplicateEvent(EventKey),

    #[error("event `{0}` declares no channels")]
    NoChannels(EventKey),

    #[error("event `{key}` allows channel `{channel}` but has no template for it")]
    MissingTemplate { key: EventKey, channel: Channel },

    #[error("event `{key}` has a template for `{channel}`, which is not an allowed channel")]
    UnroutableTemplate { key: EventKey, channel: Channel },

    #[error("event `{key}` template for `{channel}` references undeclared variable `{placeholder}`")]
    UndeclaredPlaceholder {
        key: EventKey,
        channel: Channel,
        placeholder: String,
    },
}

/// Immutable store of notification events.
///
/// Built once at process start, from code or from TOML, then shared
/// read-only. There is no runtime mutation: swapping in a freshly built
/// registry is the only reload path.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    events: HashMap<EventKey, NotificationEvent>,
}

impl EventRegistry {
    #[must_use]
    pub fn builder() -> EventRegistryBuilder {
        EventRegistryBuilder::default()
    }

    /// Look up an event by key.
    pub fn lookup(&self, key: &EventKey) -> Result<&NotificationEvent, UnknownEventError> {
        self.events
            .get(key)
            .ok_or_else(|| UnknownEventError(key.clone()))
    }

    #[must_use]
    pub fn contains(&self, key: &EventKey) -> bool {
        self.events.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &EventKey> {
        self.events.keys()
    }
}

/// Collects event definitions and validates them into an [`EventRegistry`].
#[derive(Debug, Default)]
pub struct EventRegistryBuilder {
    events: Vec<NotificationEvent>,
}

impl EventRegistryBuilder {
    #[must_use]
    pub fn event(mut self, event: impl Into<NotificationEvent>) -> Self {
        self.events.push(event.into());
        self
    }

    /// Validate every definition and build the registry.
    pub fn build(self) -> Result<EventRegistry, RegistryError> {
        let mut events = HashMap::with_capacity(self.events.len());

        for event in self.events {
            validate(&event)?;
            match events.entry(event.key.clone()) {
                Entry::Occupied(_) => return Err(RegistryError::DuplicateEvent(event.key)),
                Entry::Vacant(slot) => {
                    slot.insert(event);
                }
            }
        }

        let registry = EventRegistry { events };
        tracing::debug!(events = registry.len(), "event registry built");
        Ok(registry)
    }
}

fn validate(event: &NotificationEvent) -> Result<(), RegistryError> {
    if event.allowed_channels.is_empty() {
        return Err(RegistryError::NoChannels(event.key.clone()));
    }

    for channel in event.allowed_channels.iter() {
        if !event.templates.contains_key(&channel) {
            return Err(RegistryError::MissingTemplate {
                key: event.key.clone(),
                channel,
            });
        }
    }

    for (&channel, template) in &event.templates {
        if !event.allowed_channels.contains(channel) {
            return Err(RegistryError::UnroutableTemplate {
                key: event.key.clone(),
                channel,
            });
        }

        // Every placeholder must be satisfiable by the declared variables,
        // otherwise rendering could never succeed.
        for placeholder in template.placeholders() {
            if !event.required_variables.contains(&placeholder) {
                return Err(RegistryError::UndeclaredPlaceholder {
                    key: event.key.clone(),
                    channel,
                    placeholder,
                });
            }
        }
    }

    Ok(())
}
