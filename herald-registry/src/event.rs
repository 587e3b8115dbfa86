//! Notification event definitions.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use herald_common::{Channel, ChannelSet, EventKey, Priority};

use crate::template::Template;

/// A registered notification event.
///
/// Carries the event's priority, its allowed channels in declaration order
/// (the first one is the routing fallback), the variables producers must
/// supply, and one template per allowed channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub key: EventKey,
    #[serde(default)]
    pub priority: Priority,
    pub allowed_channels: ChannelSet,
    #[serde(default)]
    pub required_variables: BTreeSet<String>,
    pub templates: HashMap<Channel, Template>,
}

impl NotificationEvent {
    /// Start defining an event. Channels take their declaration order from
    /// successive [`EventDefinition::template`] calls.
    pub fn define(key: impl Into<EventKey>) -> EventDefinition {
        EventDefinition {
            key: key.into(),
            priority: Priority::default(),
            channels: ChannelSet::new(),
            required: BTreeSet::new(),
            templates: HashMap::new(),
        }
    }

    /// The template registered for `channel`, if the event allows it.
    #[must_use]
    pub fn template_for(&self, channel: Channel) -> Option<&Template> {
        self.templates.get(&channel)
    }

    /// The routing fallback: the event's first-declared channel.
    #[must_use]
    pub fn fallback_channel(&self) -> Option<Channel> {
        self.allowed_channels.first()
    }
}

/// Fluent definition of a [`NotificationEvent`].
#[derive(Debug, Clone)]
pub struct EventDefinition {
    key: EventKey,
    priority: Priority,
    channels: ChannelSet,
    required: BTreeSet<String>,
    templates: HashMap<Channel, Template>,
}

impl EventDefinition {
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Declare a variable producers must supply.
    #[must_use]
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.required.insert(name.into());
        self
    }

    /// Allow a channel and register its template. Declaration order is the
    /// call order; redefining a channel replaces its template.
    #[must_use]
    pub fn template(mut self, channel: Channel, template: Template) -> Self {
        self.channels.insert(channel);
        self.templates.insert(channel, template);
        self
    }
}

impl From<EventDefinition> for NotificationEvent {
    fn from(definition: EventDefinition) -> Self {
        Self {
            key: definition.key,
            priority: definition.priority,
            allowed_channels: definition.channels,
            required_variables: definition.required,
            templates: definition.templates,
        }
    }
}
