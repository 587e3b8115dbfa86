//! TOML form of a registry definition.
//!
//! ```toml
//! [[event]]
//! key = "account.created"
//! priority = "high"
//! channels = ["email", "in_app"]
//! required_variables = ["user_name", "confirmation_url"]
//!
//! [event.templates.email]
//! subject = "Welcome, {user_name}!"
//! body = "Confirm your address: {confirmation_url}"
//!
//! [event.templates.in_app]
//! body = "Welcome aboard, {user_name}."
//! ```

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use herald_common::{Channel, Priority};

use crate::event::NotificationEvent;
use crate::registry::{EventRegistry, RegistryError};
use crate::template::Template;

/// A full registry definition as it appears in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default, rename = "event")]
    pub events: Vec<EventConfig>,
}

/// One `[[event]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
    pub key: String,
    #[serde(default)]
    pub priority: Priority,
    /// Allowed channels; order matters, the first is the routing fallback.
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub required_variables: BTreeSet<String>,
    #[serde(default)]
    pub templates: HashMap<Channel, Template>,
}

/// Errors from loading a registry out of TOML.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] RegistryError),
}

impl RegistryConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Validate the definitions and build the registry.
    pub fn into_registry(self) -> Result<EventRegistry, RegistryError> {
        let mut builder = EventRegistry::builder();
        for event in self.events {
            builder = builder.event(NotificationEvent {
                key: event.key.into(),
                priority: event.priority,
                allowed_channels: event.channels.into(),
                required_variables: event.required_variables,
                templates: event.templates,
            });
        }
        builder.build()
    }
}

impl EventRegistry {
    /// Load and validate a registry from TOML text.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        RegistryConfig::from_toml_str(input)?
            .into_registry()
            .map_err(ConfigError::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use herald_common::EventKey;
    use pretty_assertions::assert_eq;

    use super::*;

    const REGISTRY: &str = r#"
        [[event]]
        key = "account.created"
        priority = "high"
        channels = ["email", "in_app"]
        required_variables = ["user_name", "confirmation_url"]

        [event.templates.email]
        subject = "Welcome, {user_name}!"
        body = "Confirm your address: {confirmation_url}"

        [event.templates.in_app]
        body = "Welcome aboard, {user_name}."

        [[event]]
        key = "class.deadline_24h"
        channels = ["push"]
        required_variables = ["activity_name"]

        [event.templates.push]
        body = "{activity_name} is due in 24 hours"
    "#;

    #[test]
    fn loads_a_registry_from_toml() {
        let registry = EventRegistry::from_toml_str(REGISTRY).unwrap();
        assert_eq!(registry.len(), 2);

        let event = registry.lookup(&EventKey::from("account.created")).unwrap();
        assert_eq!(event.priority, Priority::High);
        assert_eq!(event.fallback_channel(), Some(Channel::Email));
        assert_eq!(
            event
                .template_for(Channel::Email)
                .and_then(|t| t.subject.as_deref()),
            Some("Welcome, {user_name}!")
        );

        let deadline = registry.lookup(&EventKey::from("class.deadline_24h")).unwrap();
        assert_eq!(deadline.priority, Priority::Normal);
    }

    #[test]
    fn invalid_definitions_fail_to_load() {
        let broken = r#"
            [[event]]
            key = "account.created"
            channels = ["email"]

            [event.templates.email]
            body = "Hello {user_name}"
        "#;
        let err = EventRegistry::from_toml_str(broken).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(RegistryError::UndeclaredPlaceholder { .. })
        ));
    }

    #[test]
    fn unknown_channel_names_fail_to_parse() {
        let broken = r#"
            [[event]]
            key = "account.created"
            channels = ["sms"]
        "#;
        assert!(matches!(
            RegistryConfig::from_toml_str(broken),
            Err(ConfigError::Parse(_))
        ));
    }
}
