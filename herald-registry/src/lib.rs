//! The notification event registry and template renderer.
//!
//! Events are registered once at startup, validated fail-fast, and read-only
//! afterwards: every event names its allowed channels (in declaration
//! order), the variables it requires, and one template per channel.
//! Rendering is literal `{name}` substitution with missing variables treated
//! as hard errors.

pub mod config;
pub mod event;
pub mod registry;
pub mod render;
pub mod template;

pub use config::{ConfigError, EventConfig, RegistryConfig};
pub use event::{EventDefinition, NotificationEvent};
pub use registry::{EventRegistry, EventRegistryBuilder, RegistryError, UnknownEventError};
pub use render::{RenderError, render};
pub use template::{RenderedContent, Template};
