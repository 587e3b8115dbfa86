//! Domain-facing notifier wrappers.
//!
//! Producers never assemble event keys or variable names by hand. Each
//! domain service gets a thin wrapper that pins its event keys and maps
//! domain context onto template variables; routing, dedup, and retries all
//! stay behind the [`Orchestrator`](crate::Orchestrator).

mod analytics;
mod auth;
mod tutor;

pub use analytics::AnalyticsNotifier;
pub use auth::AuthNotifier;
pub use tutor::TutorNotifier;
