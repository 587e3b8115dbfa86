//! Notifications raised by authentication flows.

use herald_common::Recipient;

use crate::orchestrator::{AdmissionResult, Orchestrator, SendError, SendRequest};

/// Account lifecycle notifications.
#[derive(Debug, Clone)]
pub struct AuthNotifier {
    orchestrator: Orchestrator,
}

impl AuthNotifier {
    #[must_use]
    pub const fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// A new account was registered and needs its address confirmed.
    pub fn account_created(
        &self,
        recipient: impl Into<Recipient>,
        user_name: impl Into<String>,
        confirmation_url: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "account.created",
            SendRequest::to(recipient)
                .variable("userName", user_name)
                .variable("confirmationUrl", confirmation_url),
        )
    }

    /// The account password was changed.
    pub fn password_changed(
        &self,
        recipient: impl Into<Recipient>,
        user_name: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "account.password_changed",
            SendRequest::to(recipient).variable("userName", user_name),
        )
    }

    /// A password recovery link was requested.
    pub fn password_recovery(
        &self,
        recipient: impl Into<Recipient>,
        user_name: impl Into<String>,
        recovery_url: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "account.password_recovery",
            SendRequest::to(recipient)
                .variable("userName", user_name)
                .variable("recoveryUrl", recovery_url),
        )
    }
}
