//! Notifications raised by the AI-tutoring service.

use herald_common::Recipient;

use crate::orchestrator::{AdmissionResult, Orchestrator, SendError, SendRequest};

/// Tutor bot lifecycle and conversation notifications.
#[derive(Debug, Clone)]
pub struct TutorNotifier {
    orchestrator: Orchestrator,
}

impl TutorNotifier {
    #[must_use]
    pub const fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// A tutor bot finished training and is ready to use.
    pub fn training_complete(
        &self,
        recipient: impl Into<Recipient>,
        bot_name: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "tutor.training_complete",
            SendRequest::to(recipient).variable("botName", bot_name),
        )
    }

    /// Training failed and the bot needs attention.
    pub fn training_failed(
        &self,
        recipient: impl Into<Recipient>,
        bot_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "tutor.training_failed",
            SendRequest::to(recipient)
                .variable("botName", bot_name)
                .variable("reason", reason),
        )
    }

    /// A student question the bot could not answer was escalated.
    pub fn unanswered_question(
        &self,
        recipient: impl Into<Recipient>,
        bot_name: impl Into<String>,
        question: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "tutor.unanswered_question",
            SendRequest::to(recipient)
                .variable("botName", bot_name)
                .variable("question", question),
        )
    }
}
