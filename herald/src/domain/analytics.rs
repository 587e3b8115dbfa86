//! Notifications raised by the learning-analytics jobs.

use herald_common::Recipient;

use crate::orchestrator::{AdmissionResult, Orchestrator, SendError, SendRequest};

/// Performance and reporting notifications.
///
/// Analytics jobs run in batches and may detect the same milestone more than
/// once; the engine's dedup window absorbs the repeats, so callers fire
/// without coordinating.
#[derive(Debug, Clone)]
pub struct AnalyticsNotifier {
    orchestrator: Orchestrator,
}

impl AnalyticsNotifier {
    #[must_use]
    pub const fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// A performance goal was reached.
    pub fn goal_achieved(
        &self,
        recipient: impl Into<Recipient>,
        user_name: impl Into<String>,
        goal_name: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "analytics.goal_achieved",
            SendRequest::to(recipient)
                .variable("userName", user_name)
                .variable("goalName", goal_name),
        )
    }

    /// The monthly activity report is ready.
    pub fn monthly_report(
        &self,
        recipient: impl Into<Recipient>,
        user_name: impl Into<String>,
        month_year: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "analytics.monthly_report",
            SendRequest::to(recipient)
                .variable("userName", user_name)
                .variable("monthYear", month_year),
        )
    }

    /// Sustained low performance was detected in a course.
    pub fn low_performance(
        &self,
        recipient: impl Into<Recipient>,
        user_name: impl Into<String>,
        course_name: impl Into<String>,
    ) -> Result<AdmissionResult, SendError> {
        self.orchestrator.send(
            "analytics.low_performance",
            SendRequest::to(recipient)
                .variable("userName", user_name)
                .variable("courseName", course_name),
        )
    }
}
