//! The platform's standard notification events.
//!
//! Keys are namespaced `area.event`. Channel declaration order matters: the
//! first-declared channel is the routing fallback when a recipient's
//! preferences exclude every allowed channel. Variable names follow the
//! platform's payload contract (`userName`, `confirmationUrl`, ...), so
//! producers on other services can reuse their existing payloads.

use herald_common::{Channel, Priority};
use herald_registry::{EventRegistry, NotificationEvent, RegistryError, Template};

/// Build the registry of standard platform events.
///
/// Validation is fail-fast: a malformed template or an undeclared variable
/// here stops the engine at startup instead of failing deliveries later.
pub fn platform_registry() -> Result<EventRegistry, RegistryError> {
    EventRegistry::builder()
        .event(
            NotificationEvent::define("account.created")
                .priority(Priority::High)
                .requires("userName")
                .requires("confirmationUrl")
                .template(
                    Channel::Email,
                    Template::new(
                        "Hi {userName}, welcome aboard! Confirm your account at {confirmationUrl} to get started.",
                    )
                    .with_subject("Welcome, {userName}!"),
                )
                .template(
                    Channel::InApp,
                    Template::new("Welcome, {userName}! Check your email to confirm your account."),
                ),
        )
        .event(
            NotificationEvent::define("account.password_changed")
                .priority(Priority::High)
                .requires("userName")
                .template(
                    Channel::Email,
                    Template::new(
                        "Hi {userName}, your password was just changed. If this wasn't you, contact support immediately.",
                    )
                    .with_subject("Your password was changed"),
                )
                .template(Channel::Push, Template::new("{userName}, your password was changed.")),
        )
        .event(
            NotificationEvent::define("account.password_recovery")
                .priority(Priority::Urgent)
                .requires("userName")
                .requires("recoveryUrl")
                .template(
                    Channel::Email,
                    Template::new(
                        "Hi {userName}, reset your password at {recoveryUrl}. The link expires in one hour.",
                    )
                    .with_subject("Password recovery"),
                ),
        )
        .event(
            NotificationEvent::define("class.invite")
                .priority(Priority::Normal)
                .requires("userName")
                .requires("className")
                .template(
                    Channel::Email,
                    Template::new("Hi {userName}, you have been invited to join {className}.")
                        .with_subject("Invitation to {className}"),
                )
                .template(Channel::Push, Template::new("You were invited to {className}"))
                .template(Channel::InApp, Template::new("You were invited to join {className}.")),
        )
        .event(
            NotificationEvent::define("class.activity_published")
                .priority(Priority::Normal)
                .requires("className")
                .requires("activityName")
                .template(
                    Channel::Push,
                    Template::new("New activity in {className}: {activityName}"),
                )
                .template(
                    Channel::InApp,
                    Template::new("{activityName} was published in {className}."),
                ),
        )
        .event(
            NotificationEvent::define("class.deadline_24h")
                .priority(Priority::High)
                .requires("activityName")
                .requires("dueDate")
                .template(
                    Channel::Push,
                    Template::new("{activityName} is due {dueDate}. Less than 24 hours left!"),
                )
                .template(
                    Channel::Email,
                    Template::new(
                        "Reminder: {activityName} is due {dueDate}. You have less than 24 hours to submit.",
                    )
                    .with_subject("Deadline approaching: {activityName}"),
                ),
        )
        .event(
            NotificationEvent::define("class.activity_graded")
                .priority(Priority::Normal)
                .requires("activityName")
                .requires("grade")
                .template(
                    Channel::Push,
                    Template::new("{activityName} was graded: {grade}"),
                )
                .template(
                    Channel::InApp,
                    Template::new("Your submission for {activityName} was graded: {grade}."),
                ),
        )
        .event(
            NotificationEvent::define("class.plagiarism_flagged")
                .priority(Priority::Urgent)
                .requires("activityName")
                .requires("studentName")
                .template(
                    Channel::Email,
                    Template::new(
                        "A submission by {studentName} for {activityName} was flagged for review.",
                    )
                    .with_subject("Submission flagged: {activityName}"),
                )
                .template(
                    Channel::InApp,
                    Template::new("{studentName}'s submission for {activityName} needs review."),
                ),
        )
        .event(
            NotificationEvent::define("analytics.goal_achieved")
                .priority(Priority::Normal)
                .requires("userName")
                .requires("goalName")
                .template(
                    Channel::Push,
                    Template::new("Congratulations {userName}, you reached {goalName}!"),
                )
                .template(
                    Channel::InApp,
                    Template::new("Goal achieved: {goalName}. Keep it up, {userName}!"),
                ),
        )
        .event(
            NotificationEvent::define("analytics.monthly_report")
                .priority(Priority::Low)
                .requires("userName")
                .requires("monthYear")
                .template(
                    Channel::Email,
                    Template::new(
                        "Hi {userName}, your learning report for {monthYear} is ready. See how far you've come!",
                    )
                    .with_subject("Your {monthYear} report is ready"),
                ),
        )
        .event(
            NotificationEvent::define("analytics.low_performance")
                .priority(Priority::High)
                .requires("userName")
                .requires("courseName")
                .template(
                    Channel::Email,
                    Template::new(
                        "Hi {userName}, your recent results in {courseName} suggest you could use a refresher. We picked some material for you.",
                    )
                    .with_subject("Let's get back on track in {courseName}"),
                )
                .template(
                    Channel::InApp,
                    Template::new("We prepared extra material for you in {courseName}."),
                ),
        )
        .event(
            NotificationEvent::define("tutor.training_complete")
                .priority(Priority::Normal)
                .requires("botName")
                .template(
                    Channel::Push,
                    Template::new("{botName} finished training and is ready to answer questions."),
                )
                .template(
                    Channel::InApp,
                    Template::new("{botName} is trained and ready."),
                ),
        )
        .event(
            NotificationEvent::define("tutor.training_failed")
                .priority(Priority::High)
                .requires("botName")
                .requires("reason")
                .template(
                    Channel::Email,
                    Template::new("Training of {botName} failed: {reason}. Review the source material and retry.")
                        .with_subject("Training failed for {botName}"),
                )
                .template(
                    Channel::InApp,
                    Template::new("Training of {botName} failed: {reason}"),
                ),
        )
        .event(
            NotificationEvent::define("tutor.unanswered_question")
                .priority(Priority::Normal)
                .requires("botName")
                .requires("question")
                .template(
                    Channel::InApp,
                    Template::new("A student asked something {botName} could not answer: \"{question}\""),
                ),
        )
        .build()
}
