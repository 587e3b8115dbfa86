//! End-to-end tests of the orchestration facade against the platform
//! catalog: admission, routing, dedup, retries, saturation, and shutdown.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::Semaphore;

use herald::{
    AdapterError, AdmissionDecision, AdmissionResult, AttemptOutcome, Channel, ChannelAdapter,
    CompletionHook, DeliveryRequest, DeliveryStatus, DispatchConfig, DrainSummary, EventRegistry,
    Orchestrator, OrchestratorConfig, QueueSaturatedError, Recipient, RenderedContent, RequestId,
    RetryPolicy, SendError, SendRequest, StaticPreferences, catalog,
};

fn registry() -> Arc<EventRegistry> {
    Arc::new(catalog::platform_registry().expect("catalog validates"))
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay_ms: 5,
        max_delay_ms: 40,
        jitter_factor: 0.0,
    }
}

fn fast_config(workers: usize, queue_capacity: usize, max_attempts: u32) -> OrchestratorConfig {
    OrchestratorConfig {
        dedup_window_secs: 300,
        dispatch: DispatchConfig {
            workers,
            queue_capacity,
            shutdown_grace_ms: 2_000,
            prune_interval_secs: 3_600,
            retry: fast_retry(max_attempts),
        },
    }
}

/// Adapter that captures rendered content and replays scripted failures
/// before succeeding forever.
#[derive(Debug, Default)]
struct CapturingAdapter {
    calls: AtomicUsize,
    script: Mutex<VecDeque<AdapterError>>,
    sent: Mutex<Vec<RenderedContent>>,
}

impl CapturingAdapter {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing_with(errors: impl IntoIterator<Item = AdapterError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(errors.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn sent(&self) -> Vec<RenderedContent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelAdapter for CapturingAdapter {
    async fn send(
        &self,
        _recipient: &Recipient,
        content: &RenderedContent,
    ) -> Result<(), AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.script.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(content.clone());
        Ok(())
    }
}

/// Adapter that blocks every send until the test opens the gate, recording
/// completion order.
#[derive(Debug)]
struct GateAdapter {
    gate: Arc<Semaphore>,
    order: Mutex<Vec<String>>,
}

impl GateAdapter {
    fn closed() -> Arc<Self> {
        Arc::new(Self {
            gate: Arc::new(Semaphore::new(0)),
            order: Mutex::new(Vec::new()),
        })
    }

    fn open(&self, sends: usize) {
        self.gate.add_permits(sends);
    }

    fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelAdapter for GateAdapter {
    async fn send(
        &self,
        _recipient: &Recipient,
        content: &RenderedContent,
    ) -> Result<(), AdapterError> {
        self.gate.acquire().await.expect("gate closed").forget();
        self.order.lock().unwrap().push(content.body.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingHook {
    completions: Mutex<Vec<(RequestId, DeliveryStatus)>>,
}

impl RecordingHook {
    fn completions(&self) -> Vec<(RequestId, DeliveryStatus)> {
        self.completions.lock().unwrap().clone()
    }
}

impl CompletionHook for RecordingHook {
    fn on_complete(&self, request: &DeliveryRequest, status: &DeliveryStatus) {
        self.completions
            .lock()
            .unwrap()
            .push((request.id, status.clone()));
    }
}

async fn wait_for_terminal(orchestrator: &Orchestrator, id: RequestId) -> DeliveryStatus {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = orchestrator
            .status_of(&id)
            .filter(DeliveryStatus::is_terminal);
        if let Some(status) = status {
            return status;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "request {id} did not reach a terminal status in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn monthly_report(recipient: &str, month_year: &str) -> SendRequest {
    SendRequest::to(recipient)
        .variable("userName", "Iris")
        .variable("monthYear", month_year)
}

#[tokio::test]
async fn account_created_renders_and_delivers_on_email() {
    let email = CapturingAdapter::succeeding();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(2, 16, 4))
        .build();

    let result = orchestrator
        .send(
            "account.created",
            SendRequest::to("student-1")
                .variable("userName", "Ana")
                .variable("confirmationUrl", "https://edu.example/confirm/9f2")
                .only_channels([Channel::Email]),
        )
        .expect("admission succeeds");

    let ids: Vec<RequestId> = result.admitted_ids().collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(result.admissions[0].channel, Channel::Email);

    let status = wait_for_terminal(&orchestrator, ids[0]).await;
    assert_eq!(status, DeliveryStatus::Sent);

    let attempts = orchestrator.attempts_of(&ids[0]).expect("known request");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].attempt_number, 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::Success);

    let sent = email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject.as_deref(), Some("Welcome, Ana!"));
    assert!(sent[0].body.contains("Ana"));
    assert!(sent[0].body.contains("https://edu.example/confirm/9f2"));

    let stats = orchestrator.ledger_stats();
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.total, 1);

    orchestrator.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_sends_admit_exactly_once() {
    let email = CapturingAdapter::succeeding();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(2, 32, 4))
        .build();

    let results: Vec<AdmissionResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let orchestrator = orchestrator.clone();
                scope.spawn(move || {
                    orchestrator.send(
                        "analytics.monthly_report",
                        monthly_report("student-7", "May 2025"),
                    )
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("sender thread panicked"))
            .map(|result| result.expect("admission never errors here"))
            .collect()
    });

    let admitted: Vec<RequestId> = results
        .iter()
        .flat_map(|result| result.admitted_ids().collect::<Vec<_>>())
        .collect();
    assert_eq!(admitted.len(), 1, "exactly one call wins the dedup slot");
    let winner = admitted[0];

    for result in &results {
        match result.channel(Channel::Email).expect("email was routed") {
            AdmissionDecision::Admitted { request_id } => assert_eq!(*request_id, winner),
            AdmissionDecision::Duplicate { existing, .. } => assert_eq!(*existing, winner),
        }
    }

    assert_eq!(
        wait_for_terminal(&orchestrator, winner).await,
        DeliveryStatus::Sent
    );
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(email.calls(), 1);
    assert_eq!(orchestrator.ledger_stats().total, 1);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn full_allowed_set_fans_out_in_declaration_order() {
    let email = CapturingAdapter::succeeding();
    let push = CapturingAdapter::succeeding();
    let in_app = CapturingAdapter::succeeding();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .adapter(Channel::Push, Arc::clone(&push) as _)
        .adapter(Channel::InApp, Arc::clone(&in_app) as _)
        .config(fast_config(2, 16, 4))
        .build();

    let result = orchestrator
        .send(
            "class.invite",
            SendRequest::to("student-2")
                .variable("userName", "Noa")
                .variable("className", "Algebra II"),
        )
        .expect("admission succeeds");

    let channels: Vec<Channel> = result
        .admissions
        .iter()
        .map(|admission| admission.channel)
        .collect();
    assert_eq!(channels, vec![Channel::Email, Channel::Push, Channel::InApp]);

    for id in result.admitted_ids().collect::<Vec<_>>() {
        assert_eq!(
            wait_for_terminal(&orchestrator, id).await,
            DeliveryStatus::Sent
        );
    }
    assert_eq!(email.calls(), 1);
    assert_eq!(push.calls(), 1);
    assert_eq!(in_app.calls(), 1);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn transient_failures_back_off_then_succeed() {
    let email = CapturingAdapter::failing_with([
        AdapterError::transient("smtp timeout"),
        AdapterError::transient("smtp timeout"),
        AdapterError::transient("smtp timeout"),
    ]);
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(2, 16, 5))
        .build();

    let started = std::time::Instant::now();
    let result = orchestrator
        .send("analytics.monthly_report", monthly_report("student-3", "May 2025"))
        .expect("admission succeeds");
    let id = result.admitted_ids().next().expect("one admission");

    assert_eq!(
        wait_for_terminal(&orchestrator, id).await,
        DeliveryStatus::Sent
    );
    assert_eq!(email.calls(), 4);
    // three backoffs at 5ms, 10ms, and 20ms have to elapse first
    assert!(started.elapsed() >= Duration::from_millis(35));

    let attempts = orchestrator.attempts_of(&id).expect("known request");
    let outcomes: Vec<AttemptOutcome> = attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::TransientFailure,
            AttemptOutcome::TransientFailure,
            AttemptOutcome::TransientFailure,
            AttemptOutcome::Success,
        ]
    );
    let numbers: Vec<u32> = attempts.iter().map(|a| a.attempt_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn retry_budget_exhausts_the_request() {
    let email = CapturingAdapter::failing_with(
        (0..8).map(|_| AdapterError::transient("provider unavailable")),
    );
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(2, 16, 3))
        .build();

    let result = orchestrator
        .send("analytics.monthly_report", monthly_report("student-4", "May 2025"))
        .expect("admission succeeds");
    let id = result.admitted_ids().next().expect("one admission");

    assert_eq!(
        wait_for_terminal(&orchestrator, id).await,
        DeliveryStatus::Exhausted
    );
    assert_eq!(email.calls(), 3);
    assert_eq!(orchestrator.attempts_of(&id).expect("known").len(), 3);
    assert_eq!(orchestrator.ledger_stats().exhausted, 1);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn override_outside_allowed_channels_admits_nothing() {
    let email = CapturingAdapter::succeeding();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(2, 16, 4))
        .build();

    // account.created never goes to push
    let err = orchestrator
        .send(
            "account.created",
            SendRequest::to("student-5")
                .variable("userName", "Ana")
                .variable("confirmationUrl", "https://edu.example/confirm/9f2")
                .only_channels([Channel::Push]),
        )
        .expect_err("override must be rejected");

    let SendError::InvalidChannel(invalid) = err else {
        panic!("expected an invalid channel error, got {err}");
    };
    assert!(invalid.requested.contains(Channel::Push));
    assert!(invalid.allowed.contains(Channel::Email));

    assert_eq!(orchestrator.ledger_stats().total, 0);
    assert_eq!(email.calls(), 0);

    // channels outside the closed set never parse in the first place
    assert!("sms".parse::<Channel>().is_err());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn missing_variable_concludes_without_adapter_call() {
    let email = CapturingAdapter::succeeding();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(2, 16, 4))
        .build();

    // monthYear is missing from the variables
    let result = orchestrator
        .send(
            "analytics.monthly_report",
            SendRequest::to("student-6").variable("userName", "Iris"),
        )
        .expect("admission does not validate variables");
    let id = result.admitted_ids().next().expect("one admission");

    let status = wait_for_terminal(&orchestrator, id).await;
    let DeliveryStatus::Failed(reason) = status else {
        panic!("expected a permanent failure, got {status}");
    };
    assert!(
        reason.contains("missing variable `monthYear`"),
        "unexpected reason: {reason}"
    );
    assert_eq!(email.calls(), 0);

    let attempts = orchestrator.attempts_of(&id).expect("known request");
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::PermanentFailure);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn unknown_event_is_rejected_synchronously() {
    let orchestrator = Orchestrator::builder(registry())
        .config(fast_config(2, 16, 4))
        .build();

    let err = orchestrator
        .send("account.deleted", SendRequest::to("student-1"))
        .expect_err("unregistered event key");

    assert!(matches!(err, SendError::UnknownEvent(_)));
    assert!(err.to_string().contains("account.deleted"));
    assert_eq!(orchestrator.ledger_stats().total, 0);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn preferences_narrow_channels_within_allowed() {
    let email = CapturingAdapter::succeeding();
    let push = CapturingAdapter::succeeding();
    let preferences = Arc::new(StaticPreferences::new());
    preferences.set("student-8", [Channel::Push]);

    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .adapter(Channel::Push, Arc::clone(&push) as _)
        .preferences(Arc::clone(&preferences) as _)
        .config(fast_config(2, 16, 4))
        .build();

    let result = orchestrator
        .send(
            "class.invite",
            SendRequest::to("student-8")
                .variable("userName", "Noa")
                .variable("className", "Algebra II"),
        )
        .expect("admission succeeds");

    let channels: Vec<Channel> = result
        .admissions
        .iter()
        .map(|admission| admission.channel)
        .collect();
    assert_eq!(channels, vec![Channel::Push]);

    let id = result.admitted_ids().next().expect("one admission");
    assert_eq!(
        wait_for_terminal(&orchestrator, id).await,
        DeliveryStatus::Sent
    );
    assert_eq!(push.calls(), 1);
    assert_eq!(email.calls(), 0);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn override_ignores_preferences() {
    let email = CapturingAdapter::succeeding();
    let in_app = CapturingAdapter::succeeding();
    let preferences = Arc::new(StaticPreferences::new());
    preferences.set("student-9", [Channel::InApp]);

    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .adapter(Channel::InApp, Arc::clone(&in_app) as _)
        .preferences(Arc::clone(&preferences) as _)
        .config(fast_config(2, 16, 4))
        .build();

    let result = orchestrator
        .send(
            "account.created",
            SendRequest::to("student-9")
                .variable("userName", "Ana")
                .variable("confirmationUrl", "https://edu.example/confirm/9f2")
                .only_channels([Channel::Email]),
        )
        .expect("admission succeeds");

    let channels: Vec<Channel> = result
        .admissions
        .iter()
        .map(|admission| admission.channel)
        .collect();
    assert_eq!(channels, vec![Channel::Email]);

    let id = result.admitted_ids().next().expect("one admission");
    assert_eq!(
        wait_for_terminal(&orchestrator, id).await,
        DeliveryStatus::Sent
    );
    assert_eq!(email.calls(), 1);
    assert_eq!(in_app.calls(), 0);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn preference_with_no_allowed_overlap_falls_back() {
    let email = CapturingAdapter::succeeding();
    let push = CapturingAdapter::succeeding();
    let preferences = Arc::new(StaticPreferences::new());
    // account.created never goes to push, so this filters everything out
    preferences.set("student-10", [Channel::Push]);

    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .adapter(Channel::Push, Arc::clone(&push) as _)
        .preferences(Arc::clone(&preferences) as _)
        .config(fast_config(2, 16, 4))
        .build();

    let result = orchestrator
        .send(
            "account.created",
            SendRequest::to("student-10")
                .variable("userName", "Ana")
                .variable("confirmationUrl", "https://edu.example/confirm/9f2"),
        )
        .expect("admission succeeds");

    // first-declared channel carries the notification anyway
    let channels: Vec<Channel> = result
        .admissions
        .iter()
        .map(|admission| admission.channel)
        .collect();
    assert_eq!(channels, vec![Channel::Email]);

    let id = result.admitted_ids().next().expect("one admission");
    assert_eq!(
        wait_for_terminal(&orchestrator, id).await,
        DeliveryStatus::Sent
    );
    assert_eq!(email.calls(), 1);
    assert_eq!(push.calls(), 0);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn saturated_pipeline_rejects_the_whole_call() {
    let email = GateAdapter::closed();
    let in_app = CapturingAdapter::succeeding();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .adapter(Channel::InApp, Arc::clone(&in_app) as _)
        .config(fast_config(1, 2, 4))
        .build();

    assert_eq!(orchestrator.queue_stats().capacity, 2);

    // holds one of the two capacity slots at the gate
    let blocker = orchestrator
        .send("analytics.monthly_report", monthly_report("student-11", "May 2025"))
        .expect("admission succeeds")
        .admitted_ids()
        .next()
        .expect("one admission");
    tokio::time::sleep(Duration::from_millis(50)).await;

    // two channels need two slots, only one is left: the call admits nothing
    let err = orchestrator
        .send(
            "account.created",
            SendRequest::to("student-12")
                .variable("userName", "Ana")
                .variable("confirmationUrl", "https://edu.example/confirm/9f2"),
        )
        .expect_err("saturated pipeline");
    assert_eq!(
        err,
        SendError::QueueSaturated(QueueSaturatedError { capacity: 2 })
    );
    assert_eq!(orchestrator.ledger_stats().total, 1);

    email.open(2);
    assert_eq!(
        wait_for_terminal(&orchestrator, blocker).await,
        DeliveryStatus::Sent
    );

    // capacity comes back once the blocker concludes
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while orchestrator.queue_stats().available != 2 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "capacity was not restored"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let result = orchestrator
        .send(
            "account.created",
            SendRequest::to("student-12")
                .variable("userName", "Ana")
                .variable("confirmationUrl", "https://edu.example/confirm/9f2"),
        )
        .expect("capacity recovered");
    for id in result.admitted_ids().collect::<Vec<_>>() {
        assert_eq!(
            wait_for_terminal(&orchestrator, id).await,
            DeliveryStatus::Sent
        );
    }

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn shutdown_exhausts_backlog_and_closes_intake() {
    let email = GateAdapter::closed();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(OrchestratorConfig {
            dedup_window_secs: 300,
            dispatch: DispatchConfig {
                workers: 1,
                queue_capacity: 8,
                shutdown_grace_ms: 50,
                prune_interval_secs: 3_600,
                retry: fast_retry(4),
            },
        })
        .build();

    let mut ids = Vec::new();
    // the first occupies the single worker, the rest stay buffered
    for (recipient, month) in [
        ("student-13", "March 2025"),
        ("student-14", "April 2025"),
        ("student-15", "May 2025"),
    ] {
        let id = orchestrator
            .send("analytics.monthly_report", monthly_report(recipient, month))
            .expect("admission succeeds")
            .admitted_ids()
            .next()
            .expect("one admission");
        ids.push(id);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let summary = orchestrator.shutdown().await;
    assert_eq!(
        summary,
        DrainSummary {
            completed_in_grace: 0,
            exhausted: 3,
        }
    );
    for id in &ids {
        assert_eq!(orchestrator.status_of(id), Some(DeliveryStatus::Exhausted));
    }

    // admission still answers, but the commitment concludes immediately
    let late = orchestrator
        .send("analytics.monthly_report", monthly_report("student-16", "May 2025"))
        .expect("admission path stays up")
        .admitted_ids()
        .next()
        .expect("one admission");
    assert_eq!(orchestrator.status_of(&late), Some(DeliveryStatus::Exhausted));

    // repeated shutdowns are a no-op
    assert_eq!(orchestrator.shutdown().await, DrainSummary::default());
}

#[tokio::test]
async fn terminal_failure_reopens_the_dedup_window() {
    let email = CapturingAdapter::failing_with([AdapterError::permanent("mailbox rejected")]);
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(2, 16, 4))
        .build();

    let first = orchestrator
        .send("analytics.monthly_report", monthly_report("student-17", "May 2025"))
        .expect("admission succeeds")
        .admitted_ids()
        .next()
        .expect("one admission");
    let status = wait_for_terminal(&orchestrator, first).await;
    assert!(status.is_terminal_failure());

    // the identical payload is admitted again and succeeds this time
    let second_result = orchestrator
        .send("analytics.monthly_report", monthly_report("student-17", "May 2025"))
        .expect("admission succeeds");
    let second = second_result
        .admitted_ids()
        .next()
        .expect("re-admitted after terminal failure");
    assert_ne!(first, second);
    assert_eq!(
        wait_for_terminal(&orchestrator, second).await,
        DeliveryStatus::Sent
    );

    // a sent holder suppresses the next identical payload
    let third = orchestrator
        .send("analytics.monthly_report", monthly_report("student-17", "May 2025"))
        .expect("admission succeeds");
    assert!(third.all_duplicates());
    match third.channel(Channel::Email).expect("email was routed") {
        AdmissionDecision::Duplicate { existing, status } => {
            assert_eq!(*existing, second);
            assert_eq!(*status, DeliveryStatus::Sent);
        }
        AdmissionDecision::Admitted { .. } => panic!("expected a duplicate"),
    }
    assert_eq!(email.calls(), 2);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn completion_hook_observes_every_worker_conclusion() {
    let email = CapturingAdapter::failing_with(
        (0..3).map(|_| AdapterError::transient("provider unavailable")),
    );
    let hook = Arc::new(RecordingHook::default());
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .completion_hook(Arc::clone(&hook) as _)
        .config(fast_config(1, 16, 3))
        .build();

    let exhausted = orchestrator
        .send("analytics.monthly_report", monthly_report("student-18", "April 2025"))
        .expect("admission succeeds")
        .admitted_ids()
        .next()
        .expect("one admission");
    assert_eq!(
        wait_for_terminal(&orchestrator, exhausted).await,
        DeliveryStatus::Exhausted
    );

    let sent = orchestrator
        .send("analytics.monthly_report", monthly_report("student-18", "May 2025"))
        .expect("admission succeeds")
        .admitted_ids()
        .next()
        .expect("one admission");
    assert_eq!(
        wait_for_terminal(&orchestrator, sent).await,
        DeliveryStatus::Sent
    );

    assert_eq!(
        hook.completions(),
        vec![
            (exhausted, DeliveryStatus::Exhausted),
            (sent, DeliveryStatus::Sent),
        ]
    );

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn urgent_requests_jump_the_buffered_queue() {
    let email = GateAdapter::closed();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(1, 16, 4))
        .build();

    // occupies the single worker, holding it at the gate
    let blocker = orchestrator
        .send(
            "analytics.monthly_report",
            SendRequest::to("student-19")
                .variable("userName", "Blake")
                .variable("monthYear", "April 2025"),
        )
        .expect("admission succeeds")
        .admitted_ids()
        .next()
        .expect("one admission");
    tokio::time::sleep(Duration::from_millis(50)).await;

    // buffered while the worker is busy: low first, urgent second
    let low = orchestrator
        .send(
            "analytics.monthly_report",
            SendRequest::to("student-20")
                .variable("userName", "Lena")
                .variable("monthYear", "May 2025"),
        )
        .expect("admission succeeds")
        .admitted_ids()
        .next()
        .expect("one admission");
    let urgent = orchestrator
        .send(
            "account.password_recovery",
            SendRequest::to("student-21")
                .variable("userName", "Uma")
                .variable("recoveryUrl", "https://edu.example/recover/41c"),
        )
        .expect("admission succeeds")
        .admitted_ids()
        .next()
        .expect("one admission");
    tokio::time::sleep(Duration::from_millis(50)).await;

    email.open(3);
    for id in [blocker, low, urgent] {
        assert_eq!(
            wait_for_terminal(&orchestrator, id).await,
            DeliveryStatus::Sent
        );
    }

    let order = email.order();
    assert_eq!(order.len(), 3);
    assert!(order[0].contains("Blake"), "unexpected first: {}", order[0]);
    assert!(order[1].contains("Uma"), "unexpected second: {}", order[1]);
    assert!(order[2].contains("Lena"), "unexpected third: {}", order[2]);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn query_service_reflects_ledger_state() {
    let email = CapturingAdapter::succeeding();
    let orchestrator = Orchestrator::builder(registry())
        .adapter(Channel::Email, Arc::clone(&email) as _)
        .config(fast_config(2, 16, 4))
        .build();

    let id = orchestrator
        .send("analytics.monthly_report", monthly_report("student-22", "May 2025"))
        .expect("admission succeeds")
        .admitted_ids()
        .next()
        .expect("one admission");
    assert_eq!(
        wait_for_terminal(&orchestrator, id).await,
        DeliveryStatus::Sent
    );

    let service = orchestrator.query_service();
    assert_eq!(service.status_of(&id), Some(DeliveryStatus::Sent));
    assert_eq!(service.attempts_of(&id).expect("known request").len(), 1);
    assert_eq!(service.stats().sent, 1);
    assert_eq!(service.status_of(&RequestId::generate()), None);

    orchestrator.shutdown().await;
}
