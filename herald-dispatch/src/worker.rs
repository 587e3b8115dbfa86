//! The per-request delivery pipeline.
//!
//! One worker owns one request from dequeue to terminal status: render the
//! template, hand the content to the channel adapter, classify the result,
//! record the attempt, and either back off for a retry or conclude.

use std::sync::Arc;

use tokio::sync::broadcast;

use herald_common::{AttemptOutcome, DeliveryStatus, Signal, delivery};
use herald_registry::{EventRegistry, render};

use crate::adapter::{AdapterSet, CompletionHook};
use crate::error::AdapterError;
use crate::ledger::DeliveryLedger;
use crate::retry::RetryPolicy;
use crate::types::DeliveryRequest;

/// State shared by every worker of one dispatcher.
#[derive(Debug)]
pub(crate) struct WorkerContext {
    pub(crate) registry: Arc<EventRegistry>,
    pub(crate) adapters: AdapterSet,
    pub(crate) ledger: DeliveryLedger,
    pub(crate) retry: RetryPolicy,
    pub(crate) hook: Option<Arc<dyn CompletionHook>>,
}

/// Drive one request to a terminal status.
pub(crate) async fn deliver(
    ctx: Arc<WorkerContext>,
    request: Arc<DeliveryRequest>,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    let status = run_attempts(&ctx, &request, &mut shutdown).await;

    let id = request.id;
    let channel = request.channel;
    match &status {
        DeliveryStatus::Sent => {
            delivery!(level = INFO, "request {id} delivered on {channel}");
        }
        DeliveryStatus::Failed(reason) => {
            delivery!(
                level = ERROR,
                "request {id} failed permanently on {channel}: {reason}"
            );
        }
        DeliveryStatus::Exhausted => {
            delivery!(level = ERROR, "request {id} exhausted on {channel}");
        }
        DeliveryStatus::Pending => {}
    }

    if let Some(hook) = &ctx.hook {
        hook.on_complete(&request, &status);
    }
}

/// Attempt loop for one request. Always concludes with a terminal status.
async fn run_attempts(
    ctx: &WorkerContext,
    request: &DeliveryRequest,
    shutdown: &mut broadcast::Receiver<Signal>,
) -> DeliveryStatus {
    let id = request.id;
    let channel = request.channel;

    // The registry is immutable for the engine's lifetime, so one lookup
    // covers every attempt.
    let event = match ctx.registry.lookup(&request.event_key) {
        Ok(event) => event,
        Err(err) => return fail(ctx, request, err.to_string()),
    };
    let Some(template) = event.template_for(channel) else {
        return fail(ctx, request, format!("no template for channel `{channel}`"));
    };
    let Some(adapter) = ctx.adapters.get(channel) else {
        return fail(
            ctx,
            request,
            format!("no adapter registered for channel `{channel}`"),
        );
    };

    // Rendering is deterministic, so one failure is final. A render error
    // concludes the request before the adapter is ever invoked.
    let content = match render(template, &request.variables) {
        Ok(content) => content,
        Err(err) => return fail(ctx, request, err.to_string()),
    };

    let mut attempt: u32 = 1;
    loop {
        delivery!(level = DEBUG, "attempt {attempt} for {id} on {channel}");

        match adapter.send(&request.recipient, &content).await {
            Ok(()) => {
                return conclude(ctx, request, AttemptOutcome::Success, None);
            }
            Err(AdapterError::Permanent { detail }) => {
                return conclude(ctx, request, AttemptOutcome::PermanentFailure, Some(detail));
            }
            Err(AdapterError::Transient { detail }) => {
                ctx.ledger.record_attempt(
                    &request.id,
                    AttemptOutcome::TransientFailure,
                    Some(detail.clone()),
                );

                if !ctx.retry.should_retry(attempt) {
                    delivery!(
                        level = WARN,
                        "no retries left for {id} after attempt {attempt} on {channel}"
                    );
                    return exhaust(ctx, request);
                }

                let delay = ctx.retry.backoff_delay(attempt);
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                delivery!(
                    level = WARN,
                    "attempt {attempt} for {id} failed ({detail}), retrying in {delay_ms}ms"
                );

                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    _ = shutdown.recv() => {
                        delivery!(level = WARN, "shutdown during backoff, exhausting {id}");
                        return exhaust(ctx, request);
                    }
                }

                attempt += 1;
            }
        }
    }
}

fn conclude(
    ctx: &WorkerContext,
    request: &DeliveryRequest,
    outcome: AttemptOutcome,
    detail: Option<String>,
) -> DeliveryStatus {
    ctx.ledger
        .record_attempt(&request.id, outcome, detail)
        .unwrap_or(DeliveryStatus::Exhausted)
}

fn fail(ctx: &WorkerContext, request: &DeliveryRequest, detail: String) -> DeliveryStatus {
    conclude(ctx, request, AttemptOutcome::PermanentFailure, Some(detail))
}

fn exhaust(ctx: &WorkerContext, request: &DeliveryRequest) -> DeliveryStatus {
    ctx.ledger
        .mark_exhausted(&request.id)
        .unwrap_or(DeliveryStatus::Exhausted)
}
