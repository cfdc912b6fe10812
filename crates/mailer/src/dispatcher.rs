// Path: crates/mailer/src/dispatcher.rs
//! The N-worker dispatcher pool (spec §4.7): claim, render, send, retry —
//! plus the daily cleanup worker.

use crate::queue::{EmailQueue, ReminderLogInput};
use crate::templates::TemplateResolver;
use crate::transport::{Envelope, SmtpTransport};
use ackify_types::domain::email::ReminderStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Default worker count (spec §4.7, "N worker loops (default N=5)").
const DEFAULT_WORKERS: usize = 5;
/// Default per-claim batch size (spec §4.7 step 1, "B (default 10)").
const DEFAULT_BATCH_SIZE: i64 = 10;
/// Poll interval when idle (spec §4.7, "every 5 seconds or when signalled").
const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Cleanup worker cadence (spec §4.7, "Cleanup worker runs daily").
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Cleanup worker retention window (spec §4.7, "older than 7 days").
const CLEANUP_RETENTION_DAYS: i64 = 7;

pub struct Dispatcher {
    queue: Arc<dyn EmailQueue>,
    templates: Arc<TemplateResolver>,
    transport: Arc<SmtpTransport>,
    workers: usize,
    batch_size: i64,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn EmailQueue>, templates: Arc<TemplateResolver>, transport: Arc<SmtpTransport>) -> Self {
        Self {
            queue,
            templates,
            transport,
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Spawns `self.workers` claim/render/send loops plus the daily
    /// cleanup worker, all torn down when `shutdown` fires. Returns once
    /// every spawned task has exited.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let mut handles = Vec::with_capacity(self.workers + 1);

        for worker_id in 0..self.workers {
            let queue = self.queue.clone();
            let templates = self.templates.clone();
            let transport = self.transport.clone();
            let batch_size = self.batch_size;
            let mut shutdown_rx = shutdown.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, templates, transport, batch_size, &mut shutdown_rx).await;
            }));
        }

        let queue = self.queue.clone();
        let mut shutdown_rx = shutdown.clone();
        handles.push(tokio::spawn(async move {
            cleanup_loop(queue, &mut shutdown_rx).await;
        }));

        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn EmailQueue>,
    templates: Arc<TemplateResolver>,
    transport: Arc<SmtpTransport>,
    batch_size: i64,
    shutdown: &mut watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!(target: "mailer", worker_id, "dispatcher worker shutting down");
                    return;
                }
            }
        }

        let claimed = match queue.claim_batch(batch_size).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(target: "mailer", worker_id, error = %e, "failed to claim email batch");
                continue;
            }
        };

        for job in claimed {
            dispatch_one(&queue, &templates, &transport, job).await;
        }

        if let Ok(depth) = queue.pending_count().await {
            ackify_telemetry::mail_metrics().set_queue_depth(depth);
        }
    }
}

async fn dispatch_one(
    queue: &Arc<dyn EmailQueue>,
    templates: &Arc<TemplateResolver>,
    transport: &Arc<SmtpTransport>,
    job: ackify_types::domain::email::EmailJob,
) {
    let started = std::time::Instant::now();
    let result = dispatch_one_inner(queue, templates, transport, job).await;
    ackify_telemetry::mail_metrics().observe_dispatch_duration(started.elapsed().as_secs_f64());
    result
}

async fn dispatch_one_inner(
    queue: &Arc<dyn EmailQueue>,
    templates: &Arc<TemplateResolver>,
    transport: &Arc<SmtpTransport>,
    job: ackify_types::domain::email::EmailJob,
) {
    let rendered = match templates.render(&job.template, &job.locale, &job.data) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(target: "mailer", job_id = job.id, error = %e, "permanent template failure");
            let _ = queue.mark_failed_permanent(job.id, &e.to_string()).await;
            record_reminder(queue, &job, ReminderStatus::Failed, Some(e.to_string())).await;
            return;
        }
    };

    let envelope = Envelope {
        to: &job.to_addrs,
        cc: &job.cc_addrs,
        bcc: &job.bcc_addrs,
        subject: &job.subject,
        body: &rendered,
    };

    match transport.send(envelope).await {
        Ok(()) => {
            ackify_telemetry::mail_metrics().inc_jobs_terminal("sent");
            if let Err(e) = queue.mark_sent(job.id).await {
                tracing::warn!(target: "mailer", job_id = job.id, error = %e, "failed to mark job sent");
            }
            record_reminder(queue, &job, ReminderStatus::Sent, None).await;
        }
        Err(ackify_types::error::CoreError::Validation(msg)) => {
            tracing::warn!(target: "mailer", job_id = job.id, error = %msg, "permanent SMTP rejection");
            ackify_telemetry::mail_metrics().inc_jobs_terminal("failed");
            let _ = queue.mark_failed_permanent(job.id, &msg).await;
            record_reminder(queue, &job, ReminderStatus::Failed, Some(msg)).await;
        }
        Err(e) => {
            tracing::warn!(target: "mailer", job_id = job.id, error = %e, "transient SMTP failure");
            match queue.mark_retry_or_failed(job.id, &e.to_string()).await {
                Ok(true) => ackify_telemetry::mail_metrics().inc_job_retry_scheduled(),
                Ok(false) => {
                    ackify_telemetry::mail_metrics().inc_jobs_terminal("failed");
                    record_reminder(queue, &job, ReminderStatus::Failed, Some(e.to_string())).await;
                }
                Err(store_err) => {
                    tracing::warn!(target: "mailer", job_id = job.id, error = %store_err, "failed to record retry state");
                }
            }
        }
    }
}

async fn record_reminder(
    queue: &Arc<dyn EmailQueue>,
    job: &ackify_types::domain::email::EmailJob,
    status: ReminderStatus,
    error_message: Option<String>,
) {
    if job.reference_type.as_deref() != Some("reminder") {
        return;
    }
    let Some(doc_id) = job.reference_id.clone() else {
        return;
    };
    let Some(recipient_email) = job.to_addrs.first().cloned() else {
        return;
    };
    let log = ReminderLogInput {
        doc_id,
        recipient_email,
        sent_by: job.created_by.clone(),
        template_used: job.template.clone(),
        status,
        error_message,
    };
    if let Err(e) = queue.write_reminder_log(log).await {
        tracing::warn!(target: "mailer", job_id = job.id, error = %e, "failed to write reminder log");
    }
}

async fn cleanup_loop(queue: Arc<dyn EmailQueue>, shutdown: &mut watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(CLEANUP_INTERVAL) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!(target: "mailer", "cleanup worker shutting down");
                    return;
                }
            }
        }

        let cutoff = chrono::Utc::now() - chrono::Duration::days(CLEANUP_RETENTION_DAYS);
        match queue.cleanup_terminal_older_than(cutoff).await {
            Ok(deleted) => tracing::info!(target: "mailer", deleted, "cleaned up terminal email jobs"),
            Err(e) => tracing::warn!(target: "mailer", error = %e, "cleanup worker failed"),
        }
    }
}
