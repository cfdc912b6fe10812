// Path: crates/mailer/src/queue.rs
//! Durable queue operations over `email_queue` (spec §4.7).

use ackify_types::domain::email::{EmailJob, NewEmailJob, ReminderLog};
use ackify_types::error::CoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[async_trait]
pub trait EmailQueue: Send + Sync {
    /// Inserts a row with `status=pending`. `scheduled_for` defaults to
    /// now() if not supplied (spec §4.7).
    async fn enqueue(&self, job: NewEmailJob) -> Result<EmailJob, CoreError>;

    /// Atomically claims up to `batch_size` pending, due rows and marks
    /// them `processing` (spec §4.7 step 1's `FOR UPDATE SKIP LOCKED`
    /// pattern — safe for multiple dispatcher processes to call
    /// concurrently).
    async fn claim_batch(&self, batch_size: i64) -> Result<Vec<EmailJob>, CoreError>;

    /// Marks `job_id` `sent` and stamps `processed_at`.
    async fn mark_sent(&self, job_id: i64) -> Result<(), CoreError>;

    /// Records a transient dispatch failure: increments `retry_count`,
    /// computes `next_retry_at = now() + (1 minute * 2^retry_count)`, and
    /// re-queues as `pending` — unless `retry_count` has now exceeded
    /// `max_retries`, in which case the job becomes `failed` (spec §4.7
    /// step 5, P10).
    async fn mark_retry_or_failed(&self, job_id: i64, error: &str) -> Result<bool, CoreError>;

    /// Marks `job_id` `failed` immediately, with no further retries (spec
    /// §4.7 step 6, permanent failures).
    async fn mark_failed_permanent(&self, job_id: i64, error: &str) -> Result<(), CoreError>;

    async fn write_reminder_log(&self, log: ReminderLogInput) -> Result<(), CoreError>;

    /// Current count of jobs in `pending` or `processing`, used for the
    /// queue-depth gauge.
    async fn pending_count(&self) -> Result<i64, CoreError>;

    /// Deletes `sent`/`failed`/`cancelled` rows older than `older_than`,
    /// run daily by the cleanup worker (spec §4.7 "Cleanup worker").
    async fn cleanup_terminal_older_than(&self, older_than: DateTime<Utc>) -> Result<u64, CoreError>;
}

/// Fields for [`EmailQueue::write_reminder_log`], deliberately distinct
/// from [`ReminderLog`] since `id` is storage-assigned.
pub struct ReminderLogInput {
    pub doc_id: String,
    pub recipient_email: String,
    pub sent_by: Option<String>,
    pub template_used: String,
    pub status: ackify_types::domain::email::ReminderStatus,
    pub error_message: Option<String>,
}

pub struct PgEmailQueue {
    pool: PgPool,
}

impl PgEmailQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailQueue for PgEmailQueue {
    async fn enqueue(&self, job: NewEmailJob) -> Result<EmailJob, CoreError> {
        let scheduled_for = job.scheduled_for.unwrap_or_else(Utc::now);
        let inserted = sqlx::query_as::<_, EmailJob>(
            "INSERT INTO email_queue \
             (to_addrs, cc_addrs, bcc_addrs, subject, template, locale, data, headers, \
              status, priority, retry_count, max_retries, scheduled_for, reference_type, \
              reference_id, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, 0, $10, $11, $12, $13, $14) \
             RETURNING id, to_addrs, cc_addrs, bcc_addrs, subject, template, locale, data, \
                       headers, status, priority, retry_count, max_retries, created_at, \
                       scheduled_for, processed_at, next_retry_at, last_error, error_details, \
                       reference_type, reference_id, created_by",
        )
        .bind(&job.to_addrs)
        .bind(&job.cc_addrs)
        .bind(&job.bcc_addrs)
        .bind(&job.subject)
        .bind(&job.template)
        .bind(&job.locale)
        .bind(&job.data)
        .bind(&job.headers)
        .bind(job.priority)
        .bind(job.max_retries)
        .bind(scheduled_for)
        .bind(&job.reference_type)
        .bind(&job.reference_id)
        .bind(&job.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn claim_batch(&self, batch_size: i64) -> Result<Vec<EmailJob>, CoreError> {
        let rows = sqlx::query_as::<_, EmailJob>(
            "UPDATE email_queue SET status = 'processing' \
             WHERE id IN ( \
               SELECT id FROM email_queue \
               WHERE status = 'pending' AND scheduled_for <= now() \
               ORDER BY priority DESC, scheduled_for ASC \
               LIMIT $1 \
               FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING id, to_addrs, cc_addrs, bcc_addrs, subject, template, locale, data, \
                       headers, status, priority, retry_count, max_retries, created_at, \
                       scheduled_for, processed_at, next_retry_at, last_error, error_details, \
                       reference_type, reference_id, created_by",
        )
        .bind(batch_size)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_sent(&self, job_id: i64) -> Result<(), CoreError> {
        sqlx::query("UPDATE email_queue SET status = 'sent', processed_at = now() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_retry_or_failed(&self, job_id: i64, error: &str) -> Result<bool, CoreError> {
        let row = sqlx::query_as::<_, (i32, i32)>(
            "SELECT retry_count, max_retries FROM email_queue WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some((retry_count, max_retries)) = row else {
            return Ok(false);
        };

        let next_retry_count = retry_count + 1;
        if next_retry_count > max_retries {
            sqlx::query(
                "UPDATE email_queue SET status = 'failed', retry_count = $2, last_error = $3 \
                 WHERE id = $1",
            )
            .bind(job_id)
            .bind(next_retry_count)
            .bind(error)
            .execute(&self.pool)
            .await?;
            return Ok(false);
        }

        let backoff_minutes = 2i64.saturating_pow(next_retry_count as u32);
        sqlx::query(
            "UPDATE email_queue SET status = 'pending', retry_count = $2, \
             next_retry_at = now() + ($3 || ' minutes')::interval, \
             scheduled_for = now() + ($3 || ' minutes')::interval, last_error = $4 \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(next_retry_count)
        .bind(backoff_minutes.to_string())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn mark_failed_permanent(&self, job_id: i64, error: &str) -> Result<(), CoreError> {
        sqlx::query("UPDATE email_queue SET status = 'failed', last_error = $2 WHERE id = $1")
            .bind(job_id)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_reminder_log(&self, log: ReminderLogInput) -> Result<(), CoreError> {
        let _: ReminderLog = sqlx::query_as(
            "INSERT INTO reminder_logs \
             (doc_id, recipient_email, sent_by, template_used, status, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, doc_id, recipient_email, sent_at, sent_by, template_used, status, \
                       error_message",
        )
        .bind(&log.doc_id)
        .bind(&log.recipient_email)
        .bind(&log.sent_by)
        .bind(&log.template_used)
        .bind(log.status)
        .bind(&log.error_message)
        .fetch_one(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending_count(&self) -> Result<i64, CoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM email_queue WHERE status IN ('pending', 'processing')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn cleanup_terminal_older_than(&self, older_than: DateTime<Utc>) -> Result<u64, CoreError> {
        let result = sqlx::query(
            "DELETE FROM email_queue \
             WHERE status IN ('sent', 'failed', 'cancelled') AND created_at < $1",
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// `EmailStatus` is re-exported for downstream crates constructing
// `NewEmailJob`/filter predicates without reaching back into `ackify-types`.
pub use ackify_types::domain::email::EmailStatus as QueueStatus;
