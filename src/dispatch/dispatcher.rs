use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::clock::Clock;
use super::error::DispatchError;
use super::store::NotificationJobStore;
use crate::config::DispatchConfig;
use crate::models::NotificationJob;
use crate::services::notifications::{ChannelRequest, ChannelSenders, SendOutcome};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub batch_size: u32,
    pub stale_after: chrono::Duration,
    pub max_attempts: u32,
}

impl From<&DispatchConfig> for DispatcherConfig {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            stale_after: config.stale_after(),
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

/// Outcome of one invocation of [`Dispatcher::run_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BatchSummary {
    /// Jobs that reached a terminal state in this batch
    pub processed: u32,
    pub completed: u32,
    pub failed: u32,
    /// Due jobs not handled: lost claim or unrecorded outcome
    pub skipped: u32,
    /// Stale `processing` jobs returned to `pending`
    pub requeued: u32,
    /// Stale `processing` jobs failed after `max_attempts`
    pub abandoned: u32,
}

/// Terminal state reached by a single job.
enum JobResolution {
    Completed,
    Failed,
}

/// Moves due notification jobs through channel senders to a terminal state.
pub struct Dispatcher {
    store: Arc<dyn NotificationJobStore>,
    senders: ChannelSenders,
    clock: Arc<dyn Clock>,
    config: DispatcherConfig,
    // Serializes overlapping triggers inside this process
    run_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationJobStore>,
        senders: ChannelSenders,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            senders,
            clock,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Run one dispatch batch.
    ///
    /// Stale claims are resolved first, then up to `batch_size` due jobs are
    /// claimed and sent one at a time. A failure on one job never stops the
    /// batch; only an unreachable store before the first claim returns `Err`.
    ///
    /// Recovery writes are committed before the due query runs. If that query
    /// then fails, the `Err` is returned with requeued or abandoned jobs left
    /// as written; no job has been claimed or sent.
    pub async fn run_batch(&self) -> Result<BatchSummary, DispatchError> {
        let _guard = self.run_lock.lock().await;
        let now = self.clock.now();

        // An unrepresentable cutoff leaves every claim fresh
        let stale_before = now
            .checked_sub_signed(self.config.stale_after)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let max_attempts = i32::try_from(self.config.max_attempts).unwrap_or(i32::MAX);

        let recovery = self
            .store
            .reclaim_stale(stale_before, max_attempts, now)
            .await?;
        if recovery.requeued > 0 || recovery.abandoned > 0 {
            warn!(
                requeued = recovery.requeued,
                abandoned = recovery.abandoned,
                "Recovered stale notification jobs"
            );
        }

        let jobs = self
            .store
            .fetch_due(now, i64::from(self.config.batch_size))
            .await?;

        let mut summary = BatchSummary {
            requeued: recovery.requeued,
            abandoned: recovery.abandoned,
            ..Default::default()
        };

        if jobs.is_empty() {
            debug!("No due notification jobs");
            return Ok(summary);
        }

        info!(due = jobs.len(), "Dispatching notification jobs");

        for job in jobs {
            let span = info_span!("dispatch_job", job_id = %job.id, kind = %job.kind);
            match self.process_job(job.id).instrument(span).await {
                Some(JobResolution::Completed) => {
                    summary.processed += 1;
                    summary.completed += 1;
                }
                Some(JobResolution::Failed) => {
                    summary.processed += 1;
                    summary.failed += 1;
                }
                None => summary.skipped += 1,
            }
        }

        info!(
            processed = summary.processed,
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Dispatch batch finished"
        );

        Ok(summary)
    }

    /// Claim, send and record one job. `None` when the job was not resolved here.
    async fn process_job(&self, id: Uuid) -> Option<JobResolution> {
        let job = match self.store.claim(id, self.clock.now()).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                debug!("Job no longer pending, skipping");
                return None;
            }
            Err(e) => {
                error!(error = %e.detailed_message(), "Failed to claim job");
                return None;
            }
        };

        let result = self
            .deliver(&job)
            .await
            .and_then(|outcome| match outcome {
                SendOutcome::Delivered(tally) => tally.check().map(Ok),
                SendOutcome::Rejected { status, message } => {
                    warn!(status, error = %message, "Channel sender rejected job");
                    Ok(Err(message))
                }
            })
            .unwrap_or_else(|e| Err(e.job_message()));

        let now = self.clock.now();
        let (recorded, resolution) = match result {
            Ok(tally) => (
                self.store.complete(job.id, tally, now).await,
                JobResolution::Completed,
            ),
            Err(message) => (
                self.store.fail(job.id, &message, now).await,
                JobResolution::Failed,
            ),
        };

        match recorded {
            Ok(true) => {
                match resolution {
                    JobResolution::Completed => info!("Job completed"),
                    JobResolution::Failed => warn!("Job failed"),
                }
                Some(resolution)
            }
            Ok(false) => {
                warn!("Job left processing before its outcome was recorded");
                None
            }
            Err(e) => {
                // Left in processing; stale-claim recovery picks it up later
                error!(error = %e.detailed_message(), "Failed to record job outcome");
                None
            }
        }
    }

    async fn deliver(&self, job: &NotificationJob) -> Result<SendOutcome, DispatchError> {
        let sender = self
            .senders
            .for_kind(job.kind)
            .ok_or(DispatchError::ChannelNotConfigured(job.kind))?;

        sender.send(&ChannelRequest::for_job(job)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{FixedClock, MemoryJobStore, StaleRecovery, UnreachableJobStore};
    use crate::error::{AppError, AppResult};
    use crate::models::{JobKind, JobStatus, NewNotificationJob};
    use crate::services::notifications::{ChannelSender, SendTally};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
    }

    /// Sender replaying scripted outcomes and recording requests.
    #[derive(Default)]
    struct ScriptedSender {
        script: StdMutex<VecDeque<Result<SendOutcome, DispatchError>>>,
        requests: StdMutex<Vec<ChannelRequest>>,
    }

    impl ScriptedSender {
        fn with(outcomes: Vec<Result<SendOutcome, DispatchError>>) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(outcomes.into()),
                requests: StdMutex::default(),
            })
        }

        fn requests(&self) -> Vec<ChannelRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChannelSender for ScriptedSender {
        async fn send(&self, request: &ChannelRequest) -> Result<SendOutcome, DispatchError> {
            self.requests.lock().unwrap().push(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(SendOutcome::Delivered(tally(1, 0, 1))))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn tally(sent: i32, failed: i32, total: i32) -> SendTally {
        SendTally {
            sent,
            failed,
            total,
        }
    }

    fn job(kind: JobKind, scheduled_at: DateTime<Utc>) -> NotificationJob {
        NotificationJob::from_new(
            NewNotificationJob {
                id: Uuid::new_v4(),
                kind,
                title: "Avocados restocked".to_string(),
                body: "Ripe and ready".to_string(),
                url: None,
                html_content: None,
                audience: "all".to_string(),
                activity_filter: None,
                scheduled_at,
                created_by: Some("admin-1".to_string()),
            },
            scheduled_at - chrono::Duration::hours(1),
        )
    }

    struct Harness {
        store: Arc<MemoryJobStore>,
        clock: Arc<FixedClock>,
        dispatcher: Dispatcher,
    }

    fn harness(push: Arc<ScriptedSender>, email: Arc<ScriptedSender>) -> Harness {
        let store = Arc::new(MemoryJobStore::new());
        let clock = Arc::new(FixedClock::new(t0()));
        let dispatcher = Dispatcher::new(
            store.clone(),
            ChannelSenders::new(Some(push), Some(email)),
            clock.clone(),
            DispatcherConfig::default(),
        );
        Harness {
            store,
            clock,
            dispatcher,
        }
    }

    #[tokio::test]
    async fn test_future_jobs_are_untouched_and_due_jobs_terminate() {
        let push = ScriptedSender::with(vec![]);
        let h = harness(push.clone(), ScriptedSender::with(vec![]));
        let due = job(JobKind::Push, t0() - chrono::Duration::minutes(5));
        let future = job(JobKind::Push, t0() + chrono::Duration::minutes(5));
        h.store.insert(due.clone()).await;
        h.store.insert(future.clone()).await;

        let summary = h.dispatcher.run_batch().await.unwrap();

        assert_eq!(summary.processed, 1);
        let due_after = h.store.get(due.id).await.unwrap();
        assert!(due_after.status.is_terminal());
        assert_eq!(due_after.processed_at, Some(t0()));
        assert_eq!(h.store.get(future.id).await.unwrap(), future);
        assert_eq!(push.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_claims_ten_oldest_of_fifteen() {
        let h = harness(ScriptedSender::with(vec![]), ScriptedSender::with(vec![]));
        let mut ids = Vec::new();
        for minutes in (1..=15).rev() {
            let j = job(JobKind::Push, t0() - chrono::Duration::minutes(minutes));
            ids.push(j.id);
            h.store.insert(j).await;
        }

        let summary = h.dispatcher.run_batch().await.unwrap();
        assert_eq!(summary.processed, 10);

        for (i, id) in ids.iter().enumerate() {
            let status = h.store.get(*id).await.unwrap().status;
            if i < 10 {
                assert_eq!(status, JobStatus::Completed, "job {i} should be dispatched");
            } else {
                assert_eq!(status, JobStatus::Pending, "job {i} should wait");
            }
        }
    }

    #[tokio::test]
    async fn test_no_due_jobs_returns_zero_without_mutation() {
        let h = harness(ScriptedSender::with(vec![]), ScriptedSender::with(vec![]));
        let future = job(JobKind::Email, t0() + chrono::Duration::days(1));
        h.store.insert(future.clone()).await;

        let summary = h.dispatcher.run_batch().await.unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert_eq!(h.store.all().await, vec![future]);
    }

    #[tokio::test]
    async fn test_single_job_error_does_not_stop_batch() {
        let push = ScriptedSender::with(vec![
            Ok(SendOutcome::Delivered(tally(5, 0, 5))),
            Err(DispatchError::InvalidResponse("connection reset".to_string())),
            Ok(SendOutcome::Delivered(tally(7, 1, 8))),
        ]);
        let h = harness(push, ScriptedSender::with(vec![]));
        let jobs: Vec<_> = (1..=3)
            .rev()
            .map(|m| job(JobKind::Push, t0() - chrono::Duration::minutes(m)))
            .collect();
        for j in &jobs {
            h.store.insert(j.clone()).await;
        }

        let summary = h.dispatcher.run_batch().await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!((summary.completed, summary.failed), (2, 1));
        let second = h.store.get(jobs[1].id).await.unwrap();
        assert_eq!(second.status, JobStatus::Failed);
        assert!(second.error_message.unwrap().contains("connection reset"));
        assert_eq!(h.store.get(jobs[2].id).await.unwrap().sent_count, 7);
    }

    #[tokio::test]
    async fn test_push_counters_are_recorded() {
        let push = ScriptedSender::with(vec![Ok(SendOutcome::Delivered(tally(120, 3, 123)))]);
        let h = harness(push.clone(), ScriptedSender::with(vec![]));
        let j = job(JobKind::Push, t0() - chrono::Duration::minutes(1));
        h.store.insert(j.clone()).await;

        h.dispatcher.run_batch().await.unwrap();

        let after = h.store.get(j.id).await.unwrap();
        assert_eq!(after.status, JobStatus::Completed);
        assert_eq!(
            (after.sent_count, after.failed_count, after.total_count),
            (120, 3, 123)
        );
        assert!(after.error_message.is_none());

        let request = &push.requests()[0];
        assert_eq!(request.created_by.as_deref(), Some("admin-1"));
        assert_eq!(request.payload["tag"], format!("scheduled-{}", j.id));
    }

    #[tokio::test]
    async fn test_email_rejection_fails_job_with_message() {
        let email = ScriptedSender::with(vec![Ok(SendOutcome::Rejected {
            status: 500,
            message: "smtp down".to_string(),
        })]);
        let h = harness(ScriptedSender::with(vec![]), email);
        let j = job(JobKind::Email, t0());
        h.store.insert(j.clone()).await;

        let summary = h.dispatcher.run_batch().await.unwrap();

        assert_eq!(summary.failed, 1);
        let after = h.store.get(j.id).await.unwrap();
        assert_eq!(after.status, JobStatus::Failed);
        assert_eq!(after.error_message.as_deref(), Some("smtp down"));
        assert_eq!(after.processed_at, Some(t0()));
    }

    #[tokio::test]
    async fn test_inconsistent_tally_fails_job() {
        let push = ScriptedSender::with(vec![Ok(SendOutcome::Delivered(tally(10, 5, 12)))]);
        let h = harness(push, ScriptedSender::with(vec![]));
        let j = job(JobKind::Push, t0());
        h.store.insert(j.clone()).await;

        h.dispatcher.run_batch().await.unwrap();

        let after = h.store.get(j.id).await.unwrap();
        assert_eq!(after.status, JobStatus::Failed);
        assert_eq!((after.sent_count, after.total_count), (0, 0));
        assert!(after.error_message.unwrap().contains("inconsistent"));
    }

    #[tokio::test]
    async fn test_cancelled_jobs_are_excluded() {
        let push = ScriptedSender::with(vec![]);
        let h = harness(push.clone(), ScriptedSender::with(vec![]));
        let j = job(JobKind::Push, t0() - chrono::Duration::minutes(1));
        h.store.insert(j.clone()).await;
        h.store.cancel(j.id, t0()).await.unwrap();

        let summary = h.dispatcher.run_batch().await.unwrap();

        assert_eq!(summary.processed, 0);
        assert!(push.requests().is_empty());
        assert_eq!(h.store.get(j.id).await.unwrap().status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_missing_channel_sender_fails_job() {
        let store = Arc::new(MemoryJobStore::new());
        let dispatcher = Dispatcher::new(
            store.clone(),
            ChannelSenders::new(Some(ScriptedSender::with(vec![])), None),
            Arc::new(FixedClock::new(t0())),
            DispatcherConfig::default(),
        );
        let j = job(JobKind::Email, t0());
        store.insert(j.clone()).await;

        dispatcher.run_batch().await.unwrap();

        let after = store.get(j.id).await.unwrap();
        assert_eq!(after.status, JobStatus::Failed);
        assert_eq!(
            after.error_message.as_deref(),
            Some("no email channel sender is configured")
        );
    }

    #[tokio::test]
    async fn test_stale_claims_are_requeued_then_abandoned() {
        let h = harness(ScriptedSender::with(vec![]), ScriptedSender::with(vec![]));
        let stale_at = t0() - chrono::Duration::hours(1);

        let mut retry = job(JobKind::Push, stale_at);
        retry.status = JobStatus::Processing;
        retry.attempts = 1;
        retry.claimed_at = Some(stale_at);
        let mut exhausted = job(JobKind::Push, stale_at);
        exhausted.status = JobStatus::Processing;
        exhausted.attempts = 3;
        exhausted.claimed_at = Some(stale_at);
        let mut fresh = job(JobKind::Push, t0());
        fresh.status = JobStatus::Processing;
        fresh.attempts = 1;
        fresh.claimed_at = Some(t0() - chrono::Duration::minutes(1));
        for j in [&retry, &exhausted, &fresh] {
            h.store.insert(j.clone()).await;
        }

        let summary = h.dispatcher.run_batch().await.unwrap();

        assert_eq!((summary.requeued, summary.abandoned), (1, 1));
        // Requeued in the same batch, then dispatched
        let retried = h.store.get(retry.id).await.unwrap();
        assert_eq!(retried.status, JobStatus::Completed);
        assert_eq!(retried.attempts, 2);

        let abandoned = h.store.get(exhausted.id).await.unwrap();
        assert_eq!(abandoned.status, JobStatus::Failed);
        assert_eq!(
            abandoned.error_message.as_deref(),
            Some("abandoned in processing after 3 attempts")
        );

        assert_eq!(h.store.get(fresh.id).await.unwrap().status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_extreme_recovery_limits_never_reclaim_in_flight_jobs() {
        let store = Arc::new(MemoryJobStore::new());
        let dispatcher = Dispatcher::new(
            store.clone(),
            ChannelSenders::new(Some(ScriptedSender::with(vec![])), None),
            Arc::new(FixedClock::new(t0())),
            DispatcherConfig::from(&DispatchConfig {
                stale_after_secs: u64::MAX,
                max_attempts: u32::MAX,
                ..Default::default()
            }),
        );

        let mut in_flight = job(JobKind::Push, t0() - chrono::Duration::minutes(5));
        in_flight.status = JobStatus::Processing;
        in_flight.attempts = 1;
        in_flight.claimed_at = Some(t0());
        store.insert(in_flight.clone()).await;

        let summary = dispatcher.run_batch().await.unwrap();

        assert_eq!((summary.requeued, summary.abandoned), (0, 0));
        let untouched = store.get(in_flight.id).await.unwrap();
        assert_eq!(untouched.status, JobStatus::Processing);
        assert_eq!(untouched.attempts, 1);
    }

    #[tokio::test]
    async fn test_oversized_attempt_limit_requeues_instead_of_abandoning() {
        let store = Arc::new(MemoryJobStore::new());
        let dispatcher = Dispatcher::new(
            store.clone(),
            ChannelSenders::new(Some(ScriptedSender::with(vec![])), None),
            Arc::new(FixedClock::new(t0())),
            DispatcherConfig {
                max_attempts: u32::MAX,
                ..Default::default()
            },
        );

        let stale_at = t0() - chrono::Duration::hours(2);
        let mut stuck = job(JobKind::Push, stale_at);
        stuck.status = JobStatus::Processing;
        stuck.attempts = 5;
        stuck.claimed_at = Some(stale_at);
        store.insert(stuck.clone()).await;

        let summary = dispatcher.run_batch().await.unwrap();

        assert_eq!((summary.requeued, summary.abandoned), (1, 0));
        assert_eq!(store.get(stuck.id).await.unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_clock_drives_eligibility() {
        let h = harness(ScriptedSender::with(vec![]), ScriptedSender::with(vec![]));
        let j = job(JobKind::Push, t0() + chrono::Duration::minutes(30));
        h.store.insert(j.clone()).await;

        assert_eq!(h.dispatcher.run_batch().await.unwrap().processed, 0);
        h.clock.advance(chrono::Duration::minutes(30));
        assert_eq!(h.dispatcher.run_batch().await.unwrap().processed, 1);
        assert_eq!(
            h.store.get(j.id).await.unwrap().processed_at,
            Some(t0() + chrono::Duration::minutes(30))
        );
    }

    /// Store that loses every claim, as if another dispatcher got there first.
    struct ContendedStore(MemoryJobStore);

    #[async_trait]
    impl NotificationJobStore for ContendedStore {
        async fn fetch_due(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<NotificationJob>> {
            self.0.fetch_due(now, limit).await
        }
        async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<NotificationJob>> {
            self.0.cancel(id, now).await?;
            self.0.claim(id, now).await
        }
        async fn complete(&self, id: Uuid, t: SendTally, now: DateTime<Utc>) -> AppResult<bool> {
            self.0.complete(id, t, now).await
        }
        async fn fail(&self, id: Uuid, m: &str, now: DateTime<Utc>) -> AppResult<bool> {
            self.0.fail(id, m, now).await
        }
        async fn reclaim_stale(
            &self,
            before: DateTime<Utc>,
            max: i32,
            now: DateTime<Utc>,
        ) -> AppResult<StaleRecovery> {
            self.0.reclaim_stale(before, max, now).await
        }
        async fn create(&self, job: NewNotificationJob, now: DateTime<Utc>) -> AppResult<NotificationJob> {
            self.0.create(job, now).await
        }
        async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NotificationJob>> {
            self.0.find_by_id(id).await
        }
        async fn list(
            &self,
            s: Option<JobStatus>,
            o: i64,
            l: i64,
        ) -> AppResult<(Vec<NotificationJob>, i64)> {
            self.0.list(s, o, l).await
        }
        async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<NotificationJob>> {
            self.0.cancel(id, now).await
        }
        async fn ping(&self) -> AppResult<()> {
            Err(AppError::Internal {
                source: anyhow::anyhow!("unused"),
            })
        }
    }

    #[tokio::test]
    async fn test_lost_claim_is_skipped() {
        let inner = MemoryJobStore::new();
        let j = job(JobKind::Push, t0());
        inner.insert(j.clone()).await;
        let store = Arc::new(ContendedStore(inner));
        let push = ScriptedSender::with(vec![]);
        let dispatcher = Dispatcher::new(
            store.clone(),
            ChannelSenders::new(Some(push.clone()), None),
            Arc::new(FixedClock::new(t0())),
            DispatcherConfig::default(),
        );

        let summary = dispatcher.run_batch().await.unwrap();

        assert_eq!((summary.processed, summary.skipped), (0, 1));
        assert!(push.requests().is_empty());
        assert_eq!(store.0.get(j.id).await.unwrap().status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_whole_batch() {
        let push = ScriptedSender::with(vec![]);
        let dispatcher = Dispatcher::new(
            Arc::new(UnreachableJobStore),
            ChannelSenders::new(Some(push.clone()), None),
            Arc::new(FixedClock::new(t0())),
            DispatcherConfig::default(),
        );

        let result = dispatcher.run_batch().await;

        assert!(matches!(result, Err(DispatchError::Store(_))));
        assert!(push.requests().is_empty());
    }
}
