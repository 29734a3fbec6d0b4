//! Process-wide job registry and progress broadcaster.
//!
//! Every transcription request gets one job here. Subscribers attach to a
//! job and receive its progress events in order, then exactly one terminal
//! event (`completed` or `job-error`), after which their stream closes and
//! the job is forgotten. All state is in memory and lives at most as long
//! as the job runs: there is no persistence and no reattach after the
//! terminal event has been broadcast.
//!
//! Every mutation and broadcast happens under a single write lock, which is
//! what guarantees that all subscribers observe the same event order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::progress::{ProgressSink, ProgressUpdate};

/// Lifecycle state of a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Metadata broadcast with a job's `completed` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCompletion {
    pub file_name: String,
    pub model: String,
}

/// Error details broadcast with a job's `job-error` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Default for JobFailure {
    fn default() -> Self {
        Self {
            message: "Unknown transcription failure".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Timestamped note attached when a job's status is set out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusNote {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// One tracked transcription job. Owned exclusively by the registry.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    /// Most recent progress update, replayed to late subscribers.
    pub latest_progress: Option<ProgressUpdate>,
    pub status_note: Option<StatusNote>,
    pub result: Option<JobCompletion>,
    pub error: Option<JobFailure>,
}

/// Event delivered to subscribers of a job's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum JobEvent {
    Progress(ProgressUpdate),
    Completed(JobCompletion),
    JobError(JobFailure),
    KeepAlive,
}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<JobEvent>,
}

/// Receiving half of one subscriber attachment.
///
/// Events arrive in broadcast order; `None` means the stream has closed,
/// which happens right after the terminal event or on [`JobRegistry::detach`].
pub struct JobSubscription {
    job_id: String,
    subscriber_id: u64,
    rx: mpsc::UnboundedReceiver<JobEvent>,
}

impl JobSubscription {
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.rx.recv().await
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

#[derive(Default)]
struct RegistryInner {
    jobs: HashMap<String, Job>,
    streams: HashMap<String, Vec<Subscriber>>,
}

/// In-memory job map plus the per-job subscriber streams.
pub struct JobRegistry {
    inner: RwLock<RegistryInner>,
    subscriber_seq: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            subscriber_seq: AtomicU64::new(0),
        }
    }

    /// Register a new pending job and return its id.
    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let job = Job {
            id: id.clone(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            latest_progress: None,
            status_note: None,
            result: None,
            error: None,
        };
        self.inner.write().await.jobs.insert(id.clone(), job);
        crate::verbose!("Created job {id}");
        id
    }

    pub async fn exists(&self, job_id: &str) -> bool {
        self.inner.read().await.jobs.contains_key(job_id)
    }

    /// Overwrite a job's status without broadcasting. Unknown ids are ignored.
    pub async fn set_status(
        &self,
        job_id: &str,
        status: JobStatus,
        details: Option<serde_json::Value>,
    ) {
        let mut inner = self.inner.write().await;
        if let Some(job) = inner.jobs.get_mut(job_id) {
            job.status = status;
            job.status_note = Some(StatusNote {
                timestamp: Utc::now(),
                details,
            });
        }
    }

    /// Record a progress update and broadcast it to the job's subscribers.
    ///
    /// The update is timestamped here, stored as the job's latest progress,
    /// and fanned out under the same lock. Unknown ids are ignored.
    pub async fn report_progress(&self, job_id: &str, mut update: ProgressUpdate) {
        let mut inner = self.inner.write().await;
        let Some(job) = inner.jobs.get_mut(job_id) else {
            return;
        };
        update.timestamp = Some(Utc::now());
        job.latest_progress = Some(update.clone());
        Self::broadcast(&mut inner, job_id, JobEvent::Progress(update));
    }

    /// Mark a job completed: broadcast the `completed` event, close every
    /// subscriber stream, and remove the job. Unknown ids are ignored.
    pub async fn complete(&self, job_id: &str, completion: JobCompletion) {
        let mut inner = self.inner.write().await;
        let Some(job) = inner.jobs.get_mut(job_id) else {
            return;
        };
        job.status = JobStatus::Completed;
        job.result = Some(completion.clone());
        Self::broadcast(&mut inner, job_id, JobEvent::Completed(completion));
        Self::close_streams(&mut inner, job_id);
        inner.jobs.remove(job_id);
        crate::verbose!("Job {job_id} completed and retired");
    }

    /// Mark a job failed: broadcast the `job-error` event, close every
    /// subscriber stream, and remove the job. Unknown ids are ignored.
    pub async fn fail(&self, job_id: &str, message: impl Into<String>) {
        let mut inner = self.inner.write().await;
        let Some(job) = inner.jobs.get_mut(job_id) else {
            return;
        };
        let failure = JobFailure {
            message: message.into(),
            timestamp: Utc::now(),
        };
        job.status = JobStatus::Failed;
        job.error = Some(failure.clone());
        Self::broadcast(&mut inner, job_id, JobEvent::JobError(failure));
        Self::close_streams(&mut inner, job_id);
        inner.jobs.remove(job_id);
        crate::verbose!("Job {job_id} failed and retired");
    }

    /// Subscribe to a job's event stream, or `None` for unknown ids.
    ///
    /// The job's latest progress update, if any, is replayed first. When the
    /// job already carries a terminal status the matching terminal event is
    /// delivered and the stream closes immediately instead of going live.
    pub async fn attach(&self, job_id: &str) -> Option<JobSubscription> {
        let mut inner = self.inner.write().await;
        let (status, latest_progress, result, error) = {
            let job = inner.jobs.get(job_id)?;
            (
                job.status,
                job.latest_progress.clone(),
                job.result.clone(),
                job.error.clone(),
            )
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(progress) = latest_progress {
            let _ = tx.send(JobEvent::Progress(progress));
        }

        let subscriber_id = self.subscriber_seq.fetch_add(1, Ordering::Relaxed);
        match status {
            JobStatus::Completed => {
                let _ = tx.send(JobEvent::Completed(result.unwrap_or_default()));
                // tx drops here, closing the stream after the terminal event.
            }
            JobStatus::Failed => {
                let _ = tx.send(JobEvent::JobError(error.unwrap_or_default()));
            }
            JobStatus::Pending | JobStatus::Processing => {
                inner
                    .streams
                    .entry(job_id.to_string())
                    .or_default()
                    .push(Subscriber { id: subscriber_id, tx });
            }
        }

        Some(JobSubscription {
            job_id: job_id.to_string(),
            subscriber_id,
            rx,
        })
    }

    /// Remove one subscriber from a job's stream.
    ///
    /// The per-job subscriber list is discarded once it is empty and the job
    /// itself no longer exists.
    pub async fn detach(&self, subscription: &JobSubscription) {
        let mut inner = self.inner.write().await;
        if let Some(subscribers) = inner.streams.get_mut(&subscription.job_id) {
            subscribers.retain(|s| s.id != subscription.subscriber_id);
            if subscribers.is_empty() && !inner.jobs.contains_key(&subscription.job_id) {
                inner.streams.remove(&subscription.job_id);
            }
        }
    }

    /// Send a keep-alive event to every live subscriber of every job.
    pub async fn broadcast_keep_alive(&self) {
        let mut inner = self.inner.write().await;
        let job_ids: Vec<String> = inner.streams.keys().cloned().collect();
        for job_id in job_ids {
            Self::broadcast(&mut inner, &job_id, JobEvent::KeepAlive);
        }
    }

    /// Spawn a task that broadcasts keep-alives at a fixed period until
    /// aborted.
    pub fn spawn_keep_alive(registry: Arc<JobRegistry>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so keep-alives start
            // one full period after spawn.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.broadcast_keep_alive().await;
            }
        })
    }

    /// Progress sink bound to one job.
    ///
    /// Reports are queued and applied to the registry in send order by a
    /// single forwarding task, so subscriber streams preserve the pipeline's
    /// reporting order. Await [`RegistrySink::finish`] before broadcasting
    /// the job's terminal event to ensure every queued update lands first.
    pub fn progress_sink(self: &Arc<Self>, job_id: &str) -> RegistrySink {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let registry = Arc::clone(self);
        let job_id = job_id.to_string();
        let task = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                registry.report_progress(&job_id, update).await;
            }
        });
        RegistrySink { tx, task }
    }

    /// Deliver an event to a job's subscribers, pruning any whose receiver
    /// has been dropped. Caller holds the write lock.
    fn broadcast(inner: &mut RegistryInner, job_id: &str, event: JobEvent) {
        if let Some(subscribers) = inner.streams.get_mut(job_id) {
            subscribers.retain(|subscriber| subscriber.tx.send(event.clone()).is_ok());
        }
    }

    /// Drop every subscriber of a job, closing their streams.
    fn close_streams(inner: &mut RegistryInner, job_id: &str) {
        inner.streams.remove(job_id);
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Channel-backed [`ProgressSink`] bound to one registry job.
pub struct RegistrySink {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
    task: JoinHandle<()>,
}

impl RegistrySink {
    /// Close the sink and wait until every queued update has been applied.
    pub async fn finish(self) {
        drop(self.tx);
        let _ = self.task.await;
    }
}

impl ProgressSink for RegistrySink {
    fn report(&self, update: ProgressUpdate) {
        let _ = self.tx.send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{Phase, ProgressStatus};

    fn progress(message: &str) -> ProgressUpdate {
        ProgressUpdate::new(Phase::Transcribe, message)
    }

    fn completion() -> JobCompletion {
        JobCompletion {
            file_name: "meeting.mp3".to_string(),
            model: "gemini-2.5-pro".to_string(),
        }
    }

    #[tokio::test]
    async fn create_makes_job_resolvable() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        assert!(registry.exists(&id).await);
        assert!(!registry.exists("no-such-job").await);
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[tokio::test]
    async fn subscribers_observe_progress_in_order_then_one_terminal() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        let mut first = registry.attach(&id).await.unwrap();
        let mut second = registry.attach(&id).await.unwrap();

        for message in ["one", "two", "three"] {
            registry.report_progress(&id, progress(message)).await;
        }
        registry.complete(&id, completion()).await;

        for subscription in [&mut first, &mut second] {
            for expected in ["one", "two", "three"] {
                match subscription.next_event().await {
                    Some(JobEvent::Progress(update)) => assert_eq!(update.message, expected),
                    other => panic!("expected progress {expected:?}, got {other:?}"),
                }
            }
            match subscription.next_event().await {
                Some(JobEvent::Completed(meta)) => assert_eq!(meta.file_name, "meeting.mp3"),
                other => panic!("expected completed, got {other:?}"),
            }
            assert!(subscription.next_event().await.is_none());
        }
        assert!(!registry.exists(&id).await);
    }

    #[tokio::test]
    async fn attach_to_unknown_job_returns_none() {
        let registry = JobRegistry::new();
        assert!(registry.attach("missing").await.is_none());
    }

    #[tokio::test]
    async fn late_attach_replays_only_latest_progress() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        registry.report_progress(&id, progress("first")).await;
        registry.report_progress(&id, progress("second")).await;

        let mut subscription = registry.attach(&id).await.unwrap();
        match subscription.next_event().await {
            Some(JobEvent::Progress(update)) => {
                assert_eq!(update.message, "second");
                assert!(update.timestamp.is_some());
            }
            other => panic!("expected replayed progress, got {other:?}"),
        }

        registry.report_progress(&id, progress("third")).await;
        match subscription.next_event().await {
            Some(JobEvent::Progress(update)) => assert_eq!(update.message, "third"),
            other => panic!("expected live progress, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn attach_after_terminal_status_delivers_terminal_and_closes() {
        let registry = JobRegistry::new();
        let done = registry.create().await;
        registry.set_status(&done, JobStatus::Completed, None).await;
        let mut subscription = registry.attach(&done).await.unwrap();
        match subscription.next_event().await {
            Some(JobEvent::Completed(meta)) => assert_eq!(meta, JobCompletion::default()),
            other => panic!("expected completed, got {other:?}"),
        }
        assert!(subscription.next_event().await.is_none());

        let failed = registry.create().await;
        registry.set_status(&failed, JobStatus::Failed, None).await;
        let mut subscription = registry.attach(&failed).await.unwrap();
        match subscription.next_event().await {
            Some(JobEvent::JobError(failure)) => {
                assert_eq!(failure.message, "Unknown transcription failure");
            }
            other => panic!("expected job-error, got {other:?}"),
        }
        assert!(subscription.next_event().await.is_none());
    }

    #[tokio::test]
    async fn fail_broadcasts_error_and_removes_job() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        let mut subscription = registry.attach(&id).await.unwrap();

        registry.report_progress(&id, progress("working")).await;
        registry.fail(&id, "Gemini API error (500): upstream").await;

        assert!(matches!(
            subscription.next_event().await,
            Some(JobEvent::Progress(_))
        ));
        match subscription.next_event().await {
            Some(JobEvent::JobError(failure)) => {
                assert_eq!(failure.message, "Gemini API error (500): upstream");
            }
            other => panic!("expected job-error, got {other:?}"),
        }
        assert!(subscription.next_event().await.is_none());
        assert!(!registry.exists(&id).await);
    }

    #[tokio::test]
    async fn operations_on_missing_jobs_are_noops() {
        let registry = JobRegistry::new();
        registry.report_progress("ghost", progress("ignored")).await;
        registry.set_status("ghost", JobStatus::Processing, None).await;
        registry.complete("ghost", completion()).await;
        registry.fail("ghost", "ignored").await;
        assert!(!registry.exists("ghost").await);
    }

    #[tokio::test]
    async fn second_terminal_is_a_noop() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        let mut subscription = registry.attach(&id).await.unwrap();

        registry.complete(&id, completion()).await;
        registry.fail(&id, "too late").await;

        assert!(matches!(
            subscription.next_event().await,
            Some(JobEvent::Completed(_))
        ));
        assert!(subscription.next_event().await.is_none());
    }

    #[tokio::test]
    async fn detach_closes_the_subscription() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        let mut subscription = registry.attach(&id).await.unwrap();

        registry.detach(&subscription).await;
        registry.report_progress(&id, progress("after detach")).await;

        assert!(subscription.next_event().await.is_none());
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned_on_broadcast() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        let mut live = registry.attach(&id).await.unwrap();
        let dead = registry.attach(&id).await.unwrap();
        drop(dead);

        registry.report_progress(&id, progress("still flowing")).await;
        registry.complete(&id, completion()).await;

        assert!(matches!(
            live.next_event().await,
            Some(JobEvent::Progress(_))
        ));
        assert!(matches!(
            live.next_event().await,
            Some(JobEvent::Completed(_))
        ));
    }

    #[tokio::test]
    async fn keep_alive_reaches_live_subscribers() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        let mut subscription = registry.attach(&id).await.unwrap();

        registry.broadcast_keep_alive().await;
        assert_eq!(subscription.next_event().await, Some(JobEvent::KeepAlive));
    }

    #[tokio::test]
    async fn registry_sink_applies_updates_in_send_order() {
        let registry = Arc::new(JobRegistry::new());
        let id = registry.create().await;
        let mut subscription = registry.attach(&id).await.unwrap();

        let sink = registry.progress_sink(&id);
        for message in ["a", "b", "c"] {
            sink.report(progress(message));
        }
        sink.finish().await;
        registry.complete(&id, completion()).await;

        for expected in ["a", "b", "c"] {
            match subscription.next_event().await {
                Some(JobEvent::Progress(update)) => assert_eq!(update.message, expected),
                other => panic!("expected progress {expected:?}, got {other:?}"),
            }
        }
        assert!(matches!(
            subscription.next_event().await,
            Some(JobEvent::Completed(_))
        ));
    }

    #[tokio::test]
    async fn progress_updates_are_timestamped() {
        let registry = JobRegistry::new();
        let id = registry.create().await;
        let mut subscription = registry.attach(&id).await.unwrap();

        let update = progress("stamped")
            .with_status(ProgressStatus::Start)
            .with_segments(3, 0);
        assert!(update.timestamp.is_none());
        registry.report_progress(&id, update).await;

        match subscription.next_event().await {
            Some(JobEvent::Progress(received)) => assert!(received.timestamp.is_some()),
            other => panic!("expected progress, got {other:?}"),
        }
    }

    #[test]
    fn events_serialize_with_wire_names() {
        let completed = JobEvent::Completed(completion());
        let value = serde_json::to_value(&completed).unwrap();
        assert_eq!(value["event"], "completed");
        assert_eq!(value["data"]["fileName"], "meeting.mp3");
        assert_eq!(value["data"]["model"], "gemini-2.5-pro");

        let progress = JobEvent::Progress(
            ProgressUpdate::new(Phase::Format, "Generating subtitle output")
                .with_format(crate::config::OutputFormat::Subtitle),
        );
        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["event"], "progress");
        assert_eq!(value["data"]["format"], "subtitle");

        let failure = JobEvent::JobError(JobFailure {
            message: "boom".to_string(),
            timestamp: Utc::now(),
        });
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["event"], "job-error");
        assert_eq!(value["data"]["message"], "boom");

        let keep_alive = serde_json::to_value(&JobEvent::KeepAlive).unwrap();
        assert_eq!(keep_alive["event"], "keep-alive");
    }
}
