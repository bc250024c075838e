//! Job host: a single pending-job queue drained by one worker task.
//!
//! Callers submit whole-document classification jobs and get an id back
//! immediately. The worker runs jobs one at a time in submission order,
//! records their outcome on a shared status board, and delivers results to
//! the webhook channel when a job asks for it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use threatscan_ai::{LanguageModel, classify};
use threatscan_core::{ClassifierConfig, ClassifyReport};
use threatscan_store::ResultStore;
use threatscan_sync::{Channel, ResultPusher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("job queue is shut down")]
    QueueClosed,
    #[error("job worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Pending,
    InProgress,
    Complete {
        report: ClassifyReport,
        /// `Some(true)` once pushed to the webhook, `Some(false)` if delivery
        /// was requested but failed, `None` if not requested.
        delivered: Option<bool>,
    },
    Failed {
        error: String,
    },
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    /// Position in submission order.
    pub seq: u64,
    pub source_id: String,
    pub channel: Option<Channel>,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct Job {
    id: JobId,
    source_id: String,
    channel: Option<Channel>,
}

/// Every submitted job, kept until [`JobQueue::prune_finished`] removes it.
/// Short-lived callers such as `threatscan batch` never prune.
type Board = Arc<Mutex<HashMap<JobId, JobRecord>>>;

fn lock(board: &Board) -> MutexGuard<'_, HashMap<JobId, JobRecord>> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running job queue.
pub struct JobQueue {
    tx: Option<mpsc::UnboundedSender<Job>>,
    board: Board,
    next_seq: AtomicU64,
    worker: JoinHandle<()>,
}

impl JobQueue {
    /// Spawn the worker. Must be called within a tokio runtime.
    ///
    /// The configuration is captured by value: later changes only apply to a
    /// queue started with the new value.
    pub fn start(
        config: ClassifierConfig,
        model: Arc<dyn LanguageModel>,
        store: ResultStore,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let board: Board = Arc::default();
        let pusher = config.webhook_url.clone().map(ResultPusher::new);

        let worker = Worker {
            config,
            model,
            store,
            pusher,
            board: Arc::clone(&board),
        };
        let worker = tokio::spawn(worker.run(rx));

        Self {
            tx: Some(tx),
            board,
            next_seq: AtomicU64::new(0),
            worker,
        }
    }

    /// Queue a classification job. Returns at once with the job pending.
    pub fn submit(&self, source_id: &str, channel: Option<Channel>) -> Result<JobId, HostError> {
        let tx = self.tx.as_ref().ok_or(HostError::QueueClosed)?;
        let id = Uuid::new_v4();
        lock(&self.board).insert(
            id,
            JobRecord {
                id,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                source_id: source_id.to_string(),
                channel,
                state: JobState::Pending,
                submitted_at: Utc::now(),
                finished_at: None,
            },
        );

        let job = Job {
            id,
            source_id: source_id.to_string(),
            channel,
        };
        if tx.send(job).is_err() {
            lock(&self.board).remove(&id);
            return Err(HostError::QueueClosed);
        }
        info!(%id, source_id, "job queued");
        Ok(id)
    }

    pub fn status(&self, id: &JobId) -> Option<JobRecord> {
        lock(&self.board).get(id).cloned()
    }

    /// All known jobs in submission order.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = lock(&self.board).values().cloned().collect();
        jobs.sort_by_key(|j| j.seq);
        jobs
    }

    /// Drop complete and failed records from the board. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut board = lock(&self.board);
        let before = board.len();
        board.retain(|_, record| !record.state.is_finished());
        before - board.len()
    }

    /// Stop accepting jobs, wait for queued ones to finish, and return the board.
    pub async fn shutdown(mut self) -> Result<Vec<JobRecord>, HostError> {
        self.tx.take();
        (&mut self.worker).await?;
        Ok(self.snapshot())
    }
}

struct Worker {
    config: ClassifierConfig,
    model: Arc<dyn LanguageModel>,
    store: ResultStore,
    pusher: Option<ResultPusher>,
    board: Board,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = rx.recv().await {
            self.process(job).await;
        }
        info!("job queue drained, worker exiting");
    }

    async fn process(&self, job: Job) {
        self.set_state(&job.id, JobState::InProgress);
        info!(id = %job.id, source_id = %job.source_id, "job started");

        let state = match classify(&job.source_id, &self.config, self.model.as_ref(), &self.store)
            .await
        {
            Ok(report) => {
                let delivered = match job.channel {
                    Some(Channel::Webhook) => Some(self.deliver(&job, &report).await),
                    None => None,
                };
                info!(
                    id = %job.id,
                    verdicts = report.results.len(),
                    dropped_windows = report.dropped_windows,
                    cache_hit = report.cache_hit,
                    "job complete"
                );
                JobState::Complete { report, delivered }
            }
            Err(e) => {
                warn!(id = %job.id, error = %e, "job failed");
                JobState::Failed {
                    error: e.to_string(),
                }
            }
        };

        let mut board = lock(&self.board);
        if let Some(record) = board.get_mut(&job.id) {
            record.state = state;
            record.finished_at = Some(Utc::now());
        }
    }

    async fn deliver(&self, job: &Job, report: &ClassifyReport) -> bool {
        let Some(pusher) = &self.pusher else {
            warn!(id = %job.id, "webhook delivery requested but no webhook_url configured");
            return false;
        };
        match pusher
            .push(&job.id.to_string(), &job.source_id, &report.results)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(id = %job.id, url = pusher.url(), error = %e, "webhook delivery failed");
                false
            }
        }
    }

    fn set_state(&self, id: &JobId, state: JobState) {
        if let Some(record) = lock(&self.board).get_mut(id) {
            record.state = state;
        }
    }
}
