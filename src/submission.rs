//! Final score reporting to the tournament backend.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::court::StartingConfiguration;
use crate::error::{StorageError, SubmissionError};
use crate::game::{MatchEngine, format_duration};
use crate::storage::{
    KeyValueStore, PENDING_SUBMISSIONS_KEY, SUBMISSION_QUEUE_KEY, load_list, save_list,
};
use crate::transport::{HttpRequest, Method, Transport};
use crate::types::{GameMode, Player, Side};

pub const DEFAULT_REFEREE_ID: &str = "REF001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub left: u32,
    pub right: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePlayers {
    pub left: Vec<Player>,
    pub right: Vec<Player>,
}

/// Body of `POST {scores_endpoint}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub match_id: String,
    pub game_mode: GameMode,
    pub final_score: FinalScore,
    pub winner: Side,
    pub players: SidePlayers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_configuration: Option<StartingConfiguration>,
    /// `m:ss`
    pub game_duration: String,
    pub timestamp: DateTime<Utc>,
    pub referee_id: String,
}

impl SubmissionPayload {
    /// Builds the report for a completed game. `None` while the game is still open.
    pub fn from_engine(
        engine: &MatchEngine,
        referee_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Option<Self> {
        let result = engine.game_result()?;
        let state = engine.state();
        Some(Self {
            match_id: state.match_id.clone()?,
            game_mode: state.game_mode,
            final_score: FinalScore {
                left: result.left_score,
                right: result.right_score,
            },
            winner: result.winner,
            players: SidePlayers {
                left: state.teams.left.players.clone(),
                right: state.teams.right.players.clone(),
            },
            starting_configuration: engine.starting_configuration(),
            game_duration: format_duration(engine.game_duration()),
            timestamp: completed_at,
            referee_id: referee_id.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub success: bool,
    pub submission_id: Option<String>,
}

/// Where final scores go.
pub trait SubmissionSink {
    fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmissionError>;

    fn is_online(&self) -> bool {
        true
    }
}

impl<S: SubmissionSink + ?Sized> SubmissionSink for &S {
    fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmissionError> {
        (**self).submit(payload)
    }

    fn is_online(&self) -> bool {
        (**self).is_online()
    }
}

/// Accepts everything unless told otherwise. Queued outcomes are consumed one per
/// submit call; an empty script means success.
#[derive(Debug)]
pub struct DemoSubmissionSink {
    script: RefCell<VecDeque<Result<(), SubmissionError>>>,
    submitted: RefCell<Vec<SubmissionPayload>>,
    online: Cell<bool>,
}

impl Default for DemoSubmissionSink {
    fn default() -> Self {
        Self {
            script: RefCell::default(),
            submitted: RefCell::default(),
            online: Cell::new(true),
        }
    }
}

impl DemoSubmissionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: Vec<Result<(), SubmissionError>>) -> Self {
        Self {
            script: RefCell::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.set(online);
    }

    pub fn push_outcome(&self, outcome: Result<(), SubmissionError>) {
        self.script.borrow_mut().push_back(outcome);
    }

    /// Payloads accepted so far.
    pub fn submitted(&self) -> Vec<SubmissionPayload> {
        self.submitted.borrow().clone()
    }
}

impl SubmissionSink for DemoSubmissionSink {
    fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmissionError> {
        if !self.online.get() {
            return Err(SubmissionError::Network("device is offline".to_string()));
        }
        self.script.borrow_mut().pop_front().unwrap_or(Ok(()))?;

        let mut submitted = self.submitted.borrow_mut();
        submitted.push(payload.clone());
        Ok(SubmissionReceipt {
            success: true,
            submission_id: Some(format!("DEMO-{:04}", submitted.len())),
        })
    }

    fn is_online(&self) -> bool {
        self.online.get()
    }
}

/// Posts payloads to the tournament backend.
pub struct RemoteSubmissionSink<T> {
    transport: T,
    endpoint: String,
    timeout: Duration,
    token: Option<String>,
}

impl<T: Transport> RemoteSubmissionSink<T> {
    pub fn new(transport: T, api: &ApiConfig) -> Self {
        Self {
            transport,
            endpoint: api.scores_endpoint.clone(),
            timeout: Duration::from_millis(api.timeout_ms),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl<T: Transport> SubmissionSink for RemoteSubmissionSink<T> {
    fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmissionError> {
        let body = serde_json::to_string(payload)
            .map_err(|err| SubmissionError::Unknown(err.to_string()))?;
        let request = HttpRequest {
            method: Method::Post,
            url: self.endpoint.clone(),
            bearer_token: self.token.clone(),
            body: Some(body),
            timeout: self.timeout,
        };

        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(SubmissionError::from_status(response.status));
        }
        let accepted = SubmissionReceipt {
            success: true,
            submission_id: None,
        };
        if response.body.trim().is_empty() {
            return Ok(accepted);
        }
        // A 2xx means the score landed even if the body is unreadable.
        match serde_json::from_str(&response.body) {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                warn!(
                    "HTTP {} for {} with unreadable body, treating as accepted: {err}",
                    response.status, payload.match_id
                );
                Ok(accepted)
            }
        }
    }

    fn is_online(&self) -> bool {
        self.transport.is_online()
    }
}

/// Waiting for connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedSubmission {
    #[serde(flatten)]
    pub payload: SubmissionPayload,
    pub queued_at: DateTime<Utc>,
}

/// Gave up after every attempt; kept for a manual retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub id: String,
    #[serde(flatten)]
    pub payload: SubmissionPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionStatus {
    Submitted,
    Queued,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub match_id: String,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Tally from draining the queue or retrying pending entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    pub processed: usize,
    pub successful: usize,
}

/// Sends final scores, retrying and falling back to local storage.
pub struct ScoreSubmitter<K, S> {
    store: K,
    sink: S,
    retry_attempts: u32,
    audit: Vec<AuditEntry>,
}

impl<K: KeyValueStore, S: SubmissionSink> ScoreSubmitter<K, S> {
    pub fn new(store: K, sink: S, retry_attempts: u32) -> Self {
        Self {
            store,
            sink,
            retry_attempts: retry_attempts.max(1),
            audit: Vec::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut K {
        &mut self.store
    }

    /// Reports a finished game: queued when offline, otherwise sent with retries.
    /// A final failure lands in the pending list.
    pub fn submit_on_game_end(
        &mut self,
        payload: SubmissionPayload,
    ) -> Result<SubmissionStatus, StorageError> {
        if !self.sink.is_online() {
            self.queue(payload)?;
            return Ok(SubmissionStatus::Queued);
        }

        match self.submit_with_retry(&payload) {
            Ok(receipt) => {
                self.record_success(&payload.match_id, receipt.submission_id);
                Ok(SubmissionStatus::Submitted)
            }
            Err(err) => {
                self.record_failure(&payload.match_id, &err);
                self.save_pending(payload, Some(&err))?;
                Ok(SubmissionStatus::Failed)
            }
        }
    }

    /// Up to `retry_attempts` tries; returns the last error when all fail.
    pub fn submit_with_retry(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut attempt = 1;
        loop {
            match self.send(payload) {
                Ok(receipt) => {
                    info!(
                        "score for {} submitted on attempt {attempt} ({})",
                        payload.match_id,
                        receipt.submission_id.as_deref().unwrap_or("no id")
                    );
                    return Ok(receipt);
                }
                Err(err) if attempt < self.retry_attempts => {
                    warn!(
                        "submission attempt {attempt}/{} for {} failed: {err}",
                        self.retry_attempts, payload.match_id
                    );
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        "submission for {} failed after {attempt} attempts: {} ({})",
                        payload.match_id,
                        err.operator_message(),
                        err.code()
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Adds `payload` to the offline queue, replacing an earlier entry for the same match.
    pub fn queue(&mut self, payload: SubmissionPayload) -> Result<(), StorageError> {
        let mut queue: Vec<QueuedSubmission> = load_list(&self.store, SUBMISSION_QUEUE_KEY)?;
        queue.retain(|entry| entry.payload.match_id != payload.match_id);
        warn!(
            "queued score for {} ({} waiting)",
            payload.match_id,
            queue.len() + 1
        );
        self.audit.push(AuditEntry {
            match_id: payload.match_id.clone(),
            status: SubmissionStatus::Queued,
            submission_id: None,
            error_code: None,
            error: None,
            timestamp: Utc::now(),
        });
        queue.push(QueuedSubmission {
            payload,
            queued_at: Utc::now(),
        });
        save_list(&mut self.store, SUBMISSION_QUEUE_KEY, &queue)
    }

    /// Sends every queued entry once, in order. Only confirmed successes leave the queue.
    pub fn process_queue(&mut self) -> Result<RetryReport, StorageError> {
        let queue: Vec<QueuedSubmission> = load_list(&self.store, SUBMISSION_QUEUE_KEY)?;
        let mut report = RetryReport::default();
        let mut remaining = Vec::new();

        for entry in queue {
            report.processed += 1;
            match self.send(&entry.payload) {
                Ok(receipt) => {
                    report.successful += 1;
                    self.record_success(&entry.payload.match_id, receipt.submission_id);
                }
                Err(err) => {
                    self.record_failure(&entry.payload.match_id, &err);
                    remaining.push(entry);
                }
            }
        }

        save_list(&mut self.store, SUBMISSION_QUEUE_KEY, &remaining)?;
        info!(
            "processed {} queued submission(s), {} succeeded",
            report.processed, report.successful
        );
        Ok(report)
    }

    /// Stores a failed submission for manual retry, one entry per match.
    pub fn save_pending(
        &mut self,
        payload: SubmissionPayload,
        err: Option<&SubmissionError>,
    ) -> Result<(), StorageError> {
        let mut pending: Vec<PendingSubmission> =
            load_list(&self.store, PENDING_SUBMISSIONS_KEY)?;
        let entry = PendingSubmission {
            id: format!("PENDING-{}", Utc::now().timestamp_millis()),
            error_code: err.map(|err| err.code().to_string()),
            payload,
        };
        match pending
            .iter_mut()
            .find(|existing| existing.payload.match_id == entry.payload.match_id)
        {
            Some(existing) => *existing = entry,
            None => pending.push(entry),
        }
        save_list(&mut self.store, PENDING_SUBMISSIONS_KEY, &pending)
    }

    /// Resends every pending entry once. Successes are dropped from the list.
    pub fn retry_pending(&mut self) -> Result<RetryReport, StorageError> {
        let pending: Vec<PendingSubmission> = load_list(&self.store, PENDING_SUBMISSIONS_KEY)?;
        let mut report = RetryReport::default();
        let mut remaining = Vec::new();

        for mut entry in pending {
            report.processed += 1;
            match self.submit_with_retry(&entry.payload) {
                Ok(receipt) => {
                    report.successful += 1;
                    self.record_success(&entry.payload.match_id, receipt.submission_id);
                }
                Err(err) => {
                    self.record_failure(&entry.payload.match_id, &err);
                    entry.error_code = Some(err.code().to_string());
                    remaining.push(entry);
                }
            }
        }

        save_list(&mut self.store, PENDING_SUBMISSIONS_KEY, &remaining)?;
        Ok(report)
    }

    pub fn pending(&self) -> Result<Vec<PendingSubmission>, StorageError> {
        load_list(&self.store, PENDING_SUBMISSIONS_KEY)
    }

    pub fn queued(&self) -> Result<Vec<QueuedSubmission>, StorageError> {
        load_list(&self.store, SUBMISSION_QUEUE_KEY)
    }

    pub fn is_queued(&self, match_id: &str) -> Result<bool, StorageError> {
        Ok(self
            .queued()?
            .iter()
            .any(|entry| entry.payload.match_id == match_id))
    }

    pub fn clear_queue(&mut self) {
        self.store.remove(SUBMISSION_QUEUE_KEY);
    }

    pub fn clear_pending(&mut self) {
        self.store.remove(PENDING_SUBMISSIONS_KEY);
    }

    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit
    }

    /// One submit call. A receipt without `success` counts as a failure.
    fn send(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, SubmissionError> {
        let receipt = self.sink.submit(payload)?;
        if receipt.success {
            Ok(receipt)
        } else {
            Err(SubmissionError::NotConfirmed)
        }
    }

    fn record_success(&mut self, match_id: &str, submission_id: Option<String>) {
        self.audit.push(AuditEntry {
            match_id: match_id.to_string(),
            status: SubmissionStatus::Submitted,
            submission_id,
            error_code: None,
            error: None,
            timestamp: Utc::now(),
        });
    }

    fn record_failure(&mut self, match_id: &str, err: &SubmissionError) {
        self.audit.push(AuditEntry {
            match_id: match_id.to_string(),
            status: SubmissionStatus::Failed,
            submission_id: None,
            error_code: Some(err.code()),
            error: Some(err.operator_message()),
            timestamp: Utc::now(),
        });
    }
}
