//! Feedback orchestration service.
//!
//! Owns the at-most-one-in-flight guarantee per entry: a watch channel is
//! reserved under a registry lock before anything is persisted or spawned,
//! so two overlapping requests for the same entry can never race into two
//! generation tasks.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{Entry, EntryId, Feedback, FeedbackError, FeedbackResult, FeedbackStatus, RetrySettings};
use journal::JournalStore;
use llm::{LlmProvider, LlmRequest};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::backoff::delay_for_attempt;
use crate::prompt::{build_prompt, SYSTEM_PROMPT};

type InFlightRegistry = Arc<Mutex<HashMap<EntryId, watch::Receiver<FeedbackStatus>>>>;

/// Orchestrates AI feedback generation for journal entries.
///
/// Cheap to clone; clones share the store, provider, and in-flight registry.
#[derive(Clone)]
pub struct FeedbackService {
    store: Arc<JournalStore>,
    provider: Arc<dyn LlmProvider>,
    retry: RetrySettings,
    profile_context: Option<String>,
    in_flight: InFlightRegistry,
}

impl FeedbackService {
    pub fn new(store: Arc<JournalStore>, provider: Arc<dyn LlmProvider>, retry: RetrySettings) -> Self {
        Self {
            store,
            provider,
            retry,
            profile_context: None,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Attach a per-user profile blurb included in every prompt.
    pub fn with_profile_context(mut self, profile_context: Option<String>) -> Self {
        self.profile_context = profile_context.filter(|c| !c.is_empty());
        self
    }

    /// Submit a generation request for an entry and return immediately.
    ///
    /// On success the returned record is `Pending` and a background task owns
    /// the generation attempt. Requesting again while an attempt is in flight
    /// joins it instead of starting a second one; requesting after a terminal
    /// state resets the record and generates anew.
    pub async fn request_feedback(&self, entry_id: EntryId) -> FeedbackResult<Feedback> {
        self.request_feedback_with_context(entry_id, None).await
    }

    /// Like [`request_feedback`](Self::request_feedback), with an extra
    /// caller-supplied context block appended to the prompt.
    pub async fn request_feedback_with_context(
        &self,
        entry_id: EntryId,
        auxiliary_context: Option<&str>,
    ) -> FeedbackResult<Feedback> {
        let entry = self
            .store
            .get_entry(&entry_id)
            .await?
            .ok_or(FeedbackError::EntryNotFound(entry_id))?;
        entry.validate_for_prompt()?;

        let request = self.build_request(&entry, auxiliary_context);

        // Reserve the in-flight slot before touching the store. Whoever wins
        // this insert is the only caller allowed to spawn.
        let tx = {
            let mut registry = self.in_flight.lock();
            if registry.contains_key(&entry_id) {
                None
            } else {
                let (tx, rx) = watch::channel(FeedbackStatus::Pending);
                registry.insert(entry_id, rx);
                Some(tx)
            }
        };

        let Some(tx) = tx else {
            debug!(entry_id = %entry_id, "Joining in-flight feedback generation");
            return match self.store.get_feedback(&entry_id).await? {
                Some(record) => Ok(record),
                // The winner holds the slot but has not committed the row
                // yet; hand back a pending handle rather than a rejection.
                None => Ok(Feedback::pending(entry_id)),
            };
        };

        let feedback = match self.store.upsert_pending_feedback(&entry_id).await {
            Ok(feedback) => feedback,
            Err(err) => {
                self.in_flight.lock().remove(&entry_id);
                return Err(FeedbackError::Persistence(err));
            }
        };

        info!(
            entry_id = %entry_id,
            provider = %self.provider.id(),
            "Starting feedback generation"
        );

        let store = Arc::clone(&self.store);
        let provider = Arc::clone(&self.provider);
        let retry = self.retry;
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            let outcome = run_generation(&store, provider.as_ref(), &retry, request, entry_id, &tx).await;
            in_flight.lock().remove(&entry_id);
            if let Err(err) = outcome {
                error!(entry_id = %entry_id, error = %err, "Feedback generation task failed to persist a terminal state");
            }
        });

        Ok(feedback)
    }

    /// Current feedback record for an entry, if one was ever requested.
    pub async fn get_feedback(&self, entry_id: EntryId) -> FeedbackResult<Option<Feedback>> {
        Ok(self.store.get_feedback(&entry_id).await?)
    }

    /// Block until the in-flight generation for `entry_id` reaches a terminal
    /// state, then return the stored record. Returns immediately when nothing
    /// is in flight and a record already exists.
    pub async fn wait_for(&self, entry_id: EntryId) -> FeedbackResult<Feedback> {
        let receiver = {
            let registry = self.in_flight.lock();
            registry.get(&entry_id).cloned()
        };

        if let Some(mut rx) = receiver {
            if rx.wait_for(|status| status.is_terminal()).await.is_err() {
                // Sender dropped without a terminal send: the task panicked
                // or hit a persistence failure before it could report.
                return Err(FeedbackError::Persistence(anyhow::anyhow!(
                    "generation task ended without recording a terminal status for entry {entry_id}"
                )));
            }
        }

        self.store
            .get_feedback(&entry_id)
            .await?
            .ok_or(FeedbackError::NotRequested(entry_id))
    }

    fn build_request(&self, entry: &Entry, auxiliary_context: Option<&str>) -> LlmRequest {
        let prompt = build_prompt(entry, self.profile_context.as_deref(), auxiliary_context);
        LlmRequest::new(&prompt).with_system_prompt(SYSTEM_PROMPT)
    }
}

/// Drive one generation attempt chain to a terminal state.
///
/// Provider failures are absorbed here and retried with exponential backoff;
/// only persistence failures escape. A terminal status is always broadcast on
/// `tx` when persistence succeeded.
async fn run_generation(
    store: &JournalStore,
    provider: &dyn LlmProvider,
    retry: &RetrySettings,
    request: LlmRequest,
    entry_id: EntryId,
    tx: &watch::Sender<FeedbackStatus>,
) -> anyhow::Result<()> {
    let provider_id = provider.id();
    let mut last_error: Option<llm::ProviderError> = None;

    for attempt in 1..=retry.max_attempts {
        match provider.generate(request.clone()).await {
            Ok(response) => {
                store
                    .complete_feedback(
                        &entry_id,
                        &response.content,
                        &provider_id.provider,
                        &response.model,
                        response.tokens_used,
                        response.generation_time,
                    )
                    .await?;
                let _ = tx.send(FeedbackStatus::Completed);
                info!(
                    entry_id = %entry_id,
                    attempt,
                    tokens = ?response.tokens_used,
                    "Feedback generation completed"
                );
                return Ok(());
            }
            Err(err) => {
                if attempt < retry.max_attempts {
                    let delay = delay_for_attempt(retry, attempt);
                    warn!(
                        entry_id = %entry_id,
                        attempt,
                        error = %err,
                        delay_secs = delay.as_secs(),
                        "Generation attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    error!(
                        entry_id = %entry_id,
                        attempt,
                        error = %err,
                        "Generation attempt failed, retry budget exhausted"
                    );
                }
                last_error = Some(err);
            }
        }
    }

    let message = last_error
        .map(|err| err.to_string())
        .unwrap_or_else(|| "no generation attempts were made".to_string());
    store.fail_feedback(&entry_id, &message).await?;
    let _ = tx.send(FeedbackStatus::Failed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use llm::{LlmResponse, ProviderError, ProviderId};

    use super::*;

    #[derive(Debug)]
    struct IdleProvider;

    #[async_trait]
    impl LlmProvider for IdleProvider {
        fn id(&self) -> ProviderId {
            ProviderId::new("idle", "idle-model")
        }

        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, ProviderError> {
            Err(ProviderError::new("idle", "should not be called"))
        }
    }

    // A request landing between another caller's slot reservation and its
    // pending-row write must get a pending handle, not a rejection.
    #[tokio::test]
    async fn test_join_before_row_commit_returns_pending_handle() {
        let store = Arc::new(JournalStore::in_memory().expect("in-memory store"));
        let entry = Entry::new(
            "tester",
            NaiveDate::from_ymd_opt(2025, 10, 21).expect("valid date"),
            420.0,
            35.5,
            9.0,
            6.5,
            6,
            "",
        );
        store.create_entry(&entry).await.expect("entry persists");

        let service = FeedbackService::new(
            Arc::clone(&store),
            Arc::new(IdleProvider),
            RetrySettings::default(),
        );
        let (_tx, rx) = watch::channel(FeedbackStatus::Pending);
        service.in_flight.lock().insert(entry.id, rx);

        let record = service
            .request_feedback(entry.id)
            .await
            .expect("pending handle");
        assert_eq!(record.status, FeedbackStatus::Pending);
        assert_eq!(record.entry_id, entry.id);
        assert!(store
            .get_feedback(&entry.id)
            .await
            .expect("readable")
            .is_none());
    }
}
