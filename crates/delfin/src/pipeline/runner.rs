use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDate};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::credentials::{self, CredentialError};
use crate::db::order_repo::{self, InsertOutcome};
use crate::db::{Database, DatabaseError};
use crate::extract::{example_order, CapturedImage, GeminiClient, OrderExtractor};
use crate::order::NewOrder;
use crate::reconcile::{reconcile_with, ReplaceDecision, Resolution};

use super::config::PipelineConfig;
use super::context::{CaptureSession, CaptureState, CommitOutcome, Review};
use super::error::PipelineError;
use super::notify::{
    Notifier, Severity, MSG_DUPLICATE_REJECTED, MSG_PREVIOUS_REMOVED, MSG_SAVED, MSG_SAVE_FAILED,
};

/// Sequences capture, extraction, review, reconciliation and commit.
///
/// Holds at most one capture session. A new capture is refused while the
/// current one is capturing, extracting or reconciling; a session waiting
/// for review is superseded.
pub struct CapturePipeline {
    db: Database,
    extractor: Option<OrderExtractor>,
    notifier: Arc<dyn Notifier>,
    session: Mutex<Option<CaptureSession>>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl CapturePipeline {
    /// Production constructor: resolves the API key and builds the Gemini
    /// client. Without any key the example record still works; captures
    /// fail with [`CredentialError::Missing`].
    pub fn from_config(
        config: &PipelineConfig,
        db: Database,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, PipelineError> {
        let extractor =
            match credentials::resolve_api_key(&db, config.default_api_key.as_deref()) {
                Ok(key) => {
                    let client = GeminiClient::new(config.gemini.clone(), key)?;
                    Some(OrderExtractor::new(Arc::new(client)))
                }
                Err(CredentialError::Missing) => {
                    warn!("No API key available; only the example order can be captured");
                    None
                }
                Err(e) => return Err(e.into()),
            };

        Ok(Self {
            db,
            extractor,
            notifier,
            session: Mutex::new(None),
        })
    }

    /// Constructor with an explicit extractor (any [`crate::InferenceClient`]).
    pub fn new(db: Database, extractor: OrderExtractor, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            extractor: Some(extractor),
            notifier,
            session: Mutex::new(None),
        }
    }

    /// Current state; `Idle` when there is no session.
    pub fn state(&self) -> CaptureState {
        self.session()
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(CaptureState::Idle)
    }

    /// The candidate waiting for review, if any.
    pub fn pending_review(&self) -> Option<Review> {
        let guard = self.session();
        let session = guard.as_ref()?;
        if session.state != CaptureState::ReviewPending {
            return None;
        }
        session.candidate.clone().map(|candidate| Review {
            token: session.token,
            candidate,
        })
    }

    /// Extracts a candidate from `image` and holds it for review.
    ///
    /// On failure the error is reported through the notifier and the
    /// pipeline returns to idle.
    pub async fn capture(&self, image: CapturedImage) -> Result<Review, PipelineError> {
        let token = self.begin(Some(image.reference().to_string()))?;
        let span = info_span!("capture", session = %token, image = %image.reference());
        self.run_capture(token, image).instrument(span).await
    }

    async fn run_capture(
        &self,
        token: Uuid,
        image: CapturedImage,
    ) -> Result<Review, PipelineError> {
        let Some(extractor) = self.extractor.as_ref() else {
            return Err(self.abort(token, CredentialError::Missing.into()));
        };

        self.transition(token, CaptureState::Extracting)?;
        match extractor.extract(&image, today()).await {
            Ok(candidate) => self.present(token, candidate),
            Err(e) => {
                warn!(error = %e, "extraction failed");
                Err(self.abort(token, e.into()))
            }
        }
    }

    /// Holds the fixed example order for review, without calling the model.
    pub fn capture_example(&self) -> Result<Review, PipelineError> {
        let token = self.begin(None)?;
        let _span = info_span!("capture_example", session = %token).entered();
        self.present(token, example_order(today()))
    }

    /// Saves the reviewed (possibly edited) candidate.
    ///
    /// Reconciles against a fresh snapshot of the store; `decision` is only
    /// consulted when the order number is already taken.
    pub fn save(
        &self,
        token: Uuid,
        edited: NewOrder,
        decision: &dyn ReplaceDecision,
    ) -> Result<CommitOutcome, PipelineError> {
        let candidate = {
            let mut guard = self.session();
            let session = match guard.as_mut() {
                Some(s) if s.token == token => s,
                _ => return Err(PipelineError::UnknownSession),
            };
            if session.state != CaptureState::ReviewPending {
                return Err(PipelineError::InvalidState {
                    state: session.state,
                });
            }
            session.state = CaptureState::Reconciling;

            let mut candidate = edited.normalized(today());
            if candidate.image_data.is_none() {
                candidate.image_data = session.image_ref.clone();
            }
            candidate
        };
        self.notifier.state_changed(CaptureState::Reconciling);

        let _span = info_span!(
            "save",
            session = %token,
            order_number = %candidate.order_number,
        )
        .entered();

        match self.commit(candidate, decision) {
            Ok(outcome) => {
                match &outcome {
                    CommitOutcome::Inserted { id } => {
                        info!(id, "order saved");
                        self.notifier.notify(Severity::Success, MSG_SAVED);
                        self.end(token, Some(CaptureState::Committed));
                    }
                    CommitOutcome::Replaced { id, removed } => {
                        info!(id, ?removed, "order replaced");
                        self.notifier.notify(Severity::Info, MSG_PREVIOUS_REMOVED);
                        self.notifier.notify(Severity::Success, MSG_SAVED);
                        self.end(token, Some(CaptureState::Committed));
                    }
                    CommitOutcome::Rejected => {
                        info!("duplicate declined");
                        self.notifier
                            .notify(Severity::Warning, MSG_DUPLICATE_REJECTED);
                        self.end(token, None);
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "commit failed");
                self.notifier.notify(Severity::Error, MSG_SAVE_FAILED);
                self.end(token, Some(CaptureState::Aborted));
                Err(e.into())
            }
        }
    }

    /// Drops the session and its candidate. Storage is untouched.
    /// Returns `false` when `token` is not the current session.
    pub fn discard(&self, token: Uuid) -> bool {
        let released = self.release(token);
        if released {
            debug!(session = %token, "capture discarded");
            self.notifier.state_changed(CaptureState::Idle);
        }
        released
    }

    fn commit(
        &self,
        candidate: NewOrder,
        decision: &dyn ReplaceDecision,
    ) -> Result<CommitOutcome, DatabaseError> {
        let snapshot = {
            let _step = info_span!("snapshot").entered();
            order_repo::get_all(&self.db)?
        };

        let _step = info_span!("commit").entered();
        match reconcile_with(candidate, &snapshot, decision) {
            Resolution::Insert(candidate) => match order_repo::insert_unique(&self.db, &candidate)? {
                InsertOutcome::Inserted(id) => Ok(CommitOutcome::Inserted { id }),
                // Stored by someone else after the snapshot was taken.
                InsertOutcome::Conflict(existing) => {
                    if decision.confirm_replace(&existing, &candidate) {
                        self.replace(existing.id, &candidate)
                    } else {
                        Ok(CommitOutcome::Rejected)
                    }
                }
            },
            Resolution::Replace { old_id, candidate } => self.replace(old_id, &candidate),
            Resolution::Reject => Ok(CommitOutcome::Rejected),
        }
    }

    fn replace(&self, old_id: i64, candidate: &NewOrder) -> Result<CommitOutcome, DatabaseError> {
        let replacement = order_repo::replace_order(&self.db, old_id, candidate)?;
        Ok(CommitOutcome::Replaced {
            id: replacement.id,
            removed: replacement.removed,
        })
    }

    fn session(&self) -> MutexGuard<'_, Option<CaptureSession>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self, image_ref: Option<String>) -> Result<Uuid, PipelineError> {
        let mut guard = self.session();
        if let Some(current) = guard.as_ref() {
            if current.state.is_busy() {
                return Err(PipelineError::Busy {
                    state: current.state,
                });
            }
            debug!(session = %current.token, "superseding pending review");
        }

        let session = CaptureSession::new(image_ref);
        let token = session.token;
        *guard = Some(session);
        drop(guard);

        self.notifier.state_changed(CaptureState::Capturing);
        Ok(token)
    }

    fn transition(&self, token: Uuid, state: CaptureState) -> Result<(), PipelineError> {
        {
            let mut guard = self.session();
            match guard.as_mut() {
                Some(s) if s.token == token => s.state = state,
                _ => return Err(PipelineError::UnknownSession),
            }
        }
        self.notifier.state_changed(state);
        Ok(())
    }

    fn present(&self, token: Uuid, candidate: NewOrder) -> Result<Review, PipelineError> {
        {
            let mut guard = self.session();
            match guard.as_mut() {
                Some(s) if s.token == token => {
                    s.state = CaptureState::ReviewPending;
                    s.candidate = Some(candidate.clone());
                }
                _ => return Err(PipelineError::UnknownSession),
            }
        }
        self.notifier.state_changed(CaptureState::ReviewPending);
        Ok(Review { token, candidate })
    }

    /// Reports `error`, ends the session as aborted and hands the error back.
    fn abort(&self, token: Uuid, error: PipelineError) -> PipelineError {
        self.notifier.notify(Severity::Error, &error.to_string());
        self.end(token, Some(CaptureState::Aborted));
        error
    }

    fn release(&self, token: Uuid) -> bool {
        let mut guard = self.session();
        if guard.as_ref().is_some_and(|s| s.token == token) {
            *guard = None;
            true
        } else {
            false
        }
    }

    fn end(&self, token: Uuid, terminal: Option<CaptureState>) {
        if !self.release(token) {
            return;
        }
        if let Some(state) = terminal {
            self.notifier.state_changed(state);
        }
        self.notifier.state_changed(CaptureState::Idle);
    }
}
