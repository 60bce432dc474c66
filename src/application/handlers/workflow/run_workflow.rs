//! Run workflow command handler.
//!
//! The orchestrator behind every user turn: validates the command,
//! resolves the session, asks the router for a plan, then walks the
//! planned stages in canonical order while checkpointing the run after
//! every transition so status polling always sees current progress.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::application::gateway::{CallFailure, CallGateway};
use crate::domain::extraction::{
    AggregationPolicy, EvidenceAggregator, FieldKind, FieldSpec, MergedField, MergedValue,
    PageCandidate, PreparedInput, Preprocessor, NOT_AVAILABLE,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, Percentage, RecordId, RunStatus, Score, SessionId, Stage, WorkflowId,
};
use crate::domain::routing::{Intent, Supervisor};
use crate::domain::session::{InteractionTurn, Session, SessionPatch};
use crate::domain::workflow::{RunError, RunErrorEntry, WorkflowRun};
use crate::ports::{
    CompletionError, CompletionService, PageCompletionRequest, RecordBundle, RecordSource,
    RecordSourceError, RunRegistry, SessionStore, SessionStoreError,
};

/// Upper bound on a user turn's message length, in characters.
pub const MAX_USER_MESSAGE_LENGTH: usize = 4000;

/// Field label the QA stage aggregates answer evidence under.
const QA_FIELD_LABEL: &str = "qa_answer";

/// Tuning knobs for workflow execution.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Sliding session lifetime, applied at creation and refreshed on
    /// every successful turn.
    ///
    /// Default: 3600 seconds
    pub session_ttl_secs: u64,

    /// Wall-clock budget for one fan-out stage. On expiry the stage
    /// keeps whatever pages already answered instead of failing.
    ///
    /// Default: 120 seconds
    pub stage_timeout: Duration,

    /// Pages sent to the completion service concurrently.
    ///
    /// Default: 4
    pub page_concurrency: usize,

    /// Minimum winning weight accepted during aggregation.
    ///
    /// Default: zero, any positive evidence is accepted
    pub acceptance_threshold: Score,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            session_ttl_secs: 3600,
            stage_timeout: Duration::from_secs(120),
            page_concurrency: 4,
            acceptance_threshold: Score::ZERO,
        }
    }
}

/// Command to run one workflow turn.
#[derive(Debug, Clone, Deserialize)]
pub struct RunWorkflowCommand {
    /// Upstream record the turn operates on.
    pub record_id: String,

    /// What the user asked for, in free text.
    pub user_message: String,

    /// Session to continue; None starts a fresh conversation.
    pub session_id: Option<String>,
}

/// Answer produced by the QA stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaAnswer {
    /// The question as asked.
    pub question: String,

    /// Best-evidence answer, or the sentinel when nothing usable won.
    pub answer: String,

    /// Weight of the winning evidence; zero for the sentinel.
    pub quality_score: Score,
}

/// Caller-facing outcome of one workflow turn.
///
/// Failed runs carry their errors and an empty response payload; the
/// partial stage outputs are deliberately not exposed.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub workflow_id: WorkflowId,
    pub session_id: Option<SessionId>,
    pub record_id: RecordId,
    pub intent: Intent,
    pub status: RunStatus,
    pub progress: Percentage,
    pub merged_fields: Vec<MergedField>,
    pub prefilled_fields: Vec<FieldSpec>,
    pub qa_answer: Option<QaAnswer>,
    pub errors: Vec<RunErrorEntry>,
}

/// What a stage produced: an output summary for the step record, or
/// the code and message that failed the run.
type StageOutcome = Result<serde_json::Value, (ErrorCode, String)>;

/// Data flowing between stages within one run.
///
/// Continuation turns seed this from the session so later stages can
/// run without their upstream stages being re-planned.
struct StageOutputs {
    bundle: Option<RecordBundle>,
    prepared: Option<PreparedInput>,
    merged: Vec<MergedField>,
    prefilled: Vec<FieldSpec>,
    qa_answer: Option<QaAnswer>,
}

impl StageOutputs {
    fn from_session(session: Option<&Session>) -> Self {
        Self {
            bundle: None,
            prepared: session.and_then(|s| s.input_snapshot().cloned()),
            merged: session.map(|s| s.last_response().to_vec()).unwrap_or_default(),
            prefilled: Vec::new(),
            qa_answer: None,
        }
    }
}

/// Handler for the run workflow command.
pub struct RunWorkflowHandler {
    session_store: Arc<dyn SessionStore>,
    record_source: Arc<dyn RecordSource>,
    completion_service: Arc<dyn CompletionService>,
    run_registry: Arc<dyn RunRegistry>,
    gateway: Arc<CallGateway>,
    settings: WorkflowSettings,
}

impl RunWorkflowHandler {
    /// Creates a new handler with its dependencies.
    pub fn new(
        session_store: Arc<dyn SessionStore>,
        record_source: Arc<dyn RecordSource>,
        completion_service: Arc<dyn CompletionService>,
        run_registry: Arc<dyn RunRegistry>,
        gateway: Arc<CallGateway>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            session_store,
            record_source,
            completion_service,
            run_registry,
            gateway,
            settings,
        }
    }

    /// Executes one workflow turn.
    ///
    /// Stage failures do not surface as handler errors: the run is
    /// failed, persisted, and reported through the result. `Err` is
    /// reserved for rejecting the command itself and for persistence
    /// failures before a run exists.
    ///
    /// # Errors
    ///
    /// - `InvalidRecordId` if the record ID is blank
    /// - `InvalidUserMessage` if the message is blank or too long
    /// - `SessionNotFound` if a given session ID is malformed, unknown,
    ///   or expired
    /// - `ValidationFailed` if the session belongs to another record
    /// - `StorageError` if the run registry rejects a checkpoint
    pub async fn handle(&self, command: RunWorkflowCommand) -> Result<WorkflowResult, DomainError> {
        // 1. Validate the command before any state exists.
        let record_id = RecordId::new(command.record_id.clone()).map_err(|_| {
            DomainError::new(ErrorCode::InvalidRecordId, "record_id must not be blank")
        })?;
        let user_message = command.user_message.trim().to_string();
        if user_message.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InvalidUserMessage,
                "user_message must not be blank",
            ));
        }
        if user_message.chars().count() > MAX_USER_MESSAGE_LENGTH {
            return Err(DomainError::new(
                ErrorCode::InvalidUserMessage,
                format!(
                    "user_message must be at most {} characters",
                    MAX_USER_MESSAGE_LENGTH
                ),
            ));
        }

        // 2. Resolve the session for continuation turns.
        let session = match &command.session_id {
            Some(raw) => Some(self.load_session(raw, &record_id).await?),
            None => None,
        };

        // 3. Ask the router for a plan.
        let decision = Supervisor::plan(&user_message, session.as_ref());
        tracing::info!(
            "Planned {} run for record {}: {}",
            decision.intent,
            record_id,
            decision.plan
        );

        // 4. Materialize the run and make it pollable before starting.
        let mut run = WorkflowRun::new(record_id.clone(), decision.plan.clone());
        if let Some(existing) = &session {
            run.attach_session(*existing.id());
        }
        self.checkpoint(&run).await?;
        run.start().map_err(into_internal)?;
        self.checkpoint(&run).await?;

        // 5. Walk the planned stages in canonical order. The first
        //    failed stage fails the run; later stages never start.
        let mut outputs = StageOutputs::from_session(session.as_ref());
        for stage in run.plan().stages().to_vec() {
            self.execute_stage(&mut run, &mut outputs, stage, &record_id, &user_message)
                .await?;
            if run.status() != RunStatus::InProgress {
                break;
            }
        }

        // 6. Fold the turn into the session, then close the run. A
        //    session write failure fails the run rather than leaving a
        //    completed run whose session silently lost the turn.
        if run.status() == RunStatus::InProgress {
            match self
                .persist_session(&run, session, &record_id, decision.intent, &user_message, &outputs)
                .await
            {
                Ok(session_id) => {
                    run.attach_session(session_id);
                    run.complete().map_err(into_internal)?;
                }
                Err(err) => {
                    tracing::error!("Session write failed after run {}: {}", run.id(), err);
                    run.fail(err.code(), err.to_string()).map_err(into_internal)?;
                }
            }
            self.checkpoint(&run).await?;
        }

        // 7. Shape the caller-facing result.
        let failed = run.status() == RunStatus::Failed;
        Ok(WorkflowResult {
            workflow_id: run.id(),
            session_id: run.session_id(),
            record_id,
            intent: decision.intent,
            status: run.status(),
            progress: run.progress_percentage(),
            merged_fields: if failed { Vec::new() } else { outputs.merged },
            prefilled_fields: if failed { Vec::new() } else { outputs.prefilled },
            qa_answer: if failed { None } else { outputs.qa_answer },
            errors: run.errors().to_vec(),
        })
    }

    // ───────────────────────────────────────────────────────────────
    // Session resolution and persistence
    // ───────────────────────────────────────────────────────────────

    /// Loads and checks the session named by a continuation turn.
    async fn load_session(&self, raw: &str, record_id: &RecordId) -> Result<Session, DomainError> {
        let session_id = raw.parse::<SessionId>().map_err(|_| {
            DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session '{}' not found", raw),
            )
        })?;
        let session = self.session_store.get(&session_id).await.map_err(|err| match err {
            SessionStoreError::NotFound(id) => DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session '{}' not found", id),
            ),
            other => DomainError::new(other.code(), other.to_string()),
        })?;
        if session.record_id() != record_id {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Session belongs to a different record",
            )
            .with_detail("session_record_id", session.record_id().as_str())
            .with_detail("record_id", record_id.as_str()));
        }
        Ok(session)
    }

    /// Writes the turn's outcome to the session, creating one for
    /// fresh conversations.
    async fn persist_session(
        &self,
        run: &WorkflowRun,
        session: Option<Session>,
        record_id: &RecordId,
        intent: Intent,
        user_message: &str,
        outputs: &StageOutputs,
    ) -> Result<SessionId, SessionStoreError> {
        let turn = InteractionTurn::new(
            user_message,
            response_summary(run, outputs),
            intent,
            run.id(),
        );
        let mut patch = SessionPatch::new(turn);
        if run.plan().contains(Stage::Preprocess) {
            if let Some(prepared) = &outputs.prepared {
                patch = patch.with_input_snapshot(prepared.clone());
            }
        }
        if run.plan().contains(Stage::Extract) {
            patch = patch.with_last_response(outputs.merged.clone());
        }
        for stage in run.plan().stages() {
            patch = patch.with_completed_stage(*stage);
        }

        match session {
            Some(existing) => {
                let session_id = *existing.id();
                self.session_store.update(&session_id, patch).await?;
                self.session_store
                    .touch_expiry(&session_id, self.settings.session_ttl_secs)
                    .await?;
                Ok(session_id)
            }
            None => {
                let mut fresh = Session::new(record_id.clone(), self.settings.session_ttl_secs);
                fresh
                    .apply_patch(patch)
                    .map_err(|err| SessionStoreError::InvalidState(err.to_string()))?;
                self.session_store.create(&fresh).await
            }
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Stage execution
    // ───────────────────────────────────────────────────────────────

    /// Runs one planned stage and records its outcome on the run.
    async fn execute_stage(
        &self,
        run: &mut WorkflowRun,
        outputs: &mut StageOutputs,
        stage: Stage,
        record_id: &RecordId,
        user_message: &str,
    ) -> Result<(), DomainError> {
        let input = step_input(outputs, stage, record_id, user_message);
        run.start_step(stage, Some(input)).map_err(into_internal)?;
        self.checkpoint(run).await?;

        let outcome = match stage {
            Stage::FetchRecord => self.fetch_record_stage(outputs, record_id).await,
            Stage::Preprocess => preprocess_stage(outputs),
            Stage::Extract => self.extract_stage(outputs, record_id).await,
            Stage::Prefill => prefill_stage(outputs),
            Stage::Qa => self.qa_stage(outputs, record_id, user_message).await,
        };

        match outcome {
            Ok(output) => {
                run.complete_step(stage, Some(output)).map_err(into_internal)?;
            }
            Err((code, message)) => {
                tracing::warn!("Stage {} failed run {}: {}", stage, run.id(), message);
                run.fail_step(stage, code, message).map_err(into_internal)?;
            }
        }
        self.checkpoint(run).await
    }

    /// Fetches the record bundle through the gateway.
    async fn fetch_record_stage(
        &self,
        outputs: &mut StageOutputs,
        record_id: &RecordId,
    ) -> StageOutcome {
        let call = self
            .gateway
            .submit("fetch_record", |_| {
                let source = Arc::clone(&self.record_source);
                let record_id = record_id.clone();
                async move { source.fetch_record(&record_id).await }
            })
            .await;

        match call.outcome {
            Ok(bundle) => {
                let output = serde_json::json!({
                    "documents": bundle.documents.len(),
                    "pages": bundle.total_pages(),
                    "field_specs": bundle.field_specs.len(),
                });
                outputs.bundle = Some(bundle);
                Ok(output)
            }
            Err(failure) => {
                let code = match &failure {
                    CallFailure::Timeout { .. } => ErrorCode::Timeout,
                    CallFailure::Upstream(RecordSourceError::NotFound(_)) => {
                        ErrorCode::RecordNotFound
                    }
                    CallFailure::Upstream(RecordSourceError::Timeout { .. }) => ErrorCode::Timeout,
                    CallFailure::Upstream(_) => ErrorCode::UpstreamError,
                };
                Err((code, failure.to_string()))
            }
        }
    }

    /// Fans page extraction out through the gateway and merges the
    /// evidence into one value per field.
    async fn extract_stage(
        &self,
        outputs: &mut StageOutputs,
        record_id: &RecordId,
    ) -> StageOutcome {
        let prepared = match &outputs.prepared {
            Some(prepared) => prepared,
            None => {
                return Err((
                    ErrorCode::WorkflowError,
                    "no prepared input available for extraction".to_string(),
                ))
            }
        };
        let specs = prepared.field_specs().to_vec();
        let candidates = self
            .fan_out_pages("extract_page", prepared, record_id, &specs, None)
            .await?;

        let policy = AggregationPolicy::new(self.settings.acceptance_threshold);
        let merged = EvidenceAggregator::merge_all(&specs, &candidates, &policy);
        let available = merged.iter().filter(|m| m.is_available()).count();
        let output = serde_json::json!({
            "candidates": candidates.len(),
            "fields": merged.len(),
            "available": available,
        });
        outputs.merged = merged;
        Ok(output)
    }

    /// Answers the user's question from page evidence.
    async fn qa_stage(
        &self,
        outputs: &mut StageOutputs,
        record_id: &RecordId,
        user_message: &str,
    ) -> StageOutcome {
        let prepared = match &outputs.prepared {
            Some(prepared) => prepared,
            None => {
                return Err((
                    ErrorCode::WorkflowError,
                    "no prepared input available for qa".to_string(),
                ))
            }
        };
        let spec = FieldSpec::new(QA_FIELD_LABEL, FieldKind::Textarea, false)
            .map_err(|err| (ErrorCode::InternalError, err.to_string()))?;
        let specs = vec![spec.clone()];
        let candidates = self
            .fan_out_pages("qa_page", prepared, record_id, &specs, Some(user_message))
            .await?;

        let policy = AggregationPolicy::new(self.settings.acceptance_threshold);
        let merged = EvidenceAggregator::merge_field(&spec, &candidates, &policy);
        let output = serde_json::json!({
            "available": merged.is_available(),
            "quality_score": merged.quality_score().value(),
            "source_page": merged.source_page(),
        });
        outputs.qa_answer = Some(QaAnswer {
            question: user_message.to_string(),
            answer: merged.value().as_str().to_string(),
            quality_score: merged.quality_score(),
        });
        Ok(output)
    }

    /// Sends every page to the completion service, bounded by the
    /// concurrency limit and the stage deadline.
    ///
    /// A terminal per-page failure fails the stage. Hitting the stage
    /// deadline does not: the pages that already answered are kept and
    /// aggregation proceeds on partial evidence.
    async fn fan_out_pages(
        &self,
        label: &str,
        prepared: &PreparedInput,
        record_id: &RecordId,
        specs: &[FieldSpec],
        question: Option<&str>,
    ) -> Result<Vec<PageCandidate>, (ErrorCode, String)> {
        let pages: Vec<(u32, String, Score)> = prepared
            .documents()
            .iter()
            .flat_map(|doc| doc.pages().iter())
            .enumerate()
            .map(|(index, page)| (index as u32, page.text().to_string(), page.quality()))
            .collect();

        let calls = pages.into_iter().map(|(page_index, page_text, page_quality)| {
            let mut request =
                PageCompletionRequest::new(record_id.clone(), page_index, page_text, page_quality)
                    .with_field_specs(specs.to_vec());
            if let Some(question) = question {
                request = request.with_question(question);
            }
            async move {
                let call = self
                    .gateway
                    .submit(label, move |_| {
                        let service = Arc::clone(&self.completion_service);
                        let request = request.clone();
                        async move { service.complete(request).await }
                    })
                    .await;
                (page_index, call)
            }
        });

        let mut collected = Vec::new();
        let fan_out = async {
            let mut stream =
                futures::stream::iter(calls).buffer_unordered(self.settings.page_concurrency);
            while let Some((page_index, call)) = stream.next().await {
                match call.outcome {
                    Ok(candidates) => collected.extend(candidates),
                    Err(failure) => {
                        let code = match &failure {
                            CallFailure::Timeout { .. } => ErrorCode::Timeout,
                            CallFailure::Upstream(CompletionError::Timeout { .. }) => {
                                ErrorCode::Timeout
                            }
                            CallFailure::Upstream(_) => ErrorCode::UpstreamError,
                        };
                        return Err((code, format!("page {}: {}", page_index, failure)));
                    }
                }
            }
            Ok(())
        };

        match tokio::time::timeout(self.settings.stage_timeout, fan_out).await {
            Ok(Ok(())) => Ok(collected),
            Ok(Err(failure)) => Err(failure),
            Err(_) => {
                tracing::warn!(
                    "Stage deadline hit after {}ms; keeping {} partial candidates",
                    self.settings.stage_timeout.as_millis(),
                    collected.len()
                );
                Ok(collected)
            }
        }
    }

    /// Persists the run's current state to the registry.
    async fn checkpoint(&self, run: &WorkflowRun) -> Result<(), DomainError> {
        self.run_registry
            .save(run)
            .await
            .map_err(|err| DomainError::new(ErrorCode::StorageError, err.to_string()))
    }
}

// ───────────────────────────────────────────────────────────────────
// Pure stages and helpers
// ───────────────────────────────────────────────────────────────────

/// Normalizes the fetched bundle into the extraction payload.
fn preprocess_stage(outputs: &mut StageOutputs) -> StageOutcome {
    let bundle = match outputs.bundle.take() {
        Some(bundle) => bundle,
        None => {
            return Err((
                ErrorCode::WorkflowError,
                "no record bundle available for preprocessing".to_string(),
            ))
        }
    };
    match Preprocessor::prepare(bundle.field_specs, bundle.documents) {
        Ok(prepared) => {
            let output = serde_json::json!({
                "fields": prepared.field_specs().len(),
                "pages": prepared.total_pages(),
                "documents": prepared.document_summaries().len(),
            });
            outputs.prepared = Some(prepared);
            Ok(output)
        }
        Err(err) => Err((ErrorCode::ValidationFailed, err.to_string())),
    }
}

/// Writes merged values into the form's target slots.
///
/// Fields without usable evidence get the sentinel when they accept
/// free text; constrained fields are left empty rather than given a
/// value outside their allowed set.
fn prefill_stage(outputs: &mut StageOutputs) -> StageOutcome {
    let prepared = match &outputs.prepared {
        Some(prepared) => prepared,
        None => {
            return Err((
                ErrorCode::WorkflowError,
                "no prepared input available for prefill".to_string(),
            ))
        }
    };
    if outputs.merged.is_empty() {
        return Err((
            ErrorCode::WorkflowError,
            "no merged template available for prefill".to_string(),
        ));
    }

    let mut specs = prepared.field_specs().to_vec();
    let mut filled = 0usize;
    let mut not_available = 0usize;
    for spec in &mut specs {
        let merged = outputs
            .merged
            .iter()
            .find(|m| m.field_label() == spec.label())
            .map(MergedField::value);
        match merged {
            Some(MergedValue::Available(value)) => {
                let value = value.clone();
                match spec.set_target(value) {
                    Ok(()) => filled += 1,
                    Err(_) => not_available += 1,
                }
            }
            _ => {
                not_available += 1;
                if spec.kind().is_free_text() {
                    // Free-text fields carry the sentinel so a human
                    // reviewer sees the gap; constrained fields cannot.
                    let _ = spec.set_target(NOT_AVAILABLE);
                }
            }
        }
    }

    let output = serde_json::json!({
        "fields": specs.len(),
        "filled": filled,
        "not_available": not_available,
    });
    outputs.prefilled = specs;
    Ok(output)
}

/// Builds the input summary recorded when a step starts.
fn step_input(
    outputs: &StageOutputs,
    stage: Stage,
    record_id: &RecordId,
    user_message: &str,
) -> serde_json::Value {
    match stage {
        Stage::FetchRecord => serde_json::json!({ "record_id": record_id.as_str() }),
        Stage::Preprocess => serde_json::json!({
            "documents": outputs.bundle.as_ref().map_or(0, |b| b.documents.len()),
            "field_specs": outputs.bundle.as_ref().map_or(0, |b| b.field_specs.len()),
        }),
        Stage::Extract => serde_json::json!({
            "pages": outputs.prepared.as_ref().map_or(0, |p| p.total_pages()),
            "fields": outputs.prepared.as_ref().map_or(0, |p| p.field_specs().len()),
        }),
        Stage::Prefill => serde_json::json!({ "fields": outputs.merged.len() }),
        Stage::Qa => serde_json::json!({ "question": user_message }),
    }
}

/// One-line account of the turn for the session history.
fn response_summary(run: &WorkflowRun, outputs: &StageOutputs) -> String {
    if let Some(answer) = &outputs.qa_answer {
        return answer.answer.clone();
    }
    if run.plan().contains(Stage::Prefill) {
        let filled = outputs.prefilled.iter().filter(|s| s.has_target()).count();
        return format!("Prefilled {} of {} fields", filled, outputs.prefilled.len());
    }
    if run.plan().contains(Stage::Extract) {
        let available = outputs.merged.iter().filter(|m| m.is_available()).count();
        return format!("Extracted {} of {} fields", available, outputs.merged.len());
    }
    "Nothing left to do for this request".to_string()
}

fn into_internal(err: RunError) -> DomainError {
    DomainError::new(ErrorCode::InternalError, err.to_string())
}
