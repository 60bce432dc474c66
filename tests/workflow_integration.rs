//! Integration tests for the workflow orchestration pipeline.
//!
//! These tests drive the end-to-end flow with real adapters:
//! 1. RunWorkflowHandler validates the turn and plans stages from the
//!    message and the session
//! 2. Planned stages execute through the CallGateway against a
//!    fixture-backed record source and a mock completion service
//! 3. Per-page evidence is merged per field and folded into the session
//! 4. Status polling reads the run registry; task polling reads the
//!    gateway's task registry
//!
//! Uses the in-memory session store and run registry plus TempDir-backed
//! record fixtures, so no external services are required.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use formpilot::adapters::{
    FixtureRecordSource, InMemoryRunRegistry, InMemorySessionStore, MockCompletionError,
    MockCompletionService,
};
use formpilot::application::{
    CallGateway, GetTaskStatusHandler, GetTaskStatusQuery, GetWorkflowStatusHandler,
    GetWorkflowStatusQuery, RetryPolicy, RunWorkflowCommand, RunWorkflowHandler, WorkflowSettings,
};
use formpilot::domain::extraction::{PageCandidate, NOT_AVAILABLE};
use formpilot::domain::foundation::{
    ErrorCode, RunStatus, Score, SessionId, Stage, StepStatus,
};
use formpilot::domain::routing::Intent;
use formpilot::ports::{
    CallStatus, CompletionService, RecordSource, RecordSourceError, RunRegistry, SessionStore,
    SessionStoreError, TaskMonitor,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

const INVOICE_RECORD: &str = "REC-001";
const SOLO_RECORD: &str = "REC-SOLO";

/// Two-page invoice with a free-text amount and a constrained status.
const INVOICE_FIXTURE: &str = r#"
documents:
  - doc_id: doc-1
    pages:
      - page_number: 0
        text: "Facture no 2024-0042"
        quality: 0.9
      - page_number: 1
        text: "Montant total 1 200,00 EUR"
        quality: 0.8
fields:
  - label: amount
    type: text
    required: true
  - label: status
    type: picklist
    allowed_values: [Open, Closed]
"#;

/// Single-page record for tests that need exactly one completion call.
const SOLO_FIXTURE: &str = r#"
documents:
  - doc_id: doc-2
    pages:
      - page_number: 0
        text: "Bon de commande no 77"
        quality: 1.0
fields:
  - label: amount
    type: text
    required: true
"#;

/// The wired application: real handlers over in-memory adapters.
struct TestApp {
    handler: RunWorkflowHandler,
    status: GetWorkflowStatusHandler,
    tasks: GetTaskStatusHandler,
    store: Arc<InMemorySessionStore>,
    registry: Arc<InMemoryRunRegistry>,
    completion: Arc<MockCompletionService>,
    gateway: Arc<CallGateway>,
    fixtures: TempDir,
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        call_timeout: Duration::from_millis(500),
    }
}

fn default_settings() -> WorkflowSettings {
    WorkflowSettings {
        session_ttl_secs: 3600,
        stage_timeout: Duration::from_secs(5),
        // One page at a time keeps queued mock responses aligned with
        // page order.
        page_concurrency: 1,
        acceptance_threshold: Score::ZERO,
    }
}

/// Surfaces pipeline logs when running with RUST_LOG set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn test_app(completion: MockCompletionService) -> TestApp {
    test_app_with(completion, fast_policy(), default_settings()).await
}

async fn test_app_with(
    completion: MockCompletionService,
    policy: RetryPolicy,
    settings: WorkflowSettings,
) -> TestApp {
    init_tracing();
    let fixtures = TempDir::new().unwrap();
    for (record, content) in [(INVOICE_RECORD, INVOICE_FIXTURE), (SOLO_RECORD, SOLO_FIXTURE)] {
        let path = fixtures.path().join(format!("{}.yaml", record));
        tokio::fs::write(&path, content).await.unwrap();
    }

    let store = Arc::new(InMemorySessionStore::new());
    let registry = Arc::new(InMemoryRunRegistry::new());
    let completion = Arc::new(completion);
    let gateway = Arc::new(CallGateway::new(policy));
    let source = Arc::new(FixtureRecordSource::new(fixtures.path()));

    let handler = RunWorkflowHandler::new(
        Arc::clone(&store) as Arc<dyn SessionStore>,
        source as Arc<dyn RecordSource>,
        Arc::clone(&completion) as Arc<dyn CompletionService>,
        Arc::clone(&registry) as Arc<dyn RunRegistry>,
        Arc::clone(&gateway),
        settings,
    );
    let status = GetWorkflowStatusHandler::new(Arc::clone(&registry) as Arc<dyn RunRegistry>);
    let tasks = GetTaskStatusHandler::new(Arc::clone(&gateway) as Arc<dyn TaskMonitor>);

    TestApp {
        handler,
        status,
        tasks,
        store,
        registry,
        completion,
        gateway,
        fixtures,
    }
}

fn candidate(label: &str, page: u32, value: &str, confidence: f64, quality: f64) -> PageCandidate {
    PageCandidate::new(
        label,
        page,
        value,
        Score::try_new(confidence).unwrap(),
        Score::try_new(quality).unwrap(),
    )
    .unwrap()
}

fn extract_command(record: &str, session: Option<&SessionId>) -> RunWorkflowCommand {
    RunWorkflowCommand {
        record_id: record.to_string(),
        user_message: "extrais les champs du dossier".to_string(),
        session_id: session.map(|id| id.to_string()),
    }
}

// =============================================================================
// Quality-weighted merge of page evidence
// =============================================================================

#[tokio::test]
async fn extract_merges_page_evidence_by_weight() {
    // Page 0 finds nothing; page 1 (quality 0.8) reads the amount with
    // confidence 0.9, so the merged weight is 0.72.
    let completion = MockCompletionService::new()
        .with_candidates(vec![])
        .with_candidates(vec![candidate("amount", 1, "1 200,00", 0.9, 0.8)]);
    let app = test_app(completion).await;

    let result = app
        .handler
        .handle(extract_command(INVOICE_RECORD, None))
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.intent, Intent::ExtractOnly);
    assert_eq!(result.progress.value(), 100);
    assert!(result.errors.is_empty());

    let amount = result
        .merged_fields
        .iter()
        .find(|m| m.field_label() == "amount")
        .unwrap();
    assert!(amount.is_available());
    assert_eq!(amount.value().as_str(), "1 200,00");
    assert_eq!(amount.source_page(), Some(1));
    assert!((amount.quality_score().value() - 0.72).abs() < 1e-9);

    // The session now carries the merged template for later turns.
    let session = app.store.get(&result.session_id.unwrap()).await.unwrap();
    assert!(session.has_template());
    assert!(session.has_input());
    assert_eq!(session.interaction_history().len(), 1);
}

// =============================================================================
// The golden-rule sentinel
// =============================================================================

#[tokio::test]
async fn field_without_evidence_reads_the_sentinel() {
    // Neither page yields a candidate for any field.
    let completion = MockCompletionService::new()
        .with_candidates(vec![])
        .with_candidates(vec![]);
    let app = test_app(completion).await;

    let result = app
        .handler
        .handle(extract_command(INVOICE_RECORD, None))
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.merged_fields.len(), 2);
    for merged in &result.merged_fields {
        assert!(!merged.is_available());
        assert_eq!(merged.value().as_str(), NOT_AVAILABLE);
        assert!(merged.quality_score().is_zero());
        assert_eq!(merged.source_page(), None);
    }
}

#[tokio::test]
async fn picklist_near_misses_never_win() {
    // "open" outweighs "Closed" but is not a member of the allowed set,
    // so the exact match wins despite its lower weight.
    let completion = MockCompletionService::new()
        .with_candidates(vec![candidate("status", 0, "open", 0.95, 0.9)])
        .with_candidates(vec![candidate("status", 1, "Closed", 0.5, 0.8)]);
    let app = test_app(completion).await;

    let result = app
        .handler
        .handle(extract_command(INVOICE_RECORD, None))
        .await
        .unwrap();

    let status = result
        .merged_fields
        .iter()
        .find(|m| m.field_label() == "status")
        .unwrap();
    assert_eq!(status.value().as_str(), "Closed");
    assert_eq!(status.source_page(), Some(1));
}

// =============================================================================
// Transient upstream failures are retried silently
// =============================================================================

#[tokio::test]
async fn transient_completion_failures_retry_to_success() {
    // The first two attempts fail with retryable errors; the third
    // succeeds within the budget of three, so the run never sees them.
    let completion = MockCompletionService::new()
        .with_error(MockCompletionError::Unavailable {
            message: "warming up".to_string(),
        })
        .with_error(MockCompletionError::RateLimited { retry_after_secs: 1 });
    let app = test_app(completion).await;

    let result = app
        .handler
        .handle(extract_command(SOLO_RECORD, None))
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert!(result.errors.is_empty());
    assert_eq!(app.completion.call_count(), 3);

    let amount = &result.merged_fields[0];
    assert_eq!(amount.field_label(), "amount");
    assert!(amount.is_available());
}

#[tokio::test]
async fn task_status_reports_attempt_accounting() {
    let app = test_app(MockCompletionService::new()).await;
    let attempts = AtomicU32::new(0);

    let call = app
        .gateway
        .submit("record_probe", |_| {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(RecordSourceError::unavailable("connection reset"))
                } else {
                    Ok("fetched".to_string())
                }
            }
        })
        .await;

    assert_eq!(call.attempt_count, 3);
    assert!(call.outcome.is_ok());

    // The same accounting is visible through the task status handler.
    let snapshot = app
        .tasks
        .handle(GetTaskStatusQuery {
            task_id: call.task_id.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(snapshot.status, CallStatus::Succeeded);
    assert_eq!(snapshot.attempt_count, 3);
    assert_eq!(snapshot.label, "record_probe");
}

// =============================================================================
// A call timeout fails the stage but keeps earlier progress
// =============================================================================

#[tokio::test]
async fn completion_timeout_fails_extract_but_keeps_earlier_steps() {
    // Every completion call sleeps past the per-attempt deadline.
    let completion = MockCompletionService::new().with_delay(Duration::from_millis(200));
    let policy = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        call_timeout: Duration::from_millis(20),
    };
    let app = test_app_with(completion, policy, default_settings()).await;

    let result = app
        .handler
        .handle(extract_command(SOLO_RECORD, None))
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.merged_fields.is_empty());
    assert!(result.session_id.is_none());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].error_type, "TIMEOUT");
    assert_eq!(result.errors[0].step, Some(Stage::Extract));

    // Earlier steps keep their completed status in the polled view.
    let view = app
        .status
        .handle(GetWorkflowStatusQuery {
            workflow_id: result.workflow_id.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(view.status, RunStatus::Failed);
    let statuses: Vec<(Stage, StepStatus)> =
        view.steps.iter().map(|s| (s.name, s.status)).collect();
    assert_eq!(
        statuses,
        vec![
            (Stage::FetchRecord, StepStatus::Completed),
            (Stage::Preprocess, StepStatus::Completed),
            (Stage::Extract, StepStatus::Failed),
            (Stage::Prefill, StepStatus::Skipped),
            (Stage::Qa, StepStatus::Skipped),
        ]
    );
    assert_eq!(view.progress.value(), 66);
}

// =============================================================================
// A question without a prior template upgrades the plan
// =============================================================================

#[tokio::test]
async fn question_without_template_upgrades_to_full_chain() {
    // No queued responses: the mock synthesizes candidates for both the
    // extraction fields and the QA question.
    let app = test_app(MockCompletionService::new()).await;

    let command = RunWorkflowCommand {
        record_id: INVOICE_RECORD.to_string(),
        user_message: "combien de pages contient le dossier ?".to_string(),
        session_id: None,
    };
    let result = app.handler.handle(command).await.unwrap();

    assert_eq!(result.intent, Intent::QaSession);
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.progress.value(), 100);

    // The plan expanded to the full chain rather than qa alone.
    let run = app.registry.get(&result.workflow_id).await.unwrap();
    assert_eq!(run.plan().stages(), Stage::all());

    // Page 0 carries the best quality, so its answer wins.
    let answer = result.qa_answer.unwrap();
    assert_eq!(answer.question, "combien de pages contient le dossier ?");
    assert_eq!(answer.answer, "qa_answer page 0");
    assert!(!answer.quality_score.is_zero());

    // Prefill ran too and gave the constrained field a legal value.
    let status = result
        .prefilled_fields
        .iter()
        .find(|s| s.label() == "status")
        .unwrap();
    assert_eq!(status.target_value(), "Open");
}

// =============================================================================
// Continuation turns never refetch the record
// =============================================================================

#[tokio::test]
async fn continuation_turn_never_refetches_the_record() {
    let app = test_app(MockCompletionService::new()).await;

    let first = app
        .handler
        .handle(extract_command(INVOICE_RECORD, None))
        .await
        .unwrap();
    assert_eq!(first.status, RunStatus::Completed);
    let session_id = first.session_id.unwrap();

    // Remove the fixture; any refetch would now fail the run.
    let fixture = app
        .fixtures
        .path()
        .join(format!("{}.yaml", INVOICE_RECORD));
    tokio::fs::remove_file(fixture).await.unwrap();

    let command = RunWorkflowCommand {
        record_id: INVOICE_RECORD.to_string(),
        user_message: "remplis le formulaire".to_string(),
        session_id: Some(session_id.to_string()),
    };
    let second = app.handler.handle(command).await.unwrap();

    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.intent, Intent::PrefillForm);
    assert_eq!(second.session_id, Some(session_id));

    // Fetch was skipped, not completed; only prefill actually ran.
    let run = app.registry.get(&second.workflow_id).await.unwrap();
    assert_eq!(run.plan().stages(), &[Stage::Prefill]);
    assert_eq!(
        run.step(Stage::FetchRecord).unwrap().status(),
        StepStatus::Skipped
    );
    assert_eq!(run.step(Stage::Extract).unwrap().status(), StepStatus::Skipped);
    assert_eq!(
        run.step(Stage::Prefill).unwrap().status(),
        StepStatus::Completed
    );

    // The prefilled form reuses the template stored by the first turn.
    let amount = second
        .prefilled_fields
        .iter()
        .find(|s| s.label() == "amount")
        .unwrap();
    assert_eq!(amount.target_value(), "amount page 0");

    let session = app.store.get(&session_id).await.unwrap();
    assert_eq!(session.interaction_history().len(), 2);
}

// =============================================================================
// Session expiry
// =============================================================================

#[tokio::test]
async fn expired_session_reads_as_not_found() {
    let app = test_app(MockCompletionService::new()).await;

    let first = app
        .handler
        .handle(extract_command(INVOICE_RECORD, None))
        .await
        .unwrap();
    let session_id = first.session_id.unwrap();

    // Collapse the deadline; the next read treats the session as absent.
    app.store.touch_expiry(&session_id, 0).await.unwrap();

    let err = app
        .handler
        .handle(extract_command(INVOICE_RECORD, Some(&session_id)))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SessionNotFound);

    assert!(matches!(
        app.store.get(&session_id).await,
        Err(SessionStoreError::NotFound(_))
    ));
}

// =============================================================================
// Progress monotonicity under polling
// =============================================================================

#[tokio::test]
async fn progress_and_completed_steps_never_shrink_across_polls() {
    // Slow completion calls down so polls can observe intermediate
    // checkpoints while the run executes.
    let completion = MockCompletionService::new().with_delay(Duration::from_millis(15));
    let app = test_app(completion).await;
    let TestApp {
        handler,
        status,
        registry,
        fixtures: _fixtures,
        ..
    } = app;

    let command = RunWorkflowCommand {
        record_id: INVOICE_RECORD.to_string(),
        user_message: "traite tout le dossier".to_string(),
        session_id: None,
    };
    let run_task = tokio::spawn(async move { handler.handle(command).await });

    // Find the run as soon as its first checkpoint lands.
    let workflow_id = loop {
        if let Some(id) = registry.workflow_ids().await.first().copied() {
            break id;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    };

    let mut last_progress = 0u8;
    let mut last_completed = 0usize;
    loop {
        let view = status
            .handle(GetWorkflowStatusQuery {
                workflow_id: workflow_id.to_string(),
            })
            .await
            .unwrap();
        let completed = view
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        assert!(view.progress.value() >= last_progress);
        assert!(completed >= last_completed);
        last_progress = view.progress.value();
        last_completed = completed;
        if view.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let result = run_task.await.unwrap().unwrap();
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(last_progress, 100);
    assert_eq!(last_completed, Stage::all().len());
}
