//! Supervisor service for planning workflow stages.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Stage;
use crate::domain::routing::Intent;
use crate::domain::session::Session;
use crate::domain::workflow::StagePlan;

/// Outcome of routing: the classified intent and the stages to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub intent: Intent,
    pub plan: StagePlan,
}

/// Stateless service that turns a user message and prior session state
/// into an ordered stage plan.
///
/// # Algorithm
///
/// 1. Classify the message into an intent.
/// 2. Fresh requests (no session) always start with fetch_record and
///    preprocess; continuations never re-plan them.
/// 3. Append the intent's stage suffix:
///    - extract_only -> extract
///    - prefill_form -> prefill, preceded by extract when the session
///      holds no template
///    - qa_session -> qa, upgraded to extract, prefill, qa when the
///      session holds no template
///    - full_pipeline -> every one of extract, prefill, qa the session
///      does not already satisfy
///
/// # Edge Cases
///
/// - A full_pipeline continuation on a fully satisfied session yields
///   an empty plan; the run completes without executing anything.
/// - Stages are deduplicated and always emerge in canonical pipeline
///   order regardless of insertion sequence.
pub struct Supervisor;

impl Supervisor {
    /// Plans the stages a run must execute.
    pub fn plan(user_message: &str, session: Option<&Session>) -> RoutingDecision {
        let intent = Intent::classify(user_message);
        let mut plan = StagePlan::new();

        if session.is_none() {
            plan.push(Stage::FetchRecord);
            plan.push(Stage::Preprocess);
        }

        let has_template = session.map(Session::has_template).unwrap_or(false);

        match intent {
            Intent::ExtractOnly => {
                plan.push(Stage::Extract);
            }
            Intent::PrefillForm => {
                if !has_template {
                    plan.push(Stage::Extract);
                }
                plan.push(Stage::Prefill);
            }
            Intent::QaSession => {
                if !has_template {
                    plan.push(Stage::Extract);
                    plan.push(Stage::Prefill);
                }
                plan.push(Stage::Qa);
            }
            Intent::FullPipeline => {
                for stage in [Stage::Extract, Stage::Prefill, Stage::Qa] {
                    let satisfied = session
                        .map(|s| s.is_stage_satisfied(stage))
                        .unwrap_or(false);
                    if !satisfied {
                        plan.push(stage);
                    }
                }
            }
        }

        RoutingDecision { intent, plan }
    }
}
