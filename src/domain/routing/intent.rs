//! Intent classification for user turns.
//!
//! Classification is purely keyword driven and deterministic; there is
//! no model in the loop, so the router stays unit-testable.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a user turn asks the pipeline to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ExtractOnly,
    PrefillForm,
    QaSession,
    FullPipeline,
}

/// Ordered rule table; the first row with a keyword hit decides.
///
/// Full-pipeline wording is checked first so a phrase like "remplis tout
/// le formulaire ?" routes to the full pipeline rather than QA.
static RULES: Lazy<Vec<(Intent, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            Intent::FullPipeline,
            vec!["tout", "complet", "entier", "everything", "full", "entire"],
        ),
        (
            Intent::QaSession,
            vec![
                "?", "question", "pourquoi", "comment", "combien", "quel", "why", "what", "how",
            ],
        ),
        (
            Intent::PrefillForm,
            vec![
                "remplir", "remplis", "préremplir", "renseigner", "prefill", "fill", "populate",
            ],
        ),
        (
            Intent::ExtractOnly,
            vec!["extraire", "extraction", "extrais", "extract", "analyse"],
        ),
    ]
});

impl Intent {
    /// Classifies a user message.
    ///
    /// Matching is case-insensitive substring containment against the
    /// rule table; a message matching no rule defaults to the full
    /// pipeline.
    pub fn classify(message: &str) -> Intent {
        let text = message.to_lowercase();
        for (intent, keywords) in RULES.iter() {
            if keywords.iter().any(|keyword| text.contains(keyword)) {
                return *intent;
            }
        }
        Intent::FullPipeline
    }

    /// Returns the intent name used in logs and session history.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::ExtractOnly => "extract_only",
            Intent::PrefillForm => "prefill_form",
            Intent::QaSession => "qa_session",
            Intent::FullPipeline => "full_pipeline",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
