//! Page-Evidence Aggregator - merges per-page candidates into one value per field.

use serde::{Deserialize, Serialize};

use super::{FieldSpec, MergedField, PageCandidate, NOT_AVAILABLE};
use crate::domain::foundation::Score;

/// Tuning knobs for evidence aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Minimum winning weight; anything strictly below falls back to the
    /// sentinel. Zero accepts any positive evidence.
    acceptance_threshold: Score,
}

impl AggregationPolicy {
    /// Creates a policy with the given acceptance threshold.
    pub fn new(acceptance_threshold: Score) -> Self {
        Self {
            acceptance_threshold,
        }
    }

    /// Returns the acceptance threshold.
    pub fn acceptance_threshold(&self) -> Score {
        self.acceptance_threshold
    }
}

/// Evidence aggregation functions.
///
/// Deterministic and side-effect free: identical candidate sets always
/// produce identical output, and aggregation never fails - missing or
/// rejected evidence degrades to the sentinel.
pub struct EvidenceAggregator;

impl EvidenceAggregator {
    /// Merges one field's page candidates into a single result.
    ///
    /// # Algorithm
    /// 1. Drop candidates for other fields, candidates with a blank or
    ///    sentinel raw value, and (for picklist/radio) candidates whose
    ///    value is not an exact, case-sensitive member of the allowed
    ///    values.
    /// 2. If nothing remains, the result is the sentinel with quality
    ///    zero.
    /// 3. Otherwise pick the candidate with the highest weight
    ///    (`raw_confidence x page_quality`); ties go to the lowest page
    ///    index.
    /// 4. A winner whose weight is zero or strictly below the acceptance
    ///    threshold also degrades to the sentinel. Quality zero is
    ///    reserved for the sentinel.
    ///
    /// # Edge Cases
    /// - Empty candidate slice: sentinel, quality zero
    /// - All candidates rejected by the picklist filter: sentinel
    /// - Equal weights on several pages: earliest page wins
    pub fn merge_field(
        spec: &FieldSpec,
        candidates: &[PageCandidate],
        policy: &AggregationPolicy,
    ) -> MergedField {
        let mut best: Option<&PageCandidate> = None;

        for candidate in candidates {
            if candidate.field_label() != spec.label() {
                continue;
            }
            let raw = candidate.raw_value();
            if raw.is_empty() || raw == NOT_AVAILABLE {
                continue;
            }
            if !spec.kind().accepts(raw) {
                continue;
            }

            best = match best {
                None => Some(candidate),
                Some(current) => {
                    let challenger = candidate.weight().value();
                    let incumbent = current.weight().value();
                    if challenger > incumbent
                        || (challenger == incumbent
                            && candidate.page_index() < current.page_index())
                    {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }

        let winner = match best {
            Some(candidate) => candidate,
            None => return MergedField::not_available(spec.label()),
        };

        let weight = winner.weight();
        if weight.is_zero() || weight.value() < policy.acceptance_threshold().value() {
            return MergedField::not_available(spec.label());
        }

        MergedField::available(spec.label(), winner.raw_value(), weight, winner.page_index())
            .unwrap_or_else(|_| MergedField::not_available(spec.label()))
    }

    /// Merges every field of a form, preserving spec order.
    pub fn merge_all(
        specs: &[FieldSpec],
        candidates: &[PageCandidate],
        policy: &AggregationPolicy,
    ) -> Vec<MergedField> {
        specs
            .iter()
            .map(|spec| Self::merge_field(spec, candidates, policy))
            .collect()
    }
}
