//! Quota allocation across the question-type and difficulty dimensions.
//!
//! A request asks for `N` questions split two independent ways: by question
//! type and by difficulty. [`build_selection_plan`] turns the two splits into
//! concrete selection slots (type × difficulty × count) before any catalog
//! query is issued.

use std::collections::{BTreeMap, HashSet};

use crate::error::{CompositionError, ValidationFailure};
use crate::model::{Difficulty, QuestionTypeQuota, SelectionSlot};

/// Structural checks on the two quota dimensions.
///
/// Drops zero-count entries and rejects duplicate type ids, a zero target,
/// and dimensions that do not both sum to `target`. Returns the normalized
/// quotas.
pub fn validate_quotas(
    target: u32,
    question_types: &[QuestionTypeQuota],
    difficulty_counts: &BTreeMap<Difficulty, u32>,
) -> Result<(Vec<QuestionTypeQuota>, BTreeMap<Difficulty, u32>), ValidationFailure> {
    if target == 0 {
        return Err(ValidationFailure::ZeroQuestionCount);
    }

    let mut seen = HashSet::new();
    for quota in question_types {
        if quota.question_type_id.trim().is_empty() {
            return Err(ValidationFailure::EmptyField("question_type_id"));
        }
        if !seen.insert(quota.question_type_id.as_str()) {
            return Err(ValidationFailure::DuplicateQuestionType(
                quota.question_type_id.clone(),
            ));
        }
    }

    let types: Vec<QuestionTypeQuota> = question_types
        .iter()
        .filter(|q| q.count > 0)
        .cloned()
        .collect();
    let difficulties: BTreeMap<Difficulty, u32> = difficulty_counts
        .iter()
        .filter(|(_, &count)| count > 0)
        .map(|(&d, &count)| (d, count))
        .collect();

    let type_total = checked_total(types.iter().map(|q| q.count), "question type")?;
    if type_total != target {
        return Err(ValidationFailure::QuotaSumMismatch {
            dimension: "question type",
            expected: target,
            actual: type_total,
        });
    }

    let difficulty_total = checked_total(difficulties.values().copied(), "difficulty")?;
    if difficulty_total != target {
        return Err(ValidationFailure::QuotaSumMismatch {
            dimension: "difficulty",
            expected: target,
            actual: difficulty_total,
        });
    }

    Ok((types, difficulties))
}

/// Sum quota counts, refusing totals that do not fit in a `u32`.
pub(crate) fn checked_total(
    counts: impl IntoIterator<Item = u32>,
    dimension: &'static str,
) -> Result<u32, ValidationFailure> {
    counts
        .into_iter()
        .try_fold(0u32, |total, count| total.checked_add(count))
        .ok_or(ValidationFailure::QuotaOverflow { dimension })
}

/// Allocate per-type demand against the difficulty supply.
///
/// Types are processed in the given order; for each type the difficulty
/// buckets are walked from easiest to hardest, taking
/// `min(remaining demand, remaining supply)` into a new slot. Fails with a
/// business-rule error if a type's demand outlasts the supply or if supply
/// is left over once every type is served.
pub fn build_selection_plan(
    target: u32,
    question_types: &[QuestionTypeQuota],
    difficulty_counts: &BTreeMap<Difficulty, u32>,
) -> Result<Vec<SelectionSlot>, CompositionError> {
    let mut supply: Vec<(Difficulty, u32)> = difficulty_counts
        .iter()
        .filter(|(_, &count)| count > 0)
        .map(|(&d, &count)| (d, count))
        .collect();

    let mut slots = Vec::new();

    for quota in question_types {
        let mut demand = quota.count;

        for (difficulty, available) in supply.iter_mut() {
            if demand == 0 {
                break;
            }
            if *available == 0 {
                continue;
            }
            let take = demand.min(*available);
            slots.push(SelectionSlot {
                question_type_id: quota.question_type_id.clone(),
                difficulty: *difficulty,
                count: take,
            });
            demand -= take;
            *available -= take;
        }

        if demand > 0 {
            return Err(CompositionError::BusinessRule(format!(
                "question type '{}' needs {} more question(s) than the difficulty quotas provide",
                quota.question_type_id, demand
            )));
        }
    }

    let residual = checked_total(supply.iter().map(|(_, available)| *available), "difficulty")?;
    if residual > 0 {
        let leftover: Vec<String> = supply
            .iter()
            .filter(|(_, available)| *available > 0)
            .map(|(d, available)| format!("{d}={available}"))
            .collect();
        return Err(CompositionError::BusinessRule(format!(
            "difficulty quotas left unallocated after serving every question type: {}",
            leftover.join(", ")
        )));
    }

    let allocated = checked_total(slots.iter().map(|s| s.count), "question type")?;
    if allocated != target {
        return Err(CompositionError::BusinessRule(format!(
            "allocated {allocated} question(s) but {target} were requested"
        )));
    }

    tracing::debug!(slots = slots.len(), target, "built selection plan");
    Ok(slots)
}
