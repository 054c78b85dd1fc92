//! Question payload validation.

use std::collections::HashSet;

use crate::error::ValidationFailure;
use crate::model::QuestionRef;

/// Check a caller-supplied question list and return it sorted by index.
///
/// The list must hold exactly `expected_count` entries, with no repeated
/// question id and no repeated (or zero) `question_index`. Indices need not
/// be contiguous.
pub fn ensure_questions_payload(
    questions: &[QuestionRef],
    expected_count: u32,
) -> Result<Vec<QuestionRef>, ValidationFailure> {
    if questions.len() != expected_count as usize {
        return Err(ValidationFailure::CountMismatch {
            expected: expected_count,
            actual: questions.len(),
        });
    }

    let mut ids = HashSet::with_capacity(questions.len());
    let mut indices = HashSet::with_capacity(questions.len());
    for entry in questions {
        if entry.question_index == 0 {
            return Err(ValidationFailure::ZeroQuestionIndex);
        }
        if !ids.insert(entry.question_id.as_str()) {
            return Err(ValidationFailure::DuplicateQuestionId(
                entry.question_id.clone(),
            ));
        }
        if !indices.insert(entry.question_index) {
            return Err(ValidationFailure::DuplicateQuestionIndex(entry.question_index));
        }
    }

    let mut sorted = questions.to_vec();
    sorted.sort_by_key(|q| q.question_index);
    Ok(sorted)
}
