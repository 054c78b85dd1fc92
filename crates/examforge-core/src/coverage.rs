//! Topic proportions, derived difficulty, and coverage descriptors.
//!
//! All of these are derived from the final question set; callers may
//! override proportions and coverage, in which case nothing here runs.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Difficulty, QuestionForExam, TopicCoverage};

/// Key a question contributes to in the topic proportion map:
/// `topic` or `topic/sub_topic`.
pub fn proportion_key(question: &QuestionForExam) -> String {
    match &question.sub_topic_id {
        Some(sub) => format!("{}/{}", question.topic_id, sub),
        None => question.topic_id.clone(),
    }
}

/// Fraction of questions per topic key, rounded to `decimals` places.
pub fn compute_topic_proportions<'a, I>(questions: I, decimals: u32) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'a QuestionForExam>,
{
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut total = 0u32;
    for question in questions {
        *counts.entry(proportion_key(question)).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return BTreeMap::new();
    }

    counts
        .into_iter()
        .map(|(key, count)| (key, round_to(count as f64 / total as f64, decimals)))
        .collect()
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Sorted, de-duplicated topic keys of a question set.
pub fn topic_keys<'a, I>(questions: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a QuestionForExam>,
{
    questions
        .into_iter()
        .map(proportion_key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Most frequent difficulty among the questions. Ties go to the harder level.
pub fn derive_difficulty<'a, I>(questions: I) -> Option<Difficulty>
where
    I: IntoIterator<Item = &'a QuestionForExam>,
{
    let mut counts: BTreeMap<Difficulty, u32> = BTreeMap::new();
    for question in questions {
        *counts.entry(question.difficulty).or_default() += 1;
    }
    dominant(&counts)
}

/// Difficulty with the largest requested count. Ties go to the harder level.
pub fn derive_difficulty_from_quota(counts: &BTreeMap<Difficulty, u32>) -> Option<Difficulty> {
    dominant(counts)
}

fn dominant(counts: &BTreeMap<Difficulty, u32>) -> Option<Difficulty> {
    counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .max_by_key(|(difficulty, count)| (**count, **difficulty))
        .map(|(difficulty, _)| *difficulty)
}

/// Coverage descriptor for an exam whose questions were picked by hand.
pub fn manual_coverage(subject_id: &str, questions: &[QuestionForExam]) -> TopicCoverage {
    TopicCoverage::Manual {
        subject_id: subject_id.to_string(),
        question_count: questions.len() as u32,
        topics: topic_keys(questions),
    }
}

/// Coverage descriptor for an exam whose question list was replaced.
pub fn manual_update_coverage(
    subject_id: &str,
    previous_question_count: u32,
    questions: &[QuestionForExam],
) -> TopicCoverage {
    TopicCoverage::ManualUpdate {
        subject_id: subject_id.to_string(),
        question_count: questions.len() as u32,
        previous_question_count,
        topics: topic_keys(questions),
    }
}
