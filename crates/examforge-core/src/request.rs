//! Caller-facing request types for the composition engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    Difficulty, ExamStatus, FilterCriteria, QuestionRef, QuestionTypeQuota, TopicCoverage,
    TopicFilter,
};

/// Create an exam from an explicit, ordered question list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualExamRequest {
    pub title: String,
    pub subject_id: String,
    pub author_id: String,
    /// Overrides the difficulty derived from the questions.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub status: Option<ExamStatus>,
    #[serde(default)]
    pub validator_id: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    pub question_count: u32,
    pub questions: Vec<QuestionRef>,
    #[serde(default)]
    pub topic_proportions: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub topic_coverage: Option<TopicCoverage>,
}

/// Generate an exam from type and difficulty quotas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomaticExamRequest {
    pub title: String,
    pub subject_id: String,
    pub author_id: String,
    /// Overrides the difficulty derived from the difficulty quotas.
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub observations: Option<String>,
    pub question_count: u32,
    /// Processed in order by the allocation algorithm.
    pub question_types: Vec<QuestionTypeQuota>,
    pub difficulty_counts: BTreeMap<Difficulty, u32>,
    #[serde(default)]
    pub topic_filter: TopicFilter,
    #[serde(default)]
    pub filters: FilterCriteria,
    #[serde(default)]
    pub topic_proportions: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub topic_coverage: Option<TopicCoverage>,
}

/// Partial update of an exam, optionally replacing its question list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub status: Option<ExamStatus>,
    #[serde(default)]
    pub validator_id: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Only valid together with `questions`.
    #[serde(default)]
    pub question_count: Option<u32>,
    #[serde(default)]
    pub questions: Option<Vec<QuestionRef>>,
    #[serde(default)]
    pub topic_proportions: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub topic_coverage: Option<TopicCoverage>,
}
