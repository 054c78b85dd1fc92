//! Core data model types for examforge.
//!
//! These are the exam aggregate, its ordered question rows, the catalog
//! projection of a question, and the provenance metadata attached to every
//! exam the engine creates or regenerates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Difficulty level of a question or an exam.
///
/// The derived `Ord` (`Easy < Medium < Hard`) is the bucket order the
/// allocation algorithm walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// All levels, in bucket order.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Review lifecycle of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    #[default]
    Draft,
    PendingReview,
    Validated,
    Rejected,
    Archived,
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamStatus::Draft => write!(f, "draft"),
            ExamStatus::PendingReview => write!(f, "pending_review"),
            ExamStatus::Validated => write!(f, "validated"),
            ExamStatus::Rejected => write!(f, "rejected"),
            ExamStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for ExamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "draft" => Ok(ExamStatus::Draft),
            "pending_review" | "pending" => Ok(ExamStatus::PendingReview),
            "validated" => Ok(ExamStatus::Validated),
            "rejected" => Ok(ExamStatus::Rejected),
            "archived" => Ok(ExamStatus::Archived),
            other => Err(format!("unknown exam status: {other}")),
        }
    }
}

/// A question as the catalog exposes it to the composition engine.
///
/// Read-only from the engine's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionForExam {
    /// Catalog identifier.
    pub id: String,
    /// Subject the question belongs to.
    pub subject_id: String,
    pub difficulty: Difficulty,
    /// Question type reference (e.g. "mcq", "essay").
    pub question_type_id: String,
    pub topic_id: String,
    #[serde(default)]
    pub sub_topic_id: Option<String>,
    /// Question statement.
    pub body: String,
    /// Answer options, if the question type has any.
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    /// Canonical response.
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

/// The exam aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub title: String,
    pub subject_id: String,
    pub difficulty: Difficulty,
    pub status: ExamStatus,
    pub author_id: String,
    #[serde(default)]
    pub validator_id: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    /// Always equal to the number of linked exam-question rows.
    pub question_count: u32,
    /// Topic key → fraction of the exam's questions, in `[0, 1]`.
    #[serde(default)]
    pub topic_proportions: BTreeMap<String, f64>,
    pub topic_coverage: TopicCoverage,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the exam store needs to create a new exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExam {
    pub title: String,
    pub subject_id: String,
    pub difficulty: Difficulty,
    pub status: ExamStatus,
    pub author_id: String,
    pub validator_id: Option<String>,
    pub observations: Option<String>,
    pub question_count: u32,
    pub topic_proportions: BTreeMap<String, f64>,
    pub topic_coverage: TopicCoverage,
    pub validated_at: Option<DateTime<Utc>>,
}

/// Partial update of an exam. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamPatch {
    pub title: Option<String>,
    pub observations: Option<String>,
    pub status: Option<ExamStatus>,
    pub validator_id: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub question_count: Option<u32>,
    pub topic_proportions: Option<BTreeMap<String, f64>>,
    pub topic_coverage: Option<TopicCoverage>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl ExamPatch {
    /// Apply the present fields onto an exam.
    pub fn apply_to(self, exam: &mut Exam) {
        if let Some(title) = self.title {
            exam.title = title;
        }
        if let Some(observations) = self.observations {
            exam.observations = Some(observations);
        }
        if let Some(status) = self.status {
            exam.status = status;
        }
        if let Some(validator_id) = self.validator_id {
            exam.validator_id = Some(validator_id);
        }
        if let Some(difficulty) = self.difficulty {
            exam.difficulty = difficulty;
        }
        if let Some(count) = self.question_count {
            exam.question_count = count;
        }
        if let Some(proportions) = self.topic_proportions {
            exam.topic_proportions = proportions;
        }
        if let Some(coverage) = self.topic_coverage {
            exam.topic_coverage = coverage;
        }
        if let Some(validated_at) = self.validated_at {
            exam.validated_at = Some(validated_at);
        }
    }
}

/// One row linking an exam to a question at a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub exam_id: Uuid,
    pub question_id: String,
    pub question_index: u32,
}

/// A caller-supplied reference to a question and its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRef {
    pub question_id: String,
    pub question_index: u32,
}

impl QuestionRef {
    pub fn new(question_id: impl Into<String>, question_index: u32) -> Self {
        Self {
            question_id: question_id.into(),
            question_index,
        }
    }
}

/// A positioned question with its full catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamQuestionDetail {
    pub question_index: u32,
    pub question: QuestionForExam,
}

/// An exam together with its ordered questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamDetail {
    pub exam: Exam,
    pub questions: Vec<ExamQuestionDetail>,
}

/// An automatically generated exam that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamPreview {
    pub title: String,
    pub subject_id: String,
    pub difficulty: Difficulty,
    pub status: ExamStatus,
    pub author_id: String,
    #[serde(default)]
    pub observations: Option<String>,
    pub question_count: u32,
    pub topic_proportions: BTreeMap<String, f64>,
    pub topic_coverage: TopicCoverage,
    /// Questions in presentation order, `question_index` starting at 1.
    pub questions: Vec<ExamQuestionDetail>,
    pub generated_at: DateTime<Utc>,
}

/// Requested number of questions of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTypeQuota {
    pub question_type_id: String,
    pub count: u32,
}

impl QuestionTypeQuota {
    pub fn new(question_type_id: impl Into<String>, count: u32) -> Self {
        Self {
            question_type_id: question_type_id.into(),
            count,
        }
    }
}

/// One allocation unit: `count` questions of one type at one difficulty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSlot {
    pub question_type_id: String,
    pub difficulty: Difficulty,
    pub count: u32,
}

/// Topic and sub-topic restrictions for automatic generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFilter {
    #[serde(default)]
    pub topic_ids: Vec<String>,
    #[serde(default)]
    pub sub_topic_ids: Vec<String>,
}

impl TopicFilter {
    pub fn is_empty(&self) -> bool {
        self.topic_ids.is_empty() && self.sub_topic_ids.is_empty()
    }
}

/// Non-topic filters applied during automatic generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Questions that must never be drawn.
    #[serde(default)]
    pub excluded_question_ids: Vec<String>,
}

/// Provenance record describing how an exam's questions were chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum TopicCoverage {
    /// Questions picked explicitly by the author.
    Manual {
        subject_id: String,
        question_count: u32,
        topics: Vec<String>,
    },
    /// Questions drawn from quotas.
    Automatic {
        subject_id: String,
        difficulty: Difficulty,
        question_types: Vec<QuestionTypeQuota>,
        difficulty_counts: BTreeMap<Difficulty, u32>,
        topic_filter: TopicFilter,
        filters: FilterCriteria,
    },
    /// Question list replaced by an update.
    ManualUpdate {
        subject_id: String,
        question_count: u32,
        previous_question_count: u32,
        topics: Vec<String>,
    },
    /// Caller-supplied descriptor, stored as given.
    Custom { data: serde_json::Value },
}

impl TopicCoverage {
    /// Short mode name, as serialized in the `mode` tag.
    pub fn mode(&self) -> &'static str {
        match self {
            TopicCoverage::Manual { .. } => "manual",
            TopicCoverage::Automatic { .. } => "automatic",
            TopicCoverage::ManualUpdate { .. } => "manual-update",
            TopicCoverage::Custom { .. } => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Medium.to_string(), "medium");
        assert_eq!("EASY".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!(" hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("impossible".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_bucket_order() {
        let mut levels = vec![Difficulty::Hard, Difficulty::Easy, Difficulty::Medium];
        levels.sort();
        assert_eq!(levels, Difficulty::ALL.to_vec());
    }

    #[test]
    fn status_parse_accepts_dashes() {
        assert_eq!(
            "pending-review".parse::<ExamStatus>().unwrap(),
            ExamStatus::PendingReview
        );
        assert_eq!(ExamStatus::PendingReview.to_string(), "pending_review");
        assert_eq!(ExamStatus::default(), ExamStatus::Draft);
    }

    #[test]
    fn coverage_is_tagged_by_mode() {
        let coverage = TopicCoverage::ManualUpdate {
            subject_id: "math".into(),
            question_count: 2,
            previous_question_count: 3,
            topics: vec!["algebra".into()],
        };
        let json = serde_json::to_value(&coverage).unwrap();
        assert_eq!(json["mode"], "manual-update");
        assert_eq!(json["previous_question_count"], 3);
        assert_eq!(coverage.mode(), "manual-update");
    }

    #[test]
    fn automatic_coverage_keys_difficulties_by_name() {
        let mut counts = BTreeMap::new();
        counts.insert(Difficulty::Easy, 2);
        let coverage = TopicCoverage::Automatic {
            subject_id: "math".into(),
            difficulty: Difficulty::Easy,
            question_types: vec![QuestionTypeQuota::new("mcq", 2)],
            difficulty_counts: counts,
            topic_filter: TopicFilter::default(),
            filters: FilterCriteria::default(),
        };
        let json = serde_json::to_string(&coverage).unwrap();
        assert!(json.contains("\"easy\":2"), "got {json}");
        let back: TopicCoverage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coverage);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let now = Utc::now();
        let mut exam = Exam {
            id: Uuid::nil(),
            title: "Old".into(),
            subject_id: "math".into(),
            difficulty: Difficulty::Easy,
            status: ExamStatus::Draft,
            author_id: "alice".into(),
            validator_id: None,
            observations: Some("keep me".into()),
            question_count: 4,
            topic_proportions: BTreeMap::new(),
            topic_coverage: TopicCoverage::Custom {
                data: serde_json::json!({}),
            },
            validated_at: None,
            created_at: now,
            updated_at: now,
        };
        ExamPatch {
            title: Some("New".into()),
            ..Default::default()
        }
        .apply_to(&mut exam);
        assert_eq!(exam.title, "New");
        assert_eq!(exam.observations.as_deref(), Some("keep me"));
        assert_eq!(exam.question_count, 4);
    }
}
