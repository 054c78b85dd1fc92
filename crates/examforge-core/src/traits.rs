//! Port definitions for the question catalog and the exam stores.
//!
//! These async traits are implemented by `examforge-store` (in memory and
//! snapshot backed) and by whatever persistence adapter hosts the engine.
//! Misses are reported as `None`/`false`, never as errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Difficulty, Exam, ExamPatch, ExamQuestion, ExamStatus, NewExam, QuestionForExam};

// ---------------------------------------------------------------------------
// Question catalog
// ---------------------------------------------------------------------------

/// Read access to the question bank.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    /// Resolve question ids to full records. Unknown ids are simply absent
    /// from the result.
    async fn find_by_ids(&self, ids: &[String]) -> anyhow::Result<Vec<QuestionForExam>>;

    /// Draw up to `criteria.limit` random questions matching the criteria.
    async fn find_random_by_filters(
        &self,
        criteria: &QuestionCriteria,
    ) -> anyhow::Result<Vec<QuestionForExam>>;
}

/// Filter for random question draws.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCriteria {
    pub subject_id: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Accepted question types; empty means any.
    #[serde(default)]
    pub question_type_ids: Vec<String>,
    /// Accepted topics; empty means any.
    #[serde(default)]
    pub topic_ids: Vec<String>,
    /// Accepted sub-topics; empty means any.
    #[serde(default)]
    pub sub_topic_ids: Vec<String>,
    /// Questions that must not be returned.
    #[serde(default)]
    pub exclude_ids: Vec<String>,
    /// Maximum number of questions to return.
    pub limit: u32,
}

impl QuestionCriteria {
    /// Whether a question satisfies every filter except the limit.
    pub fn matches(&self, question: &QuestionForExam) -> bool {
        question.subject_id == self.subject_id
            && self.difficulty.map_or(true, |d| d == question.difficulty)
            && (self.question_type_ids.is_empty()
                || self.question_type_ids.contains(&question.question_type_id))
            && (self.topic_ids.is_empty() || self.topic_ids.contains(&question.topic_id))
            && (self.sub_topic_ids.is_empty()
                || question
                    .sub_topic_id
                    .as_ref()
                    .is_some_and(|s| self.sub_topic_ids.contains(s)))
            && !self.exclude_ids.contains(&question.id)
    }
}

// ---------------------------------------------------------------------------
// Exam store
// ---------------------------------------------------------------------------

/// Persistence of exam aggregates.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn create(&self, exam: NewExam) -> anyhow::Result<Exam>;

    /// Apply a patch. Returns `None` if the exam does not exist.
    async fn update(&self, id: Uuid, patch: ExamPatch) -> anyhow::Result<Option<Exam>>;

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<Exam>>;

    /// Returns `false` if no exam was deleted.
    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn paginate(&self, filter: &ExamFilter, page: Page) -> anyhow::Result<Paginated<Exam>>;
}

/// Listing filter for exams. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamFilter {
    pub subject_id: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<ExamStatus>,
    pub author_id: Option<String>,
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
}

impl ExamFilter {
    pub fn matches(&self, exam: &Exam) -> bool {
        self.subject_id.as_ref().map_or(true, |s| *s == exam.subject_id)
            && self.difficulty.map_or(true, |d| d == exam.difficulty)
            && self.status.map_or(true, |s| s == exam.status)
            && self.author_id.as_ref().map_or(true, |a| *a == exam.author_id)
            && self.title_contains.as_ref().map_or(true, |t| {
                exam.title.to_lowercase().contains(&t.to_lowercase())
            })
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.per_page as usize
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paginated<T> {
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page as usize)
    }
}

// ---------------------------------------------------------------------------
// Exam question store
// ---------------------------------------------------------------------------

/// Persistence of the ordered question list of an exam.
#[async_trait]
pub trait ExamQuestionStore: Send + Sync {
    /// Destroy every row of the exam and insert `rows`, atomically with
    /// respect to readers.
    async fn replace_exam_questions(&self, exam_id: Uuid, rows: &[ExamQuestion])
        -> anyhow::Result<()>;

    /// Current rows of the exam, ordered by `question_index`.
    async fn list_by_exam_id(&self, exam_id: Uuid) -> anyhow::Result<Vec<ExamQuestion>>;
}
