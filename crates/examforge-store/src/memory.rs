//! In-memory implementations of the catalog and store ports.
//!
//! Used by the CLI (seeded from a question bank and a snapshot) and by tests,
//! which rely on the call counters and failure switches to observe what the
//! engine did.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use uuid::Uuid;

use examforge_core::model::{Exam, ExamPatch, ExamQuestion, NewExam, QuestionForExam};
use examforge_core::traits::{
    ExamFilter, ExamQuestionStore, ExamStore, Page, Paginated, QuestionCatalog, QuestionCriteria,
};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// MemoryCatalog
// ---------------------------------------------------------------------------

/// A question catalog over a fixed list of questions.
pub struct MemoryCatalog {
    questions: Mutex<Vec<QuestionForExam>>,
    rng: Mutex<StdRng>,
    /// When set, `exclude_ids` is ignored, like a catalog that cannot filter.
    ignore_exclusions: bool,
    find_by_ids_calls: AtomicU32,
    random_calls: AtomicU32,
    criteria_log: Mutex<Vec<QuestionCriteria>>,
}

impl MemoryCatalog {
    pub fn new(questions: Vec<QuestionForExam>) -> Self {
        Self::build(questions, StdRng::from_entropy())
    }

    /// A catalog whose random draws are reproducible.
    pub fn with_seed(questions: Vec<QuestionForExam>, seed: u64) -> Self {
        Self::build(questions, StdRng::seed_from_u64(seed))
    }

    fn build(questions: Vec<QuestionForExam>, rng: StdRng) -> Self {
        Self {
            questions: Mutex::new(questions),
            rng: Mutex::new(rng),
            ignore_exclusions: false,
            find_by_ids_calls: AtomicU32::new(0),
            random_calls: AtomicU32::new(0),
            criteria_log: Mutex::new(Vec::new()),
        }
    }

    /// Stop honoring exclusion lists in random draws.
    pub fn ignoring_exclusions(mut self) -> Self {
        self.ignore_exclusions = true;
        self
    }

    /// Drop a question from the catalog. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        let mut questions = guard(&self.questions);
        let before = questions.len();
        questions.retain(|q| q.id != id);
        questions.len() != before
    }

    pub fn len(&self) -> usize {
        guard(&self.questions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find_by_ids_calls(&self) -> u32 {
        self.find_by_ids_calls.load(Ordering::Relaxed)
    }

    pub fn random_calls(&self) -> u32 {
        self.random_calls.load(Ordering::Relaxed)
    }

    /// Total number of catalog calls of any kind.
    pub fn total_calls(&self) -> u32 {
        self.find_by_ids_calls() + self.random_calls()
    }

    /// Every criteria passed to `find_random_by_filters`, in call order.
    pub fn criteria_log(&self) -> Vec<QuestionCriteria> {
        guard(&self.criteria_log).clone()
    }
}

#[async_trait]
impl QuestionCatalog for MemoryCatalog {
    async fn find_by_ids(&self, ids: &[String]) -> anyhow::Result<Vec<QuestionForExam>> {
        self.find_by_ids_calls.fetch_add(1, Ordering::Relaxed);

        let questions = guard(&self.questions);
        Ok(questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn find_random_by_filters(
        &self,
        criteria: &QuestionCriteria,
    ) -> anyhow::Result<Vec<QuestionForExam>> {
        self.random_calls.fetch_add(1, Ordering::Relaxed);
        guard(&self.criteria_log).push(criteria.clone());

        let effective = if self.ignore_exclusions {
            QuestionCriteria {
                exclude_ids: Vec::new(),
                ..criteria.clone()
            }
        } else {
            criteria.clone()
        };

        let questions = guard(&self.questions);
        let pool: Vec<&QuestionForExam> = questions.iter().filter(|q| effective.matches(q)).collect();

        let mut rng = guard(&self.rng);
        let drawn: Vec<QuestionForExam> = pool
            .choose_multiple(&mut *rng, criteria.limit as usize)
            .map(|q| (*q).clone())
            .collect();

        tracing::debug!(
            pool = pool.len(),
            drawn = drawn.len(),
            limit = criteria.limit,
            "random catalog draw"
        );
        Ok(drawn)
    }
}

// ---------------------------------------------------------------------------
// MemoryExamStore
// ---------------------------------------------------------------------------

/// Exam aggregates in a `HashMap<Uuid, Exam>`.
#[derive(Default)]
pub struct MemoryExamStore {
    exams: Mutex<HashMap<Uuid, Exam>>,
    create_calls: AtomicU32,
    update_calls: AtomicU32,
    delete_calls: AtomicU32,
    /// Makes `update` report a miss, as after a concurrent delete.
    vanish_on_update: AtomicBool,
    /// Question rows removed together with their exam.
    linked_rows: Option<Arc<MemoryExamQuestionStore>>,
}

impl MemoryExamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_exams(exams: Vec<Exam>) -> Self {
        let store = Self::default();
        {
            let mut map = guard(&store.exams);
            for exam in exams {
                map.insert(exam.id, exam);
            }
        }
        store
    }

    /// Cascade deletions into `rows`, dropping an exam's question rows when
    /// the exam itself is deleted.
    pub fn cascade_deletes_to(mut self, rows: Arc<MemoryExamQuestionStore>) -> Self {
        self.linked_rows = Some(rows);
        self
    }

    /// All stored exams, oldest first.
    pub fn all(&self) -> Vec<Exam> {
        let mut exams: Vec<Exam> = guard(&self.exams).values().cloned().collect();
        exams.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        exams
    }

    pub fn len(&self) -> usize {
        guard(&self.exams).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_vanish_on_update(&self, vanish: bool) {
        self.vanish_on_update.store(vanish, Ordering::Relaxed);
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::Relaxed)
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::Relaxed)
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::Relaxed)
    }

    /// Number of write calls of any kind.
    pub fn write_calls(&self) -> u32 {
        self.create_calls() + self.update_calls() + self.delete_calls()
    }
}

#[async_trait]
impl ExamStore for MemoryExamStore {
    async fn create(&self, exam: NewExam) -> anyhow::Result<Exam> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);

        let now = Utc::now();
        let exam = Exam {
            id: Uuid::new_v4(),
            title: exam.title,
            subject_id: exam.subject_id,
            difficulty: exam.difficulty,
            status: exam.status,
            author_id: exam.author_id,
            validator_id: exam.validator_id,
            observations: exam.observations,
            question_count: exam.question_count,
            topic_proportions: exam.topic_proportions,
            topic_coverage: exam.topic_coverage,
            validated_at: exam.validated_at,
            created_at: now,
            updated_at: now,
        };
        guard(&self.exams).insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn update(&self, id: Uuid, patch: ExamPatch) -> anyhow::Result<Option<Exam>> {
        self.update_calls.fetch_add(1, Ordering::Relaxed);

        if self.vanish_on_update.load(Ordering::Relaxed) {
            guard(&self.exams).remove(&id);
            return Ok(None);
        }

        let mut exams = guard(&self.exams);
        let Some(exam) = exams.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(exam);
        exam.updated_at = Utc::now();
        Ok(Some(exam.clone()))
    }

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<Exam>> {
        Ok(guard(&self.exams).get(&id).cloned())
    }

    async fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);
        let deleted = guard(&self.exams).remove(&id).is_some();
        if deleted {
            if let Some(rows) = &self.linked_rows {
                rows.remove_exam(id);
            }
        }
        Ok(deleted)
    }

    async fn paginate(&self, filter: &ExamFilter, page: Page) -> anyhow::Result<Paginated<Exam>> {
        let mut matching: Vec<Exam> = guard(&self.exams)
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        // Newest first.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.per_page as usize)
            .collect();

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryExamQuestionStore
// ---------------------------------------------------------------------------

/// Exam question rows grouped by exam.
#[derive(Default)]
pub struct MemoryExamQuestionStore {
    rows: Mutex<HashMap<Uuid, Vec<ExamQuestion>>>,
    replace_calls: AtomicU32,
    fail_replace: AtomicBool,
}

impl MemoryExamQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<ExamQuestion>) -> Self {
        let store = Self::default();
        {
            let mut map = guard(&store.rows);
            for row in rows {
                map.entry(row.exam_id).or_insert_with(Vec::new).push(row);
            }
            for list in map.values_mut() {
                list.sort_by_key(|r| r.question_index);
            }
        }
        store
    }

    /// Every stored row, grouped by exam and ordered by index.
    pub fn all_rows(&self) -> Vec<ExamQuestion> {
        let map = guard(&self.rows);
        let mut exam_ids: Vec<&Uuid> = map.keys().collect();
        exam_ids.sort();
        exam_ids
            .into_iter()
            .flat_map(|id| map[id].iter().cloned())
            .collect()
    }

    /// Drop every row of `exam_id`. Returns how many were removed.
    pub fn remove_exam(&self, exam_id: Uuid) -> usize {
        guard(&self.rows).remove(&exam_id).map_or(0, |rows| rows.len())
    }

    /// Make every following `replace_exam_questions` call fail.
    pub fn set_fail_replace(&self, fail: bool) {
        self.fail_replace.store(fail, Ordering::Relaxed);
    }

    pub fn replace_calls(&self) -> u32 {
        self.replace_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ExamQuestionStore for MemoryExamQuestionStore {
    async fn replace_exam_questions(
        &self,
        exam_id: Uuid,
        rows: &[ExamQuestion],
    ) -> anyhow::Result<()> {
        self.replace_calls.fetch_add(1, Ordering::Relaxed);

        if self.fail_replace.load(Ordering::Relaxed) {
            anyhow::bail!("exam question store rejected the write");
        }
        if let Some(foreign) = rows.iter().find(|r| r.exam_id != exam_id) {
            anyhow::bail!(
                "row for exam {} passed while replacing questions of exam {}",
                foreign.exam_id,
                exam_id
            );
        }

        let mut ordered = rows.to_vec();
        ordered.sort_by_key(|r| r.question_index);

        // Single critical section: readers see the old list or the new one.
        let mut map = guard(&self.rows);
        if ordered.is_empty() {
            map.remove(&exam_id);
        } else {
            map.insert(exam_id, ordered);
        }
        Ok(())
    }

    async fn list_by_exam_id(&self, exam_id: Uuid) -> anyhow::Result<Vec<ExamQuestion>> {
        Ok(guard(&self.rows).get(&exam_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examforge_core::model::{Difficulty, ExamStatus, TopicCoverage};

    fn question(id: &str, difficulty: Difficulty) -> QuestionForExam {
        QuestionForExam {
            id: id.into(),
            subject_id: "math".into(),
            difficulty,
            question_type_id: "mcq".into(),
            topic_id: "algebra".into(),
            sub_topic_id: None,
            body: format!("body {id}"),
            options: None,
            response: None,
        }
    }

    fn new_exam(title: &str) -> NewExam {
        NewExam {
            title: title.into(),
            subject_id: "math".into(),
            difficulty: Difficulty::Easy,
            status: ExamStatus::Draft,
            author_id: "alice".into(),
            validator_id: None,
            observations: None,
            question_count: 0,
            topic_proportions: Default::default(),
            topic_coverage: TopicCoverage::Custom {
                data: serde_json::json!({}),
            },
            validated_at: None,
        }
    }

    #[tokio::test]
    async fn random_draw_respects_limit_and_exclusions() {
        let catalog = MemoryCatalog::with_seed(
            (0..10).map(|i| question(&format!("q{i}"), Difficulty::Easy)).collect(),
            3,
        );
        let criteria = QuestionCriteria {
            subject_id: "math".into(),
            difficulty: Some(Difficulty::Easy),
            exclude_ids: vec!["q0".into(), "q1".into()],
            limit: 4,
            ..Default::default()
        };

        let drawn = catalog.find_random_by_filters(&criteria).await.unwrap();
        assert_eq!(drawn.len(), 4);
        assert!(drawn.iter().all(|q| q.id != "q0" && q.id != "q1"));
        assert_eq!(catalog.random_calls(), 1);
        assert_eq!(catalog.criteria_log()[0], criteria);
    }

    #[tokio::test]
    async fn find_by_ids_skips_unknown() {
        let catalog = MemoryCatalog::new(vec![question("q1", Difficulty::Easy)]);
        let found = catalog
            .find_by_ids(&["q1".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(catalog.find_by_ids_calls(), 1);
    }

    #[tokio::test]
    async fn exam_store_crud() {
        let store = MemoryExamStore::new();
        let exam = store.create(new_exam("Midterm")).await.unwrap();

        let patched = store
            .update(
                exam.id,
                ExamPatch {
                    title: Some("Final".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patched.title, "Final");
        assert!(patched.updated_at >= exam.updated_at);

        assert!(store.delete_by_id(exam.id).await.unwrap());
        assert!(!store.delete_by_id(exam.id).await.unwrap());
        assert!(store.update(exam.id, ExamPatch::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn paginate_filters_by_title() {
        let store = MemoryExamStore::new();
        for title in ["Algebra quiz", "Geometry quiz", "Algebra final"] {
            store.create(new_exam(title)).await.unwrap();
        }

        let filter = ExamFilter {
            title_contains: Some("ALGEBRA".into()),
            ..Default::default()
        };
        let page = store.paginate(&filter, Page::new(1, 1)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages(), 2);
    }

    #[tokio::test]
    async fn replace_is_destructive_and_ordered() {
        let store = MemoryExamQuestionStore::new();
        let exam_id = Uuid::new_v4();
        let rows = |ids: &[(&str, u32)]| -> Vec<ExamQuestion> {
            ids.iter()
                .map(|(id, index)| ExamQuestion {
                    exam_id,
                    question_id: id.to_string(),
                    question_index: *index,
                })
                .collect()
        };

        store
            .replace_exam_questions(exam_id, &rows(&[("a", 2), ("b", 1)]))
            .await
            .unwrap();
        store
            .replace_exam_questions(exam_id, &rows(&[("c", 3), ("d", 1)]))
            .await
            .unwrap();

        let listed = store.list_by_exam_id(exam_id).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.question_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c"]);
    }

    #[tokio::test]
    async fn deleting_an_exam_drops_its_linked_rows() {
        let rows = Arc::new(MemoryExamQuestionStore::new());
        let store = MemoryExamStore::new().cascade_deletes_to(rows.clone());
        let kept = store.create(new_exam("kept")).await.unwrap();
        let dropped = store.create(new_exam("dropped")).await.unwrap();
        for exam_id in [kept.id, dropped.id] {
            let row = ExamQuestion {
                exam_id,
                question_id: "q1".into(),
                question_index: 1,
            };
            rows.replace_exam_questions(exam_id, &[row]).await.unwrap();
        }

        assert!(store.delete_by_id(dropped.id).await.unwrap());
        assert!(rows.list_by_exam_id(dropped.id).await.unwrap().is_empty());
        assert_eq!(rows.list_by_exam_id(kept.id).await.unwrap().len(), 1);
        assert_eq!(rows.all_rows().len(), 1);
    }

    #[tokio::test]
    async fn replace_rejects_foreign_rows_and_failure_switch() {
        let store = MemoryExamQuestionStore::new();
        let row = ExamQuestion {
            exam_id: Uuid::new_v4(),
            question_id: "q".into(),
            question_index: 1,
        };
        assert!(store.replace_exam_questions(Uuid::new_v4(), &[row.clone()]).await.is_err());

        store.set_fail_replace(true);
        assert!(store.replace_exam_questions(row.exam_id, &[row]).await.is_err());
        assert_eq!(store.replace_calls(), 2);
    }
}
