//! Exam composition engine.
//!
//! Orchestrates manual creation, automatic generation, and update with
//! regeneration on top of the catalog and store ports. Writes are always
//! ordered exam first, questions second.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::allocation::{build_selection_plan, validate_quotas};
use crate::coverage::{
    compute_topic_proportions, derive_difficulty, derive_difficulty_from_quota, manual_coverage,
    manual_update_coverage,
};
use crate::error::{CompositionError, Result, ValidationFailure};
use crate::model::{
    Difficulty, Exam, ExamDetail, ExamPatch, ExamPreview, ExamQuestion, ExamQuestionDetail,
    ExamStatus, NewExam, QuestionForExam, QuestionRef, QuestionTypeQuota, SelectionSlot,
    TopicCoverage,
};
use crate::random::{shuffle, RandomSource, ThreadRandom};
use crate::request::{AutomaticExamRequest, ExamUpdate, ManualExamRequest};
use crate::traits::{
    ExamFilter, ExamQuestionStore, ExamStore, Page, Paginated, QuestionCatalog, QuestionCriteria,
};
use crate::validation::ensure_questions_payload;

/// Configuration for the composition engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on questions per exam.
    pub max_question_count: u32,
    /// Rounding precision of topic proportions.
    pub proportion_decimals: u32,
    /// Status given to new exams when the caller does not pick one.
    pub default_status: ExamStatus,
    /// Largest page size `list_exams` accepts.
    pub max_per_page: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_question_count: 200,
            proportion_decimals: 4,
            default_status: ExamStatus::Draft,
            max_per_page: 100,
        }
    }
}

/// The exam composition engine.
pub struct CompositionEngine {
    catalog: Arc<dyn QuestionCatalog>,
    exams: Arc<dyn ExamStore>,
    exam_questions: Arc<dyn ExamQuestionStore>,
    random: Arc<dyn RandomSource>,
    config: EngineConfig,
}

impl CompositionEngine {
    pub fn new(
        catalog: Arc<dyn QuestionCatalog>,
        exams: Arc<dyn ExamStore>,
        exam_questions: Arc<dyn ExamQuestionStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            exams,
            exam_questions,
            random: Arc::new(ThreadRandom),
            config,
        }
    }

    /// Replace the randomness used to shuffle generated exams.
    pub fn with_random_source(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate quotas and allocate them into selection slots without
    /// touching the catalog.
    pub fn plan(
        &self,
        question_count: u32,
        question_types: &[QuestionTypeQuota],
        difficulty_counts: &BTreeMap<Difficulty, u32>,
    ) -> Result<Vec<SelectionSlot>> {
        let (_, _, slots) = self.prepare_plan(question_count, question_types, difficulty_counts)?;
        Ok(slots)
    }

    /// Draw an exam from quotas and return it as an unpersisted preview.
    pub async fn create_automatic_exam(&self, request: AutomaticExamRequest) -> Result<ExamPreview> {
        require_text(&request.title, "title")?;
        require_text(&request.subject_id, "subject_id")?;
        require_text(&request.author_id, "author_id")?;

        let (question_types, difficulty_counts, slots) = self.prepare_plan(
            request.question_count,
            &request.question_types,
            &request.difficulty_counts,
        )?;

        // Claimed ids, shared by every slot's exclusion filter.
        let mut used: HashSet<String> = request
            .filters
            .excluded_question_ids
            .iter()
            .cloned()
            .collect();
        let mut selected: Vec<QuestionForExam> = Vec::with_capacity(request.question_count as usize);

        for slot in &slots {
            let mut exclude_ids: Vec<String> = used.iter().cloned().collect();
            exclude_ids.sort();
            let criteria = QuestionCriteria {
                subject_id: request.subject_id.clone(),
                difficulty: Some(slot.difficulty),
                question_type_ids: vec![slot.question_type_id.clone()],
                topic_ids: request.topic_filter.topic_ids.clone(),
                sub_topic_ids: request.topic_filter.sub_topic_ids.clone(),
                exclude_ids,
                limit: slot.count,
            };

            let candidates = self
                .catalog
                .find_random_by_filters(&criteria)
                .await
                .map_err(CompositionError::Store)?;

            let mut drawn = 0u32;
            for question in candidates {
                if drawn == slot.count {
                    break;
                }
                if !criteria.matches(&question) || used.contains(&question.id) {
                    continue;
                }
                used.insert(question.id.clone());
                selected.push(question);
                drawn += 1;
            }

            if drawn < slot.count {
                tracing::warn!(
                    question_type = %slot.question_type_id,
                    difficulty = %slot.difficulty,
                    requested = slot.count,
                    available = drawn,
                    "question pool too small"
                );
                return Err(CompositionError::BusinessRule(format!(
                    "insufficient questions for requested composition: {} {} question(s) of type '{}' requested, {} available",
                    slot.count, slot.difficulty, slot.question_type_id, drawn
                )));
            }

            tracing::debug!(
                question_type = %slot.question_type_id,
                difficulty = %slot.difficulty,
                count = slot.count,
                "slot filled"
            );
        }

        shuffle(&mut selected, self.random.as_ref());

        let difficulty = request
            .difficulty
            .or_else(|| derive_difficulty_from_quota(&difficulty_counts))
            .or_else(|| derive_difficulty(&selected))
            .unwrap_or(Difficulty::Medium);

        let topic_proportions = request.topic_proportions.unwrap_or_else(|| {
            compute_topic_proportions(&selected, self.config.proportion_decimals)
        });
        let topic_coverage = request
            .topic_coverage
            .unwrap_or_else(|| TopicCoverage::Automatic {
                subject_id: request.subject_id.clone(),
                difficulty,
                question_types,
                difficulty_counts,
                topic_filter: request.topic_filter.clone(),
                filters: request.filters.clone(),
            });

        let questions: Vec<ExamQuestionDetail> = selected
            .into_iter()
            .enumerate()
            .map(|(i, question)| ExamQuestionDetail {
                question_index: i as u32 + 1,
                question,
            })
            .collect();

        tracing::info!(
            subject = %request.subject_id,
            questions = questions.len(),
            slots = slots.len(),
            "generated exam preview"
        );

        Ok(ExamPreview {
            title: request.title,
            subject_id: request.subject_id,
            difficulty,
            status: self.config.default_status,
            author_id: request.author_id,
            observations: request.observations,
            question_count: questions.len() as u32,
            topic_proportions,
            topic_coverage,
            questions,
            generated_at: Utc::now(),
        })
    }

    /// Persist a previously generated preview.
    ///
    /// Question ids are resolved again so a preview whose questions left the
    /// catalog in the meantime is rejected.
    pub async fn commit_preview(&self, preview: ExamPreview) -> Result<ExamDetail> {
        require_text(&preview.title, "title")?;
        self.check_question_count(preview.question_count)?;

        let refs: Vec<QuestionRef> = preview
            .questions
            .iter()
            .map(|d| QuestionRef::new(d.question.id.clone(), d.question_index))
            .collect();
        let refs = ensure_questions_payload(&refs, preview.question_count)?;
        self.resolve_questions(&refs).await?;

        let validated_at = (preview.status == ExamStatus::Validated).then(Utc::now);
        let new_exam = NewExam {
            title: preview.title,
            subject_id: preview.subject_id,
            difficulty: preview.difficulty,
            status: preview.status,
            author_id: preview.author_id,
            validator_id: None,
            observations: preview.observations,
            question_count: refs.len() as u32,
            topic_proportions: preview.topic_proportions,
            topic_coverage: preview.topic_coverage,
            validated_at,
        };

        self.persist_new_exam(new_exam, &refs).await
    }

    /// Create an exam from an explicit question list.
    pub async fn create_manual_exam(&self, request: ManualExamRequest) -> Result<ExamDetail> {
        require_text(&request.title, "title")?;
        require_text(&request.subject_id, "subject_id")?;
        require_text(&request.author_id, "author_id")?;

        let refs = ensure_questions_payload(&request.questions, request.question_count)?;
        self.check_question_count(request.question_count)?;

        let resolved = self.resolve_questions(&refs).await?;
        let questions: Vec<QuestionForExam> = resolved.into_iter().map(|d| d.question).collect();

        let difficulty = request
            .difficulty
            .or_else(|| derive_difficulty(&questions))
            .unwrap_or(Difficulty::Medium);
        let topic_proportions = request.topic_proportions.unwrap_or_else(|| {
            compute_topic_proportions(&questions, self.config.proportion_decimals)
        });
        let topic_coverage = request
            .topic_coverage
            .unwrap_or_else(|| manual_coverage(&request.subject_id, &questions));

        let status = request.status.unwrap_or(self.config.default_status);
        let validated_at = (status == ExamStatus::Validated).then(Utc::now);

        let new_exam = NewExam {
            title: request.title,
            subject_id: request.subject_id,
            difficulty,
            status,
            author_id: request.author_id,
            validator_id: request.validator_id,
            observations: request.observations,
            question_count: refs.len() as u32,
            topic_proportions,
            topic_coverage,
            validated_at,
        };

        self.persist_new_exam(new_exam, &refs).await
    }

    /// Patch an exam, replacing its question list if a new one is given.
    pub async fn update_exam(&self, id: Uuid, update: ExamUpdate) -> Result<ExamDetail> {
        if update.question_count.is_some() && update.questions.is_none() {
            tracing::warn!(exam_id = %id, "question_count supplied without questions");
            return Err(ValidationFailure::QuestionCountWithoutQuestions.into());
        }
        if let Some(title) = &update.title {
            require_text(title, "title")?;
        }

        let existing = self
            .exams
            .get_by_id(id)
            .await
            .map_err(CompositionError::Store)?
            .ok_or_else(|| CompositionError::not_found("exam", id))?;

        let mut patch = ExamPatch {
            title: update.title,
            observations: update.observations,
            status: update.status,
            validator_id: update.validator_id,
            difficulty: update.difficulty,
            question_count: None,
            topic_proportions: update.topic_proportions,
            topic_coverage: update.topic_coverage,
            validated_at: None,
        };
        if update.status == Some(ExamStatus::Validated) && existing.status != ExamStatus::Validated {
            patch.validated_at = Some(Utc::now());
        }

        let mut replacement: Option<Vec<ExamQuestion>> = None;
        if let Some(questions) = update.questions {
            let expected = update.question_count.unwrap_or(questions.len() as u32);
            let refs = ensure_questions_payload(&questions, expected)?;
            self.check_question_count(expected)?;

            let resolved = self.resolve_questions(&refs).await?;
            let selected: Vec<QuestionForExam> = resolved.into_iter().map(|d| d.question).collect();

            if patch.topic_proportions.is_none() {
                patch.topic_proportions = Some(compute_topic_proportions(
                    &selected,
                    self.config.proportion_decimals,
                ));
            }
            if patch.topic_coverage.is_none() {
                patch.topic_coverage = Some(manual_update_coverage(
                    &existing.subject_id,
                    existing.question_count,
                    &selected,
                ));
            }
            if patch.difficulty.is_none() {
                patch.difficulty = derive_difficulty(&selected);
            }
            patch.question_count = Some(refs.len() as u32);
            replacement = Some(exam_question_rows(id, &refs));
        }

        // The store decides whether the exam still exists.
        let updated = self
            .exams
            .update(id, patch)
            .await
            .map_err(CompositionError::Store)?
            .ok_or_else(|| CompositionError::not_found("exam", id))?;

        if let Some(rows) = replacement {
            self.exam_questions
                .replace_exam_questions(id, &rows)
                .await
                .map_err(|e| CompositionError::Store(e.context("replacing exam questions")))?;
            tracing::info!(exam_id = %id, questions = rows.len(), "replaced exam questions");
        }

        tracing::info!(exam_id = %updated.id, "updated exam");
        self.get_exam_detail(updated.id).await
    }

    /// Delete an exam.
    pub async fn delete_exam(&self, id: Uuid) -> Result<()> {
        let deleted = self
            .exams
            .delete_by_id(id)
            .await
            .map_err(CompositionError::Store)?;
        if !deleted {
            return Err(CompositionError::not_found("exam", id));
        }
        tracing::info!(exam_id = %id, "deleted exam");
        Ok(())
    }

    /// Read an exam with its ordered questions.
    pub async fn get_exam_detail(&self, id: Uuid) -> Result<ExamDetail> {
        let exam = self
            .exams
            .get_by_id(id)
            .await
            .map_err(CompositionError::Store)?
            .ok_or_else(|| CompositionError::not_found("exam", id))?;

        let mut rows = self
            .exam_questions
            .list_by_exam_id(id)
            .await
            .map_err(CompositionError::Store)?;
        rows.sort_by_key(|r| r.question_index);

        let refs: Vec<QuestionRef> = rows
            .into_iter()
            .map(|r| QuestionRef::new(r.question_id, r.question_index))
            .collect();
        let questions = self.resolve_questions(&refs).await?;

        Ok(ExamDetail { exam, questions })
    }

    /// List exams matching a filter, one page at a time.
    pub async fn list_exams(&self, filter: &ExamFilter, page: Page) -> Result<Paginated<Exam>> {
        if page.page == 0 || page.per_page == 0 || page.per_page > self.config.max_per_page {
            return Err(ValidationFailure::InvalidPage {
                max_per_page: self.config.max_per_page,
            }
            .into());
        }
        self.exams
            .paginate(filter, page)
            .await
            .map_err(CompositionError::Store)
    }

    fn prepare_plan(
        &self,
        question_count: u32,
        question_types: &[QuestionTypeQuota],
        difficulty_counts: &BTreeMap<Difficulty, u32>,
    ) -> Result<(Vec<QuestionTypeQuota>, BTreeMap<Difficulty, u32>, Vec<SelectionSlot>)> {
        self.check_question_count(question_count)?;
        let (types, difficulties) = validate_quotas(question_count, question_types, difficulty_counts)?;
        let slots = build_selection_plan(question_count, &types, &difficulties)?;
        Ok((types, difficulties, slots))
    }

    fn check_question_count(&self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(ValidationFailure::ZeroQuestionCount.into());
        }
        if count > self.config.max_question_count {
            return Err(ValidationFailure::QuestionCountOutOfRange {
                max: self.config.max_question_count,
                actual: count,
            }
            .into());
        }
        Ok(())
    }

    /// Resolve every reference through the catalog, failing on any miss.
    /// The result keeps the order of `refs`.
    async fn resolve_questions(&self, refs: &[QuestionRef]) -> Result<Vec<ExamQuestionDetail>> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = refs.iter().map(|r| r.question_id.clone()).collect();
        let found = self
            .catalog
            .find_by_ids(&ids)
            .await
            .map_err(CompositionError::Store)?;

        let mut by_id: HashMap<String, QuestionForExam> =
            found.into_iter().map(|q| (q.id.clone(), q)).collect();

        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !by_id.contains_key(*id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            tracing::warn!(missing = missing.len(), "unknown question ids");
            return Err(CompositionError::NotFound {
                entity: "question",
                ids: missing,
            });
        }

        refs.iter()
            .map(|r| {
                by_id
                    .remove(&r.question_id)
                    .map(|question| ExamQuestionDetail {
                        question_index: r.question_index,
                        question,
                    })
                    .ok_or_else(|| CompositionError::not_found("question", &r.question_id))
            })
            .collect()
    }

    /// Create the exam, then its question list. A failed question write
    /// removes the freshly created exam so nothing stays committed.
    async fn persist_new_exam(&self, new_exam: NewExam, refs: &[QuestionRef]) -> Result<ExamDetail> {
        let exam = self
            .exams
            .create(new_exam)
            .await
            .map_err(CompositionError::Store)?;

        let rows = exam_question_rows(exam.id, refs);
        if let Err(e) = self.exam_questions.replace_exam_questions(exam.id, &rows).await {
            tracing::warn!(exam_id = %exam.id, "question write failed, removing new exam");
            if let Err(cleanup) = self.exams.delete_by_id(exam.id).await {
                tracing::error!(exam_id = %exam.id, "failed to remove exam: {cleanup:#}");
            }
            return Err(CompositionError::Store(e.context("writing exam questions")));
        }

        tracing::info!(
            exam_id = %exam.id,
            mode = exam.topic_coverage.mode(),
            questions = rows.len(),
            "created exam"
        );
        self.get_exam_detail(exam.id).await
    }
}

fn exam_question_rows(exam_id: Uuid, refs: &[QuestionRef]) -> Vec<ExamQuestion> {
    refs.iter()
        .map(|r| ExamQuestion {
            exam_id,
            question_id: r.question_id.clone(),
            question_index: r.question_index,
        })
        .collect()
}

fn require_text(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationFailure::EmptyField(field).into());
    }
    Ok(())
}
