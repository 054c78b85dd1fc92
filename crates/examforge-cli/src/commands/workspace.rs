//! Loads config, question bank, and saved exams into a ready engine.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use examforge_core::parser::{load_question_bank, validate_question_bank};
use examforge_core::random::SeededRandom;
use examforge_core::CompositionEngine;
use examforge_store::{
    load_config_from, ExamforgeConfig, MemoryCatalog, MemoryExamQuestionStore, MemoryExamStore,
    Snapshot,
};

pub struct Workspace {
    pub config: ExamforgeConfig,
    pub engine: CompositionEngine,
    exams: Arc<MemoryExamStore>,
    exam_questions: Arc<MemoryExamQuestionStore>,
}

impl Workspace {
    /// Open the workspace. `seed` makes catalog draws and ordering reproducible.
    pub fn open(config_path: Option<&Path>, seed: Option<u64>) -> Result<Self> {
        let config = load_config_from(config_path)?;

        if !config.question_bank.exists() {
            anyhow::bail!(
                "question bank not found: {} (run `examforge init` to create one)",
                config.question_bank.display()
            );
        }
        let questions = load_question_bank(&config.question_bank)?;
        for warning in validate_question_bank(&questions) {
            match &warning.question_id {
                Some(id) => tracing::warn!(question = %id, "{}", warning.message),
                None => tracing::warn!("{}", warning.message),
            }
        }
        tracing::debug!(questions = questions.len(), "loaded question bank");

        let catalog = match seed {
            Some(seed) => MemoryCatalog::with_seed(questions, seed),
            None => MemoryCatalog::new(questions),
        };

        let snapshot = Snapshot::load(&config.state_path())?;
        let (exams, exam_questions) = snapshot.into_stores();

        let mut engine = CompositionEngine::new(
            Arc::new(catalog),
            exams.clone(),
            exam_questions.clone(),
            config.engine_config(),
        );
        if let Some(seed) = seed {
            engine = engine.with_random_source(Arc::new(SeededRandom::new(seed)));
        }

        Ok(Self {
            config,
            engine,
            exams,
            exam_questions,
        })
    }

    /// Author to record when a request leaves it blank.
    pub fn fill_author(&self, author: &mut String) {
        if author.trim().is_empty() {
            if let Some(default) = &self.config.default_author {
                *author = default.clone();
            }
        }
    }

    /// Persist the exam stores to `state.json`.
    pub fn save(&self) -> Result<()> {
        let path = self.config.state_path();
        Snapshot::capture(&self.exams, &self.exam_questions)
            .save(&path)
            .with_context(|| format!("failed to save exams to {}", path.display()))
    }
}
