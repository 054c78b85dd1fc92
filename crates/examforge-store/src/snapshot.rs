//! JSON snapshot of exam state between CLI runs.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use examforge_core::model::{Exam, ExamQuestion};

use crate::memory::{MemoryExamQuestionStore, MemoryExamStore};

/// Exams and their question rows as written to `state.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub exam_questions: Vec<ExamQuestion>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Read a snapshot. A missing file yields an empty snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no snapshot yet");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse snapshot: {}", path.display()))?;
        tracing::debug!(
            exams = snapshot.exams.len(),
            rows = snapshot.exam_questions.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Write the snapshot, replacing the file through a temporary sibling.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("failed to serialize snapshot")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write snapshot: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace snapshot: {}", path.display()))?;
        Ok(())
    }

    /// Capture the current store contents. Rows whose exam is gone are
    /// dropped, so deleting an exam also deletes its question rows.
    pub fn capture(exams: &MemoryExamStore, exam_questions: &MemoryExamQuestionStore) -> Self {
        let exams = exams.all();
        let live: HashSet<Uuid> = exams.iter().map(|e| e.id).collect();
        let rows: Vec<ExamQuestion> = exam_questions
            .all_rows()
            .into_iter()
            .filter(|r| live.contains(&r.exam_id))
            .collect();

        Self {
            exams,
            exam_questions: rows,
            saved_at: Some(Utc::now()),
        }
    }

    /// Build fresh stores holding this snapshot's contents. Deleting an
    /// exam from the returned exam store also drops its question rows.
    pub fn into_stores(self) -> (Arc<MemoryExamStore>, Arc<MemoryExamQuestionStore>) {
        let rows = Arc::new(MemoryExamQuestionStore::from_rows(self.exam_questions));
        let exams = MemoryExamStore::from_exams(self.exams).cascade_deletes_to(rows.clone());
        (Arc::new(exams), rows)
    }
}
