//! The `examforge plan` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examforge_core::parser::parse_automatic_request;
use examforge_core::CompositionEngine;
use examforge_store::{load_config_from, MemoryCatalog, MemoryExamQuestionStore, MemoryExamStore};

pub fn execute(request_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let request = parse_automatic_request(&request_path)?;

    // Planning never reads the bank or the saved exams.
    let engine = CompositionEngine::new(
        Arc::new(MemoryCatalog::new(Vec::new())),
        Arc::new(MemoryExamStore::new()),
        Arc::new(MemoryExamQuestionStore::new()),
        config.engine_config(),
    );
    let slots = engine.plan(
        request.question_count,
        &request.question_types,
        &request.difficulty_counts,
    )?;

    let mut table = Table::new();
    table.set_header(vec!["Question type", "Difficulty", "Count"]);
    for slot in &slots {
        table.add_row(vec![
            Cell::new(&slot.question_type_id),
            Cell::new(slot.difficulty),
            Cell::new(slot.count),
        ]);
    }

    println!("Plan for {} question(s) in {} slot(s)", request.question_count, slots.len());
    println!("{table}");
    Ok(())
}
