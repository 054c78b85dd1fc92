//! The `examforge update` command.

use std::path::PathBuf;

use anyhow::Result;
use uuid::Uuid;

use examforge_core::parser::parse_exam_update;

use super::render::print_detail;
use super::workspace::Workspace;

pub async fn execute(id: Uuid, patch_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref(), None)?;
    let update = parse_exam_update(&patch_path)?;
    let replaces_questions = update.questions.is_some();

    let detail = workspace.engine.update_exam(id, update).await?;
    workspace.save()?;

    print_detail(&detail);
    if replaces_questions {
        println!("\nUpdated exam {} with a new question list", detail.exam.id);
    } else {
        println!("\nUpdated exam {}", detail.exam.id);
    }
    Ok(())
}
