//! The `examforge create` command.

use std::path::PathBuf;

use anyhow::Result;

use examforge_core::parser::parse_manual_request;

use super::render::print_detail;
use super::workspace::Workspace;

pub async fn execute(request_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref(), None)?;
    let mut request = parse_manual_request(&request_path)?;
    workspace.fill_author(&mut request.author_id);

    let detail = workspace.engine.create_manual_exam(request).await?;
    workspace.save()?;

    print_detail(&detail);
    println!("\nSaved exam {}", detail.exam.id);
    Ok(())
}
