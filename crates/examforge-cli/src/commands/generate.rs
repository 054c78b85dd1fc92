//! The `examforge generate` command.

use std::path::PathBuf;

use anyhow::Result;

use examforge_core::parser::parse_automatic_request;

use super::render::{print_detail, print_preview};
use super::workspace::Workspace;

pub async fn execute(
    request_path: PathBuf,
    commit: bool,
    seed: Option<u64>,
    json: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref(), seed)?;
    let mut request = parse_automatic_request(&request_path)?;
    workspace.fill_author(&mut request.author_id);

    let preview = workspace.engine.create_automatic_exam(request).await?;

    if !commit {
        if json {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            print_preview(&preview);
            println!("\nNot saved. Re-run with --commit to store this exam.");
        }
        return Ok(());
    }

    let detail = workspace.engine.commit_preview(preview).await?;
    workspace.save()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_detail(&detail);
        println!("\nSaved exam {}", detail.exam.id);
    }
    Ok(())
}
