//! The `examforge show` command.

use std::path::PathBuf;

use anyhow::Result;
use uuid::Uuid;

use super::render::print_detail;
use super::workspace::Workspace;

pub async fn execute(id: Uuid, json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref(), None)?;
    let detail = workspace.engine.get_exam_detail(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_detail(&detail);
    }
    Ok(())
}
