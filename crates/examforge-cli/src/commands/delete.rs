//! The `examforge delete` command.

use std::path::PathBuf;

use anyhow::Result;
use uuid::Uuid;

use super::workspace::Workspace;

pub async fn execute(id: Uuid, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref(), None)?;
    workspace.engine.delete_exam(id).await?;
    workspace.save()?;

    println!("Deleted exam {id}");
    Ok(())
}
