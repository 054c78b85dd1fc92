//! The `examforge list` command.

use std::path::PathBuf;

use anyhow::Result;

use examforge_core::model::{Difficulty, ExamStatus};
use examforge_core::traits::{ExamFilter, Page};

use super::render::exams_table;
use super::workspace::Workspace;

/// Raw filter flags from the command line.
pub struct ListFilter {
    pub subject: Option<String>,
    pub status: Option<String>,
    pub difficulty: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
}

impl ListFilter {
    fn into_exam_filter(self) -> Result<ExamFilter> {
        let status = self
            .status
            .map(|s| s.parse::<ExamStatus>().map_err(|e| anyhow::anyhow!("{e}")))
            .transpose()?;
        let difficulty = self
            .difficulty
            .map(|d| d.parse::<Difficulty>().map_err(|e| anyhow::anyhow!("{e}")))
            .transpose()?;
        Ok(ExamFilter {
            subject_id: self.subject,
            difficulty,
            status,
            author_id: self.author,
            title_contains: self.title,
        })
    }
}

pub async fn execute(
    filter: ListFilter,
    page: u32,
    per_page: Option<u32>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let workspace = Workspace::open(config_path.as_deref(), None)?;
    let filter = filter.into_exam_filter()?;
    let page = Page::new(page, per_page.unwrap_or(workspace.config.page_size));

    let result = workspace.engine.list_exams(&filter, page).await?;

    if result.items.is_empty() {
        println!("No exams found.");
        return Ok(());
    }

    println!("{}", exams_table(&result.items));
    println!(
        "Page {} of {} ({} exam(s))",
        result.page,
        result.total_pages(),
        result.total
    );
    Ok(())
}
