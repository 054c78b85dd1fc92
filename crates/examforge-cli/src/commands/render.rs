//! Table output shared by the commands.

use std::collections::BTreeMap;

use comfy_table::{Cell, Table};

use examforge_core::coverage::proportion_key;
use examforge_core::model::{Exam, ExamDetail, ExamPreview, ExamQuestionDetail};

pub fn print_preview(preview: &ExamPreview) {
    println!(
        "Preview: {} ({}, {}, {} questions)",
        preview.title, preview.subject_id, preview.difficulty, preview.question_count
    );
    println!("{}", questions_table(&preview.questions));
    print_proportions(&preview.topic_proportions);
}

pub fn print_detail(detail: &ExamDetail) {
    let exam = &detail.exam;
    println!("Exam {}", exam.id);
    println!("  Title:      {}", exam.title);
    println!("  Subject:    {}", exam.subject_id);
    println!("  Difficulty: {}", exam.difficulty);
    println!("  Status:     {}", exam.status);
    println!("  Author:     {}", exam.author_id);
    if let Some(validator) = &exam.validator_id {
        println!("  Validator:  {validator}");
    }
    if let Some(at) = exam.validated_at {
        println!("  Validated:  {}", at.format("%Y-%m-%d %H:%M"));
    }
    if let Some(observations) = &exam.observations {
        println!("  Notes:      {observations}");
    }
    println!("  Coverage:   {}", exam.topic_coverage.mode());
    println!("  Questions:  {}", exam.question_count);
    println!("{}", questions_table(&detail.questions));
    print_proportions(&exam.topic_proportions);
}

pub fn exams_table(exams: &[Exam]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Subject", "Difficulty", "Status", "Questions"]);
    for exam in exams {
        table.add_row(vec![
            Cell::new(exam.id),
            Cell::new(&exam.title),
            Cell::new(&exam.subject_id),
            Cell::new(exam.difficulty),
            Cell::new(exam.status),
            Cell::new(exam.question_count),
        ]);
    }
    table
}

fn questions_table(questions: &[ExamQuestionDetail]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Type", "Difficulty", "Topic"]);
    for detail in questions {
        let q = &detail.question;
        table.add_row(vec![
            Cell::new(detail.question_index),
            Cell::new(&q.id),
            Cell::new(&q.question_type_id),
            Cell::new(q.difficulty),
            Cell::new(proportion_key(q)),
        ]);
    }
    table
}

fn print_proportions(proportions: &BTreeMap<String, f64>) {
    if proportions.is_empty() {
        return;
    }
    println!("Topics:");
    for (topic, share) in proportions {
        println!("  {topic}: {:.1}%", share * 100.0);
    }
}
