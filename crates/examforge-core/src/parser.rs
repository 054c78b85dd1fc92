//! TOML parsers for question banks and composition requests.
//!
//! Loads question banks from TOML files and directories, and turns request
//! files into the engine's request types.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::allocation::checked_total;
use crate::error::ValidationFailure;
use crate::model::{
    Difficulty, ExamStatus, FilterCriteria, QuestionForExam, QuestionRef, QuestionTypeQuota,
    TopicCoverage, TopicFilter,
};
use crate::request::{AutomaticExamRequest, ExamUpdate, ManualExamRequest};

// ---------------------------------------------------------------------------
// Question banks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TomlBankFile {
    #[serde(default)]
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlBankHeader {
    /// Subject for questions that do not name one.
    #[serde(default)]
    subject: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(default)]
    subject: Option<String>,
    difficulty: String,
    #[serde(rename = "type")]
    question_type: String,
    topic: String,
    #[serde(default)]
    sub_topic: Option<String>,
    body: String,
    #[serde(default)]
    options: Option<toml::Value>,
    #[serde(default)]
    response: Option<toml::Value>,
}

/// Parse a single TOML question bank file.
pub fn parse_question_bank(path: &Path) -> Result<Vec<QuestionForExam>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_question_bank_str(&content, path)
}

/// Parse a TOML string into questions (useful for testing).
pub fn parse_question_bank_str(content: &str, source_path: &Path) -> Result<Vec<QuestionForExam>> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let default_subject = parsed.bank.subject;

    parsed
        .questions
        .into_iter()
        .map(|q| {
            let subject_id = q
                .subject
                .or_else(|| default_subject.clone())
                .ok_or_else(|| anyhow::anyhow!("question '{}' has no subject", q.id))?;
            let difficulty: Difficulty = q
                .difficulty
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question '{}': {}", q.id, e))?;

            Ok(QuestionForExam {
                subject_id,
                difficulty,
                question_type_id: q.question_type,
                topic_id: q.topic,
                sub_topic_id: q.sub_topic,
                body: q.body,
                options: q.options.map(toml_to_json).transpose()?,
                response: q.response.map(toml_to_json).transpose()?,
                id: q.id,
            })
        })
        .collect()
}

/// Recursively load all `.toml` question bank files from a directory.
pub fn load_question_bank_dir(dir: &Path) -> Result<Vec<QuestionForExam>> {
    let mut questions = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            questions.extend(load_question_bank_dir(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_question_bank(&path) {
                Ok(parsed) => questions.extend(parsed),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(questions)
}

/// Load a question bank from a file or a directory of files.
pub fn load_question_bank(path: &Path) -> Result<Vec<QuestionForExam>> {
    if path.is_dir() {
        load_question_bank_dir(path)
    } else {
        parse_question_bank(path)
    }
}

/// A warning from question bank validation.
#[derive(Debug, Clone)]
pub struct BankWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    pub message: String,
}

/// Check a question bank for common issues.
pub fn validate_question_bank(questions: &[QuestionForExam]) -> Vec<BankWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for question in questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(BankWarning {
                question_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in questions {
        if question.body.trim().is_empty() {
            warnings.push(BankWarning {
                question_id: Some(question.id.clone()),
                message: "body is empty".into(),
            });
        }
        if question.topic_id.trim().is_empty() {
            warnings.push(BankWarning {
                question_id: Some(question.id.clone()),
                message: "topic is empty".into(),
            });
        }
    }

    if questions.is_empty() {
        warnings.push(BankWarning {
            question_id: None,
            message: "question bank is empty".into(),
        });
    }

    warnings
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    title: String,
    subject: String,
    /// Left empty when absent so the caller can supply a default.
    #[serde(default)]
    author: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    validator: Option<String>,
    #[serde(default)]
    observations: Option<String>,
    #[serde(default)]
    question_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestionRef {
    id: String,
    #[serde(default)]
    index: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlManualFile {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestionRef>,
    #[serde(default)]
    topic_proportions: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    topic_coverage: Option<toml::Value>,
}

#[derive(Debug, Deserialize)]
struct TomlTypeQuota {
    id: String,
    count: u32,
}

#[derive(Debug, Default, Deserialize)]
struct TomlFilters {
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    sub_topics: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TomlAutomaticFile {
    exam: TomlExamHeader,
    #[serde(default)]
    question_types: Vec<TomlTypeQuota>,
    #[serde(default)]
    difficulties: BTreeMap<String, u32>,
    #[serde(default)]
    filters: TomlFilters,
    #[serde(default)]
    topic_proportions: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    topic_coverage: Option<toml::Value>,
}

#[derive(Debug, Deserialize)]
struct TomlUpdateFile {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    observations: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    validator: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    question_count: Option<u32>,
    #[serde(default)]
    questions: Option<Vec<TomlQuestionRef>>,
    #[serde(default)]
    topic_proportions: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    topic_coverage: Option<toml::Value>,
}

/// Parse a manual exam request file.
pub fn parse_manual_request(path: &Path) -> Result<ManualExamRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request: {}", path.display()))?;
    parse_manual_request_str(&content, path)
}

/// Parse a manual exam request from a TOML string.
pub fn parse_manual_request_str(content: &str, source_path: &Path) -> Result<ManualExamRequest> {
    let parsed: TomlManualFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = question_refs(parsed.questions);
    let header = parsed.exam;

    Ok(ManualExamRequest {
        question_count: header.question_count.unwrap_or(questions.len() as u32),
        difficulty: parse_opt(header.difficulty)?,
        status: parse_opt::<ExamStatus>(header.status)?,
        title: header.title,
        subject_id: header.subject,
        author_id: header.author,
        validator_id: header.validator,
        observations: header.observations,
        questions,
        topic_proportions: parsed.topic_proportions,
        topic_coverage: parsed.topic_coverage.map(custom_coverage).transpose()?,
    })
}

/// Parse an automatic exam request file.
pub fn parse_automatic_request(path: &Path) -> Result<AutomaticExamRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request: {}", path.display()))?;
    parse_automatic_request_str(&content, path)
}

/// Parse an automatic exam request from a TOML string.
pub fn parse_automatic_request_str(
    content: &str,
    source_path: &Path,
) -> Result<AutomaticExamRequest> {
    let parsed: TomlAutomaticFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let question_types: Vec<QuestionTypeQuota> = parsed
        .question_types
        .into_iter()
        .map(|q| QuestionTypeQuota::new(q.id, q.count))
        .collect();
    let difficulty_counts = parse_difficulty_counts(&parsed.difficulties)?;

    let header = parsed.exam;
    let question_count = match header.question_count {
        Some(count) => count,
        None => checked_total(question_types.iter().map(|q| q.count), "question type")?,
    };

    Ok(AutomaticExamRequest {
        difficulty: parse_opt(header.difficulty)?,
        title: header.title,
        subject_id: header.subject,
        author_id: header.author,
        observations: header.observations,
        question_count,
        question_types,
        difficulty_counts,
        topic_filter: TopicFilter {
            topic_ids: parsed.filters.topics,
            sub_topic_ids: parsed.filters.sub_topics,
        },
        filters: FilterCriteria {
            excluded_question_ids: parsed.filters.exclude,
        },
        topic_proportions: parsed.topic_proportions,
        topic_coverage: parsed.topic_coverage.map(custom_coverage).transpose()?,
    })
}

/// Parse an exam update file.
pub fn parse_exam_update(path: &Path) -> Result<ExamUpdate> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read update: {}", path.display()))?;
    parse_exam_update_str(&content, path)
}

/// Parse an exam update from a TOML string.
pub fn parse_exam_update_str(content: &str, source_path: &Path) -> Result<ExamUpdate> {
    let parsed: TomlUpdateFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    Ok(ExamUpdate {
        title: parsed.title,
        observations: parsed.observations,
        status: parse_opt(parsed.status)?,
        validator_id: parsed.validator,
        difficulty: parse_opt(parsed.difficulty)?,
        question_count: parsed.question_count,
        questions: parsed.questions.map(question_refs),
        topic_proportions: parsed.topic_proportions,
        topic_coverage: parsed.topic_coverage.map(custom_coverage).transpose()?,
    })
}

/// Parse `name=count` difficulty entries such as those in a request file.
pub fn parse_difficulty_counts(entries: &BTreeMap<String, u32>) -> Result<BTreeMap<Difficulty, u32>> {
    let mut counts = BTreeMap::new();
    for (name, count) in entries {
        let difficulty: Difficulty = name.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?;
        let total = counts.entry(difficulty).or_insert(0u32);
        *total = total
            .checked_add(*count)
            .ok_or(ValidationFailure::QuotaOverflow {
                dimension: "difficulty",
            })?;
    }
    Ok(counts)
}

/// Entries without an explicit index take their 1-based position.
fn question_refs(entries: Vec<TomlQuestionRef>) -> Vec<QuestionRef> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, q)| QuestionRef::new(q.id, q.index.unwrap_or(i as u32 + 1)))
        .collect()
}

fn parse_opt<T>(value: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .map(|v| v.parse::<T>().map_err(|e| anyhow::anyhow!("{}", e)))
        .transpose()
}

fn toml_to_json(value: toml::Value) -> Result<serde_json::Value> {
    serde_json::to_value(value).context("failed to convert TOML value")
}

fn custom_coverage(value: toml::Value) -> Result<TopicCoverage> {
    Ok(TopicCoverage::Custom {
        data: toml_to_json(value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const BANK_TOML: &str = r#"
[bank]
subject = "math"

[[questions]]
id = "alg-001"
difficulty = "easy"
type = "mcq"
topic = "algebra"
sub_topic = "linear"
body = "Solve 2x + 3 = 7."
options = ["x = 1", "x = 2", "x = 3"]
response = "x = 2"

[[questions]]
id = "geo-001"
subject = "geometry"
difficulty = "HARD"
type = "essay"
topic = "triangles"
body = "Prove the triangle inequality."
"#;

    #[test]
    fn parse_bank_with_defaults() {
        let questions = parse_question_bank_str(BANK_TOML, &PathBuf::from("bank.toml")).unwrap();
        assert_eq!(questions.len(), 2);

        let first = &questions[0];
        assert_eq!(first.subject_id, "math");
        assert_eq!(first.difficulty, Difficulty::Easy);
        assert_eq!(first.sub_topic_id.as_deref(), Some("linear"));
        assert_eq!(first.options.as_ref().unwrap()[1], "x = 2");
        assert_eq!(first.response, Some(serde_json::json!("x = 2")));

        let second = &questions[1];
        assert_eq!(second.subject_id, "geometry");
        assert_eq!(second.difficulty, Difficulty::Hard);
        assert!(second.options.is_none());
    }

    #[test]
    fn bank_question_without_subject_fails() {
        let toml = r#"
[[questions]]
id = "q1"
difficulty = "easy"
type = "mcq"
topic = "algebra"
body = "?"
"#;
        let err = parse_question_bank_str(toml, &PathBuf::from("bank.toml")).unwrap_err();
        assert!(err.to_string().contains("no subject"));
    }

    #[test]
    fn bank_with_unknown_difficulty_fails() {
        let toml = BANK_TOML.replace("\"easy\"", "\"trivial\"");
        assert!(parse_question_bank_str(&toml, &PathBuf::from("bank.toml")).is_err());
    }

    #[test]
    fn validate_bank_duplicates() {
        let mut questions = parse_question_bank_str(BANK_TOML, &PathBuf::from("b.toml")).unwrap();
        questions.push(questions[0].clone());
        let warnings = validate_question_bank(&questions);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
    }

    #[test]
    fn parse_manual_request_defaults_indices_and_count() {
        let toml = r#"
[exam]
title = "Midterm"
subject = "math"
author = "alice"
status = "pending-review"

[[questions]]
id = "q1"

[[questions]]
id = "q2"
index = 5
"#;
        let request = parse_manual_request_str(toml, &PathBuf::from("m.toml")).unwrap();
        assert_eq!(request.question_count, 2);
        assert_eq!(request.status, Some(ExamStatus::PendingReview));
        assert_eq!(request.questions[0], QuestionRef::new("q1", 1));
        assert_eq!(request.questions[1], QuestionRef::new("q2", 5));
        assert!(request.topic_coverage.is_none());
    }

    #[test]
    fn parse_manual_request_keeps_explicit_count() {
        let toml = r#"
[exam]
title = "Quiz"
subject = "math"
author = "alice"
question_count = 3

[[questions]]
id = "q1"

[topic_coverage]
note = "hand picked"
"#;
        let request = parse_manual_request_str(toml, &PathBuf::from("m.toml")).unwrap();
        assert_eq!(request.question_count, 3);
        match request.topic_coverage {
            Some(TopicCoverage::Custom { data }) => assert_eq!(data["note"], "hand picked"),
            other => panic!("unexpected coverage: {other:?}"),
        }
    }

    #[test]
    fn parse_automatic_request_keeps_type_order() {
        let toml = r#"
[exam]
title = "Auto"
subject = "math"
author = "alice"

[[question_types]]
id = "mcq"
count = 3

[[question_types]]
id = "essay"
count = 1

[difficulties]
easy = 2
medium = 2

[filters]
topics = ["algebra"]
exclude = ["q9"]
"#;
        let request = parse_automatic_request_str(toml, &PathBuf::from("a.toml")).unwrap();
        assert_eq!(request.question_count, 4);
        assert_eq!(request.question_types[0].question_type_id, "mcq");
        assert_eq!(request.question_types[1].question_type_id, "essay");
        assert_eq!(request.difficulty_counts.get(&Difficulty::Medium), Some(&2));
        assert_eq!(request.topic_filter.topic_ids, vec!["algebra"]);
        assert_eq!(request.filters.excluded_question_ids, vec!["q9"]);
    }

    #[test]
    fn overflowing_quota_totals_are_rejected() {
        let toml = format!(
            r#"
[exam]
title = "Huge"
subject = "math"
author = "alice"

[[question_types]]
id = "mcq"
count = {max}

[[question_types]]
id = "essay"
count = 5

[difficulties]
easy = 4
"#,
            max = u32::MAX
        );
        let err = parse_automatic_request_str(&toml, &PathBuf::from("a.toml")).unwrap_err();
        assert!(err.to_string().contains("question type counts overflow"));

        let mut entries = BTreeMap::new();
        entries.insert("easy".to_string(), u32::MAX);
        entries.insert("EASY".to_string(), 1);
        let err = parse_difficulty_counts(&entries).unwrap_err();
        assert!(err.to_string().contains("difficulty counts overflow"));
    }

    #[test]
    fn parse_update_without_questions() {
        let toml = r#"
title = "Renamed"
status = "validated"
question_count = 4
"#;
        let update = parse_exam_update_str(toml, &PathBuf::from("u.toml")).unwrap();
        assert_eq!(update.title.as_deref(), Some("Renamed"));
        assert_eq!(update.status, Some(ExamStatus::Validated));
        assert_eq!(update.question_count, Some(4));
        assert!(update.questions.is_none());
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_exam_update_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bank.toml"), BANK_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "[[questions]]\nid = 1").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let questions = load_question_bank_dir(dir.path()).unwrap();
        assert_eq!(questions.len(), 2);
    }
}
