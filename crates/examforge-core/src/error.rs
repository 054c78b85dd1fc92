//! Composition error types.
//!
//! Every failure the engine raises falls into one of three deterministic
//! categories (validation, not-found, business rule). Failures reported by
//! the ports themselves are wrapped as [`CompositionError::Store`].

use thiserror::Error;

/// Which caller-input invariant was violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("expected {expected} question(s) but {actual} were supplied")]
    CountMismatch { expected: u32, actual: usize },

    #[error("question '{0}' appears more than once")]
    DuplicateQuestionId(String),

    #[error("question index {0} is used more than once")]
    DuplicateQuestionIndex(u32),

    #[error("question indices are 1-based, index 0 is not allowed")]
    ZeroQuestionIndex,

    #[error("question_count can only be changed together with a replacement question list")]
    QuestionCountWithoutQuestions,

    #[error("{dimension} counts sum to {actual}, expected {expected}")]
    QuotaSumMismatch {
        dimension: &'static str,
        expected: u32,
        actual: u32,
    },

    #[error("{dimension} counts overflow a 32-bit total")]
    QuotaOverflow { dimension: &'static str },

    #[error("question type '{0}' is listed more than once")]
    DuplicateQuestionType(String),

    #[error("question count must be at least 1")]
    ZeroQuestionCount,

    #[error("question count must be between 1 and {max}, got {actual}")]
    QuestionCountOutOfRange { max: u32, actual: u32 },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("page must be at least 1 and per_page between 1 and {max_per_page}")]
    InvalidPage { max_per_page: u32 },
}

/// Errors returned by the composition engine.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// Malformed or inconsistent caller input.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// A referenced exam or question does not exist.
    #[error("{entity} not found: {}", .ids.join(", "))]
    NotFound {
        entity: &'static str,
        ids: Vec<String>,
    },

    /// Valid input that cannot be satisfied against the current data.
    #[error("business rule violated: {0}")]
    BusinessRule(String),

    /// A port implementation failed.
    #[error("store failure: {0:#}")]
    Store(anyhow::Error),
}

/// Coarse classification of a [`CompositionError`], e.g. for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    BusinessRule,
    Store,
}

impl CompositionError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CompositionError::NotFound {
            entity,
            ids: vec![id.to_string()],
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompositionError::Validation(_) => ErrorKind::Validation,
            CompositionError::NotFound { .. } => ErrorKind::NotFound,
            CompositionError::BusinessRule(_) => ErrorKind::BusinessRule,
            CompositionError::Store(_) => ErrorKind::Store,
        }
    }

    /// Returns `true` if repeating the same call could succeed.
    ///
    /// Engine-originated failures are deterministic for a given input and
    /// data snapshot, so only the caller adjusting the request helps.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, CompositionError>;
