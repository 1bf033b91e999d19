// ❓ Question Entity - Trivia questions with answer, category and difficulty
//
// A question is immutable except through an explicit QuestionPatch and is
// deleted by identifier. The category reference is enforced by the store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_DIFFICULTY: i64 = 1;
pub const MAX_DIFFICULTY: i64 = 5;

// ============================================================================
// VALIDATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0}: required field is empty")]
    EmptyField(&'static str),

    #[error("difficulty {0} is outside 1..=5")]
    DifficultyOutOfRange(i64),

    #[error("category {0} does not exist")]
    UnknownCategory(i64),
}

fn check_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

fn check_difficulty(difficulty: i64) -> Result<(), ValidationError> {
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
        return Err(ValidationError::DifficultyOutOfRange(difficulty));
    }
    Ok(())
}

// ============================================================================
// QUESTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    /// Category identifier
    pub category: i64,
    pub difficulty: i64,
}

impl Question {
    /// Case-insensitive substring match on the question text
    pub fn matches(&self, term: &str) -> bool {
        self.question.to_lowercase().contains(&term.to_lowercase())
    }

    /// Apply a validated patch, returning the updated question
    pub fn patched(&self, patch: &QuestionPatch) -> Result<Question, ValidationError> {
        patch.validate()?;

        let mut next = self.clone();
        if let Some(question) = &patch.question {
            next.question = question.clone();
        }
        if let Some(answer) = &patch.answer {
            next.answer = answer.clone();
        }
        if let Some(category) = patch.category {
            next.category = category;
        }
        if let Some(difficulty) = patch.difficulty {
            next.difficulty = difficulty;
        }
        Ok(next)
    }
}

/// Question without an identity yet (the store assigns one on insert)
///
/// Also the row shape of the CSV import file:
/// `question,answer,category,difficulty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

impl NewQuestion {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text("question", &self.question)?;
        check_text("answer", &self.answer)?;
        check_difficulty(self.difficulty)
    }

    pub fn with_id(self, id: i64) -> Question {
        Question {
            id,
            question: self.question,
            answer: self.answer,
            category: self.category,
            difficulty: self.difficulty,
        }
    }
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPatch {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<i64>,
}

impl QuestionPatch {
    pub fn is_empty(&self) -> bool {
        self.question.is_none()
            && self.answer.is_none()
            && self.category.is_none()
            && self.difficulty.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(question) = &self.question {
            check_text("question", question)?;
        }
        if let Some(answer) = &self.answer {
            check_text("answer", answer)?;
        }
        if let Some(difficulty) = self.difficulty {
            check_difficulty(difficulty)?;
        }
        Ok(())
    }
}
