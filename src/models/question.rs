// src/models/question.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// One of the four answer symbols. Both `questions.correct` and
/// `attempt_answers.selected` are constrained to these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Choice {
    A,
    B,
    C,
    D,
}

impl Choice {
    pub fn as_str(self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
        }
    }

    /// Lenient parse used for user input: surrounding whitespace and case are ignored.
    pub fn parse_lenient(input: &str) -> Option<Self> {
        input.trim().to_ascii_uppercase().parse().ok()
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Choice::A),
            "B" => Ok(Choice::B),
            "C" => Ok(Choice::C),
            "D" => Ok(Choice::D),
            other => Err(format!("'{}' is not one of A, B, C, D", other)),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,

    /// Display position inside the exam; ties are broken by id.
    pub order_index: i64,

    pub text: String,
    pub choice_a: String,
    pub choice_b: String,
    pub choice_c: String,
    pub choice_d: String,

    pub correct: Choice,
}

impl Question {
    pub fn choices(&self) -> ChoiceTexts {
        ChoiceTexts {
            a: self.choice_a.clone(),
            b: self.choice_b.clone(),
            c: self.choice_c.clone(),
            d: self.choice_d.clone(),
        }
    }
}

/// The four choice texts keyed by symbol, as sent to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceTexts {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

/// DTO for sending a question to someone taking the exam (excludes the correct marker).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub order_index: i64,
    pub text: String,
    pub choices: ChoiceTexts,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            order_index: q.order_index,
            text: q.text.clone(),
            choices: q.choices(),
        }
    }
}

/// A question parsed from an upload, not yet assigned to an exam.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewQuestion {
    pub order_index: i64,
    #[validate(length(min = 1, max = 4000, message = "question text must be 1-4000 characters"))]
    pub text: String,
    #[validate(length(min = 1, max = 1000, message = "choice_a must be 1-1000 characters"))]
    pub choice_a: String,
    #[validate(length(min = 1, max = 1000, message = "choice_b must be 1-1000 characters"))]
    pub choice_b: String,
    #[validate(length(min = 1, max = 1000, message = "choice_c must be 1-1000 characters"))]
    pub choice_c: String,
    #[validate(length(min = 1, max = 1000, message = "choice_d must be 1-1000 characters"))]
    pub choice_d: String,
    pub correct: Choice,
}
