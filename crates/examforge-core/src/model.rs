//! Core data model types for examforge.
//!
//! Question definitions, the per-test bindings that place them in a test,
//! and the answers a student can capture during a session.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification tag used when a question carries no subject/topic/subtopic.
pub const DEFAULT_CLASSIFICATION: &str = "Other";

/// The answer format of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Exactly one option is correct.
    Single,
    /// A set of options is correct.
    Multiple,
    /// A free-typed numeric value.
    Numeric,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Single => write!(f, "single"),
            QuestionKind::Multiple => write!(f, "multiple"),
            QuestionKind::Numeric => write!(f, "numeric"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "single-choice" | "mcq" => Ok(QuestionKind::Single),
            "multiple" | "multi" | "multi-choice" | "msq" => Ok(QuestionKind::Multiple),
            "numeric" | "number" | "nat" => Ok(QuestionKind::Numeric),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// The canonical correct answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AnswerKey {
    /// Index of the single correct option.
    Single(usize),
    /// Indices of every correct option.
    Multiple(BTreeSet<usize>),
    /// Canonical numeric value, kept as authored.
    Numeric(String),
}

impl AnswerKey {
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerKey::Single(_) => QuestionKind::Single,
            AnswerKey::Multiple(_) => QuestionKind::Multiple,
            AnswerKey::Numeric(_) => QuestionKind::Numeric,
        }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerKey::Single(index) => write!(f, "{index}"),
            AnswerKey::Multiple(indices) => write!(f, "{}", join_indices(indices)),
            AnswerKey::Numeric(value) => write!(f, "{value}"),
        }
    }
}

/// A value captured for one question during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Answer {
    /// A selected option index.
    Choice(usize),
    /// A set of selected option indices.
    Choices(BTreeSet<usize>),
    /// Typed text for a numeric question. Stored literally, parsed at scoring.
    Numeric(String),
}

impl Answer {
    /// Interpret raw input text according to the question kind.
    ///
    /// Returns `Ok(None)` for input that amounts to "no answer" (blank text,
    /// empty selection) and `Err` for choice input that is not a list of
    /// option indices. Numeric input is never rejected.
    pub fn parse(kind: QuestionKind, text: &str) -> Result<Option<Answer>, String> {
        let trimmed = text.trim();
        match kind {
            QuestionKind::Single => {
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<usize>()
                    .map(|i| Some(Answer::Choice(i)))
                    .map_err(|_| format!("not an option index: '{trimmed}'"))
            }
            QuestionKind::Multiple => {
                let indices = trimmed
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|part| !part.is_empty())
                    .map(|part| {
                        part.parse::<usize>()
                            .map_err(|_| format!("not an option index: '{part}'"))
                    })
                    .collect::<Result<BTreeSet<_>, _>>()?;
                if indices.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Answer::Choices(indices)))
                }
            }
            QuestionKind::Numeric => {
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Answer::Numeric(text.to_string())))
                }
            }
        }
    }

    /// Whether this answer carries nothing (empty selection or blank text).
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Choice(_) => false,
            Answer::Choices(indices) => indices.is_empty(),
            Answer::Numeric(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Choice(index) => write!(f, "{index}"),
            Answer::Choices(indices) => write!(f, "{}", join_indices(indices)),
            Answer::Numeric(text) => write!(f, "{}", text.trim()),
        }
    }
}

fn join_indices(indices: &BTreeSet<usize>) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// A question as authored in the question bank. Read-only to the session engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDefinition {
    /// Unique question identifier.
    pub id: String,
    /// Plain-text prompt shown to the student.
    #[serde(default)]
    pub prompt: String,
    /// Option texts, in display order. Empty for numeric questions.
    #[serde(default)]
    pub options: Vec<String>,
    /// Canonical correct answer.
    pub answer: AnswerKey,
    /// Default marks awarded for a correct answer.
    pub marks: f64,
    /// Default penalty (a magnitude) for a wrong answer.
    #[serde(default)]
    pub penalty: f64,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub subtopic: Option<String>,
}

impl QuestionDefinition {
    pub fn kind(&self) -> QuestionKind {
        self.answer.kind()
    }

    /// Classification tags with every missing tag defaulted to `"Other"`.
    pub fn classification(&self) -> Classification {
        Classification {
            subject: tag_or_default(self.subject.as_deref()),
            topic: tag_or_default(self.topic.as_deref()),
            subtopic: tag_or_default(self.subtopic.as_deref()),
        }
    }
}

fn tag_or_default(tag: Option<&str>) -> String {
    match tag.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_CLASSIFICATION.to_string(),
    }
}

/// Fully-resolved classification of a question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Classification {
    pub subject: String,
    pub topic: String,
    pub subtopic: String,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            subject: DEFAULT_CLASSIFICATION.to_string(),
            topic: DEFAULT_CLASSIFICATION.to_string(),
            subtopic: DEFAULT_CLASSIFICATION.to_string(),
        }
    }
}

/// Placement of a question inside one test, with optional marking overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestQuestionBinding {
    /// Referenced question.
    pub question_id: String,
    /// Ordinal position within the test.
    pub position: u32,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub subsection_id: Option<String>,
    /// Marks for this test; falls back to the question's default.
    #[serde(default)]
    pub marks: Option<f64>,
    /// Penalty for this test; falls back to the question's default.
    #[serde(default)]
    pub negative_marks: Option<f64>,
}

/// A named group of questions within a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subsection {
    pub id: String,
    pub name: String,
}

/// A timed test: ordered question bindings plus section layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Unique test identifier.
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Time allowed, in minutes.
    pub duration_minutes: u32,
    /// Question bindings. Not necessarily stored in position order.
    #[serde(default)]
    pub bindings: Vec<TestQuestionBinding>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl TestDefinition {
    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    /// Bindings sorted by position; ties keep their authored order.
    pub fn ordered_bindings(&self) -> Vec<&TestQuestionBinding> {
        let mut bindings: Vec<&TestQuestionBinding> = self.bindings.iter().collect();
        bindings.sort_by_key(|b| b.position);
        bindings
    }
}

/// A binding joined with the question it references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundQuestion {
    pub binding: TestQuestionBinding,
    pub definition: QuestionDefinition,
}

impl BoundQuestion {
    /// Marks awarded for a correct answer in this test.
    pub fn marks(&self) -> f64 {
        self.binding.marks.unwrap_or(self.definition.marks)
    }

    /// Penalty magnitude for a wrong answer in this test.
    pub fn penalty(&self) -> f64 {
        self.binding
            .negative_marks
            .unwrap_or(self.definition.penalty)
            .abs()
    }
}
