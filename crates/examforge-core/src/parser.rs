//! TOML catalog parser.
//!
//! Loads question and test definitions from TOML files and directories, and
//! validates them.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{
    AnswerKey, QuestionDefinition, QuestionKind, Section, Subsection, TestDefinition,
    TestQuestionBinding,
};

/// Questions and tests loaded from one or more catalog files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub questions: Vec<QuestionDefinition>,
    pub tests: Vec<TestDefinition>,
}

impl Catalog {
    /// Append another catalog's entries.
    pub fn extend(&mut self, other: Catalog) {
        self.questions.extend(other.questions);
        self.tests.extend(other.tests);
    }

    pub fn question(&self, id: &str) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn test(&self, id: &str) -> Option<&TestDefinition> {
        self.tests.iter().find(|t| t.id == id)
    }
}

/// Intermediate TOML structure for catalog files.
#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    #[serde(default)]
    questions: Vec<TomlQuestion>,
    #[serde(default)]
    tests: Vec<TomlTest>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    options: Vec<String>,
    correct: toml::Value,
    #[serde(default = "default_marks")]
    marks: f64,
    #[serde(default)]
    penalty: f64,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    subtopic: Option<String>,
}

fn default_kind() -> String {
    "single".to_string()
}

fn default_marks() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct TomlTest {
    id: String,
    #[serde(default)]
    title: String,
    duration_minutes: u32,
    #[serde(default)]
    sections: Vec<TomlSection>,
    #[serde(default)]
    questions: Vec<TomlBinding>,
}

#[derive(Debug, Deserialize)]
struct TomlSection {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    subsections: Vec<TomlSubsection>,
}

#[derive(Debug, Deserialize)]
struct TomlSubsection {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlBinding {
    question: String,
    #[serde(default)]
    position: Option<u32>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    subsection: Option<String>,
    #[serde(default)]
    marks: Option<f64>,
    #[serde(default)]
    negative_marks: Option<f64>,
}

/// Parse a single TOML file into a `Catalog`.
pub fn parse_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into a `Catalog`.
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;
            let answer = answer_key(kind, &q.correct)
                .with_context(|| format!("question {}: invalid `correct` value", q.id))?;

            Ok(QuestionDefinition {
                id: q.id,
                prompt: q.prompt,
                options: q.options,
                answer,
                marks: q.marks,
                penalty: q.penalty,
                subject: q.subject,
                topic: q.topic,
                subtopic: q.subtopic,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let tests = parsed
        .tests
        .into_iter()
        .map(|t| {
            let bindings = t
                .questions
                .into_iter()
                .enumerate()
                .map(|(i, b)| TestQuestionBinding {
                    question_id: b.question,
                    // authored order when no explicit position is given
                    position: b.position.unwrap_or((i + 1) as u32),
                    section_id: b.section,
                    subsection_id: b.subsection,
                    marks: b.marks,
                    negative_marks: b.negative_marks,
                })
                .collect();

            let sections = t
                .sections
                .into_iter()
                .map(|s| Section {
                    name: s.name.unwrap_or_else(|| s.id.clone()),
                    id: s.id,
                    subsections: s
                        .subsections
                        .into_iter()
                        .map(|ss| Subsection {
                            name: ss.name.unwrap_or_else(|| ss.id.clone()),
                            id: ss.id,
                        })
                        .collect(),
                })
                .collect();

            TestDefinition {
                id: t.id,
                title: t.title,
                duration_minutes: t.duration_minutes,
                bindings,
                sections,
            }
        })
        .collect();

    Ok(Catalog { questions, tests })
}

/// Interpret the authored `correct` value for a question kind.
fn answer_key(kind: QuestionKind, value: &toml::Value) -> Result<AnswerKey> {
    fn index(value: &toml::Value) -> Result<usize> {
        match value {
            toml::Value::Integer(i) if *i >= 0 => Ok(*i as usize),
            other => anyhow::bail!("expected a non-negative option index, got {other}"),
        }
    }

    match kind {
        QuestionKind::Single => Ok(AnswerKey::Single(index(value)?)),
        QuestionKind::Multiple => {
            let indices = match value {
                toml::Value::Array(items) => {
                    items.iter().map(index).collect::<Result<BTreeSet<_>>>()?
                }
                single => BTreeSet::from([index(single)?]),
            };
            Ok(AnswerKey::Multiple(indices))
        }
        QuestionKind::Numeric => match value {
            toml::Value::String(s) => Ok(AnswerKey::Numeric(s.trim().to_string())),
            toml::Value::Integer(i) => Ok(AnswerKey::Numeric(i.to_string())),
            toml::Value::Float(f) => Ok(AnswerKey::Numeric(f.to_string())),
            other => anyhow::bail!("expected a number or string, got {other}"),
        },
    }
}

/// Recursively load and merge all `.toml` catalog files from a directory.
pub fn load_catalog_directory(dir: &Path) -> Result<Catalog> {
    let mut catalog = Catalog::default();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            catalog.extend(load_catalog_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_catalog(&path) {
                Ok(part) => catalog.extend(part),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(catalog)
}

/// Load a catalog from either a single file or a directory of files.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    if path.is_dir() {
        load_catalog_directory(path)
    } else {
        parse_catalog(path)
    }
}

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question or test ID (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn new(item_id: &str, message: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a catalog for common authoring issues.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for q in &catalog.questions {
        if !seen.insert(q.id.as_str()) {
            warnings.push(ValidationWarning::new(
                &q.id,
                format!("duplicate question ID: {}", q.id),
            ));
        }
    }

    for q in &catalog.questions {
        warnings.extend(validate_question(q));
    }

    let questions: HashMap<&str, &QuestionDefinition> = catalog
        .questions
        .iter()
        .map(|q| (q.id.as_str(), q))
        .collect();

    let mut seen = HashSet::new();
    for t in &catalog.tests {
        if !seen.insert(t.id.as_str()) {
            warnings.push(ValidationWarning::new(
                &t.id,
                format!("duplicate test ID: {}", t.id),
            ));
        }
        warnings.extend(validate_test(t, &questions));
    }

    warnings
}

fn validate_question(q: &QuestionDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let option_count = q.options.len();

    match &q.answer {
        AnswerKey::Single(_) | AnswerKey::Multiple(_) if option_count == 0 => {
            warnings.push(ValidationWarning::new(
                &q.id,
                format!("{} question has no options", q.kind()),
            ));
        }
        AnswerKey::Single(i) if *i >= option_count => {
            warnings.push(ValidationWarning::new(
                &q.id,
                format!("correct option {i} is out of range ({option_count} options)"),
            ));
        }
        AnswerKey::Multiple(indices) => {
            if indices.is_empty() {
                warnings.push(ValidationWarning::new(&q.id, "no correct options given"));
            }
            for i in indices.iter().filter(|i| **i >= option_count) {
                warnings.push(ValidationWarning::new(
                    &q.id,
                    format!("correct option {i} is out of range ({option_count} options)"),
                ));
            }
        }
        AnswerKey::Numeric(value) if value.trim().parse::<f64>().is_err() => {
            warnings.push(ValidationWarning::new(
                &q.id,
                format!("numeric answer '{value}' is not a number and will be compared as text"),
            ));
        }
        _ => {}
    }

    if q.marks < 0.0 {
        warnings.push(ValidationWarning::new(
            &q.id,
            format!("marks are negative ({})", q.marks),
        ));
    }

    if q.prompt.trim().is_empty() {
        warnings.push(ValidationWarning::new(&q.id, "prompt is empty"));
    }

    warnings
}

fn validate_test(
    t: &TestDefinition,
    questions: &HashMap<&str, &QuestionDefinition>,
) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if t.bindings.is_empty() {
        warnings.push(ValidationWarning::new(&t.id, "test has no questions"));
    }

    if t.duration_minutes == 0 {
        warnings.push(ValidationWarning::new(
            &t.id,
            "duration is zero; sessions will submit immediately",
        ));
    }

    let section_ids: HashSet<&str> = t.sections.iter().map(|s| s.id.as_str()).collect();
    let mut positions = HashSet::new();

    for b in &t.bindings {
        if !questions.contains_key(b.question_id.as_str()) {
            warnings.push(ValidationWarning::new(
                &t.id,
                format!("references unknown question: {}", b.question_id),
            ));
        }

        if !positions.insert(b.position) {
            warnings.push(ValidationWarning::new(
                &t.id,
                format!("duplicate position {} ({})", b.position, b.question_id),
            ));
        }

        if b.marks.is_some_and(|m| m < 0.0) {
            warnings.push(ValidationWarning::new(
                &t.id,
                format!("negative marks for {}", b.question_id),
            ));
        }

        if let Some(section) = &b.section_id {
            if !section_ids.is_empty() && !section_ids.contains(section.as_str()) {
                warnings.push(ValidationWarning::new(
                    &t.id,
                    format!("{} is placed in undeclared section '{section}'", b.question_id),
                ));
            }
        }
    }

    warnings
}
