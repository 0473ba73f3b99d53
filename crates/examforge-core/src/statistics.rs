//! Multi-level performance aggregation.
//!
//! Folds scored responses from one or many results into overall, subject,
//! topic, and subtopic buckets. Pure: the same inputs always produce the same
//! report, with buckets in sorted key order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Classification;
use crate::results::{ResponseRecord, SubmissionKind, TestResult};
use crate::traits::QuestionLookup;

/// Display-time accuracy thresholds, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthThresholds {
    /// Accuracy at or above this is strong.
    pub strong: f64,
    /// Accuracy below this is weak.
    pub weak: f64,
}

impl Default for StrengthThresholds {
    fn default() -> Self {
        Self {
            strong: 70.0,
            weak: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Neutral,
    Weak,
}

impl Strength {
    pub fn classify(accuracy: f64, thresholds: &StrengthThresholds) -> Self {
        if accuracy >= thresholds.strong {
            Strength::Strong
        } else if accuracy < thresholds.weak {
            Strength::Weak
        } else {
            Strength::Neutral
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Strong => write!(f, "strong"),
            Strength::Neutral => write!(f, "neutral"),
            Strength::Weak => write!(f, "weak"),
        }
    }
}

/// Counters for one rollup bucket. `overall` carries no classification key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStatistic {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub subtopic: Option<String>,
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub not_answered: usize,
    pub marks_obtained: f64,
    pub marks_possible: f64,
    /// `correct / total * 100`, or 0 for an empty bucket.
    pub accuracy: f64,
}

impl TopicStatistic {
    fn keyed(subject: Option<&str>, topic: Option<&str>, subtopic: Option<&str>) -> Self {
        Self {
            subject: subject.map(str::to_string),
            topic: topic.map(str::to_string),
            subtopic: subtopic.map(str::to_string),
            total: 0,
            correct: 0,
            incorrect: 0,
            not_answered: 0,
            marks_obtained: 0.0,
            marks_possible: 0.0,
            accuracy: 0.0,
        }
    }

    fn record(&mut self, response: &ResponseRecord, marks_possible: f64) {
        self.total += 1;
        if response.answer.is_none() {
            self.not_answered += 1;
        } else if response.is_correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        self.marks_obtained += response.marks_obtained;
        self.marks_possible += marks_possible;
    }

    fn finish(mut self) -> Self {
        self.accuracy = if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        };
        self
    }

    pub fn strength(&self, thresholds: &StrengthThresholds) -> Strength {
        Strength::classify(self.accuracy, thresholds)
    }

    /// "Subject / Topic / Subtopic", or "Overall" for the unkeyed bucket.
    pub fn label(&self) -> String {
        let parts: Vec<&str> = [&self.subject, &self.topic, &self.subtopic]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        if parts.is_empty() {
            "Overall".to_string()
        } else {
            parts.join(" / ")
        }
    }
}

/// One attempt as listed in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub result_id: String,
    pub test_id: String,
    pub marks_obtained: f64,
    pub marks_possible: f64,
    pub percentage: f64,
    pub time_spent_seconds: u64,
    pub submission: SubmissionKind,
    pub submitted_at: DateTime<Utc>,
}

/// Hierarchical statistics over one or many results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedReportData {
    pub overall: TopicStatistic,
    pub by_subject: Vec<TopicStatistic>,
    pub by_topic: Vec<TopicStatistic>,
    pub by_subtopic: Vec<TopicStatistic>,
    /// Attempts in submission order.
    #[serde(default)]
    pub attempts: Vec<AttemptSummary>,
    #[serde(default)]
    pub total_time_spent_seconds: u64,
    /// Responses whose question could not be resolved (filed under "Other").
    #[serde(default)]
    pub unresolved_records: usize,
}

impl CombinedReportData {
    pub fn tests_attempted(&self) -> usize {
        self.attempts.len()
    }

    /// Strong topics, best first.
    pub fn strengths(&self, thresholds: &StrengthThresholds) -> Vec<&TopicStatistic> {
        let mut topics: Vec<&TopicStatistic> = self
            .by_topic
            .iter()
            .filter(|t| t.strength(thresholds) == Strength::Strong)
            .collect();
        topics.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));
        topics
    }

    /// Weak topics, worst first.
    pub fn weaknesses(&self, thresholds: &StrengthThresholds) -> Vec<&TopicStatistic> {
        let mut topics: Vec<&TopicStatistic> = self
            .by_topic
            .iter()
            .filter(|t| t.strength(thresholds) == Strength::Weak)
            .collect();
        topics.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
        topics
    }
}

/// Aggregate every response of every result.
///
/// A response whose question is missing from `questions` is still counted,
/// under the default "Other" classification at every level, so bucket totals
/// always add up to `overall.total`.
pub fn aggregate_results<Q>(results: &[TestResult], questions: &Q) -> CombinedReportData
where
    Q: QuestionLookup + ?Sized,
{
    let mut overall = TopicStatistic::keyed(None, None, None);
    let mut by_subject: BTreeMap<String, TopicStatistic> = BTreeMap::new();
    let mut by_topic: BTreeMap<(String, String), TopicStatistic> = BTreeMap::new();
    let mut by_subtopic: BTreeMap<(String, String, String), TopicStatistic> = BTreeMap::new();
    let mut unresolved = 0usize;

    for result in results {
        for response in &result.responses {
            let definition = questions.lookup(&response.question_id);
            let classification = match definition {
                Some(d) => d.classification(),
                None => {
                    unresolved += 1;
                    Classification::default()
                }
            };
            let marks_possible = response
                .marks_available
                .or(definition.map(|d| d.marks))
                .unwrap_or(0.0);

            let Classification {
                subject,
                topic,
                subtopic,
            } = classification;

            overall.record(response, marks_possible);
            by_subject
                .entry(subject.clone())
                .or_insert_with(|| TopicStatistic::keyed(Some(subject.as_str()), None, None))
                .record(response, marks_possible);
            by_topic
                .entry((subject.clone(), topic.clone()))
                .or_insert_with(|| {
                    TopicStatistic::keyed(Some(subject.as_str()), Some(topic.as_str()), None)
                })
                .record(response, marks_possible);
            by_subtopic
                .entry((subject.clone(), topic.clone(), subtopic.clone()))
                .or_insert_with(|| {
                    TopicStatistic::keyed(
                        Some(subject.as_str()),
                        Some(topic.as_str()),
                        Some(subtopic.as_str()),
                    )
                })
                .record(response, marks_possible);
        }
    }

    if unresolved > 0 {
        tracing::warn!(
            unresolved,
            "responses reference unknown questions; counted under the default classification"
        );
    }

    let mut attempts: Vec<AttemptSummary> = results
        .iter()
        .map(|r| AttemptSummary {
            result_id: r.id.clone(),
            test_id: r.test_id.clone(),
            marks_obtained: r.totals.marks_obtained,
            marks_possible: r.totals.marks_possible,
            percentage: r.totals.percentage(),
            time_spent_seconds: r.time_spent_seconds,
            submission: r.submission,
            submitted_at: r.created_at.to_datetime(),
        })
        .collect();
    attempts.sort_by(|a, b| {
        a.submitted_at
            .cmp(&b.submitted_at)
            .then_with(|| a.result_id.cmp(&b.result_id))
    });

    CombinedReportData {
        overall: overall.finish(),
        by_subject: by_subject.into_values().map(TopicStatistic::finish).collect(),
        by_topic: by_topic.into_values().map(TopicStatistic::finish).collect(),
        by_subtopic: by_subtopic.into_values().map(TopicStatistic::finish).collect(),
        total_time_spent_seconds: results.iter().map(|r| r.time_spent_seconds).sum(),
        attempts,
        unresolved_records: unresolved,
    }
}

/// Statistics for a single attempt.
pub fn aggregate_result<Q>(result: &TestResult, questions: &Q) -> CombinedReportData
where
    Q: QuestionLookup + ?Sized,
{
    aggregate_results(std::slice::from_ref(result), questions)
}
