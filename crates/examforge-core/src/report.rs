//! Report persistence and progress comparison.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::statistics::{CombinedReportData, TopicStatistic};

impl CombinedReportData {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: CombinedReportData =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Compare this report against an earlier one.
    ///
    /// `threshold` is in percentage points of accuracy; smaller moves count as
    /// unchanged. Subjects and topics are matched by their labels.
    pub fn compare(&self, baseline: &CombinedReportData, threshold: f64) -> ProgressReport {
        let mut report = ProgressReport {
            overall_delta: self.overall.accuracy - baseline.overall.accuracy,
            ..ProgressReport::default()
        };

        for (level, current, previous) in [
            (Level::Subject, &self.by_subject, &baseline.by_subject),
            (Level::Topic, &self.by_topic, &baseline.by_topic),
        ] {
            let before = by_label(previous);
            let after = by_label(current);

            for (label, now) in &after {
                let Some(then) = before.get(label) else {
                    report.new_buckets += 1;
                    continue;
                };
                let delta = now.accuracy - then.accuracy;
                let change = AccuracyChange {
                    level,
                    label: label.clone(),
                    baseline_accuracy: then.accuracy,
                    current_accuracy: now.accuracy,
                    delta,
                };
                if delta < -threshold {
                    report.regressions.push(change);
                } else if delta > threshold {
                    report.improvements.push(change);
                } else {
                    report.unchanged += 1;
                }
            }

            report.removed_buckets += before.keys().filter(|k| !after.contains_key(*k)).count();
        }

        report
            .regressions
            .sort_by(|a, b| a.delta.total_cmp(&b.delta));
        report
            .improvements
            .sort_by(|a, b| b.delta.total_cmp(&a.delta));
        report
    }
}

fn by_label(stats: &[TopicStatistic]) -> BTreeMap<String, &TopicStatistic> {
    stats.iter().map(|s| (s.label(), s)).collect()
}

/// Rollup level a change was observed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Subject,
    Topic,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Subject => write!(f, "subject"),
            Level::Topic => write!(f, "topic"),
        }
    }
}

/// An accuracy move beyond the comparison threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyChange {
    pub level: Level,
    pub label: String,
    pub baseline_accuracy: f64,
    pub current_accuracy: f64,
    /// Percentage points; negative when accuracy fell.
    pub delta: f64,
}

/// Result of comparing two reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Change in overall accuracy, in percentage points.
    pub overall_delta: f64,
    /// Buckets where accuracy went down, largest fall first.
    pub regressions: Vec<AccuracyChange>,
    /// Buckets where accuracy went up, largest rise first.
    pub improvements: Vec<AccuracyChange>,
    pub unchanged: usize,
    /// Buckets in current but not baseline.
    pub new_buckets: usize,
    /// Buckets in baseline but not current.
    pub removed_buckets: usize,
}

impl ProgressReport {
    /// Format the progress report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Overall accuracy:** {:+.1} pts\n\n**Summary:** {} regressions, {} improvements, {} unchanged\n\n",
            self.overall_delta,
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged
        ));

        for (title, changes) in [
            ("Regressions", &self.regressions),
            ("Improvements", &self.improvements),
        ] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Level | Bucket | Baseline | Current | Delta |\n");
            md.push_str("|-------|--------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {} | {:.1}% | {:.1}% | {:+.1} |\n",
                    c.level, c.label, c.baseline_accuracy, c.current_accuracy, c.delta
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Returns true if any subject or topic fell beyond the threshold.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(
        subject: Option<&str>,
        topic: Option<&str>,
        correct: usize,
        total: usize,
    ) -> TopicStatistic {
        TopicStatistic {
            subject: subject.map(str::to_string),
            topic: topic.map(str::to_string),
            subtopic: None,
            total,
            correct,
            incorrect: total - correct,
            not_answered: 0,
            marks_obtained: correct as f64,
            marks_possible: total as f64,
            accuracy: correct as f64 / total as f64 * 100.0,
        }
    }

    fn report(mechanics: usize, organic: usize) -> CombinedReportData {
        CombinedReportData {
            overall: stat(None, None, mechanics + organic, 20),
            by_subject: vec![
                stat(Some("Chemistry"), None, organic, 10),
                stat(Some("Physics"), None, mechanics, 10),
            ],
            by_topic: vec![
                stat(Some("Chemistry"), Some("Organic"), organic, 10),
                stat(Some("Physics"), Some("Mechanics"), mechanics, 10),
            ],
            by_subtopic: vec![],
            attempts: vec![],
            total_time_spent_seconds: 0,
            unresolved_records: 0,
        }
    }

    #[test]
    fn compare_identical_reports() {
        let r = report(5, 5);
        let progress = r.compare(&r, 5.0);
        assert!(progress.regressions.is_empty());
        assert!(progress.improvements.is_empty());
        assert_eq!(progress.unchanged, 4);
        assert_eq!(progress.overall_delta, 0.0);
    }

    #[test]
    fn compare_detects_moves_beyond_threshold() {
        let baseline = report(5, 5);
        let current = report(9, 2);
        let progress = current.compare(&baseline, 5.0);

        assert_eq!(progress.improvements.len(), 2);
        assert_eq!(progress.regressions.len(), 2);
        assert!(progress.has_regressions());
        assert_eq!(progress.regressions[0].label, "Chemistry");
        assert!((progress.regressions[0].delta + 30.0).abs() < 1e-9);
        assert_eq!(progress.improvements[0].label, "Physics");
    }

    #[test]
    fn small_moves_are_unchanged() {
        let progress = report(6, 5).compare(&report(5, 5), 15.0);
        assert!(!progress.has_regressions());
        assert_eq!(progress.unchanged, 4);
    }

    #[test]
    fn new_and_removed_buckets() {
        let baseline = report(5, 5);
        let mut current = report(5, 5);
        current.by_topic[0] = stat(Some("Chemistry"), Some("Inorganic"), 5, 10);

        let progress = current.compare(&baseline, 5.0);
        assert_eq!(progress.new_buckets, 1);
        assert_eq!(progress.removed_buckets, 1);
    }

    #[test]
    fn json_roundtrip() {
        let r = report(7, 3);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        r.save_json(&path).unwrap();
        let loaded = CombinedReportData::load_json(&path).unwrap();
        assert_eq!(loaded.by_topic.len(), 2);
        assert_eq!(loaded.by_topic[1].label(), "Physics / Mechanics");
        assert_eq!(loaded.overall.correct, 10);
        assert!((loaded.by_subject[0].accuracy - 30.0).abs() < 1e-9);
    }

    #[test]
    fn markdown_output() {
        let progress = report(2, 5).compare(&report(8, 5), 5.0);
        let md = progress.to_markdown();
        assert!(md.contains("### Regressions"));
        assert!(md.contains("Physics / Mechanics"));
        assert!(!md.contains("### Improvements"));
    }
}
