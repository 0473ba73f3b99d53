//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use examforge_core::statistics::{
    CombinedReportData, Strength, StrengthThresholds, TopicStatistic,
};

/// Page metadata that is not part of the report data itself.
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    pub student_id: String,
    pub thresholds: StrengthThresholds,
    pub generated_at: DateTime<Utc>,
}

impl HtmlOptions {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            thresholds: StrengthThresholds::default(),
            generated_at: Utc::now(),
        }
    }
}

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else {
        format!("{m}m {s:02}s")
    }
}

/// Generate an HTML page for a combined report.
pub fn generate_html(report: &CombinedReportData, options: &HtmlOptions) -> String {
    let mut html = String::new();
    let student = html_escape(&options.student_id);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>examforge report: {student}</title>\n"));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str("<h1>Performance report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">Student: <strong>{}</strong> | {} tests attempted | {} total | generated {}</p>\n",
        student,
        report.tests_attempted(),
        format_duration(report.total_time_spent_seconds),
        options.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Overall
    let overall = &report.overall;
    html.push_str("<section class=\"dashboard\">\n<h2>Overall</h2>\n");
    html.push_str("<div class=\"cards\">\n");
    for (label, value) in [
        ("Accuracy", format!("{:.1}%", overall.accuracy)),
        (
            "Marks",
            format!("{:.1} / {:.1}", overall.marks_obtained, overall.marks_possible),
        ),
        ("Correct", overall.correct.to_string()),
        ("Incorrect", overall.incorrect.to_string()),
        ("Not answered", overall.not_answered.to_string()),
    ] {
        html.push_str(&format!(
            "<div class=\"card\"><span class=\"label\">{label}</span><span class=\"value\">{value}</span></div>\n"
        ));
    }
    html.push_str("</div>\n");
    if report.unresolved_records > 0 {
        html.push_str(&format!(
            "<p class=\"warning\">{} responses refer to questions that no longer exist and are filed under \"Other\".</p>\n",
            report.unresolved_records
        ));
    }
    html.push_str("</section>\n");

    // Attempts
    if !report.attempts.is_empty() {
        html.push_str("<section>\n<h2>Attempts</h2>\n");
        html.push_str("<table>\n<thead><tr><th>Test</th><th>Submitted</th><th>Marks</th><th>Score</th><th>Time</th><th>Submission</th></tr></thead>\n<tbody>\n");
        for a in &report.attempts {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.1} / {:.1}</td><td>{:.1}%</td><td>{}</td><td>{}</td></tr>\n",
                html_escape(&a.test_id),
                a.submitted_at.format("%Y-%m-%d %H:%M"),
                a.marks_obtained,
                a.marks_possible,
                a.percentage,
                format_duration(a.time_spent_seconds),
                a.submission,
            ));
        }
        html.push_str("</tbody></table>\n</section>\n");
    }

    // Strengths and weaknesses
    let strengths = report.strengths(&options.thresholds);
    let weaknesses = report.weaknesses(&options.thresholds);
    html.push_str("<section class=\"focus\">\n");
    html.push_str(&topic_list("Strengths", "strong", &strengths));
    html.push_str(&topic_list("Needs work", "weak", &weaknesses));
    html.push_str("</section>\n");

    // Chart + breakdown tables
    if !report.by_subject.is_empty() {
        html.push_str("<section>\n<h2>Accuracy by subject</h2>\n");
        html.push_str(&generate_bar_chart(&report.by_subject, &options.thresholds));
        html.push_str("</section>\n");
    }

    for (id, title, stats) in [
        ("subjects", "Subjects", &report.by_subject),
        ("topics", "Topics", &report.by_topic),
        ("subtopics", "Subtopics", &report.by_subtopic),
    ] {
        html.push_str(&breakdown_table(id, title, stats, &options.thresholds));
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(
    report: &CombinedReportData,
    options: &HtmlOptions,
    path: &Path,
) -> Result<()> {
    let html = generate_html(report, options);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn topic_list(title: &str, class: &str, topics: &[&TopicStatistic]) -> String {
    let mut html = format!("<div class=\"{class}\">\n<h3>{title}</h3>\n");
    if topics.is_empty() {
        html.push_str("<p class=\"meta\">None yet.</p>\n");
    } else {
        html.push_str("<ul>\n");
        for t in topics {
            html.push_str(&format!(
                "<li>{} <span class=\"meta\">{:.1}% ({}/{})</span></li>\n",
                html_escape(&t.label()),
                t.accuracy,
                t.correct,
                t.total
            ));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</div>\n");
    html
}

fn breakdown_table(
    id: &str,
    title: &str,
    stats: &[TopicStatistic],
    thresholds: &StrengthThresholds,
) -> String {
    if stats.is_empty() {
        return String::new();
    }

    let mut html = format!("<section>\n<h2>{title}</h2>\n<table id=\"{id}\">\n");
    html.push_str(&format!(
        "<thead><tr>{}</tr></thead>\n<tbody>\n",
        ["Bucket", "Questions", "Correct", "Incorrect", "Not answered", "Marks", "Accuracy"]
            .iter()
            .enumerate()
            .map(|(col, h)| format!("<th onclick=\"sortTable('{id}', {col})\">{h}</th>"))
            .collect::<String>()
    ));
    for s in stats {
        let class = match s.strength(thresholds) {
            Strength::Strong => "pass",
            Strength::Weak => "fail",
            Strength::Neutral => "",
        };
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.1} / {:.1}</td><td>{:.1}%</td></tr>\n",
            class,
            html_escape(&s.label()),
            s.total,
            s.correct,
            s.incorrect,
            s.not_answered,
            s.marks_obtained,
            s.marks_possible,
            s.accuracy
        ));
    }
    html.push_str("</tbody></table>\n</section>\n");
    html
}

fn generate_bar_chart(stats: &[TopicStatistic], thresholds: &StrengthThresholds) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 200;

    let total_height = stats.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, s) in stats.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (s.accuracy.clamp(0.0, 100.0) / 100.0 * max_width as f64) as usize;

        let color = match s.strength(thresholds) {
            Strength::Strong => "#22c55e",
            Strength::Neutral => "#eab308",
            Strength::Weak => "#ef4444",
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&s.label())
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            s.accuracy
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --muted: #6b7280; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: var(--muted); }
.warning { color: #b45309; }
.cards { display: flex; gap: 1rem; flex-wrap: wrap; }
.card { border: 1px solid var(--border); border-radius: 8px; padding: 1rem 1.5rem; display: flex; flex-direction: column; }
.card .label { color: var(--muted); font-size: 0.85rem; }
.card .value { font-size: 1.5rem; font-weight: bold; }
.focus { display: flex; gap: 3rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(id, col) {
  const table = document.getElementById(id);
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    const cmp = !isNaN(na) && !isNaN(nb) ? na - nb : va.localeCompare(vb);
    return asc ? cmp : -cmp;
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
