//! The `examforge report` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Color, Table};

use examforge_core::statistics::{
    CombinedReportData, Strength, StrengthThresholds, TopicStatistic,
};
use examforge_report::{write_html_report, HtmlOptions};

use crate::context::{AppContext, Overrides};

pub async fn execute(
    overrides: &Overrides,
    student_id: String,
    test_id: Option<String>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let ctx = AppContext::load(overrides)?;
    let engine = ctx.engine();
    let thresholds = ctx.config.thresholds();

    let report = match &test_id {
        Some(test_id) => engine
            .attempt_report(&student_id, test_id)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("no result stored for student '{student_id}' on test '{test_id}'")
            })?,
        None => engine.student_report(&student_id).await?,
    };

    if report.tests_attempted() == 0 {
        println!("No results stored for student '{student_id}'.");
        return Ok(());
    }

    match format.as_str() {
        "json" => match output {
            Some(path) => {
                report.save_json(&path)?;
                eprintln!("Report saved to: {}", path.display());
            }
            None => println!("{}", serde_json::to_string_pretty(&report)?),
        },
        "html" => {
            let path =
                output.unwrap_or_else(|| PathBuf::from(format!("report-{student_id}.html")));
            let options = HtmlOptions {
                thresholds,
                ..HtmlOptions::new(&student_id)
            };
            write_html_report(&report, &options, &path)?;
            eprintln!("HTML report: {}", path.display());
        }
        _ => print_summary(&student_id, &report, &thresholds),
    }

    Ok(())
}

fn print_summary(student_id: &str, report: &CombinedReportData, thresholds: &StrengthThresholds) {
    let o = &report.overall;
    println!(
        "Student {student_id}: {} test(s), {} question(s), accuracy {:.1}%, marks {:.2} / {:.2}",
        report.tests_attempted(),
        o.total,
        o.accuracy,
        o.marks_obtained,
        o.marks_possible
    );
    println!(
        "Correct {} | Incorrect {} | Not answered {} | Time {}m",
        o.correct,
        o.incorrect,
        o.not_answered,
        report.total_time_spent_seconds / 60
    );
    if report.unresolved_records > 0 {
        println!(
            "{} response(s) refer to unknown questions and are counted under \"Other\".",
            report.unresolved_records
        );
    }

    for (title, stats) in [
        ("Subject", &report.by_subject),
        ("Topic", &report.by_topic),
        ("Subtopic", &report.by_subtopic),
    ] {
        println!("\n{}", breakdown_table(title, stats, thresholds));
    }

    let labels = |topics: Vec<&TopicStatistic>| -> Vec<String> {
        topics.iter().map(|t| t.label()).collect()
    };
    let strengths = labels(report.strengths(thresholds));
    let weaknesses = labels(report.weaknesses(thresholds));
    if !strengths.is_empty() {
        println!("\nStrengths: {}", strengths.join(", "));
    }
    if !weaknesses.is_empty() {
        println!("Needs work: {}", weaknesses.join(", "));
    }
}

fn breakdown_table(
    title: &str,
    stats: &[TopicStatistic],
    thresholds: &StrengthThresholds,
) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        title,
        "Questions",
        "Correct",
        "Incorrect",
        "Skipped",
        "Marks",
        "Accuracy",
    ]);

    for s in stats {
        let accuracy = Cell::new(format!("{:.1}%", s.accuracy));
        let accuracy = match s.strength(thresholds) {
            Strength::Strong => accuracy.fg(Color::Green),
            Strength::Weak => accuracy.fg(Color::Red),
            Strength::Neutral => accuracy,
        };
        table.add_row(vec![
            Cell::new(s.label()),
            Cell::new(s.total),
            Cell::new(s.correct),
            Cell::new(s.incorrect),
            Cell::new(s.not_answered),
            Cell::new(format!("{:.2} / {:.2}", s.marks_obtained, s.marks_possible)),
            accuracy,
        ]);
    }

    table
}
