//! The `examforge compare` command.

use std::path::PathBuf;

use anyhow::Result;

use examforge_core::statistics::CombinedReportData;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_regression: bool,
    format: String,
) -> Result<()> {
    anyhow::ensure!(threshold >= 0.0, "threshold must not be negative");

    let baseline = CombinedReportData::load_json(&baseline_path)?;
    let current = CombinedReportData::load_json(&current_path)?;

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Overall accuracy {:+.1} pts. {} regressions, {} improvements, {} unchanged",
                report.overall_delta,
                report.regressions.len(),
                report.improvements.len(),
                report.unchanged
            );

            for (title, changes) in [
                ("Regressions", &report.regressions),
                ("Improvements", &report.improvements),
            ] {
                if changes.is_empty() {
                    continue;
                }
                println!("\n{title}:");
                for c in changes {
                    println!(
                        "  {} ({}) {:.1}% -> {:.1}% ({:+.1} pts)",
                        c.label, c.level, c.baseline_accuracy, c.current_accuracy, c.delta
                    );
                }
            }

            if report.new_buckets > 0 {
                println!("\n{} new subject/topic bucket(s)", report.new_buckets);
            }
            if report.removed_buckets > 0 {
                println!("{} removed subject/topic bucket(s)", report.removed_buckets);
            }
        }
    }

    if fail_on_regression && report.has_regressions() {
        std::process::exit(1);
    }

    Ok(())
}
