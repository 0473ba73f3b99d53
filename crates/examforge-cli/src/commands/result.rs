//! The `examforge result` command.

use anyhow::Result;
use comfy_table::{Cell, Color, Table};

use examforge_core::results::TestResult;
use examforge_core::traits::ResultStore;

use crate::context::{AppContext, Overrides};

pub async fn execute(
    overrides: &Overrides,
    student_id: String,
    test_id: String,
    format: String,
) -> Result<()> {
    let ctx = AppContext::load(overrides)?;

    let Some(result) = ctx.store.find_existing_result(&student_id, &test_id).await? else {
        anyhow::bail!("no result stored for student '{student_id}' on test '{test_id}'");
    };

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_result(&result),
    }

    Ok(())
}

/// Render a result as a per-question table followed by the totals.
pub fn print_result(result: &TestResult) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Section", "Answer", "Correct", "Marks"]);

    for r in &result.responses {
        let answer = r
            .answer
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        let marks = Cell::new(format!("{:+.2}", r.marks_obtained));
        let marks = if !r.is_answered() {
            marks
        } else if r.is_correct {
            marks.fg(Color::Green)
        } else {
            marks.fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(r.index + 1),
            Cell::new(&r.question_id),
            Cell::new(r.section_id.as_deref().unwrap_or("-")),
            Cell::new(answer),
            Cell::new(r.correct_answer.to_string()),
            marks,
        ]);
    }

    let t = &result.totals;
    println!("Result {} ({} / {})", result.id, result.student_id, result.test_id);
    println!("{table}");
    println!(
        "Correct {} | Incorrect {} | Not answered {} | Marks {:.2} / {:.2} ({:.1}%)",
        t.correct,
        t.incorrect,
        t.not_answered,
        t.marks_obtained,
        t.marks_possible,
        t.percentage()
    );
    println!(
        "Time spent {}m {:02}s | Submitted {} ({})",
        result.time_spent_seconds / 60,
        result.time_spent_seconds % 60,
        result.created_at.to_datetime().format("%Y-%m-%d %H:%M:%S UTC"),
        result.submission
    );
}
