use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use examforge_core::model::{Answer, AnswerKey, QuestionDefinition};
use examforge_core::results::{ResponseRecord, ResultTotals, SubmissionKind, TestResult};
use examforge_core::statistics::aggregate_results;
use examforge_core::timestamp::Timestamp;

const SUBJECTS: [&str; 3] = ["Physics", "Chemistry", "Maths"];
const TOPICS: [&str; 4] = ["Alpha", "Beta", "Gamma", "Delta"];

fn question_bank(count: usize) -> HashMap<String, QuestionDefinition> {
    (0..count)
        .map(|i| {
            let q = QuestionDefinition {
                id: format!("q{i}"),
                prompt: String::new(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                answer: AnswerKey::Single(i % 4),
                marks: 4.0,
                penalty: 1.0,
                subject: Some(SUBJECTS[i % SUBJECTS.len()].into()),
                topic: Some(TOPICS[i % TOPICS.len()].into()),
                subtopic: (i % 3 == 0).then(|| format!("Part {}", i % 5)),
            };
            (q.id.clone(), q)
        })
        .collect()
}

fn results(attempts: usize, per_test: usize) -> Vec<TestResult> {
    (0..attempts)
        .map(|a| {
            let responses: Vec<ResponseRecord> = (0..per_test)
                .map(|i| {
                    let answered = (a + i) % 5 != 0;
                    let is_correct = answered && (a * i) % 3 != 0;
                    ResponseRecord {
                        question_id: format!("q{}", (a * per_test + i) % 200),
                        index: i,
                        section_id: None,
                        answer: answered.then_some(Answer::Choice(i % 4)),
                        correct_answer: AnswerKey::Single(i % 4),
                        is_correct,
                        marks_obtained: match (answered, is_correct) {
                            (false, _) => 0.0,
                            (true, true) => 4.0,
                            (true, false) => -1.0,
                        },
                        marks_available: Some(4.0),
                    }
                })
                .collect();
            TestResult {
                id: format!("r{a}"),
                test_id: format!("t{a}"),
                student_id: "bench".into(),
                totals: ResultTotals::from_responses(&responses),
                responses,
                time_spent_seconds: 600,
                submission: SubmissionKind::Manual,
                created_at: Timestamp::Millis(1_700_000_000_000 + a as i64),
            }
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let bank = question_bank(200);
    let mut group = c.benchmark_group("aggregate_results");

    for attempts in [1, 10, 50] {
        let data = results(attempts, 90);
        group.bench_with_input(BenchmarkId::from_parameter(attempts), &data, |b, data| {
            b.iter(|| aggregate_results(black_box(data), black_box(&bank)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
