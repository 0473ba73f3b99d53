use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examforge_core::model::{
    Answer, AnswerKey, BoundQuestion, QuestionDefinition, TestQuestionBinding,
};
use examforge_core::scoring::score_answer;

fn bound(answer: AnswerKey) -> BoundQuestion {
    BoundQuestion {
        binding: TestQuestionBinding {
            question_id: "bench".into(),
            position: 1,
            section_id: None,
            subsection_id: None,
            marks: Some(4.0),
            negative_marks: Some(1.0),
        },
        definition: QuestionDefinition {
            id: "bench".into(),
            prompt: String::new(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            answer,
            marks: 1.0,
            penalty: 0.0,
            subject: None,
            topic: None,
            subtopic: None,
        },
    }
}

fn bench_score_answer(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_answer");

    let single = bound(AnswerKey::Single(2));
    let choice = Answer::Choice(2);
    group.bench_function("single", |b| {
        b.iter(|| score_answer(black_box(&single), black_box(Some(&choice))))
    });

    let multiple = bound(AnswerKey::Multiple(BTreeSet::from([0, 2, 3])));
    let choices = Answer::Choices(BTreeSet::from([0, 2, 3]));
    group.bench_function("multiple", |b| {
        b.iter(|| score_answer(black_box(&multiple), black_box(Some(&choices))))
    });

    let numeric = bound(AnswerKey::Numeric("9.81".into()));
    let typed = Answer::Numeric(" 9.810 ".into());
    group.bench_function("numeric", |b| {
        b.iter(|| score_answer(black_box(&numeric), black_box(Some(&typed))))
    });

    group.bench_function("unanswered", |b| {
        b.iter(|| score_answer(black_box(&single), black_box(None)))
    });

    group.finish();
}

criterion_group!(benches, bench_score_answer);
criterion_main!(benches);
