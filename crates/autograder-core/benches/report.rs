use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use autograder_core::assignment::AssignmentRecord;
use autograder_core::question::Scoresheet;

fn make_record(questions: usize) -> AssignmentRecord {
    let questions = (0..questions)
        .map(|i| {
            let mut sheet = Scoresheet::new(format!("Question {i}"), 10);
            sheet.full_credit();
            if i % 3 == 0 {
                sheet.add_message("wrong result for empty input", -2);
                sheet.add_message("wrong result for negative input", -3);
            }
            sheet
        })
        .collect();

    AssignmentRecord {
        name: "bench".into(),
        start: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 1, 1, 12, 5, 0).unwrap(),
        questions,
    }
}

fn bench_transcript(c: &mut Criterion) {
    let mut group = c.benchmark_group("transcript");

    for size in [10, 100, 1000] {
        let record = make_record(size);
        group.bench_function(format!("questions={size}"), |b| {
            b.iter(|| black_box(&record).transcript(black_box("Q")))
        });
    }

    group.finish();
}

fn bench_record_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_json");
    let record = make_record(100);
    let json = serde_json::to_string(&record).unwrap();

    group.bench_function("serialize", |b| {
        b.iter(|| serde_json::to_string(black_box(&record)).unwrap())
    });

    group.bench_function("deserialize", |b| {
        b.iter(|| serde_json::from_str::<AssignmentRecord>(black_box(&json)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_transcript, bench_record_json);
criterion_main!(benches);
