use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hmms::decode::{second_order_viterbi, top_m_viterbi, viterbi};
use hmms::{LabelSet, Model, Trainer};

/// Train on a synthetic corpus cycling through every label
fn synthetic_model(num_classes: usize) -> Model {
    let classes: Vec<String> = (0..num_classes).map(|i| format!("c{}", i)).collect();
    let labels = LabelSet::bio(&classes).unwrap();
    let domain: Vec<String> = labels
        .domain()
        .map(|label| labels.name(label).to_string())
        .collect();
    let mut trainer = Trainer::new(labels);
    for s in 0..50 {
        let len = 5 + s % 7;
        let words: Vec<String> = (0..len).map(|i| format!("w{}", (s * 7 + i) % 40)).collect();
        let tags: Vec<&str> = (0..len)
            .map(|i| domain[(s + i * 3) % domain.len()].as_str())
            .collect();
        trainer.append(&words, &tags).unwrap();
    }
    trainer.train()
}

fn observation(t: usize) -> Vec<String> {
    (0..t).map(|i| format!("w{}", (i * 11) % 45)).collect()
}

fn benchmark_viterbi_by_l(c: &mut Criterion) {
    let mut group = c.benchmark_group("viterbi_by_l");
    let xseq = observation(20);

    // 1, 2, 4 and 8 classes: 3, 5, 9 and 17 domain labels
    for classes in [1, 2, 4, 8] {
        let model = synthetic_model(classes);
        let l = model.labels().num_domain();
        group.bench_with_input(BenchmarkId::new("first_order", l), &model, |b, model| {
            b.iter(|| black_box(viterbi(model, &xseq).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("second_order", l), &model, |b, model| {
            b.iter(|| black_box(second_order_viterbi(model, &xseq).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("top_5", l), &model, |b, model| {
            b.iter(|| black_box(top_m_viterbi(model, 5, &xseq).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_viterbi_by_l);
criterion_main!(benches);
