/// Quality screen, dedup and balanced selection over a synthetic pool.
use std::collections::HashSet;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use digest_worker::pipeline::config::{QualityConfig, SelectionConfig};
use digest_worker::pipeline::dedup::FuzzyDeduplicator;
use digest_worker::pipeline::quality::QualityFilter;
use digest_worker::pipeline::select::BalancedSelector;
use digest_worker::store::RawUpdate;

const AUTHORITIES: &[&str] = &[
    "FCA",
    "PRA",
    "Bank of England",
    "HM Treasury",
    "Payment Systems Regulator",
    "ESMA",
    "SEC",
];

fn synthetic_pool(size: usize) -> Vec<RawUpdate> {
    (0..size)
        .map(|i| {
            let authority = AUTHORITIES[i % AUTHORITIES.len()];
            RawUpdate {
                id: Some(format!("bench-{i}")),
                headline: format!("{authority} statement on prudential reporting item {}", i / 3),
                summary: Some(format!(
                    "Firms supervised by {authority} must review reporting item {i} this quarter."
                )),
                authority: Some(authority.to_string()),
                region: (i % 4 == 0).then(|| "EU".to_string()),
                relevance_score: Some(u8::try_from(i % 101).unwrap_or(0)),
                ..RawUpdate::default()
            }
        })
        .collect()
}

fn bench_filter_and_select(c: &mut Criterion) {
    let pool = synthetic_pool(2_000);
    let history: HashSet<String> = (0..200).map(|i| format!("bench-{}", i * 7)).collect();
    let quality = QualityConfig::default();
    let selection = SelectionConfig::default();
    let filter = QualityFilter::new(&quality, &history, false).expect("filter");
    let dedup = FuzzyDeduplicator::new();
    let selector = BalancedSelector::new(&selection);

    c.bench_function("filter_dedup_select_2k", |b| {
        b.iter(|| {
            let outcome = filter.apply(pool.clone());
            let state = selector.select(dedup.deduplicate(outcome.survivors));
            black_box(state.len());
        });
    });
}

criterion_group!(benches, bench_filter_and_select);
criterion_main!(benches);
