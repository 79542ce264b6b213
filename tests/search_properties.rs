//! Property-based check of the cosine score invariant from the spec's
//! testable properties: for any query and stored vector with norm >= epsilon,
//! the returned score equals `cos(q, v)` within a documented tolerance.

use embedstore::{Id, Store, StoreOptions};
use proptest::prelude::*;

const DIM: usize = 6;

fn reference_cosine(q: &[f32], v: &[f32]) -> f32 {
    let dot: f64 = q.iter().zip(v).map(|(&a, &b)| f64::from(a) * f64::from(b)).sum();
    let qn: f64 = q.iter().map(|&a| f64::from(a) * f64::from(a)).sum::<f64>().sqrt();
    let vn: f64 = v.iter().map(|&a| f64::from(a) * f64::from(a)).sum::<f64>().sqrt();
    (dot / (qn * vn)) as f32
}

fn non_degenerate_vec() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-10.0f32..10.0, DIM).prop_filter("norm >= 1e-3", |v| {
        v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt() >= 1e-3
    })
}

proptest! {
    #[test]
    fn search_score_matches_reference_cosine(query in non_degenerate_vec(), stored in non_degenerate_vec()) {
        let store = Store::open(StoreOptions::ephemeral(DIM as u32)).unwrap();
        store.append(Id::new([1; 16]), &stored, true).unwrap();

        let results = store.search(&query, 1, -1.0, true).unwrap();
        prop_assert_eq!(results.len(), 1);

        let expected = reference_cosine(&query, &stored);
        let actual = results[0].score;
        let tolerance = (expected.abs() * 1e-5).max(1e-5);
        prop_assert!(
            (actual - expected).abs() <= tolerance,
            "actual {} vs expected {} (tolerance {})",
            actual,
            expected,
            tolerance
        );
    }
}
