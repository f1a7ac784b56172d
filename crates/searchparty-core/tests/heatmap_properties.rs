//! Property tests for decay and heatmap aggregation
//!
//! Run with: cargo test -p searchparty-core --test heatmap_properties

use std::sync::Arc;

use proptest::prelude::*;
use searchparty_core::{
    decay, DecayCurve, ExponentialDecay, HeatmapAggregator, InMemoryLocationStore, LocationStore,
    ParticipantId, PartyId, PointCategory, Position, Timestamp,
};

const NOW: i64 = 1_700_000_000_000;

/// Rounding slack for comparisons between separately computed intensities
const EPSILON: f64 = 1e-12;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Store seeded with one history sample per age, all from distinct participants
fn store_with_ages(ages: &[i64]) -> Arc<InMemoryLocationStore> {
    let store = Arc::new(InMemoryLocationStore::new());
    let party = PartyId::from("party");
    block_on(async {
        for (i, age) in ages.iter().enumerate() {
            store
                .append_history(
                    &party,
                    &ParticipantId::new(format!("p{:03}", i)),
                    Position::new(37.0, -122.0).unwrap(),
                    Timestamp::from_millis(NOW - age),
                )
                .await
                .unwrap();
        }
    });
    store
}

// === Boundary scenarios ===

#[test]
fn test_sample_at_window_boundary_is_included() {
    let window = 3_600_000;
    let store = store_with_ages(&[window]);
    let points = block_on(HeatmapAggregator::new(store).aggregate(
        &PartyId::from("party"),
        &ParticipantId::from("viewer"),
        chrono::Duration::milliseconds(window),
        Timestamp::from_millis(NOW),
    ))
    .unwrap();

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].category, PointCategory::History);
    assert_eq!(points[0].intensity, 0.1);
}

#[test]
fn test_sample_past_window_boundary_is_excluded() {
    let window = 3_600_000;
    let store = store_with_ages(&[window + 1]);
    let points = block_on(HeatmapAggregator::new(store).aggregate(
        &PartyId::from("party"),
        &ParticipantId::from("viewer"),
        chrono::Duration::milliseconds(window),
        Timestamp::from_millis(NOW),
    ))
    .unwrap();

    assert!(points.is_empty());
}

proptest! {
    #[test]
    fn test_history_points_stay_inside_window(
        window in 1_000i64..7_200_000,
        ages in prop::collection::vec(0i64..10_000_000, 1..40),
    ) {
        let store = store_with_ages(&ages);
        let points = block_on(HeatmapAggregator::new(store).aggregate(
            &PartyId::from("party"),
            &ParticipantId::from("viewer"),
            chrono::Duration::milliseconds(window),
            Timestamp::from_millis(NOW),
        ))
        .unwrap();

        let expected = ages.iter().filter(|age| **age <= window).count();
        prop_assert_eq!(points.len(), expected);
        for point in &points {
            let age = NOW - point.timestamp.as_millis();
            prop_assert!(age >= 0 && age <= window, "age {} outside window {}", age, window);
            prop_assert!(point.intensity >= 0.1 - EPSILON && point.intensity <= 0.8 + EPSILON);
        }
    }

    #[test]
    fn test_linear_decay_is_monotonic(
        window in 1i64..10_000_000,
        a in 0i64..10_000_000,
        b in 0i64..10_000_000,
    ) {
        let (young, old) = if a <= b { (a, b) } else { (b, a) };
        prop_assume!(old <= window);

        let young_intensity = decay(young, window).unwrap();
        let old_intensity = decay(old, window).unwrap();
        prop_assert!(
            young_intensity + EPSILON >= old_intensity,
            "decay({}) = {} < decay({}) = {}", young, young_intensity, old, old_intensity
        );
    }

    #[test]
    fn test_exponential_decay_is_monotonic(
        half_life in 1i64..3_600_000,
        a in 0i64..3_600_000,
        b in 0i64..3_600_000,
    ) {
        let curve = ExponentialDecay { min: 0.1, max: 0.8, half_life_ms: half_life };
        let (young, old) = if a <= b { (a, b) } else { (b, a) };

        let young_intensity = curve.intensity(young, 3_600_000).unwrap();
        let old_intensity = curve.intensity(old, 3_600_000).unwrap();
        prop_assert!(young_intensity + EPSILON >= old_intensity);
        prop_assert!(old_intensity >= 0.1);
    }

    #[test]
    fn test_aggregate_is_reproducible(
        ages in prop::collection::vec(0i64..3_600_000, 0..30),
    ) {
        let store = store_with_ages(&ages);
        let aggregator = HeatmapAggregator::new(store);
        let run = || block_on(aggregator.aggregate(
            &PartyId::from("party"),
            &ParticipantId::from("viewer"),
            chrono::Duration::hours(1),
            Timestamp::from_millis(NOW),
        ))
        .unwrap();

        let first = run();
        let second = run();
        prop_assert_eq!(first.len(), second.len());
        for (x, y) in first.iter().zip(second.iter()) {
            prop_assert_eq!(x.intensity.to_bits(), y.intensity.to_bits());
            prop_assert_eq!(&x.participant, &y.participant);
        }
    }

    #[test]
    fn test_distinct_history_samples_all_retrievable(
        offsets in prop::collection::btree_set(0i64..1_000_000, 1..50),
    ) {
        let store = InMemoryLocationStore::new();
        let party = PartyId::from("party");
        let walker = ParticipantId::from("walker");

        let history = block_on(async {
            for offset in &offsets {
                store
                    .append_history(
                        &party,
                        &walker,
                        Position::new(10.0, 10.0).unwrap(),
                        Timestamp::from_millis(NOW - offset),
                    )
                    .await
                    .unwrap();
            }
            store
                .query_history(&party, Timestamp::from_millis(0), None)
                .await
                .unwrap()
        });

        prop_assert_eq!(history.len(), offsets.len());
        for pair in history.windows(2) {
            prop_assert!(pair[0].timestamp > pair[1].timestamp);
        }
    }
}
