//! Property-based tests over the series math and the aggregator.

use proptest::prelude::*;
use yasce::prelude::*;

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Rise),
        Just(Direction::Fall),
        Just(Direction::Neutral),
    ]
}

fn vote(direction: Direction, confidence: u8) -> SetupVote {
    SetupVote::new(
        "prop_setup",
        direction,
        Confidence::saturating(confidence as i64),
        "generated",
        1.0,
    )
}

proptest! {
    #[test]
    fn rsi_stays_in_unit_percent_range(
        values in prop::collection::vec(0.01f64..10_000.0, 5..200),
        period in 2usize..20,
    ) {
        for v in rsi(&values, period).iter().filter(|v| v.is_finite()) {
            prop_assert!((0.0..=100.0).contains(v), "rsi out of range: {v}");
        }
    }

    #[test]
    fn flat_window_stochastic_is_midpoint(
        price in 1.0f64..10_000.0,
        len in 10usize..100,
    ) {
        let series = vec![price; len];
        let stoch = stochastic(&series, &series, &series, 5, 3, 3);
        for k in stoch.k.iter().filter(|v| v.is_finite()) {
            prop_assert_eq!(*k, 50.0);
        }
    }

    #[test]
    fn ema_of_positive_series_is_finite_and_positive(
        values in prop::collection::vec(0.01f64..10_000.0, 1..200),
        period in 1usize..50,
    ) {
        for v in ema(&values, period) {
            prop_assert!(v.is_finite() && v > 0.0);
        }
    }

    #[test]
    fn tally_count_invariant(
        directions in prop::collection::vec(direction_strategy(), 0..30),
        confidence in 0u8..=100,
    ) {
        let votes: Vec<SetupVote> = directions.iter().map(|&d| vote(d, confidence)).collect();
        let t = tally(&votes);
        prop_assert_eq!(t.total(), votes.len());
        prop_assert_eq!(
            t.rise,
            directions.iter().filter(|d| **d == Direction::Rise).count()
        );
    }

    #[test]
    fn ties_always_resolve_neutral(
        pairs in 0usize..10,
        neutrals in 0usize..10,
        rise_confidence in 0u8..=100,
        fall_confidence in 0u8..=100,
    ) {
        // equal rise/fall counts regardless of per-vote confidences
        let mut votes = Vec::new();
        for _ in 0..pairs {
            votes.push(vote(Direction::Rise, rise_confidence));
            votes.push(vote(Direction::Fall, fall_confidence));
        }
        for _ in 0..neutrals {
            votes.push(vote(Direction::Neutral, 45));
        }
        let (direction, strength) = decide(&tally(&votes));
        prop_assert_eq!(direction, Direction::Neutral);
        prop_assert_eq!(strength, Strength::None);
    }

    #[test]
    fn overall_confidence_is_lead_share(
        rise in 0usize..10,
        fall in 0usize..10,
        neutral in 0usize..10,
    ) {
        let t = VoteTally { rise, fall, neutral };
        let confidence = overall_confidence(&t);
        if t.total() == 0 {
            prop_assert_eq!(confidence.get(), 0);
        } else {
            let expected = (rise.max(fall) as f64 / t.total() as f64 * 100.0).round() as u8;
            prop_assert_eq!(confidence.get(), expected);
        }
    }
}
