//! Vote aggregation: majority/plurality with a noise guard.
//!
//! Weights on individual votes are display metadata; aggregation counts
//! directions only. Ties always resolve to neutral.

use crate::{Confidence, Direction, SetupVote, Strength};

/// Vote counts by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct VoteTally {
    pub rise: usize,
    pub fall: usize,
    pub neutral: usize,
}

impl VoteTally {
    #[inline]
    pub fn total(&self) -> usize {
        self.rise + self.fall + self.neutral
    }
}

/// Count votes by direction.
pub fn tally(votes: &[SetupVote]) -> VoteTally {
    let mut t = VoteTally::default();
    for vote in votes {
        match vote.direction {
            Direction::Rise => t.rise += 1,
            Direction::Fall => t.fall += 1,
            Direction::Neutral => t.neutral += 1,
        }
    }
    t
}

/// Composite label selection, in priority order: at least 5 agreeing votes is
/// STRONG, exactly 4 is plain, exactly 3 with at most 1 opposing is WEAK,
/// anything else (ties included) is neutral.
pub fn decide(tally: &VoteTally) -> (Direction, Strength) {
    if tally.rise == tally.fall {
        return (Direction::Neutral, Strength::None);
    }
    let (direction, lead, opposing) = if tally.rise > tally.fall {
        (Direction::Rise, tally.rise, tally.fall)
    } else {
        (Direction::Fall, tally.fall, tally.rise)
    };
    let strength = match lead {
        n if n >= 5 => Strength::Strong,
        4 => Strength::Moderate,
        3 if opposing <= 1 => Strength::Weak,
        _ => Strength::None,
    };
    if strength == Strength::None {
        (Direction::Neutral, Strength::None)
    } else {
        (direction, strength)
    }
}

/// Overall confidence: `round(max(rise, fall) / total * 100)`; 0 for an empty
/// battery.
pub fn overall_confidence(tally: &VoteTally) -> Confidence {
    let total = tally.total();
    if total == 0 {
        return Confidence::ZERO;
    }
    let lead = tally.rise.max(tally.fall) as f64;
    Confidence::saturating((lead / total as f64 * 100.0).round() as i64)
}

/// Combined display label for a direction/strength pair.
pub fn label(direction: Direction, strength: Strength) -> &'static str {
    match (direction, strength) {
        (Direction::Rise, Strength::Strong) => "STRONG RISE",
        (Direction::Rise, Strength::Moderate) => "RISE",
        (Direction::Rise, Strength::Weak) => "WEAK RISE",
        (Direction::Fall, Strength::Strong) => "STRONG FALL",
        (Direction::Fall, Strength::Moderate) => "FALL",
        (Direction::Fall, Strength::Weak) => "WEAK FALL",
        _ => "NEUTRAL",
    }
}

// ============================================================
// TESTS
// ============================================================
