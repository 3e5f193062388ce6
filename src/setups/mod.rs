//! The setup battery: independent rule-based classifiers, each contributing
//! one directional vote per classification call.
//!
//! Setups read precomputed series off the [`SeriesBundle`] and never depend on
//! each other's output. Every setup degrades to a neutral vote (confidence 45)
//! with a reason string when its conditions do not fire or history is too
//! short; none can panic.

mod confluence;
mod continuation;
mod ichimoku_trend;
mod reversal;
mod scalp;
mod trap;
mod trend_filter;

pub use confluence::EmaStochConfluenceSetup;
pub use continuation::TrendContinuationSetup;
pub use ichimoku_trend::IchimokuTrendSetup;
pub use reversal::LevelReversalSetup;
pub use scalp::MomentumScalpSetup;
pub use trap::CandleTrapSetup;
pub use trend_filter::TrendFilterSetup;

use crate::config::SignalConfig;
use crate::{SeriesBundle, SetupVote, OHLC};

/// One independent classifier in the battery.
pub trait Setup {
    fn name(&self) -> &'static str;

    /// Display weight carried on the vote; never an aggregation input.
    fn weight(&self) -> f64 {
        1.0
    }

    fn evaluate<T: OHLC>(&self, bars: &[T], series: &SeriesBundle, cfg: &SignalConfig) -> SetupVote;
}

/// The builtin battery, dispatched without dynamic allocation.
#[derive(Debug, Clone, Copy)]
pub enum BuiltinSetup {
    IchimokuTrend(IchimokuTrendSetup),
    LevelReversal(LevelReversalSetup),
    TrendContinuation(TrendContinuationSetup),
    EmaStochConfluence(EmaStochConfluenceSetup),
    TrendFilter(TrendFilterSetup),
    MomentumScalp(MomentumScalpSetup),
    CandleTrap(CandleTrapSetup),
}

impl BuiltinSetup {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinSetup::IchimokuTrend(s) => s.name(),
            BuiltinSetup::LevelReversal(s) => s.name(),
            BuiltinSetup::TrendContinuation(s) => s.name(),
            BuiltinSetup::EmaStochConfluence(s) => s.name(),
            BuiltinSetup::TrendFilter(s) => s.name(),
            BuiltinSetup::MomentumScalp(s) => s.name(),
            BuiltinSetup::CandleTrap(s) => s.name(),
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            BuiltinSetup::IchimokuTrend(s) => s.weight(),
            BuiltinSetup::LevelReversal(s) => s.weight(),
            BuiltinSetup::TrendContinuation(s) => s.weight(),
            BuiltinSetup::EmaStochConfluence(s) => s.weight(),
            BuiltinSetup::TrendFilter(s) => s.weight(),
            BuiltinSetup::MomentumScalp(s) => s.weight(),
            BuiltinSetup::CandleTrap(s) => s.weight(),
        }
    }

    pub fn evaluate<T: OHLC>(
        &self,
        bars: &[T],
        series: &SeriesBundle,
        cfg: &SignalConfig,
    ) -> SetupVote {
        match self {
            BuiltinSetup::IchimokuTrend(s) => s.evaluate(bars, series, cfg),
            BuiltinSetup::LevelReversal(s) => s.evaluate(bars, series, cfg),
            BuiltinSetup::TrendContinuation(s) => s.evaluate(bars, series, cfg),
            BuiltinSetup::EmaStochConfluence(s) => s.evaluate(bars, series, cfg),
            BuiltinSetup::TrendFilter(s) => s.evaluate(bars, series, cfg),
            BuiltinSetup::MomentumScalp(s) => s.evaluate(bars, series, cfg),
            BuiltinSetup::CandleTrap(s) => s.evaluate(bars, series, cfg),
        }
    }
}

// ============================================================
// SHARED HELPERS
// ============================================================

/// Finite value at an index; None when out of bounds or still warming up.
#[inline]
pub(crate) fn value_at(series: &[f64], index: usize) -> Option<f64> {
    series.get(index).copied().filter(|v| v.is_finite())
}

/// Finite (previous, current) pair at the latest index.
#[inline]
pub(crate) fn last_pair(series: &[f64]) -> Option<(f64, f64)> {
    let len = series.len();
    if len < 2 {
        return None;
    }
    Some((value_at(series, len - 2)?, value_at(series, len - 1)?))
}

/// "Near level" test: `|price - level| / price <= tolerance`. A missing level
/// is never near.
#[inline]
pub(crate) fn near_level(price: f64, level: Option<f64>, tolerance: f64) -> bool {
    match level {
        Some(level) if price > 0.0 => (price - level).abs() / price <= tolerance,
        _ => false,
    }
}

/// Relative slope of a series over `bars` trailing bars ending at `end`:
/// `(series[end] - series[end - bars]) / series[end - bars]`.
pub(crate) fn relative_slope(series: &[f64], end: usize, bars: usize) -> Option<f64> {
    let back = end.checked_sub(bars)?;
    let from = value_at(series, back)?;
    let to = value_at(series, end)?;
    (from.abs() > f64::EPSILON).then(|| (to - from) / from)
}

/// Did `series` cross from at-or-below `level` to strictly above it on the
/// latest bar?
#[inline]
pub(crate) fn crossed_above(prev: f64, now: f64, level: f64) -> bool {
    prev <= level && now > level
}

#[inline]
pub(crate) fn crossed_below(prev: f64, now: f64, level: f64) -> bool {
    prev >= level && now < level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_at_filters_nan_and_bounds() {
        let series = [f64::NAN, 1.0, 2.0];
        assert_eq!(value_at(&series, 0), None);
        assert_eq!(value_at(&series, 1), Some(1.0));
        assert_eq!(value_at(&series, 3), None);
    }

    #[test]
    fn near_level_handles_missing() {
        assert!(near_level(100.0, Some(100.2), 0.003));
        assert!(!near_level(100.0, Some(101.0), 0.003));
        assert!(!near_level(100.0, None, 0.003));
    }

    #[test]
    fn slope_is_relative() {
        let series = [100.0, 101.0, 102.0, 103.0];
        let slope = relative_slope(&series, 3, 3).unwrap();
        assert!((slope - 0.03).abs() < 1e-12);
        // not enough history
        assert_eq!(relative_slope(&series, 3, 4), None);
    }

    #[test]
    fn cross_requires_both_sides() {
        assert!(crossed_above(49.0, 51.0, 50.0));
        assert!(crossed_above(50.0, 51.0, 50.0));
        assert!(!crossed_above(51.0, 52.0, 50.0));
        assert!(crossed_below(50.0, 49.0, 50.0));
        assert!(!crossed_below(49.0, 48.0, 50.0));
    }
}
