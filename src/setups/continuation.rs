//! Trend-continuation setup: pullback to a level inside an established trend,
//! with RSI recovering through its boundary on the current bar.

use crate::config::SignalConfig;
use crate::setups::{crossed_above, crossed_below, last_pair, near_level, value_at, Setup};
use crate::{Confidence, Direction, SeriesBundle, SetupVote, OHLC};

const NAME: &str = "trend_continuation";
const WEIGHT: f64 = 1.0;

/// Fires RISE when price holds above the medium EMA, the close is near
/// support, and RSI(6) crossed back above the oversold boundary on this bar
/// (being above the boundary is not enough). Mirrored for FALL with the
/// boundary reflected to `100 - boundary`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendContinuationSetup;

impl Setup for TrendContinuationSetup {
    fn name(&self) -> &'static str {
        NAME
    }

    fn evaluate<T: OHLC>(&self, bars: &[T], series: &SeriesBundle, cfg: &SignalConfig) -> SetupVote {
        let len = bars.len();
        let Some(close) = series.close.last().copied() else {
            return SetupVote::neutral(NAME, WEIGHT, "insufficient history");
        };
        let Some(ema) = value_at(&series.ema_medium, len - 1) else {
            return SetupVote::neutral(NAME, WEIGHT, "ema warm-up incomplete");
        };
        let Some((rsi_prev, rsi_now)) = last_pair(&series.rsi_classic) else {
            return SetupVote::neutral(NAME, WEIGHT, "rsi warm-up incomplete");
        };

        let c = &cfg.continuation;
        if close > ema
            && near_level(close, series.support, c.near_tolerance)
            && crossed_above(rsi_prev, rsi_now, c.rsi_boundary)
        {
            return SetupVote::new(
                NAME,
                Direction::Rise,
                Confidence::saturating(c.confidence as i64),
                format!("pullback held, rsi recovered through {:.0}", c.rsi_boundary),
                WEIGHT,
            )
            .with_aux("rsi", rsi_now)
            .with_aux("ema", ema);
        }

        let upper = 100.0 - c.rsi_boundary;
        if close < ema
            && near_level(close, series.resistance, c.near_tolerance)
            && crossed_below(rsi_prev, rsi_now, upper)
        {
            return SetupVote::new(
                NAME,
                Direction::Fall,
                Confidence::saturating(c.confidence as i64),
                format!("rally faded, rsi rejected through {upper:.0}"),
                WEIGHT,
            )
            .with_aux("rsi", rsi_now)
            .with_aux("ema", ema);
        }

        SetupVote::neutral(NAME, WEIGHT, "no continuation pullback")
    }
}
