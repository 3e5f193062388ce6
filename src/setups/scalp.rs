//! Momentum scalp setup: RSI(3) midline cross with candle-color flip, EMA
//! side check, ATR-based size prefilters, cooldown and hard invalidation.

use crate::config::SignalConfig;
use crate::setups::{value_at, Setup};
use crate::{Confidence, Direction, OHLCExt, SeriesBundle, SetupVote, OHLC};

const NAME: &str = "momentum_scalp";
const WEIGHT: f64 = 0.9;
const MIDLINE: f64 = 50.0;

/// Fires when RSI(3) crosses the 50 midline on the latest bar, the prior
/// candle was opposite-colored, the close sits on the correct side of EMA(9),
/// and the ATR(14) body floor holds on the current bar and at least two of the
/// last three. A same-direction trigger inside the cooldown window suppresses
/// the vote, as does a hard invalidation (a full engulfing reversal right
/// after the most recent prior trigger). Cooldown and invalidation are
/// replayed over the trailing bars against the precomputed series.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumScalpSetup;

/// The raw trigger rule at bar `i`, read off precomputed series.
fn trigger_at<T: OHLC>(
    bars: &[T],
    rsi: &[f64],
    ema: &[f64],
    atr: &[f64],
    cfg: &SignalConfig,
    i: usize,
    direction: Direction,
) -> bool {
    if i == 0 || i >= bars.len() {
        return false;
    }
    let (Some(rsi_prev), Some(rsi_now)) = (value_at(rsi, i - 1), value_at(rsi, i)) else {
        return false;
    };
    let (Some(ema_now), Some(atr_now)) = (value_at(ema, i), value_at(atr, i)) else {
        return false;
    };
    let bar = &bars[i];
    let prior = &bars[i - 1];
    let body_ok = bar.body() >= cfg.scalp.body_atr_fraction * atr_now;
    match direction {
        Direction::Rise => {
            rsi_prev <= MIDLINE
                && rsi_now > MIDLINE
                && bar.is_bullish()
                && prior.is_bearish()
                && bar.close() > ema_now
                && body_ok
        }
        Direction::Fall => {
            rsi_prev >= MIDLINE
                && rsi_now < MIDLINE
                && bar.is_bearish()
                && prior.is_bullish()
                && bar.close() < ema_now
                && body_ok
        }
        Direction::Neutral => false,
    }
}

/// Bar `j + 1` fully engulfs bar `j`'s body in the direction opposite to
/// `direction` (the hard-invalidation candle).
fn engulfed_against<T: OHLC>(bars: &[T], j: usize, direction: Direction) -> bool {
    let Some(next) = bars.get(j + 1) else {
        return false;
    };
    let bar = &bars[j];
    let body_top = bar.open().max(bar.close());
    let body_bottom = bar.open().min(bar.close());
    match direction {
        Direction::Rise => {
            next.is_bearish() && next.open() >= body_top && next.close() <= body_bottom
        }
        Direction::Fall => {
            next.is_bullish() && next.open() <= body_bottom && next.close() >= body_top
        }
        Direction::Neutral => false,
    }
}

impl Setup for MomentumScalpSetup {
    fn name(&self) -> &'static str {
        NAME
    }

    fn weight(&self) -> f64 {
        WEIGHT
    }

    fn evaluate<T: OHLC>(&self, bars: &[T], series: &SeriesBundle, cfg: &SignalConfig) -> SetupVote {
        let len = bars.len();
        if len < 4 {
            return SetupVote::neutral(NAME, WEIGHT, "insufficient history");
        }
        let i = len - 1;
        let c = &cfg.scalp;
        let rsi = &series.rsi_scalp;
        let ema = &series.ema_scalp;
        let atr = &series.atr;

        let direction = if trigger_at(bars, rsi, ema, atr, cfg, i, Direction::Rise) {
            Direction::Rise
        } else if trigger_at(bars, rsi, ema, atr, cfg, i, Direction::Fall) {
            Direction::Fall
        } else {
            return SetupVote::neutral(NAME, WEIGHT, "no midline trigger");
        };

        // Size prefilter over the last three bars.
        let sized = (i.saturating_sub(2)..=i)
            .filter(|&j| {
                value_at(atr, j).is_some_and(|a| bars[j].body() >= c.body_atr_fraction * a)
            })
            .count();
        if sized < c.min_sized_bars {
            return SetupVote::neutral(NAME, WEIGHT, "bar-size prefilter failed");
        }

        // Cooldown: replay the trigger rule over the preceding window.
        let cooldown_start = i.saturating_sub(c.cooldown);
        for j in cooldown_start..i {
            if trigger_at(bars, rsi, ema, atr, cfg, j, direction) {
                return SetupVote::neutral(NAME, WEIGHT, "cooldown after a recent trigger");
            }
        }

        // Hard invalidation: the most recent prior same-direction trigger,
        // cancelled by a full engulfing reversal on the following bar.
        let lookback_start = i.saturating_sub(c.invalidation_lookback);
        let invalidated = (lookback_start..i)
            .rev()
            .find(|&j| trigger_at(bars, rsi, ema, atr, cfg, j, direction))
            .is_some_and(|j| engulfed_against(bars, j, direction));
        if invalidated {
            return SetupVote::neutral(NAME, WEIGHT, "hard invalidation in lookback");
        }

        let side = if direction == Direction::Rise { "above" } else { "below" };
        SetupVote::new(
            NAME,
            direction,
            Confidence::saturating(c.confidence as i64),
            format!("rsi(3) midline cross with flip candle {side} ema"),
            WEIGHT,
        )
        .with_aux("rsi", value_at(rsi, i).unwrap_or(f64::NAN))
        .with_aux("atr", value_at(atr, i).unwrap_or(f64::NAN))
    }
}
