//! Fast EMA / stochastic confluence setup.

use crate::config::SignalConfig;
use crate::setups::{value_at, Setup};
use crate::{Confidence, Direction, SeriesBundle, SetupVote, OHLC};

const NAME: &str = "ema_stoch_confluence";
const WEIGHT: f64 = 1.0;

/// Fires RISE when EMA(5) crosses above EMA(13) on this bar, a stochastic
/// %K/%D bullish cross occurred within the recency window (read off the
/// precomputed series, never recomputed per offset), and %K is still in or
/// recovering from the oversold zone. Mirrored for FALL.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmaStochConfluenceSetup;

/// Bar offsets back from the latest index at which %K crossed %D in the given
/// direction. `None` when no cross lies within `window` bars.
fn stoch_cross_within(k: &[f64], d: &[f64], window: usize, direction: Direction) -> Option<usize> {
    let len = k.len().min(d.len());
    for offset in 0..=window {
        let idx = len.checked_sub(1 + offset)?;
        if idx == 0 {
            return None;
        }
        let (k_prev, k_now) = (value_at(k, idx - 1)?, value_at(k, idx)?);
        let (d_prev, d_now) = (value_at(d, idx - 1)?, value_at(d, idx)?);
        let crossed = match direction {
            Direction::Rise => k_prev <= d_prev && k_now > d_now,
            Direction::Fall => k_prev >= d_prev && k_now < d_now,
            Direction::Neutral => false,
        };
        if crossed {
            return Some(offset);
        }
    }
    None
}

impl Setup for EmaStochConfluenceSetup {
    fn name(&self) -> &'static str {
        NAME
    }

    fn evaluate<T: OHLC>(&self, bars: &[T], series: &SeriesBundle, cfg: &SignalConfig) -> SetupVote {
        let len = bars.len();
        if len < 2 {
            return SetupVote::neutral(NAME, WEIGHT, "insufficient history");
        }
        let fast = (
            value_at(&series.ema_fast, len - 2),
            value_at(&series.ema_fast, len - 1),
        );
        let slow = (
            value_at(&series.ema_confluence, len - 2),
            value_at(&series.ema_confluence, len - 1),
        );
        let (Some(fast_prev), Some(fast_now)) = fast else {
            return SetupVote::neutral(NAME, WEIGHT, "ema warm-up incomplete");
        };
        let (Some(slow_prev), Some(slow_now)) = slow else {
            return SetupVote::neutral(NAME, WEIGHT, "ema warm-up incomplete");
        };
        let Some(k_now) = value_at(&series.stoch.k, len - 1) else {
            return SetupVote::neutral(NAME, WEIGHT, "stochastic warm-up incomplete");
        };

        let c = &cfg.confluence;
        let ema_cross_up = fast_prev <= slow_prev && fast_now > slow_now;
        let ema_cross_down = fast_prev >= slow_prev && fast_now < slow_now;

        if ema_cross_up {
            if k_now > c.oversold + c.recovery_band {
                return SetupVote::neutral(NAME, WEIGHT, "%K not near the oversold zone");
            }
            if let Some(offset) =
                stoch_cross_within(&series.stoch.k, &series.stoch.d, c.recency, Direction::Rise)
            {
                return SetupVote::new(
                    NAME,
                    Direction::Rise,
                    Confidence::saturating(c.confidence as i64),
                    format!("ema cross up with stochastic cross {offset} bar(s) ago"),
                    WEIGHT,
                )
                .with_aux("stoch_k", k_now);
            }
            return SetupVote::neutral(NAME, WEIGHT, "no recent stochastic cross");
        }

        if ema_cross_down {
            if k_now < c.overbought - c.recovery_band {
                return SetupVote::neutral(NAME, WEIGHT, "%K not near the overbought zone");
            }
            if let Some(offset) =
                stoch_cross_within(&series.stoch.k, &series.stoch.d, c.recency, Direction::Fall)
            {
                return SetupVote::new(
                    NAME,
                    Direction::Fall,
                    Confidence::saturating(c.confidence as i64),
                    format!("ema cross down with stochastic cross {offset} bar(s) ago"),
                    WEIGHT,
                )
                .with_aux("stoch_k", k_now);
            }
            return SetupVote::neutral(NAME, WEIGHT, "no recent stochastic cross");
        }

        SetupVote::neutral(NAME, WEIGHT, "no ema cross this bar")
    }

    fn weight(&self) -> f64 {
        WEIGHT
    }
}
