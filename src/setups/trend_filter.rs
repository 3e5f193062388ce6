//! Trend filter: slow-EMA distance and slope plus MACD posture, with a
//! strong variant gated on additional agreement.

use crate::config::SignalConfig;
use crate::setups::{near_level, relative_slope, value_at, Setup};
use crate::{Confidence, Direction, SeriesBundle, SetupVote, OHLC};

const NAME: &str = "trend_filter";
const WEIGHT: f64 = 1.1;

/// Fires RISE when the close sits sufficiently far above a rising EMA(50) and
/// MACD(6,13,5) agrees: line above signal, with the histogram non-negative and
/// increasing or a line zero-cross inside the lookback window. The strong
/// variant additionally requires EMA(21)/EMA(50) slope agreement, proximity to
/// a swing level, and RSI(6) on the right side of the midline; it carries a
/// materially higher confidence and sets the vote's `strong` flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendFilterSetup;

/// Did the MACD line cross zero in the given direction within `lookback` bars?
fn zero_cross_within(line: &[f64], lookback: usize, direction: Direction) -> bool {
    let len = line.len();
    for offset in 0..=lookback {
        let Some(idx) = len.checked_sub(1 + offset) else {
            return false;
        };
        if idx == 0 {
            return false;
        }
        let (Some(prev), Some(now)) = (value_at(line, idx - 1), value_at(line, idx)) else {
            continue;
        };
        let crossed = match direction {
            Direction::Rise => prev <= 0.0 && now > 0.0,
            Direction::Fall => prev >= 0.0 && now < 0.0,
            Direction::Neutral => false,
        };
        if crossed {
            return true;
        }
    }
    false
}

impl Setup for TrendFilterSetup {
    fn name(&self) -> &'static str {
        NAME
    }

    fn weight(&self) -> f64 {
        WEIGHT
    }

    fn evaluate<T: OHLC>(&self, bars: &[T], series: &SeriesBundle, cfg: &SignalConfig) -> SetupVote {
        let len = bars.len();
        if len < 2 {
            return SetupVote::neutral(NAME, WEIGHT, "insufficient history");
        }
        let c = &cfg.trend_filter;
        let close = bars[len - 1].close();
        let Some(ema_slow) = value_at(&series.ema_slow, len - 1) else {
            return SetupVote::neutral(NAME, WEIGHT, "ema warm-up incomplete");
        };
        let Some(slope_slow) = relative_slope(&series.ema_slow, len - 1, c.slope_bars) else {
            return SetupVote::neutral(NAME, WEIGHT, "slope warm-up incomplete");
        };
        let (line, signal, hist, hist_prev) = match (
            value_at(&series.macd.line, len - 1),
            value_at(&series.macd.signal, len - 1),
            value_at(&series.macd.histogram, len - 1),
            value_at(&series.macd.histogram, len - 2),
        ) {
            (Some(l), Some(s), Some(h), Some(hp)) => (l, s, h, hp),
            _ => return SetupVote::neutral(NAME, WEIGHT, "macd warm-up incomplete"),
        };
        if ema_slow <= 0.0 {
            return SetupVote::neutral(NAME, WEIGHT, "degenerate ema level");
        }

        let distance = (close - ema_slow) / ema_slow;

        let rise = distance >= c.min_distance
            && slope_slow >= c.min_slope
            && line > signal
            && ((hist >= 0.0 && hist > hist_prev)
                || zero_cross_within(&series.macd.line, c.zero_cross_lookback, Direction::Rise));
        let fall = distance <= -c.min_distance
            && slope_slow <= -c.min_slope
            && line < signal
            && ((hist <= 0.0 && hist < hist_prev)
                || zero_cross_within(&series.macd.line, c.zero_cross_lookback, Direction::Fall));

        let direction = match (rise, fall) {
            (true, _) => Direction::Rise,
            (_, true) => Direction::Fall,
            _ => return SetupVote::neutral(NAME, WEIGHT, "no trend alignment"),
        };

        // Strong variant: second-EMA slope agreement, a nearby swing level,
        // and RSI on the right side of the midline.
        let slope_medium = relative_slope(&series.ema_medium, len - 1, c.slope_bars);
        let slopes_agree = slope_medium.is_some_and(|s| match direction {
            Direction::Rise => s >= c.min_slope,
            Direction::Fall => s <= -c.min_slope,
            Direction::Neutral => false,
        });
        let at_level = near_level(close, series.support, c.level_tolerance)
            || near_level(close, series.resistance, c.level_tolerance);
        let rsi_confirms = value_at(&series.rsi_classic, len - 1).is_some_and(|r| match direction {
            Direction::Rise => r > c.rsi_midline,
            Direction::Fall => r < c.rsi_midline,
            Direction::Neutral => false,
        });

        let side = if direction == Direction::Rise { "up" } else { "down" };
        let vote = if slopes_agree && at_level && rsi_confirms {
            SetupVote::new(
                NAME,
                direction,
                Confidence::saturating(c.strong_confidence as i64),
                format!("strong trend {side}: slopes agree at a level with rsi confirmation"),
                WEIGHT,
            )
            .strong()
        } else {
            SetupVote::new(
                NAME,
                direction,
                Confidence::saturating(c.confidence as i64),
                format!("trend {side}: ema distance and macd momentum aligned"),
                WEIGHT,
            )
        };
        vote.with_aux("distance", distance)
            .with_aux("ema_slope", slope_slow)
            .with_aux("macd_histogram", hist)
    }
}
