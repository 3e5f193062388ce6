//! Reversal-at-level setup: exhaustion at a swing level with a confirming
//! candle.

use crate::config::SignalConfig;
use crate::setups::{near_level, value_at, Setup};
use crate::{Confidence, Direction, OHLCExt, SeriesBundle, SetupVote, OHLC};

const NAME: &str = "level_reversal";
const WEIGHT: f64 = 1.0;

/// Fires RISE when the close sits in a tight band around the nearest support,
/// RSI(7) is oversold, and the latest candle confirms (close beats the prior
/// high, or a dominant-body bullish candle). Mirrored at resistance.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelReversalSetup;

impl Setup for LevelReversalSetup {
    fn name(&self) -> &'static str {
        NAME
    }

    fn evaluate<T: OHLC>(&self, bars: &[T], series: &SeriesBundle, cfg: &SignalConfig) -> SetupVote {
        let len = bars.len();
        if len < 2 {
            return SetupVote::neutral(NAME, WEIGHT, "insufficient history");
        }
        let Some(rsi) = value_at(&series.rsi_fast, len - 1) else {
            return SetupVote::neutral(NAME, WEIGHT, "rsi warm-up incomplete");
        };

        let c = &cfg.reversal;
        let current = &bars[len - 1];
        let prior = &bars[len - 2];
        let close = current.close();

        if near_level(close, series.support, c.near_tolerance) && rsi < c.rsi_oversold {
            let beats_prior = close > prior.high();
            let dominant = current.is_bullish()
                && current.body_ratio().is_some_and(|r| r >= c.dominant_body);
            if beats_prior || dominant {
                let how = if beats_prior { "close above prior high" } else { "dominant bullish body" };
                return SetupVote::new(
                    NAME,
                    Direction::Rise,
                    Confidence::saturating(c.confidence as i64),
                    format!("oversold at support ({how})"),
                    WEIGHT,
                )
                .with_aux("rsi", rsi)
                .with_aux("support", series.support.unwrap_or(f64::NAN));
            }
            return SetupVote::neutral(NAME, WEIGHT, "at support but no confirming candle");
        }

        if near_level(close, series.resistance, c.near_tolerance) && rsi > c.rsi_overbought {
            let beats_prior = close < prior.low();
            let dominant = current.is_bearish()
                && current.body_ratio().is_some_and(|r| r >= c.dominant_body);
            if beats_prior || dominant {
                let how = if beats_prior { "close below prior low" } else { "dominant bearish body" };
                return SetupVote::new(
                    NAME,
                    Direction::Fall,
                    Confidence::saturating(c.confidence as i64),
                    format!("overbought at resistance ({how})"),
                    WEIGHT,
                )
                .with_aux("rsi", rsi)
                .with_aux("resistance", series.resistance.unwrap_or(f64::NAN));
            }
            return SetupVote::neutral(NAME, WEIGHT, "at resistance but no confirming candle");
        }

        SetupVote::neutral(NAME, WEIGHT, "no exhaustion at a level")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeriesConfig;
    use crate::SeriesBundle;

    #[derive(Debug, Clone, Copy)]
    struct Bar(f64, f64, f64, f64);

    impl OHLC for Bar {
        fn open(&self) -> f64 {
            self.0
        }

        fn high(&self) -> f64 {
            self.1
        }

        fn low(&self) -> f64 {
            self.2
        }

        fn close(&self) -> f64 {
            self.3
        }
    }

    fn bundle_with(bars: &[Bar], support: Option<f64>, resistance: Option<f64>, rsi: f64) -> SeriesBundle {
        let mut bundle = SeriesBundle::compute(bars, &SeriesConfig::default());
        bundle.support = support;
        bundle.resistance = resistance;
        if let Some(last) = bundle.rsi_fast.last_mut() {
            *last = rsi;
        }
        bundle
    }

    fn flat_bars(n: usize) -> Vec<Bar> {
        (0..n).map(|_| Bar(100.0, 100.5, 99.5, 100.0)).collect()
    }

    #[test]
    fn fires_rise_at_support_with_breakout_confirmation() {
        let mut bars = flat_bars(30);
        // close 100.8 beats the prior high of 100.5, support right at the close
        bars.push(Bar(100.0, 100.9, 99.9, 100.8));
        let bundle = bundle_with(&bars, Some(100.7), None, 22.0);
        let vote = LevelReversalSetup.evaluate(&bars, &bundle, &SignalConfig::default());
        assert_eq!(vote.direction, Direction::Rise);
        assert_eq!(vote.confidence.get(), 78);
        assert!(vote.detail.contains("prior high"));
    }

    #[test]
    fn fires_rise_with_dominant_body() {
        let mut bars = flat_bars(30);
        // bullish body 0.4 of a 0.5 range = 0.8 ratio, close below prior high
        bars.push(Bar(100.0, 100.45, 99.95, 100.4));
        let bundle = bundle_with(&bars, Some(100.3), None, 25.0);
        let vote = LevelReversalSetup.evaluate(&bars, &bundle, &SignalConfig::default());
        assert_eq!(vote.direction, Direction::Rise);
        assert!(vote.detail.contains("dominant"));
    }

    #[test]
    fn needs_oversold_rsi() {
        let mut bars = flat_bars(30);
        bars.push(Bar(100.0, 100.9, 99.9, 100.8));
        let bundle = bundle_with(&bars, Some(100.7), None, 55.0);
        let vote = LevelReversalSetup.evaluate(&bars, &bundle, &SignalConfig::default());
        assert_eq!(vote.direction, Direction::Neutral);
    }

    #[test]
    fn missing_level_is_never_near() {
        let mut bars = flat_bars(30);
        bars.push(Bar(100.0, 100.9, 99.9, 100.8));
        let bundle = bundle_with(&bars, None, None, 22.0);
        let vote = LevelReversalSetup.evaluate(&bars, &bundle, &SignalConfig::default());
        assert_eq!(vote.direction, Direction::Neutral);
    }

    #[test]
    fn mirrors_at_resistance() {
        let mut bars = flat_bars(30);
        // bearish close below the prior low of 99.5
        bars.push(Bar(100.0, 100.1, 99.3, 99.4));
        let bundle = bundle_with(&bars, None, Some(99.5), 81.0);
        let vote = LevelReversalSetup.evaluate(&bars, &bundle, &SignalConfig::default());
        assert_eq!(vote.direction, Direction::Fall);
        assert!(vote.detail.contains("prior low"));
    }
}
