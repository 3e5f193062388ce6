//! Primary trend setup: Ichimoku cloud position with additive confirmation.

use crate::config::SignalConfig;
use crate::series::IchimokuSnapshot;
use crate::setups::Setup;
use crate::{Confidence, Direction, SeriesBundle, SetupVote, OHLC};

const NAME: &str = "ichimoku_trend";
const WEIGHT: f64 = 1.2;

/// Votes the cloud side of price, with each confirming condition (Tenkan over
/// Kijun, a same-direction TK cross, future-cloud agreement) adding a
/// confidence step on top of the base, capped.
#[derive(Debug, Clone, Copy, Default)]
pub struct IchimokuTrendSetup;

impl Setup for IchimokuTrendSetup {
    fn name(&self) -> &'static str {
        NAME
    }

    fn weight(&self) -> f64 {
        WEIGHT
    }

    fn evaluate<T: OHLC>(&self, _bars: &[T], series: &SeriesBundle, cfg: &SignalConfig) -> SetupVote {
        let Some(ichimoku) = &series.ichimoku else {
            return SetupVote::neutral(NAME, WEIGHT, "ichimoku warm-up incomplete");
        };
        vote_from_cloud(ichimoku, cfg)
    }
}

fn vote_from_cloud(ichimoku: &IchimokuSnapshot, cfg: &SignalConfig) -> SetupVote {
    let c = &cfg.ichimoku_trend;

    let (direction, confirming) = if ichimoku.price_above_cloud {
        let confirming = [
            ichimoku.tenkan > ichimoku.kijun,
            ichimoku.tk_cross == Direction::Rise,
            ichimoku.future_bullish,
        ];
        (Direction::Rise, confirming)
    } else if ichimoku.price_below_cloud {
        let confirming = [
            ichimoku.tenkan < ichimoku.kijun,
            ichimoku.tk_cross == Direction::Fall,
            ichimoku.future_bearish,
        ];
        (Direction::Fall, confirming)
    } else {
        return SetupVote::neutral(NAME, WEIGHT, "price inside the cloud");
    };

    let count = confirming.iter().filter(|&&c| c).count();
    let confidence = (c.base_confidence as i64 + c.condition_step as i64 * count as i64)
        .min(c.max_confidence as i64);
    let side = if direction == Direction::Rise { "above" } else { "below" };

    SetupVote::new(
        NAME,
        direction,
        Confidence::saturating(confidence),
        format!("price {side} cloud, {count}/3 confirming conditions"),
        WEIGHT,
    )
    .with_aux("tenkan", ichimoku.tenkan)
    .with_aux("kijun", ichimoku.kijun)
    .with_aux("span_a", ichimoku.span_a)
    .with_aux("span_b", ichimoku.span_b)
}
