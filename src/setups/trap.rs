//! Candle trap detector: a five-stage gated evaluation of the second-to-last
//! bar (the trap candle) confirmed by the latest bar.
//!
//! Every failed gate yields a neutral vote whose detail names the gate, never
//! a directional default. A full pass is graded A+/A/B/C from wick dominance,
//! body compression and range expansion, and can attach trade levels.

use crate::config::{SignalConfig, TrapConfig};
use crate::setups::{near_level, relative_slope, value_at, Setup};
use crate::{Direction, Grade, OHLCExt, SeriesBundle, SetupVote, TradePlan, OHLC};

const NAME: &str = "candle_trap";
const WEIGHT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrapShape {
    Bullish,
    Bearish,
}

impl TrapShape {
    fn direction(self) -> Direction {
        match self {
            TrapShape::Bullish => Direction::Rise,
            TrapShape::Bearish => Direction::Fall,
        }
    }

    fn opposite(self) -> TrapShape {
        match self {
            TrapShape::Bullish => TrapShape::Bearish,
            TrapShape::Bearish => TrapShape::Bullish,
        }
    }
}

/// Wick-shape classification: a bullish trap has a dominant lower wick
/// (>= `wick_body_ratio` x body and >= `min_wick_fraction` of range), a minor
/// upper wick (< body) and a compressed body. Mirrored for bearish.
fn shape_of<T: OHLC>(bar: &T, cfg: &TrapConfig) -> Option<TrapShape> {
    let range = bar.range();
    if range <= f64::EPSILON {
        return None;
    }
    let body = bar.body();
    let upper = bar.upper_wick();
    let lower = bar.lower_wick();

    if lower >= cfg.wick_body_ratio * body
        && upper < body
        && body <= cfg.max_body_fraction * range
        && lower >= cfg.min_wick_fraction * range
    {
        return Some(TrapShape::Bullish);
    }
    if upper >= cfg.wick_body_ratio * body
        && lower < body
        && body <= cfg.max_body_fraction * range
        && upper >= cfg.min_wick_fraction * range
    {
        return Some(TrapShape::Bearish);
    }
    None
}

/// Vestigial exact-boundary check carried for parity with the historical rule
/// set: floating RSI data essentially never lands exactly on a zone boundary.
fn on_zone_boundary(rsi: f64, cfg: &TrapConfig) -> bool {
    rsi == cfg.rsi_rise_low
        || rsi == cfg.rsi_rise_high
        || rsi == cfg.rsi_fall_low
        || rsi == cfg.rsi_fall_high
}

/// Grade a full pass from wick-to-body ratio, body-to-range ratio and range
/// expansion, by descending threshold bands.
fn grade_for(wick_body: f64, body_fraction: f64, expansion: f64) -> Grade {
    if wick_body >= 3.5 && body_fraction <= 0.20 && expansion >= 1.30 {
        Grade::APlus
    } else if wick_body >= 3.0 && body_fraction <= 0.25 && expansion >= 1.15 {
        Grade::A
    } else if wick_body >= 2.5 && body_fraction <= 0.30 && expansion >= 1.00 {
        Grade::B
    } else {
        Grade::C
    }
}

fn trade_plan<T: OHLC>(trap: &T, confirm_close: f64, shape: TrapShape, cfg: &TrapConfig) -> TradePlan {
    let buffer = cfg.stop_buffer * trap.range();
    let entry = confirm_close;
    let (stop, target) = match shape {
        TrapShape::Bullish => {
            let stop = trap.low() - buffer;
            (stop, entry + cfg.reward_multiple * (entry - stop))
        }
        TrapShape::Bearish => {
            let stop = trap.high() + buffer;
            (stop, entry - cfg.reward_multiple * (stop - entry))
        }
    };
    TradePlan {
        entry,
        stop,
        target,
        grade: Grade::C, // overwritten by the caller once graded
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CandleTrapSetup;

impl Setup for CandleTrapSetup {
    fn name(&self) -> &'static str {
        NAME
    }

    fn weight(&self) -> f64 {
        WEIGHT
    }

    fn evaluate<T: OHLC>(&self, bars: &[T], series: &SeriesBundle, cfg: &SignalConfig) -> SetupVote {
        let c = &cfg.trap;
        let len = bars.len();

        // Stage 1: preconditions.
        if len < c.min_history.max(c.avg_range_period + 2) {
            return SetupVote::neutral(NAME, WEIGHT, "trap: insufficient history");
        }
        let trap_idx = len - 2;
        let confirm_idx = len - 1;
        let trap = &bars[trap_idx];
        let range = trap.range();
        if range <= f64::EPSILON {
            return SetupVote::neutral(NAME, WEIGHT, "trap: degenerate candle range");
        }
        let body_fraction = trap.body() / range;
        if body_fraction <= c.min_body_fraction {
            return SetupVote::neutral(NAME, WEIGHT, "trap: doji-like candle");
        }
        let avg_range: f64 = bars[trap_idx - c.avg_range_period..trap_idx]
            .iter()
            .map(|b| b.range())
            .sum::<f64>()
            / c.avg_range_period as f64;
        if avg_range <= f64::EPSILON {
            return SetupVote::neutral(NAME, WEIGHT, "trap: flat trailing ranges");
        }
        let expansion = range / avg_range;
        if expansion < c.expansion_factor {
            return SetupVote::neutral(NAME, WEIGHT, "trap: no range expansion");
        }

        // Stage 2: wick-shape classification.
        let Some(shape) = shape_of(trap, c) else {
            return SetupVote::neutral(NAME, WEIGHT, "trap: shape thresholds not met");
        };

        // Stage 3: noise filters.
        let opposite_start = trap_idx.saturating_sub(c.opposite_window);
        if bars[opposite_start..trap_idx]
            .iter()
            .any(|b| shape_of(b, c) == Some(shape.opposite()))
        {
            return SetupVote::neutral(NAME, WEIGHT, "trap: opposite shape nearby");
        }
        let crowding_start = trap_idx.saturating_sub(c.crowding_window);
        let crowded = bars[crowding_start..trap_idx]
            .iter()
            .filter(|b| shape_of(*b, c).is_some())
            .count();
        if crowded >= c.crowding_max {
            return SetupVote::neutral(NAME, WEIGHT, "trap: shape crowding");
        }
        let Some(rsi) = value_at(&series.rsi_fast, trap_idx) else {
            return SetupVote::neutral(NAME, WEIGHT, "trap: rsi warm-up incomplete");
        };
        if on_zone_boundary(rsi, c) {
            return SetupVote::neutral(NAME, WEIGHT, "trap: rsi exactly on a zone boundary");
        }
        let Some(ema_slope) = relative_slope(&series.ema_medium, trap_idx, c.slope_bars) else {
            return SetupVote::neutral(NAME, WEIGHT, "trap: ema warm-up incomplete");
        };
        if ema_slope.abs() < c.min_slope {
            return SetupVote::neutral(NAME, WEIGHT, "trap: flat trend");
        }

        // Stage 4: directional checks.
        let Some(ema) = value_at(&series.ema_medium, trap_idx) else {
            return SetupVote::neutral(NAME, WEIGHT, "trap: ema warm-up incomplete");
        };
        if !near_level(trap.close(), Some(ema), c.ema_tolerance) {
            return SetupVote::neutral(NAME, WEIGHT, "trap: close not at the medium ema");
        }
        let in_zone = match shape {
            TrapShape::Bullish => (c.rsi_rise_low..=c.rsi_rise_high).contains(&rsi),
            TrapShape::Bearish => (c.rsi_fall_low..=c.rsi_fall_high).contains(&rsi),
        };
        if !in_zone {
            return SetupVote::neutral(NAME, WEIGHT, "trap: rsi outside the signal zone");
        }
        let window_start = trap_idx.saturating_sub(c.directional_window);
        let agreeing = (window_start..trap_idx)
            .filter(|&j| match shape {
                TrapShape::Bullish => bars[j + 1].low() < bars[j].low(),
                TrapShape::Bearish => bars[j + 1].high() > bars[j].high(),
            })
            .count();
        if agreeing < c.directional_min {
            return SetupVote::neutral(NAME, WEIGHT, "trap: trailing moves disagree");
        }
        let swing_start = trap_idx.saturating_sub(c.swing_lookback);
        let swing_window = &bars[swing_start..trap_idx];
        let breached = match shape {
            TrapShape::Bullish => {
                let prior_low = swing_window.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
                if c.breakout_failure {
                    // failed breakdown: pierce the prior swing low, close back inside
                    !(trap.low() < prior_low && trap.close() > prior_low)
                } else {
                    trap.low() < prior_low
                }
            }
            TrapShape::Bearish => {
                let prior_high = swing_window
                    .iter()
                    .map(|b| b.high())
                    .fold(f64::NEG_INFINITY, f64::max);
                if c.breakout_failure {
                    !(trap.high() > prior_high && trap.close() < prior_high)
                } else {
                    trap.high() > prior_high
                }
            }
        };
        if breached {
            let reason = if c.breakout_failure {
                "trap: no failed breakout of the swing extreme"
            } else {
                "trap: swing extreme breached"
            };
            return SetupVote::neutral(NAME, WEIGHT, reason);
        }

        // Stage 5: confirmation.
        let confirm = &bars[confirm_idx];
        let confirmed = match shape {
            TrapShape::Bullish => confirm.close() > trap.close(),
            TrapShape::Bearish => confirm.close() < trap.close(),
        };
        if !confirmed {
            return SetupVote::neutral(NAME, WEIGHT, "trap: no confirmation close");
        }

        // Grading on a full pass.
        let wick = match shape {
            TrapShape::Bullish => trap.lower_wick(),
            TrapShape::Bearish => trap.upper_wick(),
        };
        let wick_body = if trap.body() > f64::EPSILON {
            wick / trap.body()
        } else {
            f64::INFINITY
        };
        let grade = grade_for(wick_body, body_fraction, expansion);
        let direction = shape.direction();

        let mut vote = SetupVote::new(
            NAME,
            direction,
            grade.confidence(),
            format!("candle trap confirmed, grade {grade:?}"),
            WEIGHT,
        )
        .with_aux("wick_body_ratio", wick_body)
        .with_aux("body_fraction", body_fraction)
        .with_aux("expansion", expansion)
        .with_aux("rsi", rsi);

        if c.trade_levels {
            let mut plan = trade_plan(trap, confirm.close(), shape, c);
            plan.grade = grade;
            vote = vote
                .with_aux("entry", plan.entry)
                .with_aux("stop", plan.stop)
                .with_aux("target", plan.target)
                .with_plan(plan);
        }
        vote
    }
}
