//! Series math library: pure slice functions over aligned `f64` series.
//!
//! Every function returns a `Vec<f64>` aligned index-for-index with its input.
//! Entries before the warm-up length are `NaN`, meaning "insufficient history" -
//! never zero. Degenerate inputs (empty slices, zero periods, period longer than
//! the data) yield all-NaN or empty results, never a panic.

use crate::config::{IchimokuConfig, LevelConfig};
use crate::Direction;

// ============================================================
// MOVING AVERAGES
// ============================================================

/// Simple moving average. NaN before `period - 1`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || period > len {
        return out;
    }
    for i in (period - 1)..len {
        let window = &values[i + 1 - period..=i];
        out[i] = window.iter().sum::<f64>() / period as f64;
    }
    out
}

/// Exponential moving average seeded from the first value.
///
/// `k = 2 / (period + 1)`, `ema[i] = values[i] * k + ema[i-1] * (1 - k)`.
/// Defined from index 0.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || len == 0 {
        return out;
    }
    let k = 2.0 / (period as f64 + 1.0);
    out[0] = values[0];
    for i in 1..len {
        out[i] = values[i] * k + out[i - 1] * (1.0 - k);
    }
    out
}

// ============================================================
// RSI (Wilder)
// ============================================================

/// Wilder-smoothed RSI. First defined at index `period`.
///
/// Seed average gain/loss is the simple mean of the first `period` deltas,
/// then smoothed with `(avg * (period - 1) + delta) / period`. A zero average
/// loss (including the all-flat case) yields exactly 100.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || len <= period {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = values[i] - values[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss -= delta;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..len {
        let delta = values[i] - values[i - 1];
        let (gain, loss) = if delta > 0.0 {
            (delta, 0.0)
        } else {
            (0.0, -delta)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

#[inline]
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

// ============================================================
// STOCHASTIC (slow)
// ============================================================

/// Slow stochastic %K / %D series.
#[derive(Debug, Clone)]
pub struct Stochastic {
    /// Slow %K: SMA of raw %K over the slowing period.
    pub k: Vec<f64>,
    /// %D: SMA of slow %K over the %D period.
    pub d: Vec<f64>,
}

/// Slow stochastic oscillator.
///
/// Raw %K uses the rolling highest-high / lowest-low over `k_period`; a zero
/// range maps to exactly 50 (flat-market midpoint). Slow %K is the SMA of the
/// raw series over `slowing`, %D the SMA of slow %K over `d_period`. Current
/// and previous-bar values are read off the returned series.
pub fn stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_period: usize,
    slowing: usize,
    d_period: usize,
) -> Stochastic {
    let len = close.len();
    let mut raw = vec![f64::NAN; len];
    if k_period > 0 && k_period <= len {
        for i in (k_period - 1)..len {
            let window = i + 1 - k_period..=i;
            let hh = high[window.clone()]
                .iter()
                .fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            let ll = low[window].iter().fold(f64::INFINITY, |a, &b| a.min(b));
            let range = hh - ll;
            raw[i] = if range > 0.0 {
                (close[i] - ll) / range * 100.0
            } else {
                50.0
            };
        }
    }
    let k = sma(&raw, slowing);
    let d = sma(&k, d_period);
    Stochastic { k, d }
}

// ============================================================
// MACD
// ============================================================

/// MACD line / signal / histogram series.
#[derive(Debug, Clone)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD: `line = EMA(fast) - EMA(slow)`, `signal = EMA(line, signal_period)`,
/// `histogram = line - signal`. Defined from index 0 given the EMA seeding.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> Macd {
    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal_period);
    let histogram: Vec<f64> = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    Macd {
        line,
        signal,
        histogram,
    }
}

// ============================================================
// ATR (Wilder)
// ============================================================

/// Wilder-smoothed average true range. First defined at index `period - 1`.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let len = close.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || period > len {
        return out;
    }

    let tr_at = |i: usize| -> f64 {
        if i == 0 {
            high[0] - low[0]
        } else {
            let hl = high[i] - low[i];
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            hl.max(hc).max(lc)
        }
    };

    let seed: f64 = (0..period).map(tr_at).sum::<f64>() / period as f64;
    out[period - 1] = seed;
    for i in period..len {
        out[i] = (out[i - 1] * (period as f64 - 1.0) + tr_at(i)) / period as f64;
    }
    out
}

// ============================================================
// ADX / DI (Wilder)
// ============================================================

/// ADX with directional indicators.
#[derive(Debug, Clone)]
pub struct Adx {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

/// Wilder ADX with +DI / -DI. DI series start at index `period`, the ADX line
/// at index `2 * period - 1`. A zero smoothed true range maps DI to 0; a zero
/// DI sum maps DX to 0, so flat data settles at ADX 0 rather than NaN.
pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Adx {
    let len = close.len();
    let nan = vec![f64::NAN; len];
    if period == 0 || len <= period {
        return Adx {
            adx: nan.clone(),
            plus_di: nan.clone(),
            minus_di: nan,
        };
    }

    let mut plus_di = vec![f64::NAN; len];
    let mut minus_di = vec![f64::NAN; len];
    let mut dx = vec![f64::NAN; len];
    let mut adx_out = vec![f64::NAN; len];

    let raw_at = |i: usize| -> (f64, f64, f64) {
        let hl = high[i] - low[i];
        let hc = (high[i] - close[i - 1]).abs();
        let lc = (low[i] - close[i - 1]).abs();
        let tr = hl.max(hc).max(lc);
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
        let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
        (tr, plus_dm, minus_dm)
    };

    // Wilder smoothing: seed with the plain sum of the first `period` raws,
    // then sm[i] = sm[i-1] - sm[i-1]/period + raw[i].
    let mut sm_tr = 0.0;
    let mut sm_plus = 0.0;
    let mut sm_minus = 0.0;
    for i in 1..=period {
        let (tr, p, m) = raw_at(i);
        sm_tr += tr;
        sm_plus += p;
        sm_minus += m;
    }

    let p = period as f64;
    for i in period..len {
        if i > period {
            let (tr, pl, mi) = raw_at(i);
            sm_tr = sm_tr - sm_tr / p + tr;
            sm_plus = sm_plus - sm_plus / p + pl;
            sm_minus = sm_minus - sm_minus / p + mi;
        }
        let (pdi, mdi) = if sm_tr > 0.0 {
            (100.0 * sm_plus / sm_tr, 100.0 * sm_minus / sm_tr)
        } else {
            (0.0, 0.0)
        };
        plus_di[i] = pdi;
        minus_di[i] = mdi;
        let di_sum = pdi + mdi;
        dx[i] = if di_sum > 0.0 {
            100.0 * (pdi - mdi).abs() / di_sum
        } else {
            0.0
        };
    }

    let first_adx = 2 * period - 1;
    if first_adx < len {
        let seed: f64 = dx[period..=first_adx].iter().sum::<f64>() / p;
        adx_out[first_adx] = seed;
        for i in (first_adx + 1)..len {
            adx_out[i] = (adx_out[i - 1] * (p - 1.0) + dx[i]) / p;
        }
    }

    Adx {
        adx: adx_out,
        plus_di,
        minus_di,
    }
}

// ============================================================
// BOLLINGER %B
// ============================================================

/// Bollinger %B over a `period`-bar window with `width` standard deviations.
/// A zero band width maps to 0.5.
pub fn percent_b(values: &[f64], period: usize, width: f64) -> Vec<f64> {
    let len = values.len();
    let mut out = vec![f64::NAN; len];
    if period == 0 || period > len {
        return out;
    }
    for i in (period - 1)..len {
        let window = &values[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        let sd = var.sqrt();
        let band = 2.0 * width * sd;
        out[i] = if band > 0.0 {
            (values[i] - (mean - width * sd)) / band
        } else {
            0.5
        };
    }
    out
}

// ============================================================
// ICHIMOKU
// ============================================================

/// Ichimoku components and derived flags at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct IchimokuSnapshot {
    pub tenkan: f64,
    pub kijun: f64,
    pub tenkan_prev: f64,
    pub kijun_prev: f64,
    pub span_a: f64,
    pub span_b: f64,
    pub cloud_top: f64,
    pub cloud_bottom: f64,
    pub price_above_cloud: bool,
    pub price_below_cloud: bool,
    /// Tenkan/Kijun cross direction on the latest bar (using previous-bar values).
    pub tk_cross: Direction,
    /// Un-displaced cloud bias from current Tenkan/Kijun and the long midpoint.
    pub future_bullish: bool,
    pub future_bearish: bool,
}

/// Midpoint of the high/low range over `period` bars ending at `end`.
fn midpoint(high: &[f64], low: &[f64], end: usize, period: usize) -> Option<f64> {
    if period == 0 || end + 1 < period || end >= high.len() {
        return None;
    }
    let window = end + 1 - period..=end;
    let hh = high[window.clone()]
        .iter()
        .fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let ll = low[window].iter().fold(f64::INFINITY, |a, &b| a.min(b));
    Some((hh + ll) / 2.0)
}

/// Ichimoku cloud at the latest bar. Hard `None` below `senkou` (52) bars of
/// history. Senkou spans come from values `displacement` bars back when enough
/// history exists; each span independently falls back to its current-bar
/// approximation otherwise.
pub fn ichimoku(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    cfg: &IchimokuConfig,
) -> Option<IchimokuSnapshot> {
    let len = close.len();
    if len < cfg.senkou || len < 2 {
        return None;
    }
    let i = len - 1;

    let tenkan = midpoint(high, low, i, cfg.tenkan)?;
    let kijun = midpoint(high, low, i, cfg.kijun)?;
    let tenkan_prev = midpoint(high, low, i - 1, cfg.tenkan)?;
    let kijun_prev = midpoint(high, low, i - 1, cfg.kijun)?;
    let long_mid = midpoint(high, low, i, cfg.senkou)?;

    let back = i.checked_sub(cfg.displacement);
    let span_a = back
        .and_then(|b| Some((midpoint(high, low, b, cfg.tenkan)? + midpoint(high, low, b, cfg.kijun)?) / 2.0))
        .unwrap_or((tenkan + kijun) / 2.0);
    let span_b = back
        .and_then(|b| midpoint(high, low, b, cfg.senkou))
        .unwrap_or(long_mid);

    let cloud_top = span_a.max(span_b);
    let cloud_bottom = span_a.min(span_b);
    let price = close[i];

    let tk_cross = if tenkan > kijun && tenkan_prev <= kijun_prev {
        Direction::Rise
    } else if tenkan < kijun && tenkan_prev >= kijun_prev {
        Direction::Fall
    } else {
        Direction::Neutral
    };

    let future_a = (tenkan + kijun) / 2.0;
    Some(IchimokuSnapshot {
        tenkan,
        kijun,
        tenkan_prev,
        kijun_prev,
        span_a,
        span_b,
        cloud_top,
        cloud_bottom,
        price_above_cloud: price > cloud_top,
        price_below_cloud: price < cloud_bottom,
        tk_cross,
        future_bullish: future_a > long_mid,
        future_bearish: future_a < long_mid,
    })
}

// ============================================================
// SWING SUPPORT / RESISTANCE
// ============================================================

/// A clustered swing level: weighted-average price and touch count.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Level {
    pub price: f64,
    pub touches: usize,
}

/// Clustered swing levels from local extrema over a trailing lookback window.
///
/// A low that is `<=` both neighbors (or a high `>=` both) is an extremum.
/// Extrema within `tolerance` relative distance of an existing level merge
/// into its running weighted average and bump its touch count; only levels
/// with at least `min_touches` touches survive. Sorted ascending by price.
pub fn swing_levels(high: &[f64], low: &[f64], cfg: &LevelConfig) -> Vec<Level> {
    let len = low.len();
    let mut levels: Vec<Level> = Vec::new();
    if len < 3 {
        return levels;
    }

    let mut merge = |price: f64| {
        for level in levels.iter_mut() {
            if level.price > 0.0 && (price - level.price).abs() / level.price <= cfg.tolerance {
                level.price =
                    (level.price * level.touches as f64 + price) / (level.touches as f64 + 1.0);
                level.touches += 1;
                return;
            }
        }
        levels.push(Level { price, touches: 1 });
    };

    let start = len.saturating_sub(cfg.lookback).max(1);
    for i in start..len - 1 {
        if low[i] <= low[i - 1] && low[i] <= low[i + 1] {
            merge(low[i]);
        }
        if high[i] >= high[i - 1] && high[i] >= high[i + 1] {
            merge(high[i]);
        }
    }

    levels.retain(|l| l.touches >= cfg.min_touches);
    levels.sort_by(|a, b| a.price.total_cmp(&b.price));
    levels
}

/// Nearest support (highest level `<=` close) and resistance (lowest level
/// `>=` close). A level equal to the close is both.
pub fn nearest_levels(levels: &[Level], close: f64) -> (Option<f64>, Option<f64>) {
    let support = levels
        .iter()
        .map(|l| l.price)
        .filter(|&p| p <= close)
        .fold(None, |best: Option<f64>, p| {
            Some(best.map_or(p, |b: f64| b.max(p)))
        });
    let resistance = levels
        .iter()
        .map(|l| l.price)
        .filter(|&p| p >= close)
        .fold(None, |best: Option<f64>, p| {
            Some(best.map_or(p, |b: f64| b.min(p)))
        });
    (support, resistance)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IchimokuConfig, LevelConfig};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sma_warmup_and_values() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(out[0].is_nan());
        assert!(approx(out[1], 1.5));
        assert!(approx(out[2], 2.5));
        assert!(approx(out[3], 3.5));
    }

    #[test]
    fn sma_degenerate() {
        assert!(sma(&[], 3).is_empty());
        assert!(sma(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
        assert!(sma(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_recurrence() {
        // period 3 => k = 0.5
        let out = ema(&[10.0, 11.0, 12.0], 3);
        assert!(approx(out[0], 10.0));
        assert!(approx(out[1], 10.5));
        assert!(approx(out[2], 11.25));
    }

    #[test]
    fn ema_degenerate() {
        assert!(ema(&[], 5).is_empty());
        assert!(ema(&[1.0], 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_warmup_boundary() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&values, 7);
        assert!(out[..7].iter().all(|v| v.is_nan()));
        assert!(out[7..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn rsi_zero_loss_is_100() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&rising, 7);
        assert!(approx(out[19], 100.0));

        let flat = vec![100.0; 20];
        let out = rsi(&flat, 7);
        assert!(approx(out[19], 100.0));
    }

    #[test]
    fn rsi_zero_gain_is_0() {
        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let out = rsi(&falling, 7);
        assert!(approx(out[19], 0.0));
    }

    #[test]
    fn rsi_wilder_smoothing_exact() {
        // period 2, closes 1,2,1,2: seed avg gain 0.5, avg loss 0.5 => 50,
        // then gain 1 => avg gain 0.75, avg loss 0.25 => RS 3 => 75.
        let out = rsi(&[1.0, 2.0, 1.0, 2.0], 2);
        assert!(approx(out[2], 50.0));
        assert!(approx(out[3], 75.0));
    }

    #[test]
    fn rsi_bounds() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.0, 5.0];
        for v in rsi(&values, 3).iter().filter(|v| v.is_finite()) {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn stochastic_flat_window_is_50() {
        let flat = vec![100.0; 30];
        let s = stochastic(&flat, &flat, &flat, 5, 3, 3);
        let last = *s.k.last().unwrap();
        assert!(approx(last, 50.0));
        assert!(approx(*s.d.last().unwrap(), 50.0));
    }

    #[test]
    fn stochastic_close_at_high_is_100() {
        let close: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
        let s = stochastic(&close, &low, &close, 5, 3, 3);
        assert!(approx(*s.k.last().unwrap(), 100.0));
    }

    #[test]
    fn stochastic_warmup_extends_through_smoothing() {
        let close: Vec<f64> = (0..30).map(|i| 100.0 + (i % 4) as f64).collect();
        let s = stochastic(&close, &close, &close, 5, 3, 3);
        // raw defined at 4, slow K at 6, D at 8
        assert!(s.k[5].is_nan());
        assert!(s.k[6].is_finite());
        assert!(s.d[7].is_nan());
        assert!(s.d[8].is_finite());
    }

    #[test]
    fn macd_flat_is_zero() {
        let flat = vec![100.0; 40];
        let m = macd(&flat, 6, 13, 5);
        assert!(approx(*m.line.last().unwrap(), 0.0));
        assert!(approx(*m.signal.last().unwrap(), 0.0));
        assert!(approx(*m.histogram.last().unwrap(), 0.0));
    }

    #[test]
    fn macd_histogram_identity() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let m = macd(&values, 6, 13, 5);
        for i in 0..values.len() {
            assert!(approx(m.histogram[i], m.line[i] - m.signal[i]));
        }
    }

    #[test]
    fn atr_constant_range() {
        // every bar spans exactly 2.0 and closes inside the next bar's range
        let high: Vec<f64> = (0..30).map(|_| 101.0).collect();
        let low: Vec<f64> = (0..30).map(|_| 99.0).collect();
        let close = vec![100.0; 30];
        let out = atr(&high, &low, &close, 14);
        assert!(out[12].is_nan());
        assert!(approx(out[13], 2.0));
        assert!(approx(*out.last().unwrap(), 2.0));
    }

    #[test]
    fn adx_flat_is_zero() {
        let flat = vec![100.0; 60];
        let a = adx(&flat, &flat, &flat, 14);
        assert!(approx(*a.adx.last().unwrap(), 0.0));
        assert!(approx(*a.plus_di.last().unwrap(), 0.0));
    }

    #[test]
    fn adx_trend_has_directional_bias() {
        let close: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let high: Vec<f64> = close.iter().map(|c| c + 0.5).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 0.5).collect();
        let a = adx(&high, &low, &close, 14);
        let i = close.len() - 1;
        assert!(a.plus_di[i] > a.minus_di[i]);
        assert!(a.adx[i] > 0.0);
    }

    #[test]
    fn percent_b_flat_is_midpoint() {
        let flat = vec![100.0; 30];
        let out = percent_b(&flat, 20, 2.0);
        assert!(approx(*out.last().unwrap(), 0.5));
    }

    #[test]
    fn percent_b_rising_above_midline() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let out = percent_b(&values, 20, 2.0);
        assert!(*out.last().unwrap() > 0.5);
    }

    fn rising_wickless(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let close: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let low: Vec<f64> = close.iter().map(|c| c - 1.0).collect();
        (close.clone(), low, close)
    }

    #[test]
    fn ichimoku_below_warmup_is_none() {
        let (high, low, close) = rising_wickless(51);
        assert!(ichimoku(&high, &low, &close, &IchimokuConfig::default()).is_none());
    }

    #[test]
    fn ichimoku_uptrend_flags() {
        let (high, low, close) = rising_wickless(120);
        let snap = ichimoku(&high, &low, &close, &IchimokuConfig::default()).unwrap();
        assert!(snap.price_above_cloud);
        assert!(!snap.price_below_cloud);
        assert!(snap.tenkan > snap.kijun);
        assert!(snap.future_bullish);
        // spans displaced 26 bars back sit below current price
        assert!(snap.cloud_top < *close.last().unwrap());
    }

    #[test]
    fn ichimoku_downtrend_flags() {
        let close: Vec<f64> = (0..120).map(|i| 300.0 - i as f64).collect();
        let high: Vec<f64> = close.iter().map(|c| c + 1.0).collect();
        let snap = ichimoku(&high, &close, &close, &IchimokuConfig::default()).unwrap();
        assert!(snap.price_below_cloud);
        assert!(snap.tenkan < snap.kijun);
        assert!(snap.future_bearish);
    }

    #[test]
    fn ichimoku_span_b_fallback_below_78_bars() {
        // 52..78 bars: span B falls back to the current 52-bar midpoint
        let (high, low, close) = rising_wickless(60);
        let snap = ichimoku(&high, &low, &close, &IchimokuConfig::default()).unwrap();
        let i = close.len() - 1;
        let current_mid = (high[i - 51..=i].iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))
            + low[i - 51..=i].iter().fold(f64::INFINITY, |a, &b| a.min(b)))
            / 2.0;
        assert!(approx(snap.span_b, current_mid));
    }

    #[test]
    fn swing_levels_cluster_and_filter() {
        let low = [
            105.0, 104.0, 100.0, 104.0, 105.0, 104.0, 100.1, 104.0, 105.0, 104.0, 103.0, 104.0,
        ];
        let high: Vec<f64> = low.iter().map(|l| l + 1.0).collect();
        let cfg = LevelConfig {
            lookback: 50,
            tolerance: 0.003,
            min_touches: 2,
        };
        let levels = swing_levels(&high, &low, &cfg);
        // 100.0 and 100.1 cluster into one level; 103.0 has one touch and drops
        assert_eq!(levels.len(), 2);
        assert!(approx(levels[0].price, 100.05));
        assert_eq!(levels[0].touches, 2);
        assert!(approx(levels[1].price, 106.0));
    }

    #[test]
    fn nearest_level_selection() {
        let levels = [
            Level {
                price: 100.05,
                touches: 2,
            },
            Level {
                price: 106.0,
                touches: 2,
            },
        ];
        let (support, resistance) = nearest_levels(&levels, 101.0);
        assert!(approx(support.unwrap(), 100.05));
        assert!(approx(resistance.unwrap(), 106.0));

        let (support, resistance) = nearest_levels(&levels, 99.0);
        assert!(support.is_none());
        assert!(approx(resistance.unwrap(), 100.05));

        // a level equal to the close is both support and resistance
        let (support, resistance) = nearest_levels(&levels, 106.0);
        assert!(approx(support.unwrap(), 106.0));
        assert!(approx(resistance.unwrap(), 106.0));
    }

    #[test]
    fn swing_levels_short_history_is_empty() {
        let cfg = LevelConfig::default();
        assert!(swing_levels(&[1.0, 2.0], &[1.0, 2.0], &cfg).is_empty());
    }
}
