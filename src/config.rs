//! Engine configuration: one explicit structure for every period and threshold
//! the evaluators use, plus named presets.
//!
//! Presets differ only in threshold constants, never in logic. `Standard` is
//! the canonical rule set; `Legacy` relaxes the superseded thresholds and
//! `Strict` tightens them. The whole tree deserializes with defaults so a
//! partial JSON config is enough.

use std::str::FromStr;

use crate::{Result, SignalError};

// ============================================================
// SERIES PERIODS
// ============================================================

/// Ichimoku periods (9/26/52) and span displacement.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IchimokuConfig {
    pub tenkan: usize,
    pub kijun: usize,
    pub senkou: usize,
    pub displacement: usize,
}

impl Default for IchimokuConfig {
    fn default() -> Self {
        Self {
            tenkan: 9,
            kijun: 26,
            senkou: 52,
            displacement: 26,
        }
    }
}

/// Swing-level detection: trailing lookback, clustering tolerance (relative
/// distance) and the minimum touch count for a level to survive.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub lookback: usize,
    pub tolerance: f64,
    pub min_touches: usize,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            tolerance: 0.003,
            min_touches: 2,
        }
    }
}

/// Every indicator period used by the series bundle.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    pub ema_fast: usize,
    pub ema_scalp: usize,
    pub ema_confluence: usize,
    pub ema_medium: usize,
    pub ema_slow: usize,
    pub rsi_scalp: usize,
    pub rsi_classic: usize,
    pub rsi_fast: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stoch_k: usize,
    pub stoch_slowing: usize,
    pub stoch_d: usize,
    pub atr: usize,
    pub adx: usize,
    pub bollinger: usize,
    pub bollinger_width: f64,
    pub ichimoku: IchimokuConfig,
    pub levels: LevelConfig,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            ema_fast: 5,
            ema_scalp: 9,
            ema_confluence: 13,
            ema_medium: 21,
            ema_slow: 50,
            rsi_scalp: 3,
            rsi_classic: 6,
            rsi_fast: 7,
            macd_fast: 6,
            macd_slow: 13,
            macd_signal: 5,
            stoch_k: 5,
            stoch_slowing: 3,
            stoch_d: 3,
            atr: 14,
            adx: 14,
            bollinger: 20,
            bollinger_width: 2.0,
            ichimoku: IchimokuConfig::default(),
            levels: LevelConfig::default(),
        }
    }
}

// ============================================================
// SETUP THRESHOLDS
// ============================================================

/// Ichimoku trend setup: base confidence for the cloud-position gate plus an
/// additive step per confirming condition, capped.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IchimokuTrendConfig {
    pub base_confidence: u8,
    pub condition_step: u8,
    pub max_confidence: u8,
}

impl Default for IchimokuTrendConfig {
    fn default() -> Self {
        Self {
            base_confidence: 65,
            condition_step: 10,
            max_confidence: 95,
        }
    }
}

/// Reversal-at-level setup.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReversalConfig {
    /// "Near level" band: `|price - level| / price <= near_tolerance`.
    pub near_tolerance: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Body-to-range ratio above which a candle counts as dominant-body.
    pub dominant_body: f64,
    pub confidence: u8,
}

impl Default for ReversalConfig {
    fn default() -> Self {
        Self {
            near_tolerance: 0.003,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            dominant_body: 0.6,
            confidence: 78,
        }
    }
}

/// Trend-continuation setup.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContinuationConfig {
    pub near_tolerance: f64,
    /// RSI must cross back through this boundary on the current bar
    /// (mirrored as `100 - rsi_boundary` for the fall side).
    pub rsi_boundary: f64,
    pub confidence: u8,
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            near_tolerance: 0.003,
            rsi_boundary: 35.0,
            confidence: 72,
        }
    }
}

/// Fast EMA / stochastic confluence setup.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Stochastic cross must have occurred within this many bars back.
    pub recency: usize,
    pub oversold: f64,
    pub overbought: f64,
    /// %K may sit this far above the oversold line (below the overbought line
    /// for falls) and still count as "recovering from" the zone.
    pub recovery_band: f64,
    pub confidence: u8,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            recency: 1,
            oversold: 25.0,
            overbought: 75.0,
            recovery_band: 20.0,
            confidence: 74,
        }
    }
}

/// Trend filter (MACD + slow EMA) setup, with the strong variant's extras.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrendFilterConfig {
    /// Minimum relative distance of close from the slow EMA.
    pub min_distance: f64,
    /// Minimum relative EMA slope over `slope_bars` to count as non-flat.
    pub min_slope: f64,
    pub slope_bars: usize,
    /// Lookback window for a MACD-line zero cross to substitute for rising
    /// histogram momentum.
    pub zero_cross_lookback: usize,
    /// "Near a swing level" band for the strong variant.
    pub level_tolerance: f64,
    pub rsi_midline: f64,
    pub confidence: u8,
    pub strong_confidence: u8,
}

impl Default for TrendFilterConfig {
    fn default() -> Self {
        Self {
            min_distance: 0.002,
            min_slope: 0.0005,
            slope_bars: 5,
            zero_cross_lookback: 3,
            level_tolerance: 0.005,
            rsi_midline: 50.0,
            confidence: 76,
            strong_confidence: 88,
        }
    }
}

/// Momentum scalp setup.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScalpConfig {
    /// Candle body must be at least this fraction of ATR.
    pub body_atr_fraction: f64,
    /// At least this many of the last three bars must meet the body floor.
    pub min_sized_bars: usize,
    /// Bars during which a repeat same-direction trigger is suppressed.
    pub cooldown: usize,
    /// Bars scanned for a prior trigger cancelled by an engulfing reversal.
    pub invalidation_lookback: usize,
    pub confidence: u8,
}

impl Default for ScalpConfig {
    fn default() -> Self {
        Self {
            body_atr_fraction: 0.5,
            min_sized_bars: 2,
            cooldown: 5,
            invalidation_lookback: 8,
            confidence: 73,
        }
    }
}

/// Candle trap detector thresholds, stage by stage.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrapConfig {
    pub min_history: usize,
    /// Trap body must exceed this fraction of its range (doji filter).
    pub min_body_fraction: f64,
    /// Trap range must be at least this multiple of the trailing average range.
    pub expansion_factor: f64,
    pub avg_range_period: usize,
    /// Dominant wick must be at least this multiple of the body.
    pub wick_body_ratio: f64,
    /// Body must be at most this fraction of the range.
    pub max_body_fraction: f64,
    /// Dominant wick must be at least this fraction of the range.
    pub min_wick_fraction: f64,
    /// Reject if an opposite-shaped trap occurred in this many previous bars.
    pub opposite_window: usize,
    /// Reject if at least `crowding_max` trap shapes occurred in this many
    /// previous bars.
    pub crowding_window: usize,
    pub crowding_max: usize,
    pub min_slope: f64,
    pub slope_bars: usize,
    /// Trap close must sit within this relative band of the medium EMA.
    pub ema_tolerance: f64,
    pub rsi_rise_low: f64,
    pub rsi_rise_high: f64,
    pub rsi_fall_low: f64,
    pub rsi_fall_high: f64,
    /// Window and minimum count for agreeing bar-over-bar moves.
    pub directional_window: usize,
    pub directional_min: usize,
    /// Prior swing-extreme window the trap must not breach (or, in the
    /// breakout-failure variant, must breach and close back inside).
    pub swing_lookback: usize,
    pub breakout_failure: bool,
    pub trade_levels: bool,
    /// Stop sits this fraction of the trap range beyond the trap extreme.
    pub stop_buffer: f64,
    pub reward_multiple: f64,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            min_history: 30,
            min_body_fraction: 0.05,
            expansion_factor: 0.90,
            avg_range_period: 20,
            wick_body_ratio: 2.0,
            max_body_fraction: 0.35,
            min_wick_fraction: 0.5,
            opposite_window: 4,
            crowding_window: 10,
            crowding_max: 3,
            min_slope: 0.0005,
            slope_bars: 5,
            ema_tolerance: 0.005,
            rsi_rise_low: 25.0,
            rsi_rise_high: 40.0,
            rsi_fall_low: 60.0,
            rsi_fall_high: 75.0,
            directional_window: 5,
            directional_min: 3,
            swing_lookback: 20,
            breakout_failure: false,
            trade_levels: true,
            stop_buffer: 0.1,
            reward_multiple: 2.0,
        }
    }
}

// ============================================================
// TOP-LEVEL CONFIG + PRESETS
// ============================================================

/// Named threshold presets. Only constants differ between presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Preset {
    /// Superseded, relaxed thresholds kept for regression parity.
    Legacy,
    /// The canonical rule set.
    Standard,
    /// Tightened thresholds.
    Strict,
}

impl FromStr for Preset {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "legacy" => Ok(Preset::Legacy),
            "standard" => Ok(Preset::Standard),
            "strict" => Ok(Preset::Strict),
            other => Err(SignalError::UnknownPreset(other.to_string())),
        }
    }
}

/// The single explicit configuration structure passed into the evaluators.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub series: SeriesConfig,
    pub ichimoku_trend: IchimokuTrendConfig,
    pub reversal: ReversalConfig,
    pub continuation: ContinuationConfig,
    pub confluence: ConfluenceConfig,
    pub trend_filter: TrendFilterConfig,
    pub scalp: ScalpConfig,
    pub trap: TrapConfig,
    /// Bars required before the engine produces directional output at all.
    pub min_history: usize,
    /// Opt-in bar-data validation on every classify call.
    pub validate_data: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            series: SeriesConfig::default(),
            ichimoku_trend: IchimokuTrendConfig::default(),
            reversal: ReversalConfig::default(),
            continuation: ContinuationConfig::default(),
            confluence: ConfluenceConfig::default(),
            trend_filter: TrendFilterConfig::default(),
            scalp: ScalpConfig::default(),
            trap: TrapConfig::default(),
            min_history: 100,
            validate_data: false,
        }
    }
}

impl SignalConfig {
    /// Configuration for a named preset.
    pub fn preset(preset: Preset) -> Self {
        let mut cfg = Self::default();
        match preset {
            Preset::Standard => {}
            Preset::Legacy => {
                cfg.trap.expansion_factor = 0.80;
                cfg.scalp.cooldown = 3;
                cfg.scalp.invalidation_lookback = 6;
                cfg.confluence.recency = 2;
                cfg.trend_filter.zero_cross_lookback = 5;
            }
            Preset::Strict => {
                cfg.trap.expansion_factor = 1.05;
                cfg.scalp.cooldown = 8;
                cfg.scalp.invalidation_lookback = 10;
                cfg.reversal.near_tolerance = 0.002;
                cfg.trend_filter.min_distance = 0.003;
            }
        }
        cfg
    }

    /// Configuration for a preset by name ("legacy", "standard", "strict").
    pub fn from_preset(name: &str) -> Result<Self> {
        Ok(Self::preset(name.parse()?))
    }

    /// Validate every period and threshold. Called by the engine builder.
    pub fn validate(&self) -> Result<()> {
        let s = &self.series;
        for (field, value) in [
            ("ema_fast", s.ema_fast),
            ("ema_scalp", s.ema_scalp),
            ("ema_confluence", s.ema_confluence),
            ("ema_medium", s.ema_medium),
            ("ema_slow", s.ema_slow),
            ("rsi_scalp", s.rsi_scalp),
            ("rsi_classic", s.rsi_classic),
            ("rsi_fast", s.rsi_fast),
            ("macd_fast", s.macd_fast),
            ("macd_slow", s.macd_slow),
            ("macd_signal", s.macd_signal),
            ("stoch_k", s.stoch_k),
            ("stoch_slowing", s.stoch_slowing),
            ("stoch_d", s.stoch_d),
            ("atr", s.atr),
            ("adx", s.adx),
            ("bollinger", s.bollinger),
            ("ichimoku.tenkan", s.ichimoku.tenkan),
            ("ichimoku.kijun", s.ichimoku.kijun),
            ("ichimoku.senkou", s.ichimoku.senkou),
            ("levels.lookback", s.levels.lookback),
            ("levels.min_touches", s.levels.min_touches),
            ("trap.avg_range_period", self.trap.avg_range_period),
            ("trap.swing_lookback", self.trap.swing_lookback),
            ("trap.directional_window", self.trap.directional_window),
            ("min_history", self.min_history),
        ] {
            check_period(field, value)?;
        }

        if s.macd_fast >= s.macd_slow {
            return Err(SignalError::InvalidConfig(format!(
                "macd_fast ({}) must be shorter than macd_slow ({})",
                s.macd_fast, s.macd_slow
            )));
        }
        if s.ichimoku.tenkan >= s.ichimoku.kijun || s.ichimoku.kijun >= s.ichimoku.senkou {
            return Err(SignalError::InvalidConfig(
                "ichimoku periods must be strictly increasing".to_string(),
            ));
        }

        for (field, value) in [
            ("levels.tolerance", s.levels.tolerance),
            ("reversal.near_tolerance", self.reversal.near_tolerance),
            ("continuation.near_tolerance", self.continuation.near_tolerance),
            ("trend_filter.min_distance", self.trend_filter.min_distance),
            ("trend_filter.level_tolerance", self.trend_filter.level_tolerance),
            ("trap.ema_tolerance", self.trap.ema_tolerance),
            ("trap.min_body_fraction", self.trap.min_body_fraction),
            ("trap.max_body_fraction", self.trap.max_body_fraction),
            ("trap.min_wick_fraction", self.trap.min_wick_fraction),
            ("scalp.body_atr_fraction", self.scalp.body_atr_fraction),
        ] {
            check_fraction(field, value)?;
        }

        for (field, value) in [
            ("reversal.rsi_oversold", self.reversal.rsi_oversold),
            ("reversal.rsi_overbought", self.reversal.rsi_overbought),
            ("continuation.rsi_boundary", self.continuation.rsi_boundary),
            ("confluence.oversold", self.confluence.oversold),
            ("confluence.overbought", self.confluence.overbought),
            ("trend_filter.rsi_midline", self.trend_filter.rsi_midline),
            ("trap.rsi_rise_low", self.trap.rsi_rise_low),
            ("trap.rsi_rise_high", self.trap.rsi_rise_high),
            ("trap.rsi_fall_low", self.trap.rsi_fall_low),
            ("trap.rsi_fall_high", self.trap.rsi_fall_high),
        ] {
            check_range(field, value, 0.0, 100.0)?;
        }

        check_range(
            "trap.expansion_factor",
            self.trap.expansion_factor,
            0.1,
            3.0,
        )?;
        check_range("trap.wick_body_ratio", self.trap.wick_body_ratio, 0.5, 10.0)?;
        check_range("trap.reward_multiple", self.trap.reward_multiple, 0.1, 20.0)?;
        check_range("series.bollinger_width", s.bollinger_width, 0.1, 10.0)?;

        for (field, value) in [
            ("ichimoku_trend.base_confidence", self.ichimoku_trend.base_confidence),
            ("ichimoku_trend.max_confidence", self.ichimoku_trend.max_confidence),
            ("reversal.confidence", self.reversal.confidence),
            ("continuation.confidence", self.continuation.confidence),
            ("confluence.confidence", self.confluence.confidence),
            ("trend_filter.confidence", self.trend_filter.confidence),
            ("trend_filter.strong_confidence", self.trend_filter.strong_confidence),
            ("scalp.confidence", self.scalp.confidence),
        ] {
            if value > 100 {
                return Err(SignalError::OutOfRange {
                    field,
                    value: value as f64,
                    min: 0.0,
                    max: 100.0,
                });
            }
        }

        Ok(())
    }
}

fn check_period(field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(SignalError::InvalidConfig(format!("{field} must be > 0")));
    }
    Ok(())
}

fn check_fraction(field: &'static str, value: f64) -> Result<()> {
    check_range(field, value, 0.0, 1.0)
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(SignalError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SignalConfig::default().validate().is_ok());
        for preset in [Preset::Legacy, Preset::Standard, Preset::Strict] {
            assert!(SignalConfig::preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn standard_preset_is_default() {
        assert_eq!(SignalConfig::preset(Preset::Standard), SignalConfig::default());
    }

    #[test]
    fn presets_differ_only_in_thresholds() {
        let legacy = SignalConfig::preset(Preset::Legacy);
        let strict = SignalConfig::preset(Preset::Strict);
        assert_eq!(legacy.trap.expansion_factor, 0.80);
        assert_eq!(strict.trap.expansion_factor, 1.05);
        assert!(legacy.scalp.cooldown < strict.scalp.cooldown);
        // series periods never change between presets
        assert_eq!(legacy.series, strict.series);
    }

    #[test]
    fn preset_by_name() {
        assert!(SignalConfig::from_preset("standard").is_ok());
        assert!(SignalConfig::from_preset("legacy").is_ok());
        let err = SignalConfig::from_preset("aggressive").unwrap_err();
        assert!(matches!(err, SignalError::UnknownPreset(_)));
    }

    #[test]
    fn zero_period_rejected() {
        let mut cfg = SignalConfig::default();
        cfg.series.ema_medium = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn macd_period_order_enforced() {
        let mut cfg = SignalConfig::default();
        cfg.series.macd_fast = 13;
        cfg.series.macd_slow = 6;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tolerance_out_of_range_rejected() {
        let mut cfg = SignalConfig::default();
        cfg.reversal.near_tolerance = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SignalConfig::default();
        cfg.trap.ema_tolerance = f64::NAN;
        assert!(cfg.validate().is_err());
    }
}
