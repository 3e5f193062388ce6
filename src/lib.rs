//! # YASCE - Yet Another Signal Classification Engine
//!
//! Composite directional-bias classification over OHLC bar series.
//!
//! A battery of independent technical-analysis setups each votes RISE, FALL or
//! NEUTRAL over the supplied candle history; the aggregator combines the votes
//! into one composite call with a strength grade and confidence score. The
//! engine is a pure, synchronous computation: no I/O, no shared mutable state,
//! and the same bar sequence always produces the same result.
//!
//! ## Quick Start
//!
//! ```rust
//! use yasce::prelude::*;
//!
//! // Define your OHLC data
//! struct Bar { o: f64, h: f64, l: f64, c: f64 }
//!
//! impl OHLC for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//! }
//!
//! // Create engine with the default setup battery
//! let engine = EngineBuilder::new()
//!     .with_defaults()
//!     .build()
//!     .unwrap();
//!
//! // Classify your history (oldest bar first)
//! let bars: Vec<Bar> = vec![];
//! let signal = engine.classify(&bars).unwrap();
//! assert_eq!(signal.label, "NEUTRAL"); // short history degrades to neutral
//! ```

pub mod aggregate;
pub mod config;
pub mod series;
pub mod setups;

pub mod prelude {
    pub use crate::{
        // Aggregation
        aggregate::{decide, label, overall_confidence, tally, VoteTally},
        // Parallel
        classify_parallel,
        // Configuration
        config::{Preset, SignalConfig},
        // Series math
        series::{
            adx, atr, ema, ichimoku, macd, nearest_levels, percent_b, rsi, sma, stochastic,
            swing_levels, Adx, IchimokuSnapshot, Level, Macd, Stochastic,
        },
        // Setups
        setups::{
            BuiltinSetup, CandleTrapSetup, EmaStochConfluenceSetup, IchimokuTrendSetup,
            LevelReversalSetup, MomentumScalpSetup, Setup, TrendContinuationSetup,
            TrendFilterSetup,
        },
        // Types
        Confidence,
        Direction,
        EngineBuilder,
        Grade,
        IndicatorSnapshot,
        InstrumentError,
        InstrumentSignal,
        OHLCExt,
        Replay,
        Result,
        SeriesBundle,
        SetupVote,
        // Engine
        SignalEngine,
        // Errors
        SignalError,
        SignalResult,
        Strength,
        TradePlan,
        // Core traits
        OHLC,
    };
}

use std::collections::BTreeMap;

use config::{SeriesConfig, SignalConfig};
use setups::BuiltinSetup;
use tracing::{debug, trace};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SignalError>;

/// Errors that can occur while configuring or running the engine
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignalError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown preset: {0:?}")]
    UnknownPreset(String),

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Integer percent in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Confidence(u8);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0);

    /// Create a new Confidence, validating the value is in [0, 100]
    pub fn new(value: u8) -> Result<Self> {
        if value > 100 {
            return Err(SignalError::OutOfRange {
                field: "Confidence",
                value: value as f64,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self(value))
    }

    /// Clamp into [0, 100] instead of validating
    pub fn saturating(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    /// Create a Confidence from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: u8) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl serde::Serialize for Confidence {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Confidence {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = u8::deserialize(d)?;
        Confidence::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core OHLC bar trait. Callers implement it for their own candle type; the
/// engine never owns candles.
pub trait OHLC {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    /// Bar timestamp, carried through to the result as metadata only.
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed candle geometry
pub trait OHLCExt: OHLC {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_wick(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_wick(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range ≈ 0
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    #[inline]
    fn upper_wick_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.upper_wick() / range)
    }

    #[inline]
    fn lower_wick_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.lower_wick() / range)
    }

    /// Validate bar consistency (used by the opt-in data check)
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().is_nan() || self.high().is_nan() || self.low().is_nan() || self.close().is_nan()
        {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(SignalError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        Ok(())
    }
}

impl<T: OHLC> OHLCExt for T {}

// ============================================================
// CORE RESULT TYPES
// ============================================================

/// Directional bias of a vote or composite signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Rise,
    Neutral,
    Fall,
}

impl Direction {
    #[inline]
    pub fn is_rise(self) -> bool {
        matches!(self, Direction::Rise)
    }

    #[inline]
    pub fn is_fall(self) -> bool {
        matches!(self, Direction::Fall)
    }

    /// The opposite directional bias; neutral stays neutral.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Rise => Direction::Fall,
            Direction::Fall => Direction::Rise,
            Direction::Neutral => Direction::Neutral,
        }
    }
}

/// Strength band of the composite signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
    None,
}

/// Candle-trap quality grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
}

impl Grade {
    /// Fixed confidence carried by each grade
    pub fn confidence(self) -> Confidence {
        match self {
            Grade::APlus => Confidence::new_const(95),
            Grade::A => Confidence::new_const(88),
            Grade::B => Confidence::new_const(78),
            Grade::C => Confidence::new_const(65),
        }
    }
}

/// Entry/stop/target levels attached to a fully graded trap signal
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradePlan {
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub grade: Grade,
}

/// Default confidence when a setup's conditions do not fire
pub const NEUTRAL_CONFIDENCE: Confidence = Confidence::new_const(45);

/// One setup's vote: direction, confidence and a human-readable detail.
/// Produced fresh on every evaluation, never mutated afterward.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SetupVote {
    pub name: &'static str,
    pub direction: Direction,
    pub confidence: Confidence,
    pub detail: String,
    /// Display metadata; never an aggregation input.
    pub weight: f64,
    #[serde(skip_serializing_if = "is_false")]
    pub strong: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aux: Option<BTreeMap<&'static str, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<TradePlan>,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl SetupVote {
    pub fn new(
        name: &'static str,
        direction: Direction,
        confidence: Confidence,
        detail: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            name,
            direction,
            confidence,
            detail: detail.into(),
            weight,
            strong: false,
            aux: None,
            plan: None,
        }
    }

    /// A neutral "did not fire" vote with the default confidence
    pub fn neutral(name: &'static str, weight: f64, detail: impl Into<String>) -> Self {
        Self::new(name, Direction::Neutral, NEUTRAL_CONFIDENCE, detail, weight)
    }

    /// Mark this as a strong-variant signal
    pub fn strong(mut self) -> Self {
        self.strong = true;
        self
    }

    /// Attach a scalar extra. Non-finite values are dropped so NaN can never
    /// reach the serialized result.
    pub fn with_aux(mut self, key: &'static str, value: f64) -> Self {
        if value.is_finite() {
            self.aux.get_or_insert_with(BTreeMap::new).insert(key, value);
        }
        self
    }

    pub fn with_plan(mut self, plan: TradePlan) -> Self {
        self.plan = Some(plan);
        self
    }
}

/// Derived indicator values for display. Every field is finite-or-`None`; NaN
/// never escapes into a serialized snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndicatorSnapshot {
    pub close: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_scalp: Option<f64>,
    pub ema_confluence: Option<f64>,
    pub ema_medium: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi_scalp: Option<f64>,
    pub rsi_classic: Option<f64>,
    pub rsi_fast: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub atr: Option<f64>,
    pub adx: Option<f64>,
    pub bollinger_percent_b: Option<f64>,
    pub tenkan: Option<f64>,
    pub kijun: Option<f64>,
    pub span_a: Option<f64>,
    pub span_b: Option<f64>,
    pub price_above_cloud: Option<bool>,
    pub price_below_cloud: Option<bool>,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

impl IndicatorSnapshot {
    fn from_bundle(bundle: &SeriesBundle, close: Option<f64>) -> Self {
        let ichi = bundle.ichimoku.as_ref();
        Self {
            close: close.and_then(finite),
            ema_fast: last_finite(&bundle.ema_fast),
            ema_scalp: last_finite(&bundle.ema_scalp),
            ema_confluence: last_finite(&bundle.ema_confluence),
            ema_medium: last_finite(&bundle.ema_medium),
            ema_slow: last_finite(&bundle.ema_slow),
            rsi_scalp: last_finite(&bundle.rsi_scalp),
            rsi_classic: last_finite(&bundle.rsi_classic),
            rsi_fast: last_finite(&bundle.rsi_fast),
            stoch_k: last_finite(&bundle.stoch.k),
            stoch_d: last_finite(&bundle.stoch.d),
            macd: last_finite(&bundle.macd.line),
            macd_signal: last_finite(&bundle.macd.signal),
            macd_histogram: last_finite(&bundle.macd.histogram),
            atr: last_finite(&bundle.atr),
            adx: last_finite(&bundle.adx.adx),
            bollinger_percent_b: last_finite(&bundle.percent_b),
            tenkan: ichi.map(|s| s.tenkan).and_then(finite),
            kijun: ichi.map(|s| s.kijun).and_then(finite),
            span_a: ichi.map(|s| s.span_a).and_then(finite),
            span_b: ichi.map(|s| s.span_b).and_then(finite),
            price_above_cloud: ichi.map(|s| s.price_above_cloud),
            price_below_cloud: ichi.map(|s| s.price_below_cloud),
            support: bundle.support.and_then(finite),
            resistance: bundle.resistance.and_then(finite),
        }
    }
}

/// The composite signal: one instance per classification call, owned by the
/// caller. Invariant: `rise_count + fall_count + neutral_count == votes.len()`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SignalResult {
    pub direction: Direction,
    pub strength: Strength,
    pub confidence: Confidence,
    /// Combined label, e.g. "STRONG RISE"
    pub label: String,
    pub votes: Vec<SetupVote>,
    pub rise_count: usize,
    pub fall_count: usize,
    pub neutral_count: usize,
    /// The last bar's timestamp - never the wall clock.
    pub timestamp: Option<i64>,
    pub snapshot: IndicatorSnapshot,
}

#[inline]
pub(crate) fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[inline]
pub(crate) fn last_finite(series: &[f64]) -> Option<f64> {
    series.last().copied().and_then(finite)
}

// ============================================================
// SERIES BUNDLE
// ============================================================

/// All indicator series computed once per classification call. Setups read
/// current and trailing values off the bundle instead of recomputing
/// sub-indicators per bar offset.
#[derive(Debug, Clone)]
pub struct SeriesBundle {
    pub close: Vec<f64>,
    pub ema_fast: Vec<f64>,
    pub ema_scalp: Vec<f64>,
    pub ema_confluence: Vec<f64>,
    pub ema_medium: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub rsi_scalp: Vec<f64>,
    pub rsi_classic: Vec<f64>,
    pub rsi_fast: Vec<f64>,
    pub stoch: series::Stochastic,
    pub macd: series::Macd,
    pub atr: Vec<f64>,
    pub adx: series::Adx,
    pub percent_b: Vec<f64>,
    pub ichimoku: Option<series::IchimokuSnapshot>,
    pub levels: Vec<series::Level>,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

impl SeriesBundle {
    /// Compute every series the setup battery reads, in one pass over the bars.
    pub fn compute<T: OHLC>(bars: &[T], cfg: &SeriesConfig) -> Self {
        let close: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let high: Vec<f64> = bars.iter().map(|b| b.high()).collect();
        let low: Vec<f64> = bars.iter().map(|b| b.low()).collect();

        let levels = series::swing_levels(&high, &low, &cfg.levels);
        let (support, resistance) = match close.last() {
            Some(&c) => series::nearest_levels(&levels, c),
            None => (None, None),
        };

        Self {
            ema_fast: series::ema(&close, cfg.ema_fast),
            ema_scalp: series::ema(&close, cfg.ema_scalp),
            ema_confluence: series::ema(&close, cfg.ema_confluence),
            ema_medium: series::ema(&close, cfg.ema_medium),
            ema_slow: series::ema(&close, cfg.ema_slow),
            rsi_scalp: series::rsi(&close, cfg.rsi_scalp),
            rsi_classic: series::rsi(&close, cfg.rsi_classic),
            rsi_fast: series::rsi(&close, cfg.rsi_fast),
            stoch: series::stochastic(&high, &low, &close, cfg.stoch_k, cfg.stoch_slowing, cfg.stoch_d),
            macd: series::macd(&close, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal),
            atr: series::atr(&high, &low, &close, cfg.atr),
            adx: series::adx(&high, &low, &close, cfg.adx),
            percent_b: series::percent_b(&close, cfg.bollinger, cfg.bollinger_width),
            ichimoku: series::ichimoku(&high, &low, &close, &cfg.ichimoku),
            levels,
            support,
            resistance,
            close,
        }
    }
}

// ============================================================
// SIGNAL ENGINE
// ============================================================

/// The classification engine: a fixed setup battery plus one configuration.
/// `Send + Sync`; one instance can classify many instruments concurrently.
pub struct SignalEngine {
    setups: Vec<BuiltinSetup>,
    config: SignalConfig,
}

impl SignalEngine {
    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Number of setups in the battery.
    pub fn battery_len(&self) -> usize {
        self.setups.len()
    }

    /// Compute the indicator bundle for a history (lower-level entry point
    /// for display layers).
    pub fn series<T: OHLC>(&self, bars: &[T]) -> SeriesBundle {
        SeriesBundle::compute(bars, &self.config.series)
    }

    /// Derived indicator values at the latest bar, finite-or-`None`.
    pub fn snapshot<T: OHLC>(&self, bars: &[T]) -> IndicatorSnapshot {
        let bundle = self.series(bars);
        IndicatorSnapshot::from_bundle(&bundle, bars.last().map(|b| b.close()))
    }

    /// Classify the full history (oldest bar first) into one composite signal.
    ///
    /// History shorter than `min_history` yields the neutral insufficient-data
    /// result - an empty vote list, zero counts, confidence 0, and a snapshot
    /// of whatever is computable. Errors come only from the opt-in data
    /// validation.
    pub fn classify<T: OHLC>(&self, bars: &[T]) -> Result<SignalResult> {
        if self.config.validate_data {
            self.validate_bars(bars)?;
        }
        Ok(self.classify_inner(bars))
    }

    /// Iterate composite signals per bar index from warm-up onward, each
    /// computed over the prefix ending at that bar (dashboard backfill).
    pub fn replay<'a, T: OHLC>(&'a self, bars: &'a [T]) -> Replay<'a, T> {
        Replay::new(self, bars)
    }

    fn classify_inner<T: OHLC>(&self, bars: &[T]) -> SignalResult {
        let timestamp = bars.last().and_then(|b| b.timestamp());
        let bundle = SeriesBundle::compute(bars, &self.config.series);
        let snapshot = IndicatorSnapshot::from_bundle(&bundle, bars.last().map(|b| b.close()));

        if bars.len() < self.config.min_history {
            debug!(
                bars = bars.len(),
                need = self.config.min_history,
                "history below warm-up, returning neutral"
            );
            return SignalResult {
                direction: Direction::Neutral,
                strength: Strength::None,
                confidence: Confidence::ZERO,
                label: aggregate::label(Direction::Neutral, Strength::None).to_string(),
                votes: Vec::new(),
                rise_count: 0,
                fall_count: 0,
                neutral_count: 0,
                timestamp,
                snapshot,
            };
        }

        let votes: Vec<SetupVote> = self
            .setups
            .iter()
            .map(|setup| {
                let vote = setup.evaluate(bars, &bundle, &self.config);
                trace!(
                    setup = vote.name,
                    direction = ?vote.direction,
                    confidence = vote.confidence.get(),
                    detail = %vote.detail,
                    "setup vote"
                );
                vote
            })
            .collect();

        let tally = aggregate::tally(&votes);
        let (direction, strength) = aggregate::decide(&tally);
        let confidence = aggregate::overall_confidence(&tally);
        let label = aggregate::label(direction, strength).to_string();
        debug!(
            ?direction,
            ?strength,
            label = %label,
            rise = tally.rise,
            fall = tally.fall,
            neutral = tally.neutral,
            confidence = confidence.get(),
            "classified"
        );

        SignalResult {
            direction,
            strength,
            confidence,
            label,
            votes,
            rise_count: tally.rise,
            fall_count: tally.fall,
            neutral_count: tally.neutral,
            timestamp,
            snapshot,
        }
    }

    fn validate_bars<T: OHLC>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                SignalError::InvalidBar { reason, .. } => SignalError::InvalidBar { index: i, reason },
                other => other,
            })?;
        }
        Ok(())
    }
}

// ============================================================
// REPLAY ITERATOR
// ============================================================

/// Iterator over per-prefix composite signals, one per bar from warm-up
/// onward. Each item is a full recomputation over the prefix.
pub struct Replay<'a, T: OHLC> {
    engine: &'a SignalEngine,
    bars: &'a [T],
    current: usize,
}

impl<'a, T: OHLC> Replay<'a, T> {
    fn new(engine: &'a SignalEngine, bars: &'a [T]) -> Self {
        let warmup = engine.config.min_history;
        let current = if bars.len() < warmup {
            bars.len() + 1 // exhausted
        } else {
            warmup
        };
        Self {
            engine,
            bars,
            current,
        }
    }
}

impl<'a, T: OHLC> Iterator for Replay<'a, T> {
    type Item = SignalResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current > self.bars.len() {
            return None;
        }
        let prefix = &self.bars[..self.current];
        self.current += 1;
        Some(self.engine.classify_inner(prefix))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.bars.len() + 1).saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl<'a, T: OHLC> ExactSizeIterator for Replay<'a, T> {}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating SignalEngine instances
pub struct EngineBuilder {
    setups: Vec<BuiltinSetup>,
    config: SignalConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            setups: Vec::new(),
            config: SignalConfig::default(),
        }
    }

    /// Add all seven builtin setups
    pub fn with_defaults(mut self) -> Self {
        self.setups.extend([
            BuiltinSetup::IchimokuTrend(setups::IchimokuTrendSetup),
            BuiltinSetup::LevelReversal(setups::LevelReversalSetup),
            BuiltinSetup::TrendContinuation(setups::TrendContinuationSetup),
            BuiltinSetup::EmaStochConfluence(setups::EmaStochConfluenceSetup),
            BuiltinSetup::TrendFilter(setups::TrendFilterSetup),
            BuiltinSetup::MomentumScalp(setups::MomentumScalpSetup),
            BuiltinSetup::CandleTrap(setups::CandleTrapSetup),
        ]);
        self
    }

    /// Add a single setup (for narrowed batteries)
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, setup: BuiltinSetup) -> Self {
        self.setups.push(setup);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: SignalConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a named preset's configuration
    pub fn preset(mut self, preset: config::Preset) -> Self {
        self.config = SignalConfig::preset(preset);
        self
    }

    /// Enable/disable bar-data validation on classify
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the engine, validating the configuration
    pub fn build(self) -> Result<SignalEngine> {
        self.config.validate()?;
        Ok(SignalEngine {
            setups: self.setups,
            config: self.config,
        })
    }
}

// ============================================================
// PARALLEL CLASSIFICATION
// ============================================================

use rayon::prelude::*;

/// Composite signal for a single instrument
#[derive(Debug)]
pub struct InstrumentSignal {
    pub symbol: String,
    pub signal: SignalResult,
}

/// Error from classifying a single instrument
#[derive(Debug)]
pub struct InstrumentError {
    pub symbol: String,
    pub error: SignalError,
}

/// Classify multiple instruments in parallel over one shared engine.
pub fn classify_parallel<'a, T, I>(
    engine: &SignalEngine,
    instruments: I,
) -> (Vec<InstrumentSignal>, Vec<InstrumentError>)
where
    T: OHLC + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .classify(bars)
                .map(|signal| InstrumentSignal {
                    symbol: symbol.to_string(),
                    signal,
                })
                .map_err(|error| InstrumentError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }
    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
        ts: i64,
    }

    impl Bar {
        fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
            Self { o, h, l, c, ts: 0 }
        }
    }

    impl OHLC for Bar {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn timestamp(&self) -> Option<i64> {
            Some(self.ts)
        }
    }

    /// Wickless compounding rise: open == low, close == high.
    fn rising_bars(n: usize) -> Vec<Bar> {
        let mut bars = Vec::with_capacity(n);
        let mut price = 100.0;
        for i in 0..n {
            let next = price * 1.005;
            bars.push(Bar {
                o: price,
                h: next,
                l: price,
                c: next,
                ts: i as i64 * 60,
            });
            price = next;
        }
        bars
    }

    #[test]
    fn confidence_validation() {
        assert!(Confidence::new(0).is_ok());
        assert!(Confidence::new(100).is_ok());
        assert!(Confidence::new(101).is_err());
        assert_eq!(Confidence::saturating(150).get(), 100);
        assert_eq!(Confidence::saturating(-3).get(), 0);
    }

    #[test]
    fn ohlc_ext_geometry() {
        let bar = Bar::new(100.0, 110.0, 90.0, 105.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert_eq!(bar.upper_wick(), 5.0);
        assert_eq!(bar.lower_wick(), 10.0);
        assert!(bar.is_bullish());
        assert!((bar.body_ratio().unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn zero_range_ratios_are_none() {
        let bar = Bar::new(100.0, 100.0, 100.0, 100.0);
        assert!(bar.body_ratio().is_none());
        assert!(bar.upper_wick_ratio().is_none());
    }

    #[test]
    fn engine_builder() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        assert_eq!(engine.battery_len(), 7);
    }

    #[test]
    fn invalid_config_rejected_at_build() {
        let mut cfg = SignalConfig::default();
        cfg.series.rsi_fast = 0;
        assert!(EngineBuilder::new().with_defaults().config(cfg).build().is_err());
    }

    #[test]
    fn short_history_is_neutral_not_error() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        let bars = rising_bars(50);
        let result = engine.classify(&bars).unwrap();
        assert_eq!(result.direction, Direction::Neutral);
        assert_eq!(result.strength, Strength::None);
        assert_eq!(result.confidence.get(), 0);
        assert!(result.votes.is_empty());
        assert_eq!(result.label, "NEUTRAL");
        // timestamp still comes from the last bar
        assert_eq!(result.timestamp, Some(49 * 60));
    }

    #[test]
    fn empty_history_is_neutral() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        let result = engine.classify(&Vec::<Bar>::new()).unwrap();
        assert_eq!(result.direction, Direction::Neutral);
        assert!(result.snapshot.close.is_none());
    }

    #[test]
    fn count_invariant_holds() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        let bars = rising_bars(150);
        let result = engine.classify(&bars).unwrap();
        assert_eq!(
            result.rise_count + result.fall_count + result.neutral_count,
            result.votes.len()
        );
        assert_eq!(result.votes.len(), 7);
    }

    #[test]
    fn determinism() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        let bars = rising_bars(150);
        let a = engine.classify(&bars).unwrap();
        let b = engine.classify(&bars).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn validate_data_catches_bad_bar() {
        let engine = EngineBuilder::new()
            .with_defaults()
            .validate_data(true)
            .build()
            .unwrap();
        let mut bars = rising_bars(120);
        bars[7] = Bar::new(100.0, 90.0, 110.0, 100.0); // high < low
        let err = engine.classify(&bars).unwrap_err();
        assert!(matches!(err, SignalError::InvalidBar { index: 7, .. }));
    }

    #[test]
    fn replay_exact_size() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        let bars = rising_bars(110);
        let replay = engine.replay(&bars);
        assert_eq!(replay.len(), 11); // prefixes of length 100..=110

        let results: Vec<_> = engine.replay(&bars).collect();
        assert_eq!(results.len(), 11);
        // final replay item equals a direct classification
        assert_eq!(results.last().unwrap(), &engine.classify(&bars).unwrap());
    }

    #[test]
    fn replay_below_warmup_is_empty() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        let bars = rising_bars(30);
        assert_eq!(engine.replay(&bars).count(), 0);
    }

    #[test]
    fn parallel_classification() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        let bars1 = rising_bars(150);
        let bars2 = rising_bars(120);
        let instruments: Vec<(&str, &[Bar])> = vec![("AAA", &bars1), ("BBB", &bars2)];
        let (results, errors) = classify_parallel(&engine, instruments);
        assert_eq!(results.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn snapshot_is_finite_or_none() {
        let engine = EngineBuilder::new().with_defaults().build().unwrap();
        let snapshot = engine.snapshot(&rising_bars(150));
        for value in [
            snapshot.close,
            snapshot.ema_medium,
            snapshot.rsi_fast,
            snapshot.stoch_k,
            snapshot.macd_histogram,
            snapshot.atr,
            snapshot.tenkan,
            snapshot.support,
        ]
        .into_iter()
        .flatten()
        {
            assert!(value.is_finite());
        }
        assert_eq!(snapshot.price_above_cloud, Some(true));
    }
}
