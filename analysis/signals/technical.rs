//! Moving averages, RSI, MACD and Bollinger Bands
//!
//! Every indicator keeps only the state it needs to produce the next value,
//! so the same struct serves batch folding and incremental updates.

use crate::types::{Indicator, IndicatorKind, IndicatorValue, RsiSmoothing};
use ag_storage::Bar;
use std::collections::VecDeque;

/// Simple Moving Average indicator
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    prices: VecDeque<f64>,
}

impl SimpleMovingAverage {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prices: VecDeque::with_capacity(period + 1),
        }
    }

    pub fn push(&mut self, price: f64) {
        self.prices.push_back(price);
        if self.prices.len() > self.period {
            self.prices.pop_front();
        }
    }

    pub fn value(&self) -> Option<f64> {
        if self.period == 0 || self.prices.len() < self.period {
            return None;
        }
        Some(self.prices.iter().sum::<f64>() / self.period as f64)
    }
}

impl Indicator for SimpleMovingAverage {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Sma {
            period: self.period,
        }
    }

    fn update(&mut self, bar: &Bar) -> Option<IndicatorValue> {
        self.push(bar.close);
        self.value().map(IndicatorValue::Single)
    }
}

/// Exponential Moving Average indicator
///
/// Seeded with the SMA of the first `period` prices, then
/// `ema = price * alpha + prev * (1 - alpha)` with `alpha = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seen: usize,
    ema: Option<f64>,
}

impl ExponentialMovingAverage {
    pub fn new(period: usize) -> Self {
        let alpha = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            alpha,
            seed_sum: 0.0,
            seen: 0,
            ema: None,
        }
    }

    pub fn push(&mut self, price: f64) {
        match self.ema {
            Some(prev) => {
                self.ema = Some(self.alpha * price + (1.0 - self.alpha) * prev);
            }
            None => {
                self.seed_sum += price;
                self.seen += 1;
                if self.period > 0 && self.seen == self.period {
                    self.ema = Some(self.seed_sum / self.period as f64);
                }
            }
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.ema
    }
}

impl Indicator for ExponentialMovingAverage {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Ema {
            period: self.period,
        }
    }

    fn update(&mut self, bar: &Bar) -> Option<IndicatorValue> {
        self.push(bar.close);
        self.value().map(IndicatorValue::Single)
    }
}

/// Relative Strength Index indicator
#[derive(Debug, Clone)]
pub struct RelativeStrengthIndex {
    period: usize,
    smoothing: RsiSmoothing,
    gains: VecDeque<f64>,
    losses: VecDeque<f64>,
    /// Wilder running averages once seeded
    averages: Option<(f64, f64)>,
    prev_price: Option<f64>,
}

impl RelativeStrengthIndex {
    pub fn new(period: usize) -> Self {
        Self::with_smoothing(period, RsiSmoothing::Wilder)
    }

    pub fn with_smoothing(period: usize, smoothing: RsiSmoothing) -> Self {
        Self {
            period,
            smoothing,
            gains: VecDeque::with_capacity(period + 1),
            losses: VecDeque::with_capacity(period + 1),
            averages: None,
            prev_price: None,
        }
    }

    pub fn push(&mut self, price: f64) {
        if let Some(prev) = self.prev_price {
            let change = price - prev;
            let (gain, loss) = if change > 0.0 {
                (change, 0.0)
            } else {
                (0.0, -change)
            };

            match (self.smoothing, self.averages) {
                (RsiSmoothing::Wilder, Some((avg_gain, avg_loss))) => {
                    let n = self.period as f64;
                    self.averages = Some((
                        (avg_gain * (n - 1.0) + gain) / n,
                        (avg_loss * (n - 1.0) + loss) / n,
                    ));
                }
                _ => {
                    self.gains.push_back(gain);
                    self.losses.push_back(loss);
                    if self.gains.len() > self.period {
                        self.gains.pop_front();
                        self.losses.pop_front();
                    }

                    if self.period > 0 && self.gains.len() == self.period {
                        let n = self.period as f64;
                        let averages = (
                            self.gains.iter().sum::<f64>() / n,
                            self.losses.iter().sum::<f64>() / n,
                        );
                        self.averages = Some(averages);
                        if self.smoothing == RsiSmoothing::Wilder {
                            self.gains.clear();
                            self.losses.clear();
                        }
                    }
                }
            }
        }
        self.prev_price = Some(price);
    }

    pub fn value(&self) -> Option<f64> {
        let (avg_gain, avg_loss) = self.averages?;

        if avg_loss == 0.0 {
            return Some(if avg_gain > 0.0 { 100.0 } else { 50.0 });
        }

        let rs = avg_gain / avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }
}

impl Indicator for RelativeStrengthIndex {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Rsi {
            period: self.period,
            smoothing: self.smoothing,
        }
    }

    fn update(&mut self, bar: &Bar) -> Option<IndicatorValue> {
        self.push(bar.close);
        self.value().map(IndicatorValue::Single)
    }
}

/// Bollinger Bands indicator
///
/// Width uses the population standard deviation of the window.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev: f64,
    sma: SimpleMovingAverage,
    prices: VecDeque<f64>,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev: f64) -> Self {
        Self {
            period,
            std_dev,
            sma: SimpleMovingAverage::new(period),
            prices: VecDeque::with_capacity(period + 1),
        }
    }

    pub fn push(&mut self, price: f64) {
        self.sma.push(price);
        self.prices.push_back(price);
        if self.prices.len() > self.period {
            self.prices.pop_front();
        }
    }

    /// (lower, middle, upper)
    pub fn bands(&self) -> Option<(f64, f64, f64)> {
        let middle = self.sma.value()?;

        if self.prices.len() < self.period {
            return None;
        }

        let variance = self
            .prices
            .iter()
            .map(|p| (p - middle).powi(2))
            .sum::<f64>()
            / self.period as f64;
        let std = variance.sqrt();

        let upper = middle + self.std_dev * std;
        let lower = middle - self.std_dev * std;

        Some((lower, middle, upper))
    }
}

impl Indicator for BollingerBands {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Bollinger {
            period: self.period,
            k: self.std_dev,
        }
    }

    fn update(&mut self, bar: &Bar) -> Option<IndicatorValue> {
        self.push(bar.close);
        self.bands()
            .map(|(lower, middle, upper)| IndicatorValue::Bands {
                upper,
                middle,
                lower,
            })
    }
}

/// MACD (Moving Average Convergence Divergence) indicator
///
/// The signal line is an SMA-seeded EMA of the MACD line, which only starts
/// once the slow EMA exists. The first complete value lands on bar
/// `slow + signal - 1`.
#[derive(Debug, Clone)]
pub struct MovingAverageConvergenceDivergence {
    fast: usize,
    slow: usize,
    fast_ema: ExponentialMovingAverage,
    slow_ema: ExponentialMovingAverage,
    signal_ema: ExponentialMovingAverage,
    macd: Option<f64>,
}

impl MovingAverageConvergenceDivergence {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast: fast_period,
            slow: slow_period,
            fast_ema: ExponentialMovingAverage::new(fast_period),
            slow_ema: ExponentialMovingAverage::new(slow_period),
            signal_ema: ExponentialMovingAverage::new(signal_period),
            macd: None,
        }
    }

    pub fn push(&mut self, price: f64) {
        self.fast_ema.push(price);
        self.slow_ema.push(price);

        if let (Some(fast), Some(slow)) = (self.fast_ema.value(), self.slow_ema.value()) {
            let macd = fast - slow;
            self.macd = Some(macd);
            self.signal_ema.push(macd);
        }
    }

    /// (macd, signal, histogram)
    pub fn value(&self) -> Option<(f64, f64, f64)> {
        let macd = self.macd?;
        let signal = self.signal_ema.value()?;
        Some((macd, signal, macd - signal))
    }
}

impl Indicator for MovingAverageConvergenceDivergence {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Macd {
            fast: self.fast,
            slow: self.slow,
            signal: self.signal_ema.period,
        }
    }

    fn update(&mut self, bar: &Bar) -> Option<IndicatorValue> {
        self.push(bar.close);
        self.value()
            .map(|(line, signal, histogram)| IndicatorValue::Macd {
                line,
                signal,
                histogram,
            })
    }
}
