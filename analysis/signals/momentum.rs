//! Momentum oscillators: rate of change and stochastic %K

use crate::types::{Indicator, IndicatorKind, IndicatorValue};
use ag_storage::Bar;
use std::collections::VecDeque;

/// Rate of Change in percent against the close `period` bars ago
#[derive(Debug, Clone)]
pub struct RateOfChange {
    period: usize,
    prices: VecDeque<f64>,
}

impl RateOfChange {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prices: VecDeque::with_capacity(period + 2),
        }
    }

    pub fn push(&mut self, price: f64) {
        self.prices.push_back(price);
        if self.prices.len() > self.period + 1 {
            self.prices.pop_front();
        }
    }

    /// Undefined (None) while warming up or when the reference close is 0
    pub fn value(&self) -> Option<f64> {
        if self.period == 0 || self.prices.len() < self.period + 1 {
            return None;
        }
        let reference = *self.prices.front()?;
        let current = *self.prices.back()?;
        if reference == 0.0 {
            return None;
        }
        Some((current - reference) / reference * 100.0)
    }
}

impl Indicator for RateOfChange {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Roc {
            period: self.period,
        }
    }

    fn update(&mut self, bar: &Bar) -> Option<IndicatorValue> {
        self.push(bar.close);
        self.value().map(IndicatorValue::Single)
    }
}

/// Stochastic %K over the trailing `period` bars
///
/// Defined as 50 when the high/low range is zero.
#[derive(Debug, Clone)]
pub struct StochasticOscillator {
    period: usize,
    window: VecDeque<(f64, f64)>,
    close: f64,
}

impl StochasticOscillator {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
            close: 0.0,
        }
    }

    pub fn push(&mut self, high: f64, low: f64, close: f64) {
        self.window.push_back((high, low));
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        self.close = close;
    }

    pub fn value(&self) -> Option<f64> {
        if self.period == 0 || self.window.len() < self.period {
            return None;
        }

        let highest = self
            .window
            .iter()
            .map(|(h, _)| *h)
            .fold(f64::NEG_INFINITY, f64::max);
        let lowest = self
            .window
            .iter()
            .map(|(_, l)| *l)
            .fold(f64::INFINITY, f64::min);

        let range = highest - lowest;
        if range <= 0.0 {
            return Some(50.0);
        }
        Some((self.close - lowest) / range * 100.0)
    }
}

impl Indicator for StochasticOscillator {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Stochastic {
            period: self.period,
        }
    }

    fn update(&mut self, bar: &Bar) -> Option<IndicatorValue> {
        self.push(bar.high, bar.low, bar.close);
        self.value().map(IndicatorValue::Single)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_roc() {
        let mut roc = RateOfChange::new(2);
        roc.push(100.0);
        roc.push(105.0);
        assert_eq!(roc.value(), None);

        roc.push(110.0);
        assert_relative_eq!(roc.value().unwrap(), 10.0);

        roc.push(99.0);
        assert_relative_eq!(roc.value().unwrap(), (99.0 - 105.0) / 105.0 * 100.0);
    }

    #[test]
    fn test_roc_zero_reference() {
        let mut roc = RateOfChange::new(1);
        roc.push(0.0);
        roc.push(5.0);
        assert_eq!(roc.value(), None);
        roc.push(6.0);
        assert!(roc.value().is_some());
    }

    #[test]
    fn test_stochastic() {
        let mut stoch = StochasticOscillator::new(3);
        stoch.push(11.0, 9.0, 10.0);
        stoch.push(12.0, 10.0, 11.0);
        assert_eq!(stoch.value(), None);

        stoch.push(13.0, 11.0, 12.0);
        // lowest 9, highest 13
        assert_relative_eq!(stoch.value().unwrap(), 75.0);
    }

    #[test]
    fn test_stochastic_flat_range() {
        let mut stoch = StochasticOscillator::new(2);
        stoch.push(5.0, 5.0, 5.0);
        stoch.push(5.0, 5.0, 5.0);
        assert_eq!(stoch.value(), Some(50.0));
    }
}
