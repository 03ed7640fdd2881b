//! Volume analysis: trailing average, relative volume, trend and OBV

use crate::config::VolumeConfig;
use ag_storage::Bar;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Direction of recent volume against the window before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Flat,
}

impl fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeTrend::Increasing => write!(f, "increasing"),
            VolumeTrend::Decreasing => write!(f, "decreasing"),
            VolumeTrend::Flat => write!(f, "flat"),
        }
    }
}

/// Volume readings at the last bar of a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    /// Volume of the last bar
    pub current: u64,
    /// Mean volume of the `average_window` bars before the last one
    pub average: Option<f64>,
    /// current / average
    pub relative: Option<f64>,
    pub trend: Option<VolumeTrend>,
    /// On-balance volume over the whole series
    pub obv: i64,
    pub is_spike: bool,
}

/// Volume analyzer
#[derive(Debug, Clone, Default)]
pub struct VolumeAnalyzer {
    config: VolumeConfig,
}

impl VolumeAnalyzer {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    pub fn analyze(&self, bars: &[Bar]) -> VolumeAnalysis {
        let Some(last) = bars.last() else {
            return VolumeAnalysis::default();
        };

        let average = self.average_volume(bars);
        let relative = average
            .filter(|avg| *avg > 0.0)
            .map(|avg| last.volume as f64 / avg);
        let is_spike = relative.map_or(false, |r| r >= self.config.spike_threshold);

        VolumeAnalysis {
            current: last.volume,
            average,
            relative,
            trend: self.trend(bars),
            obv: on_balance_volume(bars),
            is_spike,
        }
    }

    /// Trailing average excluding the last bar
    pub fn average_volume(&self, bars: &[Bar]) -> Option<f64> {
        let window = self.config.average_window;
        if window == 0 || bars.len() < window + 1 {
            return None;
        }
        let end = bars.len() - 1;
        Some(mean_volume(&bars[end - window..end]))
    }

    /// Compare the last `short_window` bars with the `short_window` before them
    pub fn trend(&self, bars: &[Bar]) -> Option<VolumeTrend> {
        let window = self.config.short_window;
        if window == 0 || bars.len() < window * 2 {
            return None;
        }

        let end = bars.len();
        let recent = mean_volume(&bars[end - window..]);
        let prior = mean_volume(&bars[end - 2 * window..end - window]);

        if prior == 0.0 {
            return Some(if recent == 0.0 {
                VolumeTrend::Flat
            } else {
                VolumeTrend::Increasing
            });
        }

        let change = (recent - prior) / prior;
        if change.abs() <= self.config.flat_tolerance {
            Some(VolumeTrend::Flat)
        } else if change > 0.0 {
            Some(VolumeTrend::Increasing)
        } else {
            Some(VolumeTrend::Decreasing)
        }
    }
}

fn mean_volume(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64
}

/// Cumulative volume signed by close-to-close direction
pub fn on_balance_volume(bars: &[Bar]) -> i64 {
    bars.windows(2).fold(0i64, |obv, w| {
        let volume = i64::try_from(w[1].volume).unwrap_or(i64::MAX);
        match w[1].close.partial_cmp(&w[0].close) {
            Some(Ordering::Greater) => obv.saturating_add(volume),
            Some(Ordering::Less) => obv.saturating_sub(volume),
            _ => obv,
        }
    })
}
