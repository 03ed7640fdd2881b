//! Price and volume alert conditions
//!
//! Detection only. Delivering an alert (email, push, webhook) is left to the
//! caller.

use crate::types::AnalysisSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum AlertRule {
    /// Close at or above `target`
    PriceAbove { target: f64 },

    /// Close at or below `target`
    PriceBelow { target: f64 },

    /// Absolute one-bar change of at least `percent`
    DailyMove { percent: f64 },

    /// Relative volume of at least `multiple`
    VolumeSpike { multiple: f64 },
}

/// Triggered alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub rule: AlertRule,
    /// Reading that triggered the rule
    pub value: f64,
    pub message: String,
}

impl AlertRule {
    /// Reading that triggers this rule, if any
    pub fn check(&self, snapshot: &AnalysisSnapshot) -> Option<(f64, String)> {
        match *self {
            AlertRule::PriceAbove { target } => (snapshot.close >= target).then(|| {
                (
                    snapshot.close,
                    format!("close {:.2} at or above {:.2}", snapshot.close, target),
                )
            }),
            AlertRule::PriceBelow { target } => (snapshot.close <= target).then(|| {
                (
                    snapshot.close,
                    format!("close {:.2} at or below {:.2}", snapshot.close, target),
                )
            }),
            AlertRule::DailyMove { percent } => {
                let change = snapshot.price_action.changes.one_bar?;
                (change.abs() >= percent)
                    .then(|| (change, format!("moved {:+.2}% in one bar", change)))
            }
            AlertRule::VolumeSpike { multiple } => {
                let relative = snapshot.volume.relative?;
                (relative >= multiple).then(|| {
                    (
                        relative,
                        format!("volume {:.1}x the trailing average", relative),
                    )
                })
            }
        }
    }
}

/// Rules triggered by `snapshot`, in rule order
pub fn check_alerts(snapshot: &AnalysisSnapshot, rules: &[AlertRule]) -> Vec<Alert> {
    rules
        .iter()
        .filter_map(|rule| {
            rule.check(snapshot).map(|(value, message)| Alert {
                symbol: snapshot.symbol.clone(),
                timestamp: snapshot.timestamp,
                rule: rule.clone(),
                value,
                message: format!("{}: {}", snapshot.symbol, message),
            })
        })
        .collect()
}
