//! Rolling monitor of delivered scores.
//!
//! Keeps the last [`MONITOR_WINDOW`] final scores and raises an alert when
//! the mean of the most recent [`ALERT_SAMPLES`] drops below
//! [`ALERT_MEAN_FLOOR`].

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

pub const MONITOR_WINDOW: usize = 100;
pub const ALERT_SAMPLES: usize = 10;
pub const ALERT_MEAN_FLOOR: f64 = 0.6;
/// Most recent alerts kept.
pub const MAX_RETAINED_ALERTS: usize = 50;

/// One monitored answer. Questions are kept only as a hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub user_id: String,
    pub question_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowMean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorAlert {
    pub kind: AlertKind,
    pub timestamp: DateTime<Utc>,
    pub mean: f64,
    pub samples: usize,
}

/// Aggregate statistics over the current window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub total: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Records at or above the threshold
    pub accepted: usize,
    pub approval_rate: f64,
    pub active_alerts: usize,
}

/// Short, stable digest of a question.
pub fn question_hash(question: &str) -> String {
    let digest = Sha256::digest(question.as_bytes());
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Default)]
pub struct HallucinationMonitor {
    records: VecDeque<ScoreRecord>,
    alerts: VecDeque<MonitorAlert>,
}

impl HallucinationMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivered score; returns the alert raised by this record, if any.
    pub fn record(&mut self, score: f64, user_id: &str, question: &str) -> Option<MonitorAlert> {
        self.records.push_back(ScoreRecord {
            timestamp: Utc::now(),
            score,
            user_id: user_id.to_string(),
            question_hash: question_hash(question),
        });
        while self.records.len() > MONITOR_WINDOW {
            self.records.pop_front();
        }
        self.check_alerts()
    }

    fn check_alerts(&mut self) -> Option<MonitorAlert> {
        if self.records.len() < ALERT_SAMPLES {
            return None;
        }
        let recent = self.records.iter().rev().take(ALERT_SAMPLES);
        let mean = recent.map(|r| r.score).sum::<f64>() / ALERT_SAMPLES as f64;
        if mean >= ALERT_MEAN_FLOOR {
            return None;
        }

        warn!(mean, samples = ALERT_SAMPLES, "recent confidence mean is low");
        let alert = MonitorAlert {
            kind: AlertKind::LowMean,
            timestamp: Utc::now(),
            mean,
            samples: ALERT_SAMPLES,
        };
        self.alerts.push_back(alert.clone());
        while self.alerts.len() > MAX_RETAINED_ALERTS {
            self.alerts.pop_front();
        }
        Some(alert)
    }

    pub fn records(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.records.iter()
    }

    /// Retained alerts, oldest first.
    pub fn alerts(&self) -> impl Iterator<Item = &MonitorAlert> {
        self.alerts.iter()
    }

    pub fn stats(&self, threshold: f64) -> MonitorStats {
        if self.records.is_empty() {
            return MonitorStats::default();
        }
        let total = self.records.len();
        let scores = || self.records.iter().map(|r| r.score);
        let accepted = scores().filter(|s| *s >= threshold).count();
        MonitorStats {
            total,
            mean: scores().sum::<f64>() / total as f64,
            min: scores().fold(f64::INFINITY, f64::min),
            max: scores().fold(f64::NEG_INFINITY, f64::max),
            accepted,
            approval_rate: accepted as f64 / total as f64,
            active_alerts: self.alerts.len(),
        }
    }
}
