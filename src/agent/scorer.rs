//! Rolling-window anomaly scorer
//!
//! Scores each sample against the preceding window of samples. The score is
//! the mean of the per-channel absolute z-scores; a sample is anomalous when
//! the score exceeds the threshold. Until the window is full every sample
//! scores zero.

use std::collections::VecDeque;

/// Score for a single sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    pub is_anomaly: bool,
}

/// Scores samples against a sliding baseline
#[derive(Debug, Clone)]
pub struct WindowScorer {
    window: VecDeque<(f64, f64)>,
    size: usize,
    threshold: f64,
}

impl WindowScorer {
    pub fn new(size: usize, threshold: f64) -> Self {
        let size = size.max(2);
        Self {
            window: VecDeque::with_capacity(size),
            size,
            threshold,
        }
    }

    /// Score a sample, then add it to the baseline
    pub fn score(&mut self, temperature: f64, vibration: f64) -> Score {
        let value = if self.window.len() < self.size {
            0.0
        } else {
            let temps: Vec<f64> = self.window.iter().map(|(t, _)| *t).collect();
            let vibs: Vec<f64> = self.window.iter().map(|(_, v)| *v).collect();
            let z = (z_score(&temps, temperature) + z_score(&vibs, vibration)) / 2.0;
            (z * 10_000.0).round() / 10_000.0
        };

        if self.window.len() >= self.size {
            self.window.pop_front();
        }
        self.window.push_back((temperature, vibration));

        Score {
            value,
            is_anomaly: value > self.threshold,
        }
    }

    pub fn is_warmed_up(&self) -> bool {
        self.window.len() >= self.size
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Absolute z-score of `x` against `baseline`; zero for a flat baseline
fn z_score(baseline: &[f64], x: f64) -> f64 {
    let n = baseline.len() as f64;
    let mean = baseline.iter().sum::<f64>() / n;
    let variance = baseline.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev < f64::EPSILON {
        0.0
    } else {
        (x - mean).abs() / std_dev
    }
}
