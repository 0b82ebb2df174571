//! Telemetry Agent Simulator
//!
//! Stands in for a field agent: generates simulated sensor samples, scores
//! them over a rolling window, and inserts the resulting readings into the
//! telemetry table on a fixed cadence.
//!
//! - **generator**: Gaussian samples with occasional spikes
//! - **scorer**: Rolling-window z-score anomaly scorer

mod generator;
mod scorer;

pub use generator::{GeneratorConfig, ReadingGenerator, Sample};
pub use scorer::{Score, WindowScorer};

use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::monitor::Reading;
use crate::source::ReadingSink;

/// Agent simulator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Time between uploads (ms)
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Number of preceding samples the scorer compares against
    #[serde(default = "default_window")]
    pub window: usize,

    /// Score above which a sample is flagged as anomalous
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Probability of injecting a spike into a sample
    #[serde(default = "default_spike_probability")]
    pub spike_probability: f64,

    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_interval() -> u64 {
    2000
}

fn default_window() -> usize {
    10
}

fn default_threshold() -> f64 {
    3.0
}

fn default_spike_probability() -> f64 {
    0.05
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            window: default_window(),
            threshold: default_threshold(),
            spike_probability: default_spike_probability(),
            seed: None,
        }
    }
}

impl AgentConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Summary of an agent run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    pub sent: u64,
    pub anomalies: u64,
    pub failed: u64,
}

/// Errors that stop an agent before it starts
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid agent configuration: {0}")]
    Config(String),
}

/// Simulated field agent
pub struct Agent {
    generator: ReadingGenerator,
    scorer: WindowScorer,
    config: AgentConfig,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        if !(0.0..=1.0).contains(&config.spike_probability) {
            return Err(AgentError::Config(format!(
                "spike_probability must be within [0, 1], got {}",
                config.spike_probability
            )));
        }

        let generator_config = GeneratorConfig {
            spike_probability: config.spike_probability,
            ..Default::default()
        };
        let generator = match config.seed {
            Some(seed) => ReadingGenerator::seeded(generator_config, seed),
            None => ReadingGenerator::new(generator_config),
        };

        Ok(Self {
            generator,
            scorer: WindowScorer::new(config.window, config.threshold),
            config,
        })
    }

    /// Produce the next scored reading, stamped now
    pub fn next_reading(&mut self) -> Reading {
        let sample = self.generator.next_sample();
        let score = self.scorer.score(sample.temperature, sample.vibration);

        Reading::new(
            round2(sample.temperature),
            round2(sample.vibration),
            score.is_anomaly,
        )
        .score(score.value)
    }

    /// Upload readings until `shutdown` resolves
    ///
    /// Optionally stops after `limit` successful uploads. Insert failures are
    /// logged and the loop continues on the next tick.
    pub async fn run<F>(
        mut self,
        sink: Arc<dyn ReadingSink>,
        limit: Option<u64>,
        shutdown: F,
    ) -> AgentStats
    where
        F: Future<Output = ()>,
    {
        let mut stats = AgentStats::default();
        let mut ticker = tokio::time::interval(self.config.interval());
        tokio::pin!(shutdown);

        tracing::info!(
            interval_ms = self.config.interval_ms,
            threshold = self.config.threshold,
            "Agent simulator started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let reading = self.next_reading();
            match sink.insert(&reading).await {
                Ok(()) => {
                    stats.sent += 1;
                    if reading.is_anomaly {
                        stats.anomalies += 1;
                    }
                    tracing::info!(
                        temperature = reading.temperature,
                        vibration = reading.vibration,
                        score = reading.anomaly_score.unwrap_or_default(),
                        status = if reading.is_anomaly { "ANOMALY" } else { "NOMINAL" },
                        "Sent reading"
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(error = %e, "Failed to upload reading");
                }
            }

            if limit.map(|l| stats.sent >= l).unwrap_or(false) {
                break;
            }
        }

        tracing::info!(
            sent = stats.sent,
            anomalies = stats.anomalies,
            failed = stats.failed,
            "Agent simulator stopped"
        );
        stats
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
