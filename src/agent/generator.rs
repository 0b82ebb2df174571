//! Simulated sensor samples
//!
//! Temperature hovers around 45°C and vibration around 0.2 G with gaussian
//! noise. Occasionally a spike pushes both channels well out of range.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One raw sensor sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub temperature: f64,
    pub vibration: f64,
    /// Whether the generator injected a spike into this sample
    pub spiked: bool,
}

/// Noise and spike parameters
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub temperature_mean: f64,
    pub temperature_std: f64,
    pub vibration_mean: f64,
    pub vibration_std: f64,
    pub spike_probability: f64,
    pub temperature_spike: f64,
    pub vibration_spike: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            temperature_mean: 45.0,
            temperature_std: 2.0,
            vibration_mean: 0.2,
            vibration_std: 0.05,
            spike_probability: 0.05,
            temperature_spike: 20.0,
            vibration_spike: 0.5,
        }
    }
}

/// Produces simulated samples
pub struct ReadingGenerator {
    rng: StdRng,
    config: GeneratorConfig,
}

impl ReadingGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            config,
        }
    }

    /// Deterministic generator for reproducible runs
    pub fn seeded(config: GeneratorConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }

    pub fn next_sample(&mut self) -> Sample {
        let spiked = self.rng.gen_bool(self.config.spike_probability.clamp(0.0, 1.0));

        let mut temperature = self.gaussian(self.config.temperature_mean, self.config.temperature_std);
        let mut vibration = self.gaussian(self.config.vibration_mean, self.config.vibration_std);

        if spiked {
            temperature += self.config.temperature_spike;
            vibration += self.config.vibration_spike;
        }

        Sample {
            temperature,
            vibration,
            spiked,
        }
    }

    /// Box-Muller transform
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}
