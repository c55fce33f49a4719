//! Deterministic stand-in for an audio front-end pipeline.
//!
//! One unit processes a 1.5 s mono stream (24 000 samples at 16 kHz) in
//! 256-sample frames: DC-blocking high-pass, envelope-following automatic gain,
//! then a soft limiter. Filter state is reset at the start of every unit so
//! each call does the same work on the same data.

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::error::WorkloadFailure;
use crate::workload::Workload;

pub const SAMPLE_RATE_HZ: u32 = 16_000;
pub const STREAM_SAMPLES: usize = 24_000;
pub const FRAME_SAMPLES: usize = 256;

#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    /// Seed for the generated input stream.
    pub seed: u64,
    /// Fail the n-th `run_one_unit` call (1-based).
    pub fail_at_unit: Option<u64>,
}

/// Second-order section, transposed direct form II.
#[derive(Clone, Debug)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// RBJ cookbook high-pass.
    fn highpass(cutoff_hz: f32, sample_rate: f32, q: f32) -> Self {
        let w0 = 2.0 * std::f32::consts::PI * cutoff_hz / sample_rate;
        let (sin_w, cos_w) = w0.sin_cos();
        let alpha = sin_w / (2.0 * q);
        let a0 = 1.0 + alpha;

        Self {
            b0: (1.0 + cos_w) / 2.0 / a0,
            b1: -(1.0 + cos_w) / a0,
            b2: (1.0 + cos_w) / 2.0 / a0,
            a1: -2.0 * cos_w / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Peak envelope follower driving a bounded make-up gain.
#[derive(Clone, Debug)]
struct Agc {
    attack: f32,
    release: f32,
    target: f32,
    max_gain: f32,
    envelope: f32,
}

impl Agc {
    fn new(sample_rate: f32) -> Self {
        let coef = |ms: f32| (-1.0 / (ms * 0.001 * sample_rate)).exp();
        Self {
            attack: coef(5.0),
            release: coef(120.0),
            target: 0.5,
            max_gain: 8.0,
            envelope: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        let level = x.abs();
        let coef = if level > self.envelope {
            self.attack
        } else {
            self.release
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let gain = (self.target / (self.envelope + 1e-6)).min(self.max_gain);
        x * gain
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

#[inline]
fn soft_limit(x: f32) -> f32 {
    x.tanh()
}

struct PipelineState {
    input: Vec<f32>,
    output: Vec<f32>,
    highpass: Biquad,
    agc: Agc,
}

fn generate_input(seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let fs = SAMPLE_RATE_HZ as f32;

    (0..STREAM_SAMPLES)
        .map(|n| {
            let t = n as f32 / fs;
            // Voiced tone with a slow syllable-rate envelope, noise and DC offset.
            let envelope = 0.5 + 0.5 * (2.0 * std::f32::consts::PI * 3.0 * t).sin();
            let tone = 0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin();
            let noise: f32 = rng.gen_range(-0.05..0.05);
            envelope * tone + noise + 0.05
        })
        .collect()
}

fn hex32(d: [u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in d {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

/// Synthetic audio workload for running the harness end to end.
pub struct SyntheticPipeline {
    config: PipelineConfig,
    state: Option<PipelineState>,
    units: u64,
    digest: Option<[u8; 32]>,
}

impl SyntheticPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: None,
            units: 0,
            digest: None,
        }
    }

    pub fn name(&self) -> &'static str {
        "synthetic-frontend"
    }

    /// Number of `run_one_unit` calls so far, failed ones included.
    pub fn units_run(&self) -> u64 {
        self.units
    }

    /// SHA-256 of the last unit's output, recorded at release.
    pub fn output_digest(&self) -> Option<String> {
        self.digest.map(hex32)
    }
}

impl Workload for SyntheticPipeline {
    fn initialize(&mut self) -> Result<(), WorkloadFailure> {
        if self.state.is_some() {
            return Err(WorkloadFailure::new("pipeline already initialized"));
        }

        let fs = SAMPLE_RATE_HZ as f32;
        self.state = Some(PipelineState {
            input: generate_input(self.config.seed),
            output: vec![0.0; STREAM_SAMPLES],
            highpass: Biquad::highpass(80.0, fs, std::f32::consts::FRAC_1_SQRT_2),
            agc: Agc::new(fs),
        });
        self.units = 0;
        self.digest = None;
        Ok(())
    }

    fn run_one_unit(&mut self) -> Result<(), WorkloadFailure> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| WorkloadFailure::new("pipeline not initialized"))?;

        self.units += 1;
        if self.config.fail_at_unit == Some(self.units) {
            return Err(WorkloadFailure::new(format!(
                "injected failure at unit {}",
                self.units
            )));
        }

        state.highpass.reset();
        state.agc.reset();

        for (frame_idx, (src, dst)) in state
            .input
            .chunks(FRAME_SAMPLES)
            .zip(state.output.chunks_mut(FRAME_SAMPLES))
            .enumerate()
        {
            let mut energy = 0.0f32;
            for (x, y) in src.iter().zip(dst.iter_mut()) {
                let v = soft_limit(state.agc.process(state.highpass.process(*x)));
                energy += v * v;
                *y = v;
            }
            if !energy.is_finite() {
                return Err(WorkloadFailure::new(format!(
                    "non-finite output in frame {frame_idx}"
                )));
            }
        }

        Ok(())
    }

    fn release(&mut self) {
        if let Some(state) = self.state.take() {
            let mut hasher = Sha256::new();
            for v in &state.output {
                hasher.update(v.to_le_bytes());
            }
            self.digest = Some(hasher.finalize().into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_units(seed: u64, units: usize) -> SyntheticPipeline {
        let mut p = SyntheticPipeline::new(PipelineConfig {
            seed,
            fail_at_unit: None,
        });
        p.initialize().unwrap();
        for _ in 0..units {
            p.run_one_unit().unwrap();
        }
        p.release();
        p
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = run_units(7, 2);
        let b = run_units(7, 3);
        assert!(a.output_digest().is_some());
        // Each unit starts from reset filters, so the unit count doesn't matter.
        assert_eq!(a.output_digest(), b.output_digest());
    }

    #[test]
    fn test_seed_changes_output() {
        assert_ne!(run_units(1, 1).output_digest(), run_units(2, 1).output_digest());
    }

    #[test]
    fn test_input_shape() {
        let input = generate_input(0);
        assert_eq!(input.len(), STREAM_SAMPLES);
        assert!(input.iter().all(|x| x.is_finite() && x.abs() < 1.0));
        // 1.5 s of real-time input per unit.
        assert_eq!(STREAM_SAMPLES as f64 / SAMPLE_RATE_HZ as f64, 1.5);
    }

    #[test]
    fn test_run_before_initialize_fails() {
        let mut p = SyntheticPipeline::new(PipelineConfig::default());
        let err = p.run_one_unit().unwrap_err();
        assert_eq!(err.message(), "pipeline not initialized");
    }

    #[test]
    fn test_injected_failure() {
        let mut p = SyntheticPipeline::new(PipelineConfig {
            seed: 0,
            fail_at_unit: Some(2),
        });
        p.initialize().unwrap();
        assert!(p.run_one_unit().is_ok());
        assert!(p.run_one_unit().is_err());
        assert_eq!(p.units_run(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut p = run_units(3, 1);
        let digest = p.output_digest();
        p.release();
        assert_eq!(p.output_digest(), digest);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut hp = Biquad::highpass(80.0, SAMPLE_RATE_HZ as f32, std::f32::consts::FRAC_1_SQRT_2);
        let mut y = 1.0;
        for _ in 0..STREAM_SAMPLES {
            y = hp.process(1.0);
        }
        assert!(y.abs() < 1e-3, "residual dc {y}");
    }

    #[test]
    fn test_output_is_limited() {
        let mut p = SyntheticPipeline::new(PipelineConfig::default());
        p.initialize().unwrap();
        p.run_one_unit().unwrap();
        let state = p.state.as_ref().unwrap();
        assert!(state.output.iter().all(|v| v.abs() <= 1.0));
    }
}
