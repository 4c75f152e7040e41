//! Engine configuration.
//!
//! Every field has a default, so `{}` is a complete config. JSON keys are
//! camelCase to match what the host page sends.

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::error::ConfigError;
use crate::note::DEFAULT_TUNING_PITCH;

/// Which sound backend the composition root builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Synth,
    Sampler,
}

/// Attack shape applied to every new voice's gain stage.
///
/// The gain starts at `floor`, rises exponentially to `peak` at `peak_time`
/// and settles exponentially to `sustain` at `sustain_time` (both relative
/// to the voice start).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvelopeShape {
    pub floor: f64,
    pub peak: f64,
    pub peak_time: f64,
    pub sustain: f64,
    pub sustain_time: f64,
}

impl Default for EnvelopeShape {
    fn default() -> Self {
        Self {
            floor: 0.001,
            peak: 0.5,
            peak_time: 0.03,
            sustain: 0.3,
            sustain_time: 0.05,
        }
    }
}

/// Settings for the synthesized-tone backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthConfig {
    pub waveform: Waveform,
    /// Oscillators per voice, each at gain 1/n.
    pub oscillator_count: usize,
    /// Detune step between stacked oscillators, in cents.
    pub detune_spread: f64,
    /// Per-voice lowpass cutoff in Hz.
    pub filter_cutoff: f64,
    /// Lowpass resonance in dB (WebAudio `Q` semantics for lowpass).
    pub filter_resonance_db: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sawtooth,
            oscillator_count: 1,
            detune_spread: 2.0,
            filter_cutoff: 500.0,
            filter_resonance_db: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Master output gain, fixed at init.
    pub master_gain: f64,
    /// Frequency of A4 in Hz.
    pub tuning_pitch: f64,
    pub envelope: EnvelopeShape,
    /// Seconds from stop to silence.
    pub release_time: f64,
    /// Voices younger than this are never reclaimed by the orphan sweep.
    pub grace_period: f64,
    /// Extra seconds past the grace period before an unheld voice is reclaimed.
    pub orphan_timeout: f64,
    pub history_capacity: usize,
    /// Seconds of engine time between orphan sweeps.
    pub sweep_interval: f64,
    pub synth: SynthConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Synth,
            master_gain: 0.2,
            tuning_pitch: DEFAULT_TUNING_PITCH,
            envelope: EnvelopeShape::default(),
            release_time: 4.0,
            grace_period: 2.0,
            orphan_timeout: 7.0,
            history_capacity: 100,
            sweep_interval: 1.0,
            synth: SynthConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Age after which an unheld, unstopped voice counts as orphaned.
    pub fn orphan_age(&self) -> f64 {
        self.grace_period + self.orphan_timeout
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("masterGain", self.master_gain),
            ("tuningPitch", self.tuning_pitch),
            ("envelope.floor", self.envelope.floor),
            ("envelope.peak", self.envelope.peak),
            ("envelope.peakTime", self.envelope.peak_time),
            ("envelope.sustain", self.envelope.sustain),
            ("envelope.sustainTime", self.envelope.sustain_time),
            ("releaseTime", self.release_time),
            ("orphanTimeout", self.orphan_timeout),
            ("sweepInterval", self.sweep_interval),
            ("synth.filterCutoff", self.synth.filter_cutoff),
        ];
        for (field, value) in positive {
            // NaN fails this comparison too
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if !(self.grace_period >= 0.0) || self.grace_period >= self.orphan_timeout {
            return Err(ConfigError::GraceNotBelowTimeout {
                grace: self.grace_period,
                timeout: self.orphan_timeout,
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        if self.synth.oscillator_count == 0 {
            return Err(ConfigError::NoOscillators);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.orphan_age(), 9.0);
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_json_overrides() {
        let config = EngineConfig::from_json(
            r#"{"kind":"sampler","releaseTime":1.5,"synth":{"waveform":"square","oscillatorCount":3}}"#,
        )
        .unwrap();
        assert_eq!(config.kind, EngineKind::Sampler);
        assert_eq!(config.release_time, 1.5);
        assert_eq!(config.synth.waveform, Waveform::Square);
        assert_eq!(config.synth.oscillator_count, 3);
        assert_eq!(config.synth.filter_cutoff, 500.0);
        assert_eq!(config.grace_period, 2.0);
    }

    #[test]
    fn grace_must_be_below_timeout() {
        let err = EngineConfig::from_json(r#"{"gracePeriod":7,"orphanTimeout":7}"#).unwrap_err();
        assert!(matches!(err, ConfigError::GraceNotBelowTimeout { .. }));
    }

    #[test]
    fn rejects_non_positive_release() {
        let err = EngineConfig::from_json(r#"{"releaseTime":0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { field: "releaseTime", .. }));
    }

    #[test]
    fn rejects_zero_capacity_and_bad_json() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"historyCapacity":0}"#),
            Err(ConfigError::EmptyHistory)
        ));
        assert!(matches!(
            EngineConfig::from_json("{"),
            Err(ConfigError::Json(_))
        ));
    }
}
