//! Sound backends: what a voice is made of.
//!
//! The playback engine only knows how to schedule and stop sources. A backend
//! decides which sources a note gets: stacked oscillators through a lowpass
//! for the synth, or a repitched sample zone for the sampler.

use crate::config::SynthConfig;
use crate::dsp::filter::Lowpass;
use crate::dsp::oscillator::Oscillator;
use crate::dsp::sampler::{LoadedZone, SampleBank, SamplePlayer};
use crate::dsp::source::{SoundSource, SourceKind};
use crate::error::EngineError;
use crate::note::NoteId;

use super::voice::VoiceSources;

pub trait SoundBackend {
    fn name(&self) -> &'static str;

    /// Called once by engine init with the output device parameters.
    fn prepare(&mut self, sample_rate: f64, tuning_pitch: f64) -> Result<(), EngineError>;

    /// Build the sources for `note`, scheduled to start at `at`.
    fn build_voice(&self, note: &NoteId, at: f64) -> Result<VoiceSources, EngineError>;

    fn load_zone(&mut self, _zone: LoadedZone) -> Result<(), EngineError> {
        Err(EngineError::ZonesUnsupported(self.name()))
    }
}

#[derive(Debug, Clone, Copy)]
struct OutputParams {
    sample_rate: f64,
    tuning_pitch: f64,
}

/// Synthesized tones: `oscillator_count` detuned oscillators into a lowpass.
#[derive(Debug, Clone)]
pub struct SynthBackend {
    config: SynthConfig,
    output: Option<OutputParams>,
}

impl SynthBackend {
    pub fn new(config: SynthConfig) -> Self {
        SynthBackend { config, output: None }
    }
}

impl SoundBackend for SynthBackend {
    fn name(&self) -> &'static str {
        "synth"
    }

    fn prepare(&mut self, sample_rate: f64, tuning_pitch: f64) -> Result<(), EngineError> {
        self.output = Some(OutputParams {
            sample_rate,
            tuning_pitch,
        });
        Ok(())
    }

    fn build_voice(&self, note: &NoteId, at: f64) -> Result<VoiceSources, EngineError> {
        let out = self.output.ok_or(EngineError::NotPrepared)?;
        let frequency = note.frequency_with_tuning(out.tuning_pitch);
        let count = self.config.oscillator_count.max(1);
        let level = 1.0 / count as f64;

        let sources = (0..count)
            .map(|i| {
                let detune = (i as f64 - count as f64 / 2.0) * self.config.detune_spread;
                let osc = Oscillator::new(self.config.waveform, frequency, detune, out.sample_rate);
                SoundSource::new(SourceKind::Oscillator(osc), level, at)
            })
            .collect();

        let filter = Lowpass::new(
            self.config.filter_cutoff,
            self.config.filter_resonance_db,
            out.sample_rate,
        );

        Ok(VoiceSources {
            sources,
            filter: Some(filter),
        })
    }
}

/// Sample playback from a bank of key zones.
#[derive(Debug, Clone, Default)]
pub struct SamplerBackend {
    bank: SampleBank,
    output: Option<OutputParams>,
}

impl SamplerBackend {
    pub fn new(bank: SampleBank) -> Self {
        SamplerBackend { bank, output: None }
    }

    /// Add a zone. Zones may be loaded before or after init.
    pub fn insert_zone(&mut self, zone: LoadedZone) {
        self.bank.insert(zone);
    }

    pub fn bank(&self) -> &SampleBank {
        &self.bank
    }
}

impl SoundBackend for SamplerBackend {
    fn name(&self) -> &'static str {
        "sampler"
    }

    fn prepare(&mut self, sample_rate: f64, tuning_pitch: f64) -> Result<(), EngineError> {
        if self.bank.is_empty() {
            return Err(EngineError::NoSamples);
        }
        self.output = Some(OutputParams {
            sample_rate,
            tuning_pitch,
        });
        Ok(())
    }

    fn build_voice(&self, note: &NoteId, at: f64) -> Result<VoiceSources, EngineError> {
        let out = self.output.ok_or(EngineError::NotPrepared)?;
        let midi = note.midi() as u8;
        let zone = self
            .bank
            .find_zone(midi)
            .ok_or_else(|| EngineError::NoZone(note.to_string()))?;

        let player = SamplePlayer::new(zone, midi, out.tuning_pitch, out.sample_rate);
        Ok(VoiceSources {
            sources: vec![SoundSource::new(SourceKind::Sample(player), 1.0, at)],
            filter: None,
        })
    }

    fn load_zone(&mut self, zone: LoadedZone) -> Result<(), EngineError> {
        self.insert_zone(zone);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::sampler::SampleBuffer;

    fn note(s: &str) -> NoteId {
        s.parse().unwrap()
    }

    #[test]
    fn synth_requires_prepare() {
        let backend = SynthBackend::new(SynthConfig::default());
        assert!(matches!(
            backend.build_voice(&note("C4"), 0.0),
            Err(EngineError::NotPrepared)
        ));
    }

    #[test]
    fn synth_stacks_oscillators_at_equal_level() {
        let mut backend = SynthBackend::new(SynthConfig {
            oscillator_count: 4,
            ..SynthConfig::default()
        });
        backend.prepare(8000.0, 440.0).unwrap();
        let parts = backend.build_voice(&note("A4"), 1.5).unwrap();
        assert_eq!(parts.sources.len(), 4);
        assert!(parts.filter.is_some());
        assert!(parts.sources.iter().all(|s| s.start_time() == 1.5));
    }

    #[test]
    fn synth_refuses_sample_zones() {
        let mut backend = SynthBackend::new(SynthConfig::default());
        let zone = LoadedZone::new(note("C4"), SampleBuffer::new(vec![0.0; 8], 8000));
        assert!(matches!(backend.load_zone(zone), Err(EngineError::ZonesUnsupported("synth"))));
    }

    #[test]
    fn sampler_without_zones_fails_prepare() {
        let mut backend = SamplerBackend::default();
        assert!(matches!(backend.prepare(8000.0, 440.0), Err(EngineError::NoSamples)));
    }

    #[test]
    fn sampler_builds_one_sample_source() {
        let mut backend = SamplerBackend::default();
        backend.insert_zone(LoadedZone::new(note("C4"), SampleBuffer::new(vec![0.5; 800], 8000)));
        backend.prepare(8000.0, 440.0).unwrap();
        let parts = backend.build_voice(&note("G4"), 0.0).unwrap();
        assert_eq!(parts.sources.len(), 1);
        assert!(parts.filter.is_none());
    }
}
