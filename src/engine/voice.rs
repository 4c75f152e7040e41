//! A voice is one sounding instance of a note, from trigger to silence.

use std::fmt;

use log::debug;

use crate::config::EnvelopeShape;
use crate::dsp::envelope::GainParam;
use crate::dsp::filter::Lowpass;
use crate::dsp::source::SoundSource;
use crate::note::NoteId;

/// Monotonic per-engine voice identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub(crate) u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The sound-generating parts a backend builds for one voice.
#[derive(Debug, Clone)]
pub struct VoiceSources {
    pub sources: Vec<SoundSource>,
    pub filter: Option<Lowpass>,
}

#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    note: NoteId,
    sources: Vec<SoundSource>,
    filter: Option<Lowpass>,
    gain: GainParam,
    start_time: f64,
    stopped: bool,
}

impl Voice {
    /// Build a voice starting at `now` with the attack ramp scheduled.
    pub fn new(id: VoiceId, note: NoteId, parts: VoiceSources, shape: &EnvelopeShape, now: f64) -> Self {
        let mut gain = GainParam::new(1.0);
        gain.set_value_at_time(0.0, now);
        gain.set_value_at_time(shape.floor, now);
        gain.exponential_ramp_to_value_at_time(shape.peak, now + shape.peak_time);
        gain.exponential_ramp_to_value_at_time(shape.sustain, now + shape.sustain_time);

        Voice {
            id,
            note,
            sources: parts.sources,
            filter: parts.filter,
            gain,
            start_time: now,
            stopped: false,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn note(&self) -> NoteId {
        self.note
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.start_time
    }

    /// True once the voice has been stopped by any path. Never reverts.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn gain_at(&self, t: f64) -> f64 {
        self.gain.value_at(t)
    }

    /// True while any source can still sound at or after `now`.
    pub fn is_audible(&self, now: f64) -> bool {
        self.sources.iter().any(|s| !s.is_finished(now))
    }

    /// Soft stop: ramp the gain down to `floor` over `release_time` and let
    /// the sources run until the ramp ends.
    pub fn release(&mut self, now: f64, release_time: f64, floor: f64) {
        let current = self.gain.value_at(now);
        self.gain.cancel_scheduled_values(now);
        self.gain.set_value_at_time(current, now);
        self.gain.exponential_ramp_to_value_at_time(floor, now + release_time);

        self.stop_sources(now + release_time);
        self.stopped = true;
    }

    /// Hard stop: silence at `now`, no release ramp.
    pub fn force_stop(&mut self, now: f64) {
        self.gain.cancel_scheduled_values(now);
        self.gain.set_value_at_time(0.0, now);
        self.stop_sources(now);
        self.stopped = true;
    }

    fn stop_sources(&mut self, at: f64) {
        for source in &mut self.sources {
            if let Err(e) = source.stop(at) {
                debug!("voice {} ({}): {e}; treating as stopped", self.id, self.note);
            }
        }
    }

    /// Render one sample at engine time `t`.
    pub fn next_sample(&mut self, t: f64) -> f64 {
        let mut sum = 0.0;
        for source in &mut self.sources {
            sum += source.next_sample(t);
        }
        if let Some(filter) = &mut self.filter {
            sum = filter.process(sum);
        }
        sum * self.gain.value_at(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::{Oscillator, Waveform};
    use crate::dsp::source::SourceKind;

    fn voice(now: f64) -> Voice {
        let osc = Oscillator::new(Waveform::Sine, 220.0, 0.0, 8000.0);
        let parts = VoiceSources {
            sources: vec![SoundSource::new(SourceKind::Oscillator(osc), 1.0, now)],
            filter: None,
        };
        Voice::new(VoiceId(1), "A3".parse().unwrap(), parts, &EnvelopeShape::default(), now)
    }

    #[test]
    fn attack_reaches_peak_then_sustain() {
        let v = voice(1.0);
        let shape = EnvelopeShape::default();
        assert_eq!(v.gain_at(1.0), shape.floor);
        assert!((v.gain_at(1.0 + shape.peak_time) - shape.peak).abs() < 1e-9);
        assert!((v.gain_at(2.0) - shape.sustain).abs() < 1e-9);
    }

    #[test]
    fn release_keeps_sounding_until_ramp_ends() {
        let mut v = voice(0.0);
        v.release(1.0, 4.0, 0.001);
        assert!(v.is_stopped());
        assert!(v.is_audible(4.9));
        assert!(v.gain_at(3.0) < 0.3 && v.gain_at(3.0) > 0.001);
        assert!(!v.is_audible(5.0));
    }

    #[test]
    fn force_stop_is_immediate() {
        let mut v = voice(0.0);
        v.force_stop(1.0);
        assert!(v.is_stopped());
        assert!(!v.is_audible(1.0));
        assert_eq!(v.gain_at(1.0), 0.0);
    }

    #[test]
    fn second_stop_is_tolerated() {
        let mut v = voice(0.0);
        v.release(1.0, 4.0, 0.001);
        v.force_stop(2.0);
        assert!(v.is_stopped());
        // The first scheduled stop time wins at the source level.
        assert!(v.is_audible(4.0));
    }
}
