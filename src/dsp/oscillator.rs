//! Band-limited oscillators using PolyBLEP.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    #[serde(alias = "saw")]
    Sawtooth,
    Triangle,
}

/// A free-running oscillator at a fixed pitch.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    /// Phase increment per sample, detune already applied.
    inc: f64,
    phase: f64,
}

impl Oscillator {
    /// `detune` is in cents.
    pub fn new(waveform: Waveform, frequency: f64, detune: f64, sample_rate: f64) -> Self {
        let effective = frequency * (2.0_f64).powf(detune / 1200.0);
        Oscillator {
            waveform,
            inc: effective / sample_rate,
            phase: 0.0,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        let inc = self.inc;
        let sample = match self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0 - poly_blep(self.phase, inc),
            Waveform::Square => {
                let naive = if self.phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(self.phase, inc) - poly_blep((self.phase + 0.5) % 1.0, inc)
            }
            Waveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }
}

/// PolyBLEP correction around a discontinuity.
///
/// `t` is the phase [0, 1), `dt` is the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_zero_at_start() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0, 0.0, 44100.0);
        let sample = osc.next_sample();
        assert!(sample.abs() < 1e-10, "Sine should start near 0, got {sample}");
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in [Waveform::Sine, Waveform::Square, Waveform::Sawtooth, Waveform::Triangle] {
            let mut osc = Oscillator::new(waveform, 440.0, 0.0, 44100.0);
            for _ in 0..44100 {
                let s = osc.next_sample();
                assert!(s.abs() <= 1.5, "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn detune_shifts_frequency() {
        let plain = Oscillator::new(Waveform::Sine, 440.0, 0.0, 44100.0);
        let octave_up = Oscillator::new(Waveform::Sine, 440.0, 1200.0, 44100.0);
        assert!(
            (octave_up.inc - 2.0 * plain.inc).abs() < 1e-12,
            "1200 cents detune should double frequency"
        );
    }

    #[test]
    fn waveform_names_deserialize() {
        let w: Waveform = serde_json::from_str("\"saw\"").unwrap();
        assert_eq!(w, Waveform::Sawtooth);
        let w: Waveform = serde_json::from_str("\"triangle\"").unwrap();
        assert_eq!(w, Waveform::Triangle);
    }
}
