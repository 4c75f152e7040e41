//! Per-voice lowpass using the WebAudio BiquadFilterNode lowpass coefficients.

use std::f64::consts::PI;

/// A second-order lowpass (Direct Form II Transposed).
///
/// Coefficients from the Audio EQ Cookbook. Resonance is given in dB, as the
/// WebAudio lowpass `Q` parameter is.
#[derive(Debug, Clone)]
pub struct Lowpass {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Lowpass {
    pub fn new(cutoff: f64, resonance_db: f64, sample_rate: f64) -> Self {
        // Keep the cutoff below Nyquist so the poles stay inside the unit circle.
        let cutoff = cutoff.clamp(1.0, sample_rate * 0.45);
        let q = (10.0_f64).powf(resonance_db / 20.0);

        let w0 = 2.0 * PI * cutoff / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        let a0 = 1.0 + alpha;

        Lowpass {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_dc() {
        let mut f = Lowpass::new(5000.0, 0.0, 44100.0);
        let mut output = 0.0;
        for _ in 0..1000 {
            output = f.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.001, "Lowpass should pass DC, got {output}");
    }

    #[test]
    fn attenuates_high_freq() {
        let mut f = Lowpass::new(200.0, 0.0, 44100.0);
        let mut max_out = 0.0_f64;
        for i in 0..4410 {
            let t = i as f64 / 44100.0;
            let out = f.process((2.0 * PI * 10000.0 * t).sin());
            if i > 1000 {
                max_out = max_out.max(out.abs());
            }
        }
        assert!(max_out < 0.01, "Lowpass@200Hz should attenuate 10kHz, got {max_out}");
    }

    #[test]
    fn cutoff_above_nyquist_stays_stable() {
        let mut f = Lowpass::new(500.0, 0.0, 1000.0);
        for i in 0..10000 {
            let out = f.process(if i % 2 == 0 { 1.0 } else { -1.0 });
            assert!(out.is_finite() && out.abs() < 10.0, "unstable at sample {i}: {out}");
        }
    }
}
