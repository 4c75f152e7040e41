//! Master output stage shared by every voice.

/// Sums voice output, applies the master gain and soft clipping.
///
/// The gain is fixed when the stage is built at engine init; nothing
/// mutates it afterwards.
#[derive(Debug, Clone)]
pub struct MasterOutput {
    gain: f64,
    buffer: Vec<f64>,
}

impl MasterOutput {
    pub fn new(gain: f64) -> Self {
        MasterOutput {
            gain,
            buffer: Vec::new(),
        }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Prepare a zeroed accumulation buffer of `num_samples`.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    pub fn add(&mut self, index: usize, sample: f64) {
        if let Some(slot) = self.buffer.get_mut(index) {
            *slot += sample;
        }
    }

    /// Write the mixed block into `out`.
    pub fn write_to(&self, out: &mut [f32]) {
        for (dst, &s) in out.iter_mut().zip(&self.buffer) {
            *dst = soft_clip(s * self.gain) as f32;
        }
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}
