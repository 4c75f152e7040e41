//! Sample playback: buffers, key zones, and the zone bank.
//!
//! Plays recorded samples with pitch-shifting via linear interpolation
//! resampling. Zones cover key ranges; a note outside every range is served
//! by the zone with the nearest root note, repitched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::note::NoteId;

/// Zone descriptor as it appears in a sample map JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleZone {
    /// Note recorded in the sample, e.g. "C4".
    pub root: NoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_range: Option<KeyRange>,
    #[serde(default)]
    pub fine_tune_cents: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#loop: Option<LoopPoints>,
}

/// Inclusive MIDI key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    pub low: u8,
    pub high: u8,
}

/// Loop points in sample frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopPoints {
    pub start: u64,
    pub end: u64,
}

/// A mono sample buffer loaded into memory.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub data: Vec<f64>,
    /// Native sample rate of the audio.
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f64>, sample_rate: u32) -> Self {
        SampleBuffer { data, sample_rate }
    }

    /// Create from 16-bit signed PCM data.
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        let data = pcm.iter().map(|&s| s as f64 / 32768.0).collect();
        SampleBuffer { data, sample_rate }
    }

    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        let data = samples.iter().map(|&s| s as f64).collect();
        SampleBuffer { data, sample_rate }
    }

    /// Decode a WAV file, downmixing to mono.
    #[cfg(feature = "wav")]
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, hound::Error> {
        let reader = hound::WavReader::new(std::io::Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| v as f64))
                .collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f64;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let data = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f64>() / frame.len() as f64)
            .collect();
        Ok(SampleBuffer::new(data, spec.sample_rate))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a sample with linear interpolation at a fractional position.
    pub fn read_interpolated(&self, position: f64) -> f64 {
        if self.data.is_empty() || position < 0.0 {
            return 0.0;
        }

        let idx = position as usize;
        if idx >= self.data.len() - 1 {
            return self.data.get(idx).copied().unwrap_or(0.0);
        }

        let frac = position - idx as f64;
        self.data[idx] * (1.0 - frac) + self.data[idx + 1] * frac
    }
}

/// A zone with its audio attached.
#[derive(Debug, Clone)]
pub struct LoadedZone {
    pub root_note: u8,
    pub key_range: KeyRange,
    pub fine_tune_cents: f64,
    pub loop_points: Option<LoopPoints>,
    pub buffer: Arc<SampleBuffer>,
}

impl LoadedZone {
    /// A zone covering every key, rooted at `root`.
    pub fn new(root: NoteId, buffer: SampleBuffer) -> Self {
        LoadedZone::from_zone(
            &SampleZone {
                root,
                key_range: None,
                fine_tune_cents: 0.0,
                r#loop: None,
            },
            buffer,
        )
    }

    pub fn from_zone(zone: &SampleZone, buffer: SampleBuffer) -> Self {
        LoadedZone {
            root_note: zone.root.midi() as u8,
            key_range: zone.key_range.unwrap_or(KeyRange { low: 0, high: 127 }),
            fine_tune_cents: zone.fine_tune_cents,
            loop_points: zone.r#loop,
            buffer: Arc::new(buffer),
        }
    }

    pub fn contains_note(&self, midi_note: u8) -> bool {
        (self.key_range.low..=self.key_range.high).contains(&midi_note)
    }
}

/// The loaded zones of a sampler instrument.
#[derive(Debug, Clone, Default)]
pub struct SampleBank {
    zones: Vec<LoadedZone>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zone: LoadedZone) {
        self.zones.push(zone);
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zone whose key range holds the note, else the nearest root note.
    pub fn find_zone(&self, midi_note: u8) -> Option<&LoadedZone> {
        self.zones
            .iter()
            .find(|z| z.contains_note(midi_note))
            .or_else(|| {
                self.zones
                    .iter()
                    .min_by_key(|z| (z.root_note as i32 - midi_note as i32).abs())
            })
    }
}

/// Playback rate to sound `target` from a sample recorded at `root`.
pub fn sample_playback_rate(target: u8, root: u8, fine_tune_cents: f64, tuning_pitch: f64) -> f64 {
    let semitone_diff = target as f64 - root as f64 - fine_tune_cents / 100.0;
    (2.0_f64).powf(semitone_diff / 12.0) * (tuning_pitch / 440.0)
}

/// Reads one zone's buffer at a pitch-shifted rate.
#[derive(Debug, Clone)]
pub struct SamplePlayer {
    buffer: Arc<SampleBuffer>,
    position: f64,
    /// Buffer frames advanced per output sample.
    step: f64,
    loop_points: Option<LoopPoints>,
    finished: bool,
}

impl SamplePlayer {
    pub fn new(zone: &LoadedZone, midi_note: u8, tuning_pitch: f64, engine_sample_rate: f64) -> Self {
        let pitch_rate = sample_playback_rate(midi_note, zone.root_note, zone.fine_tune_cents, tuning_pitch);
        let sr_ratio = zone.buffer.sample_rate as f64 / engine_sample_rate;
        SamplePlayer {
            buffer: Arc::clone(&zone.buffer),
            position: 0.0,
            step: pitch_rate * sr_ratio,
            loop_points: zone.loop_points,
            finished: zone.buffer.is_empty(),
        }
    }

    pub fn next_sample(&mut self) -> f64 {
        if self.finished {
            return 0.0;
        }

        let sample = self.buffer.read_interpolated(self.position);
        self.position += self.step;

        if let Some(LoopPoints { start, end }) = self.loop_points {
            let (start, end) = (start as f64, end as f64);
            if end > start && self.position >= end {
                self.position = start + (self.position - end) % (end - start);
            }
        }

        if self.position >= self.buffer.len() as f64 {
            self.finished = true;
        }
        sample
    }

    /// True once a non-looping sample has played through.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
