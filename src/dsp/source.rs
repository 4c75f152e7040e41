//! Scheduled sound sources.
//!
//! A [`SoundSource`] is the lowest-level sound generator in a voice: an
//! oscillator or a sample player that runs between a start time and an
//! optional stop time on the engine clock. Like a WebAudio scheduled source
//! node, it accepts exactly one stop request.

use super::oscillator::Oscillator;
use super::sampler::SamplePlayer;
use crate::error::SourceError;

#[derive(Debug, Clone)]
pub enum SourceKind {
    Oscillator(Oscillator),
    Sample(SamplePlayer),
}

#[derive(Debug, Clone)]
pub struct SoundSource {
    kind: SourceKind,
    /// Mix level inside the voice.
    level: f64,
    start_at: f64,
    stop_at: Option<f64>,
}

impl SoundSource {
    pub fn new(kind: SourceKind, level: f64, start_at: f64) -> Self {
        SoundSource {
            kind,
            level,
            start_at,
            stop_at: None,
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_at
    }

    pub fn stop_time(&self) -> Option<f64> {
        self.stop_at
    }

    /// Schedule the source to cease at `at`. A second request is rejected.
    pub fn stop(&mut self, at: f64) -> Result<(), SourceError> {
        if self.stop_at.is_some() {
            return Err(SourceError::AlreadyStopped);
        }
        self.stop_at = Some(at.max(self.start_at));
        Ok(())
    }

    /// True once the source can no longer produce sound at or after `now`.
    pub fn is_finished(&self, now: f64) -> bool {
        if self.stop_at.is_some_and(|stop| now >= stop) {
            return true;
        }
        match &self.kind {
            SourceKind::Sample(player) => player.is_finished(),
            SourceKind::Oscillator(_) => false,
        }
    }

    /// Output at engine time `now`; silent outside the scheduled window.
    pub fn next_sample(&mut self, now: f64) -> f64 {
        if now < self.start_at || self.is_finished(now) {
            return 0.0;
        }
        let raw = match &mut self.kind {
            SourceKind::Oscillator(osc) => osc.next_sample(),
            SourceKind::Sample(player) => player.next_sample(),
        };
        raw * self.level
    }
}
