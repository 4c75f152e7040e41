//! Playback engine: note lifecycle and voice management.
//!
//! The engine tracks which notes are sounding, guarantees at most one
//! registered voice per note, and reclaims voices whose stop signal was lost.
//! All operations are synchronous `&mut self` calls made from one thread
//! (the AudioWorklet message handler in the browser), so the registry has a
//! single writer by construction.
//!
//! Time is the engine clock: frames rendered divided by the sample rate.
//! It only advances inside [`NotePlayer::render`] while the engine runs.

pub mod backend;
pub mod held;
pub mod registry;
pub mod voice;

use log::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::dsp::mixer::MasterOutput;
use crate::dsp::sampler::LoadedZone;
use crate::error::{ConfigError, EngineError};
use crate::note::NoteId;

use self::backend::{SamplerBackend, SoundBackend, SynthBackend};
use self::held::HeldNotes;
use self::registry::VoiceRegistry;
use self::voice::Voice;

/// Platform output state, mirroring an audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Suspended,
    Running,
}

/// Observable lifecycle of one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    /// No registered voice and nothing ringing.
    Idle,
    /// A registered voice is in attack or sustain.
    Sounding,
    /// Stopped and deregistered, release tail still audible.
    Releasing,
}

/// The capability set the UI layer drives. Implemented once per backend by
/// [`PlaybackEngine`]; the composition root picks the variant.
pub trait NotePlayer {
    /// Idempotent. On failure the engine stays uninitialized.
    fn init(&mut self, sample_rate: f64) -> Result<(), EngineError>;
    fn start(&mut self, note: &NoteId);
    fn stop(&mut self, note: &NoteId);
    fn panic(&mut self);
    /// Returns how many voices were silenced.
    fn force_stop_all(&mut self) -> usize;
    /// Returns how many orphaned voices were reclaimed.
    fn cleanup_orphans(&mut self, held: &HeldNotes) -> usize;
    fn render(&mut self, out: &mut [f32]);
    fn suspend(&mut self);
    fn resume(&mut self);
    /// Add a sample zone to the backend, before or after init.
    fn load_zone(&mut self, zone: LoadedZone) -> Result<(), EngineError>;

    fn state(&self) -> DeviceState;
    fn current_time(&self) -> f64;
    fn note_state(&self, note: &NoteId) -> NoteState;
    fn registry(&self) -> &VoiceRegistry;
    fn config(&self) -> &EngineConfig;
}

pub type SynthEngine = PlaybackEngine<SynthBackend>;
pub type SamplerEngine = PlaybackEngine<SamplerBackend>;

pub struct PlaybackEngine<B: SoundBackend> {
    config: EngineConfig,
    backend: B,
    state: DeviceState,
    sample_rate: f64,
    /// Frames rendered since init.
    frames: u64,
    /// Built once at init.
    output: Option<MasterOutput>,
    registry: VoiceRegistry,
    /// Evicted from history but still ringing out a release.
    tails: Vec<Voice>,
}

impl<B: SoundBackend> PlaybackEngine<B> {
    pub fn new(config: EngineConfig, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(PlaybackEngine {
            registry: VoiceRegistry::new(config.history_capacity),
            config,
            backend,
            state: DeviceState::Uninitialized,
            sample_rate: 0.0,
            frames: 0,
            output: None,
            tails: Vec::new(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn master_gain(&self) -> Option<f64> {
        self.output.as_ref().map(MasterOutput::gain)
    }

    fn now(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.frames as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    fn try_init(&mut self, sample_rate: f64) -> Result<(), EngineError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        self.backend.prepare(sample_rate, self.config.tuning_pitch)?;
        self.sample_rate = sample_rate;
        self.output = Some(MasterOutput::new(self.config.master_gain));
        self.state = DeviceState::Running;
        Ok(())
    }

    /// Keep evicted voices that are still ringing so their tail is heard.
    fn retire(&mut self, evicted: Vec<Voice>) {
        let now = self.now();
        self.tails.extend(evicted.into_iter().filter(|v| v.is_audible(now)));
    }

    fn prune_history(&mut self) {
        let evicted = self.registry.prune();
        self.retire(evicted);
    }
}

impl<B: SoundBackend> NotePlayer for PlaybackEngine<B> {
    fn init(&mut self, sample_rate: f64) -> Result<(), EngineError> {
        if self.state != DeviceState::Uninitialized {
            debug!("audio engine already initialized");
            return Ok(());
        }
        if let Err(e) = self.try_init(sample_rate) {
            error!("Failed to initialize audio: {e}");
            return Err(e);
        }
        info!(
            "audio engine initialized: {} backend at {sample_rate} Hz",
            self.backend.name()
        );
        Ok(())
    }

    fn start(&mut self, note: &NoteId) {
        if self.state != DeviceState::Running {
            warn!("audio engine not ready ({:?}); ignoring start of {note}", self.state);
            return;
        }

        // Retrigger always releases the previous voice first.
        self.stop(note);

        let now = self.now();
        let parts = match self.backend.build_voice(note, now) {
            Ok(parts) => parts,
            Err(e) => {
                warn!("cannot start {note}: {e}");
                return;
            }
        };

        let id = self.registry.allocate_id();
        let voice = Voice::new(id, *note, parts, &self.config.envelope, now);
        let evicted = self.registry.push(voice);
        self.retire(evicted);
        self.registry.activate(*note, id);
        debug!("started voice {id} for {note} at {now:.3}s");
    }

    fn stop(&mut self, note: &NoteId) {
        if self.state == DeviceState::Uninitialized {
            warn!("audio engine not initialized; ignoring stop of {note}");
            return;
        }
        let Some(id) = self.registry.deactivate(note) else {
            return;
        };

        let now = self.now();
        let (release_time, floor) = (self.config.release_time, self.config.envelope.floor);
        match self.registry.get_mut(id) {
            Some(voice) => {
                voice.release(now, release_time, floor);
                debug!("released voice {id} for {note} at {now:.3}s");
            }
            None => warn!("active voice {id} for {note} was missing from history"),
        }
    }

    fn panic(&mut self) {
        info!("PANIC: stopping all notes");
        for note in self.registry.active_notes() {
            self.stop(&note);
        }
        self.force_stop_all();
    }

    fn force_stop_all(&mut self) -> usize {
        let now = self.now();
        let mut silenced = Vec::new();
        for voice in self.registry.history_mut() {
            if !voice.is_stopped() {
                voice.force_stop(now);
                silenced.push((voice.note(), voice.id()));
            }
        }
        for (note, id) in &silenced {
            self.registry.deactivate_voice(note, *id);
        }

        if !silenced.is_empty() {
            info!("Force-stopped {} orphaned voices", silenced.len());
        }
        self.prune_history();
        silenced.len()
    }

    fn cleanup_orphans(&mut self, held: &HeldNotes) -> usize {
        if self.state == DeviceState::Uninitialized {
            warn!("audio engine not initialized; skipping orphan cleanup");
            return 0;
        }

        let now = self.now();
        let grace = self.config.grace_period;
        let orphan_age = self.config.orphan_age();
        let mut reclaimed = Vec::new();

        for voice in self.registry.history_mut() {
            if voice.is_stopped() {
                continue;
            }
            let age = voice.age(now);
            // Too young: the press may not have reached the held snapshot yet.
            if age < grace {
                continue;
            }
            if held.is_held(&voice.note()) {
                continue;
            }
            if age > orphan_age {
                voice.force_stop(now);
                warn!("Cleaned up orphaned voice for note {} (age: {age:.1}s)", voice.note());
                reclaimed.push((voice.note(), voice.id()));
            }
        }
        for (note, id) in &reclaimed {
            self.registry.deactivate_voice(note, *id);
        }

        if !reclaimed.is_empty() {
            info!("Cleaned up {} orphaned voices", reclaimed.len());
        }
        self.prune_history();
        reclaimed.len()
    }

    fn render(&mut self, out: &mut [f32]) {
        if self.state != DeviceState::Running {
            out.fill(0.0);
            return;
        }
        let Some(output) = self.output.as_mut() else {
            out.fill(0.0);
            return;
        };

        output.clear(out.len());
        for i in 0..out.len() {
            let t = (self.frames + i as u64) as f64 / self.sample_rate;
            for voice in self.registry.history_mut().chain(self.tails.iter_mut()) {
                if voice.is_audible(t) {
                    output.add(i, voice.next_sample(t));
                }
            }
        }
        output.write_to(out);

        self.frames += out.len() as u64;
        let now = self.now();
        self.tails.retain(|v| v.is_audible(now));
    }

    fn suspend(&mut self) {
        if self.state == DeviceState::Running {
            self.state = DeviceState::Suspended;
            info!("audio engine suspended");
        }
    }

    fn resume(&mut self) {
        match self.state {
            DeviceState::Suspended => {
                self.state = DeviceState::Running;
                info!("audio engine resumed");
            }
            DeviceState::Uninitialized => warn!("cannot resume: audio engine not initialized"),
            DeviceState::Running => {}
        }
    }

    fn load_zone(&mut self, zone: LoadedZone) -> Result<(), EngineError> {
        let root = zone.root_note;
        self.backend.load_zone(zone)?;
        info!("loaded sample zone rooted at MIDI {root}");
        Ok(())
    }

    fn state(&self) -> DeviceState {
        self.state
    }

    fn current_time(&self) -> f64 {
        self.now()
    }

    fn note_state(&self, note: &NoteId) -> NoteState {
        if self.registry.active_id(note).is_some() {
            return NoteState::Sounding;
        }
        let now = self.now();
        let ringing = self
            .registry
            .history()
            .chain(self.tails.iter())
            .any(|v| v.note() == *note && v.is_stopped() && v.is_audible(now));
        if ringing {
            NoteState::Releasing
        } else {
            NoteState::Idle
        }
    }

    fn registry(&self) -> &VoiceRegistry {
        &self.registry
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }
}
