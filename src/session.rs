//! Composition root: one engine, the pad layout, the held-pad snapshot and
//! the orphan sweep that ties them together.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::config::{EngineConfig, EngineKind};
use crate::dsp::sampler::LoadedZone;
use crate::engine::backend::{SamplerBackend, SynthBackend};
use crate::engine::held::HeldNotes;
use crate::engine::{NotePlayer, PlaybackEngine};
use crate::error::{ConfigError, EngineError, NoteError};
use crate::note::{NoteId, PitchClass};
use crate::scale::{self, ScaleType};

/// Cancels the recurring orphan sweep on teardown.
#[derive(Debug, Clone)]
pub struct SweepHandle(Rc<Cell<bool>>);

impl SweepHandle {
    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Recurring `cleanup_orphans` call, scheduled on the engine clock.
#[derive(Debug)]
pub struct OrphanSweep {
    interval: f64,
    next_due: f64,
    cancelled: Rc<Cell<bool>>,
}

impl OrphanSweep {
    /// `interval` is in seconds of engine time and must be positive.
    pub fn new(interval: f64) -> Result<Self, ConfigError> {
        if !(interval > 0.0 && interval.is_finite()) {
            return Err(ConfigError::NotPositive {
                field: "sweepInterval",
                value: interval,
            });
        }
        Ok(OrphanSweep {
            interval,
            next_due: interval,
            cancelled: Rc::new(Cell::new(false)),
        })
    }

    pub fn handle(&self) -> SweepHandle {
        SweepHandle(Rc::clone(&self.cancelled))
    }

    /// Run the sweep if it is due at `now`. Returns the number of voices
    /// reclaimed, or `None` when nothing ran.
    pub fn poll(&mut self, now: f64, player: &mut dyn NotePlayer, held: &HeldNotes) -> Option<usize> {
        if self.cancelled.get() || now < self.next_due {
            return None;
        }
        // A long render block can skip several ticks; run once and catch up.
        while self.next_due <= now {
            self.next_due += self.interval;
        }
        Some(player.cleanup_orphans(held))
    }
}

pub struct Session {
    player: Box<dyn NotePlayer>,
    held: HeldNotes,
    pads: Vec<NoteId>,
    sweep: OrphanSweep,
}

impl Session {
    pub fn new(player: Box<dyn NotePlayer>) -> Result<Self, ConfigError> {
        let sweep = OrphanSweep::new(player.config().sweep_interval)?;
        Ok(Session {
            player,
            held: HeldNotes::new(),
            pads: Vec::new(),
            sweep,
        })
    }

    /// Build the backend `config.kind` names. A sampler session starts with
    /// an empty bank; zones are added through [`Session::load_zone`].
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        let player: Box<dyn NotePlayer> = match config.kind {
            EngineKind::Synth => {
                let backend = SynthBackend::new(config.synth);
                Box::new(PlaybackEngine::new(config, backend)?)
            }
            EngineKind::Sampler => Box::new(PlaybackEngine::new(config, SamplerBackend::default())?),
        };
        Session::new(player)
    }

    pub fn player(&self) -> &dyn NotePlayer {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> &mut dyn NotePlayer {
        self.player.as_mut()
    }

    pub fn load_zone(&mut self, zone: LoadedZone) -> Result<(), EngineError> {
        self.player.load_zone(zone)
    }

    pub fn held(&self) -> &HeldNotes {
        &self.held
    }

    pub fn pads(&self) -> &[NoteId] {
        &self.pads
    }

    pub fn sweep_handle(&self) -> SweepHandle {
        self.sweep.handle()
    }

    /// Replace the pad layout. Held state for notes that left the grid is
    /// dropped; their voices are stopped.
    pub fn set_pads(&mut self, pads: Vec<NoteId>) {
        let leaving: Vec<NoteId> = self.held.held().filter(|n| !pads.contains(n)).collect();
        for note in leaving {
            self.held.release(note);
            self.player.stop(&note);
        }
        self.pads = pads;
    }

    pub fn set_scale(&mut self, root: PitchClass, scale: ScaleType, octave: i8) -> Result<&[NoteId], NoteError> {
        let pads = scale::generate_scale(root, scale, octave)?;
        info!("scale set to {root} {} from octave {octave}", scale.display_name());
        self.set_pads(pads);
        Ok(&self.pads)
    }

    /// Selector-facing variant: unknown root or scale names are logged and
    /// fall back to C major.
    pub fn set_scale_by_name(&mut self, root: &str, scale_type: &str, octave: i8) -> Result<&[NoteId], NoteError> {
        let (root, scale_type) = scale::resolve_names(root, scale_type);
        self.set_scale(root, scale_type, octave)
    }

    fn on_pad(&self, note: &NoteId) -> bool {
        self.pads.is_empty() || self.pads.contains(note)
    }

    /// Pad pressed: mark held, then start.
    pub fn press(&mut self, note: NoteId) {
        if !self.on_pad(&note) {
            warn!("{note} is not assigned to a pad; ignoring press");
            return;
        }
        self.held.press(note);
        self.player.start(&note);
    }

    /// Pad released. Stopping is always allowed so a stale layout can't
    /// leave a note ringing.
    pub fn release(&mut self, note: NoteId) {
        if !self.on_pad(&note) {
            debug!("release of {note}, which is not on a pad");
        }
        self.held.release(note);
        self.player.stop(&note);
    }

    pub fn panic(&mut self) {
        self.held.clear();
        self.player.panic();
    }

    /// Render a block, then run the orphan sweep if it has come due.
    pub fn render(&mut self, out: &mut [f32]) {
        self.player.render(out);
        let now = self.player.current_time();
        if let Some(reclaimed) = self.sweep.poll(now, self.player.as_mut(), &self.held) {
            if reclaimed > 0 {
                debug!("orphan sweep at {now:.2}s reclaimed {reclaimed} voice(s)");
            }
        }
    }
}
