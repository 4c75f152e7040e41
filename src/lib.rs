pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod note;
pub mod scale;
pub mod session;

use log::warn;
use wasm_bindgen::prelude::*;

use crate::config::{EngineConfig, EngineKind};
use crate::engine::held::HeldNotes;
use crate::engine::{DeviceState, NotePlayer};
use crate::note::NoteId;
use crate::session::Session;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the scalepad-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

fn parse_kind(kind: &str) -> Option<EngineKind> {
    match kind {
        "synth" => Some(EngineKind::Synth),
        "sampler" => Some(EngineKind::Sampler),
        _ => None,
    }
}

/// Parse a note name from the page, logging rejects.
fn parse_note(note: &str) -> Option<NoteId> {
    match note.parse() {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("ignoring invalid note '{note}': {e}");
            None
        }
    }
}

/// WASM-exposed pad engine, one per page. Lives in the AudioWorklet
/// processor; the main thread forwards pad events to it as messages.
#[wasm_bindgen]
pub struct PadEngine {
    session: Session,
}

#[wasm_bindgen]
impl PadEngine {
    /// `kind` is "synth" or "sampler"; `config_json` is an optional
    /// camelCase `EngineConfig` document.
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str, config_json: Option<String>) -> Result<PadEngine, JsValue> {
        let mut config = match config_json {
            Some(json) => EngineConfig::from_json(&json).map_err(js_err)?,
            None => EngineConfig::default(),
        };
        config.kind = parse_kind(kind).ok_or_else(|| js_err(format!("unknown engine kind '{kind}'")))?;
        let session = Session::from_config(config).map_err(js_err)?;
        Ok(PadEngine { session })
    }

    /// Bring the engine up at the worklet's sample rate. Returns false (and
    /// logs) on failure; the engine then ignores playback calls.
    pub fn init(&mut self, sample_rate: f64) -> bool {
        self.session.player_mut().init(sample_rate).is_ok()
    }

    #[wasm_bindgen(getter, js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.session.player().state() == DeviceState::Running
    }

    #[wasm_bindgen(getter, js_name = currentTime)]
    pub fn current_time(&self) -> f64 {
        self.session.player().current_time()
    }

    pub fn suspend(&mut self) {
        self.session.player_mut().suspend();
    }

    pub fn resume(&mut self) {
        self.session.player_mut().resume();
    }

    /// Pad down. Returns false for an unparseable note.
    pub fn press(&mut self, note: &str) -> bool {
        let Some(note) = parse_note(note) else {
            return false;
        };
        self.session.press(note);
        true
    }

    pub fn release(&mut self, note: &str) -> bool {
        let Some(note) = parse_note(note) else {
            return false;
        };
        self.session.release(note);
        true
    }

    /// Start a note directly, bypassing pad and held tracking.
    pub fn start(&mut self, note: &str) -> bool {
        let Some(note) = parse_note(note) else {
            return false;
        };
        self.session.player_mut().start(&note);
        true
    }

    pub fn stop(&mut self, note: &str) -> bool {
        let Some(note) = parse_note(note) else {
            return false;
        };
        self.session.player_mut().stop(&note);
        true
    }

    pub fn panic(&mut self) {
        self.session.panic();
    }

    #[wasm_bindgen(js_name = forceStopAll)]
    pub fn force_stop_all(&mut self) -> u32 {
        self.session.player_mut().force_stop_all() as u32
    }

    /// `held` is the page's `{ "C4": true, ... }` pad state map.
    #[wasm_bindgen(js_name = cleanupOrphans)]
    pub fn cleanup_orphans(&mut self, held: JsValue) -> Result<u32, JsValue> {
        let held: HeldNotes = serde_wasm_bindgen::from_value(held).map_err(js_err)?;
        Ok(self.session.player_mut().cleanup_orphans(&held) as u32)
    }

    /// Cancel the recurring orphan sweep (page teardown).
    #[wasm_bindgen(js_name = stopSweep)]
    pub fn stop_sweep(&mut self) {
        self.session.sweep_handle().cancel();
    }

    /// Fill `out` with the next block of mono audio.
    pub fn process(&mut self, out: &mut [f32]) {
        self.session.render(out);
    }

    /// Lay out the pads for a scale and return their note names. Unknown
    /// root or scale names fall back to C major.
    #[wasm_bindgen(js_name = setScale)]
    pub fn set_scale(&mut self, root: &str, scale_type: &str, octave: i8) -> Result<JsValue, JsValue> {
        let pads = self
            .session
            .set_scale_by_name(root, scale_type, octave)
            .map_err(js_err)?;
        serde_wasm_bindgen::to_value(pads).map_err(js_err)
    }

    /// Decode WAV bytes and add them as a sampler zone. `zone` is a
    /// `SampleZone` object (`{ root: "C4", keyRange?, fineTuneCents?, loop? }`).
    #[cfg(feature = "wav")]
    #[wasm_bindgen(js_name = loadSample)]
    pub fn load_sample(&mut self, zone: JsValue, wav: &[u8]) -> Result<(), JsValue> {
        use crate::dsp::sampler::{LoadedZone, SampleBuffer, SampleZone};

        let zone: SampleZone = serde_wasm_bindgen::from_value(zone).map_err(js_err)?;
        let buffer = SampleBuffer::from_wav_bytes(wav).map_err(js_err)?;
        self.session
            .load_zone(LoadedZone::from_zone(&zone, buffer))
            .map_err(js_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_manifest() {
        assert_eq!(core_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn pad_engine_plays_and_panics() {
        let mut engine = PadEngine::new("synth", None).ok().unwrap();
        assert!(!engine.is_running());
        assert!(engine.init(8000.0));
        assert!(engine.is_running());

        assert!(engine.press("A4"));
        assert!(!engine.press("H4"));
        let mut block = vec![0.0_f32; 1600];
        engine.process(&mut block);
        assert!(block.iter().any(|s| s.abs() > 0.0));
        assert_eq!(engine.current_time(), 0.2);

        engine.panic();
        assert_eq!(engine.force_stop_all(), 0);
    }

    #[test]
    fn pad_engine_takes_config_json() {
        let json = r#"{"releaseTime":1.0,"synth":{"oscillatorCount":3}}"#.to_string();
        let mut engine = PadEngine::new("synth", Some(json)).ok().unwrap();
        assert!(engine.init(8000.0));
        assert!(engine.start("C4"));
        assert!(engine.stop("C4"));
        assert_eq!(engine.session.player().config().release_time, 1.0);
    }

    #[test]
    fn sampler_pad_engine_without_zones_does_not_start() {
        let mut engine = PadEngine::new("sampler", None).ok().unwrap();
        assert!(!engine.init(8000.0));
        assert!(engine.press("C4"));
        assert!(engine.session.player().registry().is_empty());
    }
}
