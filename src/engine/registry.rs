//! Voice registry: bounded voice history plus the note → active voice map.

use std::collections::{HashMap, VecDeque};

use log::debug;

use super::voice::{Voice, VoiceId};
use crate::note::NoteId;

#[derive(Debug, Clone)]
pub struct VoiceRegistry {
    /// Oldest first.
    history: VecDeque<Voice>,
    active: HashMap<NoteId, VoiceId>,
    capacity: usize,
    next_id: u64,
}

impl VoiceRegistry {
    pub fn new(capacity: usize) -> Self {
        VoiceRegistry {
            history: VecDeque::with_capacity(capacity + 1),
            active: HashMap::new(),
            capacity,
            next_id: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocate_id(&mut self) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a voice to history. Returns voices evicted to stay within
    /// capacity.
    pub fn push(&mut self, voice: Voice) -> Vec<Voice> {
        self.history.push_back(voice);
        self.prune()
    }

    /// Evict the oldest stopped voices while history exceeds capacity.
    /// Unstopped voices are never evicted, so history can only overrun the
    /// cap when every voice in it is still unstopped.
    pub fn prune(&mut self) -> Vec<Voice> {
        let mut evicted = Vec::new();
        while self.history.len() > self.capacity {
            let Some(idx) = self.history.iter().position(|v| v.is_stopped() && !self.is_registered(v)) else {
                break;
            };
            if let Some(voice) = self.history.remove(idx) {
                debug!("evicting voice {} ({}) from history", voice.id(), voice.note());
                evicted.push(voice);
            }
        }
        evicted
    }

    /// Register `id` as the active voice for `note`, returning the id it
    /// replaced.
    pub fn activate(&mut self, note: NoteId, id: VoiceId) -> Option<VoiceId> {
        self.active.insert(note, id)
    }

    pub fn deactivate(&mut self, note: &NoteId) -> Option<VoiceId> {
        self.active.remove(note)
    }

    /// Drop the registration for `voice` if it is still the active one.
    pub fn deactivate_voice(&mut self, note: &NoteId, id: VoiceId) -> bool {
        if self.active.get(note) == Some(&id) {
            self.active.remove(note);
            true
        } else {
            false
        }
    }

    pub fn active_id(&self, note: &NoteId) -> Option<VoiceId> {
        self.active.get(note).copied()
    }

    pub fn active_voice(&self, note: &NoteId) -> Option<&Voice> {
        self.active_id(note).and_then(|id| self.get(id))
    }

    /// Snapshot of notes with an active voice.
    pub fn active_notes(&self) -> Vec<NoteId> {
        self.active.keys().copied().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        // Recent voices are the ones looked up; search from the back.
        self.history.iter().rev().find(|v| v.id() == id)
    }

    pub fn get_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.history.iter_mut().rev().find(|v| v.id() == id)
    }

    pub fn history(&self) -> impl Iterator<Item = &Voice> {
        self.history.iter()
    }

    pub fn history_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.history.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    fn is_registered(&self, voice: &Voice) -> bool {
        self.active.get(&voice.note()) == Some(&voice.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvelopeShape;
    use crate::engine::voice::VoiceSources;

    fn note(s: &str) -> NoteId {
        s.parse().unwrap()
    }

    fn push_voice(reg: &mut VoiceRegistry, n: &str, now: f64, stopped: bool) -> VoiceId {
        let id = reg.allocate_id();
        let mut voice = Voice::new(
            id,
            note(n),
            VoiceSources { sources: Vec::new(), filter: None },
            &EnvelopeShape::default(),
            now,
        );
        if stopped {
            voice.force_stop(now);
        }
        reg.push(voice);
        id
    }

    #[test]
    fn ids_are_monotonic() {
        let mut reg = VoiceRegistry::new(4);
        let a = reg.allocate_id();
        let b = reg.allocate_id();
        assert!(b > a);
    }

    #[test]
    fn activate_replaces_and_deactivate_voice_checks_identity() {
        let mut reg = VoiceRegistry::new(4);
        let first = push_voice(&mut reg, "C4", 0.0, false);
        let second = push_voice(&mut reg, "C4", 1.0, false);
        assert_eq!(reg.activate(note("C4"), first), None);
        assert_eq!(reg.activate(note("C4"), second), Some(first));

        assert!(!reg.deactivate_voice(&note("C4"), first));
        assert_eq!(reg.active_id(&note("C4")), Some(second));
        assert!(reg.deactivate_voice(&note("C4"), second));
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn prune_evicts_oldest_stopped_first() {
        let mut reg = VoiceRegistry::new(2);
        let a = push_voice(&mut reg, "C4", 0.0, true);
        let b = push_voice(&mut reg, "D4", 1.0, true);
        let c = push_voice(&mut reg, "E4", 2.0, true);
        assert_eq!(reg.len(), 2);
        assert!(reg.get(a).is_none());
        assert!(reg.get(b).is_some());
        assert!(reg.get(c).is_some());
    }

    #[test]
    fn prune_skips_unstopped_voices() {
        let mut reg = VoiceRegistry::new(2);
        let held = push_voice(&mut reg, "C4", 0.0, false);
        reg.activate(note("C4"), held);
        let old_stopped = push_voice(&mut reg, "D4", 1.0, true);
        push_voice(&mut reg, "E4", 2.0, true);

        assert_eq!(reg.len(), 2);
        assert!(reg.get(held).is_some());
        assert!(reg.get(old_stopped).is_none());
    }

    #[test]
    fn history_may_overrun_only_with_unstopped_voices() {
        let mut reg = VoiceRegistry::new(1);
        push_voice(&mut reg, "C4", 0.0, false);
        push_voice(&mut reg, "D4", 1.0, false);
        assert_eq!(reg.len(), 2);
        assert!(reg.prune().is_empty());
    }
}
