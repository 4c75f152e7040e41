use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::note::NoteId;

/// Snapshot of which pads the UI believes are pressed.
///
/// Serializes as a plain `{ "C4": true, "E4": false }` map, the shape the
/// page already keeps for its pad states. Only an explicit `true` counts as
/// held.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeldNotes(HashMap<NoteId, bool>);

impl HeldNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, note: NoteId) {
        self.0.insert(note, true);
    }

    pub fn release(&mut self, note: NoteId) {
        self.0.insert(note, false);
    }

    pub fn is_held(&self, note: &NoteId) -> bool {
        self.0.get(note).copied().unwrap_or(false)
    }

    pub fn held(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.0.iter().filter(|(_, held)| **held).map(|(note, _)| *note)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<NoteId> for HeldNotes {
    fn from_iter<I: IntoIterator<Item = NoteId>>(iter: I) -> Self {
        HeldNotes(iter.into_iter().map(|note| (note, true)).collect())
    }
}
