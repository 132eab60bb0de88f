//! Ordered cue queue
//!
//! The cue list exclusively owns every [`Cue`]. A cue's index is its
//! position in the backing vector, so indices stay dense (0..N-1, no gaps
//! or duplicates) through every mutation without any renumbering step.

use crate::error::{PlaybackError, Result};
use crate::types::{Cue, CueSnapshot};

/// Ordered collection of cues for a show.
#[derive(Debug, Clone, Default)]
pub struct CueList {
    cues: Vec<Cue>,
}

impl CueList {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self { cues: Vec::new() }
    }

    /// Append a cue; returns its index.
    pub fn push(&mut self, cue: Cue) -> usize {
        self.cues.push(cue);
        self.cues.len() - 1
    }

    /// Move the cue at `from` so it ends up at `to`.
    ///
    /// A stable move, not a swap: every other cue keeps its relative order.
    pub fn move_cue(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.cues.len();
        if from >= len {
            return Err(PlaybackError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(PlaybackError::IndexOutOfRange { index: to, len });
        }
        if from == to {
            return Ok(());
        }

        let cue = self.cues.remove(from);
        self.cues.insert(to, cue);
        Ok(())
    }

    /// Remove and return the cue at `index`; later cues shift down by one.
    pub fn remove(&mut self, index: usize) -> Result<Cue> {
        let len = self.cues.len();
        if index >= len {
            return Err(PlaybackError::IndexOutOfRange { index, len });
        }
        Ok(self.cues.remove(index))
    }

    /// Flip the UI-only selection flag on one cue.
    pub fn set_selected(&mut self, index: usize, selected: bool) -> Result<()> {
        let len = self.cues.len();
        match self.cues.get_mut(index) {
            Some(cue) => {
                cue.selected = selected;
                Ok(())
            }
            None => Err(PlaybackError::IndexOutOfRange { index, len }),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Borrow the cues in order.
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Owned copy of the whole queue at a single point in time.
    pub fn snapshot(&self) -> CueSnapshot {
        self.cues.clone()
    }

    /// Replace the whole queue, as when a project file is loaded.
    pub fn replace(&mut self, cues: Vec<Cue>) {
        self.cues = cues;
    }
}
