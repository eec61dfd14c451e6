//! Participant identifier entry, run as the first phase of a session.
use serde::{Deserialize, Serialize};

use crate::input::{InputEvent, Key};

/// Longest identifier accepted from the keyboard.
pub const MAX_PARTICIPANT_ID_LEN: usize = 20;

/// Identifier used when a session closes before one was entered.
pub const ANONYMOUS_PARTICIPANT: &str = "anonymous";

/// Text buffer edited during the participant-entry phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryBuffer {
    text: String,
}

/// Result of feeding one event to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Editing,
    Confirmed(String),
}

impl EntryBuffer {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply a key event. Enter confirms only a non-empty buffer.
    pub fn apply(&mut self, event: &InputEvent) -> EntryOutcome {
        let InputEvent::KeyDown { key } = event else {
            return EntryOutcome::Editing;
        };
        match key {
            Key::Enter if !self.text.is_empty() => {
                return EntryOutcome::Confirmed(self.text.clone());
            }
            Key::Backspace => {
                self.text.pop();
            }
            Key::Space => self.push(' '),
            Key::Char(c) if c.is_alphanumeric() || c.is_whitespace() => self.push(*c),
            _ => {}
        }
        EntryOutcome::Editing
    }

    fn push(&mut self, c: char) {
        if self.text.chars().count() < MAX_PARTICIPANT_ID_LEN {
            self.text.push(c);
        }
    }
}
