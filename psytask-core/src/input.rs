//! Abstract input events and wall-clock readers consumed by the sessions.
//!
//! The engines never poll devices. A host translates its toolkit's events into
//! [`InputEvent`] values and supplies a [`Clock`].
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Keys the sessions react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Space,
    Enter,
    Escape,
    Backspace,
    /// Printable character, as delivered by the toolkit's text input.
    Char(char),
}

/// Discrete input event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown { position: Point },
    KeyDown { key: Key },
    WindowClose,
}

impl InputEvent {
    #[must_use]
    pub const fn click(x: i32, y: i32) -> Self {
        Self::PointerDown {
            position: Point::new(x, y),
        }
    }

    #[must_use]
    pub const fn key(key: Key) -> Self {
        Self::KeyDown { key }
    }

    /// Escape or window-close: cancels the session from any phase.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(
            self,
            Self::WindowClose | Self::KeyDown { key: Key::Escape }
        )
    }

    #[must_use]
    pub fn is_key(&self, wanted: Key) -> bool {
        matches!(self, Self::KeyDown { key } if *key == wanted)
    }

    #[must_use]
    pub const fn pointer(&self) -> Option<Point> {
        match self {
            Self::PointerDown { position } => Some(*position),
            _ => None,
        }
    }
}

/// Monotonic wall-clock reader, in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Clock backed by [`Instant`], measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced clock. Clones share the same time source, so a host can
/// advance the clock the session loop reads.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    #[must_use]
    pub fn starting_at(secs: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(secs)),
        }
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}
