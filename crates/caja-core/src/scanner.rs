//! # Scanner Input Classifier
//!
//! Tells barcode-scanner bursts apart from human typing, using nothing but
//! keystroke timing and character validity - there is no dedicated scanner
//! hardware API.
//!
//! ## Classification Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Keystroke Classification                            │
//! │                                                                         │
//! │  Keystroke arrives                                                      │
//! │       │                                                                 │
//! │       ├── text field focused OR modifier held? ──► ignore              │
//! │       │                                                                 │
//! │       ├── not a code character [0-9A-Za-z-_.]? ──► ignore              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  gap since previous accepted key < 100ms, or already mid-burst?        │
//! │       │                                                                 │
//! │       ├── yes ──► append to buffer, mark scanning                      │
//! │       │                                                                 │
//! │       └── no ───► start a FRESH one-character buffer                   │
//! │                                                                         │
//! │  Every accepted character re-arms the commit deadline (now + 100ms).   │
//! │  When the deadline passes with no further input, the buffer commits:   │
//! │  emitted as a code if 3..=50 valid chars, silently discarded if not.   │
//! │                                                                         │
//! │  Enter (no field focused) commits immediately, bypassing the deadline. │
//! │  Escape wipes everything, emits nothing.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Timestamp Arguments?
//! The classifier owns no timer. Time enters as explicit `Instant`
//! arguments and leaves as a commit deadline the caller schedules; the
//! tokio driver in the terminal crate turns that deadline into a cancelable
//! sleep. This keeps the state machine deterministic under test and makes
//! teardown trivial - there is no callback that can fire after detach.

use std::time::{Duration, Instant};

use crate::validation::{is_code_char, validate_code};

// =============================================================================
// Configuration
// =============================================================================

/// Tuning knobs for the burst classifier.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Maximum gap between keystrokes of a single burst.
    pub burst_gap: Duration,

    /// Idle time after the last accepted character before the buffer
    /// commits.
    pub commit_delay: Duration,

    /// Minimum accepted code length.
    pub min_len: usize,

    /// Maximum accepted code length.
    pub max_len: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            burst_gap: Duration::from_millis(100),
            commit_delay: Duration::from_millis(100),
            min_len: 3,
            max_len: 50,
        }
    }
}

// =============================================================================
// Key Events
// =============================================================================

/// The keys the classifier cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// The Enter key.
    Enter,
    /// The Escape key.
    Escape,
    /// Anything else (arrows, function keys, ...).
    Other,
}

/// A single keystroke as observed by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    /// Which key was pressed.
    pub key: Key,

    /// True when ctrl, alt or meta is held.
    pub modifier_held: bool,

    /// True when a text-entry UI element currently has focus.
    pub editing_focused: bool,
}

impl KeyPress {
    /// A bare character press with no modifier and no field focus.
    pub fn char(c: char) -> Self {
        KeyPress {
            key: Key::Char(c),
            modifier_held: false,
            editing_focused: false,
        }
    }

    /// A bare key press with no modifier and no field focus.
    pub fn key(key: Key) -> Self {
        KeyPress {
            key,
            modifier_held: false,
            editing_focused: false,
        }
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Burst classifier state.
///
/// Re-entrant by construction: [`ScanClassifier::reset`] drops every piece
/// of state, so detaching and reattaching the input listener cannot leak a
/// buffer or a stale deadline.
#[derive(Debug)]
pub struct ScanClassifier {
    config: ScannerConfig,
    buffer: String,
    scanning: bool,
    last_accept: Option<Instant>,
    deadline: Option<Instant>,
}

impl ScanClassifier {
    /// Creates a classifier with the given tuning.
    pub fn new(config: ScannerConfig) -> Self {
        ScanClassifier {
            config,
            buffer: String::new(),
            scanning: false,
            last_accept: None,
            deadline: None,
        }
    }

    /// Feeds one keystroke into the classifier.
    ///
    /// Returns a completed code only on an immediate Enter commit; timed
    /// commits happen through [`ScanClassifier::on_deadline`].
    pub fn on_key(&mut self, press: &KeyPress, now: Instant) -> Option<String> {
        // Escape wipes the buffer no matter what has focus.
        if press.key == Key::Escape {
            self.reset();
            return None;
        }

        // Keystrokes belonging to a focused field or a shortcut are not ours.
        if press.editing_focused || press.modifier_held {
            return None;
        }

        match press.key {
            Key::Enter => self.finalize(),
            Key::Char(c) if is_code_char(c) => {
                let in_burst = self.scanning
                    || self
                        .last_accept
                        .is_some_and(|prev| now.duration_since(prev) < self.config.burst_gap);

                if in_burst {
                    self.buffer.push(c);
                    self.scanning = true;
                } else {
                    // A slow keystroke is (so far) human typing: keep only
                    // the newest character so a scanner burst starting here
                    // still yields a clean code.
                    self.buffer.clear();
                    self.buffer.push(c);
                    self.scanning = false;
                }

                self.last_accept = Some(now);
                self.deadline = Some(now + self.config.commit_delay);
                None
            }
            _ => None,
        }
    }

    /// The instant at which the current buffer should commit, if any.
    ///
    /// The caller re-reads this after every [`ScanClassifier::on_key`] and
    /// schedules a single cancelable sleep against it.
    pub fn commit_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Commits the buffer if the deadline has passed.
    ///
    /// Safe to call spuriously; nothing happens while the deadline is still
    /// in the future or no buffer is pending.
    pub fn on_deadline(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.finalize(),
            _ => None,
        }
    }

    /// Drops all state: buffer, scanning flag, deadline.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanning = false;
        self.last_accept = None;
        self.deadline = None;
    }

    /// True while a burst is being accumulated.
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Commits whatever is buffered: emits it when it passes the length and
    /// character rules, discards it otherwise. Always clears.
    fn finalize(&mut self) -> Option<String> {
        let code = std::mem::take(&mut self.buffer);
        self.reset();

        match validate_code(&code, self.config.min_len, self.config.max_len) {
            Ok(()) => Some(code),
            Err(_) => None,
        }
    }
}

impl Default for ScanClassifier {
    fn default() -> Self {
        ScanClassifier::new(ScannerConfig::default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
