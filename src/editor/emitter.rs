//! Debounced change delivery.
//!
//! The editor is single-threaded, so there is no timer task: a
//! [`Debouncer`] only remembers a deadline, and the host drives it by
//! calling [`Editor::poll`](super::Editor::poll). Time comes from a
//! [`Clock`] so tests can step it by hand.

use crate::doc::Document;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Trailing-edge debounce: every `schedule` pushes the deadline out to
/// `now + window`, and `poll` fires once the deadline has passed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `true` exactly once per deadline, when `now` has reached it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

pub type ChangeSink = Box<dyn FnMut(String)>;

/// Serializes the document and hands it to the host sink when the
/// debounce window closes.
pub struct ChangeEmitter {
    debouncer: Debouncer,
    sink: ChangeSink,
    emitted: usize,
}

impl fmt::Debug for ChangeEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEmitter")
            .field("debouncer", &self.debouncer)
            .field("emitted", &self.emitted)
            .finish_non_exhaustive()
    }
}

impl ChangeEmitter {
    pub fn new(window: Duration, sink: ChangeSink) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            sink,
            emitted: 0,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.debouncer.schedule(now);
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Number of deliveries so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Delivers `doc` if the window has closed by `now`.
    pub fn poll(&mut self, now: Instant, doc: &Document) -> bool {
        if !self.debouncer.poll(now) {
            return false;
        }
        self.emit(doc);
        true
    }

    /// Delivers a pending change immediately.
    pub fn flush(&mut self, doc: &Document) -> bool {
        if !self.debouncer.is_pending() {
            return false;
        }
        self.debouncer.cancel();
        self.emit(doc);
        true
    }

    fn emit(&mut self, doc: &Document) {
        let markup = doc.to_markup();
        self.emitted += 1;
        debug!(bytes = markup.len(), count = self.emitted, "emitting change");
        (self.sink)(markup);
    }
}
