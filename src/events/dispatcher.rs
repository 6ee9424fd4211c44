//! Event listeners and the dispatcher that fans events out to them
//!
//! The dispatcher is created by whoever starts a run and passed down
//! explicitly; there is no process-wide bus.

use std::rc::Rc;

use tracing::{info, warn};

use super::event::{Event, EventEntry};
use super::id::RunId;
use super::journal::EventJournal;
use crate::error::StewardResult;

/// Receives every event dispatched during a run
pub trait EventListener {
    fn handle(&self, run_id: RunId, event: &Event) -> StewardResult<()>;
}

impl<T: EventListener + ?Sized> EventListener for Rc<T> {
    fn handle(&self, run_id: RunId, event: &Event) -> StewardResult<()> {
        (**self).handle(run_id, event)
    }
}

/// Sends each event to every registered listener, in registration order
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    pub fn subscribe(&mut self, listener: impl EventListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Builder form of [`EventDispatcher::subscribe`]
    pub fn with_listener(mut self, listener: impl EventListener + 'static) -> Self {
        self.subscribe(listener);
        self
    }

    /// Deliver an event
    ///
    /// A failing listener is logged and skipped; the others still receive
    /// the event.
    pub fn dispatch(&self, run_id: RunId, event: &Event) {
        for listener in &self.listeners {
            if let Err(err) = listener.handle(run_id, event) {
                warn!(event = event.name(), run = %run_id, error = %err, "Event listener failed");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn handle(&self, run_id: RunId, event: &Event) -> StewardResult<()> {
        match event {
            Event::ActionFailed { .. } | Event::UnhealthyDestinationsFound { .. } => {
                warn!(run = %run_id, event = event.name(), "{}", event.summary());
            }
            _ => {
                info!(run = %run_id, event = event.name(), "{}", event.summary());
            }
        }
        Ok(())
    }
}

/// Appends every event to the journal
pub struct JournalListener {
    journal: EventJournal,
}

impl JournalListener {
    pub fn new(journal: EventJournal) -> Self {
        Self { journal }
    }
}

impl EventListener for JournalListener {
    fn handle(&self, run_id: RunId, event: &Event) -> StewardResult<()> {
        self.journal.append(&EventEntry::new(run_id, event.clone()))
    }
}

/// Keeps every event it receives; used by tests to observe runs
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingListener {
    events: std::cell::RefCell<Vec<(RunId, Event)>>,
}

#[cfg(test)]
impl RecordingListener {
    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.borrow().iter().map(|(_, e)| e.clone()).collect()
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(|(_, e)| e.name()).collect()
    }

    pub(crate) fn run_ids(&self) -> Vec<RunId> {
        self.events.borrow().iter().map(|(id, _)| *id).collect()
    }
}

#[cfg(test)]
impl EventListener for RecordingListener {
    fn handle(&self, run_id: RunId, event: &Event) -> StewardResult<()> {
        self.events.borrow_mut().push((run_id, event.clone()));
        Ok(())
    }
}
