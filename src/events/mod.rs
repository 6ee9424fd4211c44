//! Domain events, their listeners and the event journal

mod dispatcher;
mod event;
mod id;
mod journal;

pub use dispatcher::{EventDispatcher, EventListener, JournalListener, TracingListener};
pub use event::{Event, EventEntry};
pub use id::RunId;
pub use journal::EventJournal;

#[cfg(test)]
pub(crate) use dispatcher::RecordingListener;
